//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use clc_api::{AdditionalDisk, ClcClient, CustomField, DiskType, Requests};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the command is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Poll queued requests until they finish, behind a spinner.
pub async fn wait_for(
    client: &ClcClient,
    requests: &Requests,
    poll_interval: Duration,
    quiet: bool,
) -> Result<(), CliError> {
    if requests.is_empty() {
        return Ok(());
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("waiting on {} request(s)", requests.len()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = requests.wait_until_complete(client, poll_interval).await;
    spinner.finish_and_clear();

    match result? {
        0 => Ok(()),
        failed => Err(CliError::RequestsFailed {
            failed,
            total: requests.len(),
        }),
    }
}

// ── Argument parsers ────────────────────────────────────────────────

/// `KEY=VALUE`
pub fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// `ID=VALUE`
pub fn parse_custom_field(raw: &str) -> Result<CustomField, String> {
    let (id, value) = parse_key_val(raw)?;
    Ok(CustomField { id, value })
}

/// `PATH:SIZE_GB` for a partitioned disk, `raw:SIZE_GB` for a raw one.
pub fn parse_disk(raw: &str) -> Result<AdditionalDisk, String> {
    let (path, size) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PATH:SIZE_GB or raw:SIZE_GB, got '{raw}'"))?;
    let size_gb = size
        .parse::<u32>()
        .map_err(|e| format!("invalid disk size '{size}': {e}"))?;

    Ok(if path.eq_ignore_ascii_case("raw") {
        AdditionalDisk {
            path: None,
            size_gb,
            disk_type: DiskType::Raw,
        }
    } else {
        AdditionalDisk {
            path: Some(path.to_owned()),
            size_gb,
            disk_type: DiskType::Partitioned,
        }
    })
}
