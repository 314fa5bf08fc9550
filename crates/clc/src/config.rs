//! CLI configuration: thin wrapper around `clc_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--endpoint, --username, --alias, ...).

use std::time::Duration;

use secrecy::SecretString;

use clc_api::TlsMode;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use clc_config::{ClientConfig, Config, Profile, config_path, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build connection settings from the config file, profile, and CLI flags.
///
/// Flags win over the profile. Without a config entry the CLI still works
/// from flags and `CLC_*` variables alone, unless `--profile` named a
/// profile that does not exist.
pub fn resolve_client_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ClientConfig, CliError> {
    let profile_name = active_profile_name(global, config);
    let fallback = Profile::default();

    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.profile.is_some() => {
            let mut available: Vec<_> = config.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
                path: config_path().display().to_string(),
            });
        }
        None => &fallback,
    };

    let endpoint =
        clc_config::parse_endpoint(global.endpoint.as_deref().unwrap_or(&profile.endpoint))?;

    let username = match global.username {
        Some(ref username) => username.clone(),
        None => clc_config::resolve_username(profile, &profile_name)?,
    };
    let password = match global.password {
        Some(ref password) => SecretString::from(password.clone()),
        None => clc_config::resolve_password(profile, &profile_name)?,
    };

    let mut transport = clc_config::transport_for(profile, &config.defaults);
    if global.insecure {
        transport.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        transport.timeout = Duration::from_secs(secs);
    }

    Ok(ClientConfig {
        endpoint,
        alias: global.alias.clone().or_else(|| profile.alias.clone()),
        username,
        password,
        transport,
    })
}
