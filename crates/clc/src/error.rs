//! CLI error types with miette diagnostics.
//!
//! Maps `clc_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use clc_api::Error as ApiError;
use clc_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(clc::connection_failed),
        help(
            "Check the endpoint and your network connection.\n\
             Override it with --endpoint or the profile's `endpoint` key."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(clc::tls_error),
        help("Check the profile's ca_cert path, or pass --insecure (-k) for lab endpoints.")
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(clc::auth_failed),
        help(
            "Verify your username and password.\n\
             Run: clc config set-password --profile <name>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(clc::no_credentials),
        help(
            "Set `username` in the profile and run: clc config set-password\n\
             Or set CLC_USERNAME and CLC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("No account alias available")]
    #[diagnostic(
        code(clc::no_alias),
        help("Pass --alias or set `alias` in the profile.")
    )]
    NoAlias,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(clc::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    #[error("Server {server} refused the operation: {message}")]
    #[diagnostic(code(clc::operation_failed))]
    OperationFailed { server: String, message: String },

    #[error("{failed} of {total} queued requests failed")]
    #[diagnostic(
        code(clc::requests_failed),
        help("Check the request history in the control portal for details.")
    )]
    RequestsFailed { failed: usize, total: usize },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(clc::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected API response: {message}")]
    #[diagnostic(code(clc::bad_response), help("Re-run with -vv to log the exchange."))]
    BadResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(clc::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(clc::profile_not_found),
        help("Available profiles: {available}\nConfig file: {path}")
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(clc::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(clc::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(clc::timeout),
        help("Increase the timeout with --timeout or the profile's `timeout` key.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(clc::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(clc::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::OperationFailed { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } | Self::NoAlias => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } => CliError::AuthFailed { message },

            ApiError::NoAlias => CliError::NoAlias,

            ApiError::Transport(e) if e.is_timeout() => CliError::Timeout,

            ApiError::Transport(e) if e.is_connect() => CliError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string),
                source: Box::new(e),
            },

            ApiError::Transport(e) => CliError::Api {
                status: e.status().map_or(0, |s| s.as_u16()),
                message: e.to_string(),
            },

            ApiError::Tls(message) => CliError::TlsError { message },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "endpoint".into(),
                reason: e.to_string(),
            },

            ApiError::Api {
                status, message, ..
            } => CliError::Api { status, message },

            ApiError::Deserialization { message, .. } => CliError::BadResponse { message },

            ApiError::ServerNotFound { alias, id } => CliError::NotFound {
                resource_type: "server".into(),
                identifier: id,
                hint: format!("No such server in account {alias}. Check --alias."),
            },

            ApiError::GroupNotFound { alias, id } => CliError::NotFound {
                resource_type: "group".into(),
                identifier: id,
                hint: format!("No such group in account {alias}."),
            },

            ApiError::AttributeNotFound { field } => CliError::NotFound {
                resource_type: "attribute".into(),
                identifier: field,
                hint: "Run: clc server get <server> -o json to see every field".into(),
            },

            ApiError::NoSnapshots => CliError::NotFound {
                resource_type: "snapshot".into(),
                identifier: "(any)".into(),
                hint: "The server has no snapshots to restore.".into(),
            },

            ApiError::SnapshotNotFound { name } => CliError::NotFound {
                resource_type: "snapshot".into(),
                identifier: name,
                hint: "Run: clc server snapshots <server>".into(),
            },

            ApiError::LinkNotFound { name, rel } => CliError::BadResponse {
                message: format!("snapshot '{name}' has no '{rel}' link"),
            },

            ApiError::OperationFailed { server, message } => {
                CliError::OperationFailed { server, message }
            }

            ApiError::Validation { field, reason } => CliError::Validation { field, reason },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
