use thiserror::Error;

/// Top-level error type for the `clc-api` crate.
///
/// Covers every failure mode of the server proxy and its collaborators:
/// authentication, transport, structured API errors, and the domain errors
/// raised by snapshot, attribute, and create validation.
/// The `clc` binary maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the bearer token was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No account alias was supplied and no session is available to supply one.
    #[error("No account alias available -- log in or pass an alias explicitly")]
    NoAlias,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response from the API. `body` holds the parsed JSON
    /// error document when the response carried one.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Servers ─────────────────────────────────────────────────────
    /// The API answered 404 for the requested server.
    #[error("Server does not exist: {alias}/{id}")]
    ServerNotFound { alias: String, id: String },

    /// The API answered 404 for the requested group.
    #[error("Group does not exist: {alias}/{id}")]
    GroupNotFound { alias: String, id: String },

    /// Neither the top-level document nor `details` carries the field.
    #[error("'Server' instance has no attribute '{field}'")]
    AttributeNotFound { field: String },

    /// A non-queued operation entry that is not a benign "already in state" reply.
    #[error("Operation failed for server {server}: {message}")]
    OperationFailed { server: String, message: String },

    // ── Snapshots ───────────────────────────────────────────────────
    #[error("No snapshots exist")]
    NoSnapshots,

    #[error("Snapshot '{name}' does not exist")]
    SnapshotNotFound { name: String },

    #[error("Snapshot '{name}' has no '{rel}' link")]
    LinkNotFound { name: String, rel: String },

    // ── Validation ──────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ServerNotFound { .. } | Self::GroupNotFound { .. }
        ) || self.status() == Some(404)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
