// HTTP client for the CenturyLink Cloud v2 API.
//
// Base path: /v2/
// Auth: `Authorization: Bearer <token>` obtained from `authentication/login`
//
// Wraps `reqwest::Client` with URL construction and JSON response handling.
// Resource proxies (servers, groups, request trackers) call into the verb
// helpers here and keep their own modules focused on API semantics.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::Session;
use crate::error::Error;

/// Public API endpoint used when no override is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.ctl.io";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the CLC v2 API.
///
/// Cheap to clone: the underlying `reqwest::Client` and the session are
/// both reference counted, so every [`Server`](crate::Server) proxy can
/// carry its own handle.
#[derive(Debug, Clone)]
pub struct ClcClient {
    http: reqwest::Client,
    base_url: Url,
    session: Option<Arc<Session>>,
}

impl ClcClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            session: None,
        })
    }

    /// Attach session metadata (account alias, location) to this client.
    ///
    /// [`login`](Self::login) does this automatically; tests and callers
    /// holding a pre-issued token use it to enable default-alias resolution.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(Arc::new(session));
        self
    }

    /// Build the base URL with the `/v2/` API prefix.
    ///
    /// `https://api.ctl.io` and `https://api.ctl.io/v2` both normalise to
    /// `https://api.ctl.io/v2/`.
    pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;

        let path = url.path().trim_end_matches('/').to_owned();
        if path.ends_with("/v2") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/v2/"));
        }

        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The API base URL (always ends with `/v2/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session metadata from login, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Resolve an API path.
    ///
    /// Relative paths (`servers/ALIAS/ID`) join onto the `/v2/` base.
    /// Link hrefs (`/v2/servers/ALIAS/ID/snapshots/1`) drop their `/v2/`
    /// prefix and join the same way, so a prefixed endpoint keeps its path.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let relative = path
            .strip_prefix("/v2/")
            .unwrap_or_else(|| path.trim_start_matches('/'));
        Ok(self.base_url.join(relative)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    /// POST without a request body (link-driven actions such as snapshot restore).
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).send().await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        Self::handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    pub(crate) async fn handle_response<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        // Some endpoints answer 204 / empty 200; surface that as JSON null.
        let text = if body.trim().is_empty() {
            "null"
        } else {
            body.as_str()
        };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "bearer token missing, expired, or rejected (HTTP 401)".into(),
            };
        }

        let raw = resp.text().await.unwrap_or_default();

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(body) => {
                let message = serde_json::from_value::<ErrorResponse>(body.clone())
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| status.to_string());
                Error::Api {
                    status: status.as_u16(),
                    message,
                    body: Some(body),
                }
            }
            Err(_) => Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                body: None,
            },
        }
    }
}
