// Bearer-token authentication
//
// `POST /v2/authentication/login` trades a username/password for a bearer
// token plus the account and location the user belongs to. The token is
// injected as a default header on a fresh client; the account alias is kept
// as session metadata and supplies the default alias for server lookups.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::ClcClient;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Identity returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_name: String,
    /// Account the user belongs to; the default alias for API paths.
    pub account_alias: String,
    /// Home data center of the account (e.g. `WA1`).
    #[serde(default)]
    pub location_alias: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(flatten)]
    session: Session,
    bearer_token: String,
}

impl ClcClient {
    /// Authenticate with username/password and return a client that sends
    /// the issued bearer token on every request.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let anonymous = Self::from_reqwest(base_url, transport.build_client()?)?;
        let url = anonymous.url("authentication/login")?;

        debug!(username, "logging in at {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = anonymous.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let login: LoginResponse = Self::handle_response(resp).await?;
        let bearer_token = SecretString::from(login.bearer_token);

        let mut token = HeaderValue::from_str(&format!(
            "Bearer {}",
            bearer_token.expose_secret()
        ))
        .map_err(|e| Error::Authentication {
            message: format!("invalid bearer token header value: {e}"),
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        let http = transport.build_client_with_headers(headers)?;
        debug!(alias = %login.session.account_alias, "login successful");

        Ok(Self::from_reqwest(base_url, http)?.with_session(login.session))
    }
}
