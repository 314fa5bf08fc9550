// Account scope
//
// Every API path is scoped by an account alias. An `Account` is that alias
// as a value; the default one comes from the logged-in session.

use std::fmt;

use serde::Serialize;

use crate::client::ClcClient;
use crate::error::Error;

/// Account that owns servers and groups, identified by its alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Account {
    alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl Account {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            location: None,
        }
    }

    /// The account of the logged-in user.
    ///
    /// Fails with [`Error::NoAlias`] when the client carries no session.
    pub fn default_for(client: &ClcClient) -> Result<Self, Error> {
        let session = client.session().ok_or(Error::NoAlias)?;
        Ok(Self {
            alias: session.account_alias.clone(),
            location: session.location_alias.clone(),
        })
    }

    /// Use `alias` when given, otherwise the session's account.
    pub(crate) fn resolve(client: &ClcClient, alias: Option<&str>) -> Result<Self, Error> {
        match alias {
            Some(alias) => Ok(Self::new(alias)),
            None => Self::default_for(client),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Home data center, known only for the session's own account.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias)
    }
}
