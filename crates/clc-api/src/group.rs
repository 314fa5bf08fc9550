// Server groups
//
// `GET groups/{alias}/{id}` returns the group a server lives in. Only the
// fields the server proxy needs are typed; the rest stay in `extra`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ClcClient;
use crate::error::Error;
use crate::model::Link;

/// Typed group document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers_count: Option<u32>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A server group within an account.
#[derive(Debug, Clone)]
pub struct Group {
    alias: String,
    data: GroupData,
}

impl Group {
    /// Fetch a group by id.
    pub async fn load(client: &ClcClient, id: &str, alias: &str) -> Result<Self, Error> {
        debug!(id, alias, "loading group");
        let data: GroupData = client
            .get(&format!("groups/{alias}/{id}"))
            .await
            .map_err(|e| {
                if e.status() == Some(404) {
                    Error::GroupNotFound {
                        alias: alias.to_owned(),
                        id: id.to_owned(),
                    }
                } else {
                    e
                }
            })?;
        Ok(Self {
            alias: alias.to_owned(),
            data,
        })
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn data(&self) -> &GroupData {
        &self.data
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data.name)
    }
}
