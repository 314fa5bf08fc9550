// ── Server document types ──
//
// Typed view over `GET servers/{alias}/{id}`. Every struct keeps an `extra`
// map so fields added to the API later survive deserialization and stay
// reachable through `Server::attribute`. Typed fields are lenient: a null or
// wrong-typed value reads as the field's default and the raw value stays in
// the document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Array of `T`, dropping entries that do not parse.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A `{rel, href}` pair pointing at a related resource or action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
}

impl Link {
    /// The link's `id`, falling back to the final path segment of `href`.
    pub fn id_or_last_segment(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            self.href
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned()
        })
    }
}

/// Hypervisor-level point-in-time image of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Snapshot {
    /// Href of the link with the given relation (`delete`, `restore`).
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel)
            .map(|l| l.href.as_str())
    }
}

/// The nested `details` object of a server document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub in_maintenance_mode: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient",
        rename = "memoryMB",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_mb: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient",
        rename = "storageGB",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_gb: Option<u64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub snapshots: Vec<Snapshot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed server document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerData {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        rename = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_template: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub details: ServerDetails,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
