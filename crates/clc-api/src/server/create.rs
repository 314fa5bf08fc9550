// Server creation
//
// `POST /v2/servers/{alias}` queues a build from a template. Enum and shape
// checks run locally so an invalid request never reaches the API.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::account::Account;
use crate::client::ClcClient;
use crate::error::Error;
use crate::requests::Requests;

use super::Server;

// ── Enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Standard,
    Hyperscale,
}

impl FromStr for ServerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "hyperscale" => Ok(Self::Hyperscale),
            other => Err(Error::Validation {
                field: "type".into(),
                reason: format!("expected 'standard' or 'hyperscale', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::Hyperscale => "hyperscale",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Standard,
    Premium,
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(Error::Validation {
                field: "storage_type".into(),
                reason: format!("expected 'standard' or 'premium', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Partitioned,
    Raw,
}

// ── Request parts ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "sizeGB")]
    pub size_gb: u32,
    #[serde(rename = "type")]
    pub disk_type: DiskType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub id: String,
    pub value: String,
}

/// Parameters for a new server.
#[derive(Debug, Clone)]
pub struct CreateServer {
    pub name: String,
    /// Defaults to `name`.
    pub description: Option<String>,
    pub cpu: u32,
    pub memory_gb: u32,
    /// Template (source server) name.
    pub template: String,
    pub group_id: String,
    pub network_id: Option<String>,
    pub password: Option<SecretString>,
    pub ip_address: Option<String>,
    pub primary_dns: String,
    pub secondary_dns: String,
    pub storage_type: StorageType,
    pub server_type: ServerType,
    pub additional_disks: Vec<AdditionalDisk>,
    pub custom_fields: Vec<CustomField>,
    /// Delete the server this long after creation.
    pub ttl: Option<Duration>,
    pub managed_os: bool,
}

impl CreateServer {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        group_id: impl Into<String>,
        cpu: u32,
        memory_gb: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            cpu,
            memory_gb,
            template: template.into(),
            group_id: group_id.into(),
            network_id: None,
            password: None,
            ip_address: None,
            primary_dns: "8.8.8.8".into(),
            secondary_dns: "8.8.4.4".into(),
            storage_type: StorageType::Standard,
            server_type: ServerType::Standard,
            additional_disks: Vec::new(),
            custom_fields: Vec::new(),
            ttl: None,
            managed_os: false,
        }
    }

    /// Local checks: type/storage combination, sizing, and disk shape.
    pub fn validate(&self) -> Result<(), Error> {
        if self.server_type == ServerType::Hyperscale && self.storage_type == StorageType::Premium
        {
            return Err(Error::Validation {
                field: "type/storage_type".into(),
                reason: "hyperscale servers cannot use premium storage".into(),
            });
        }

        if self.name.is_empty() {
            return Err(Error::Validation {
                field: "name".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.cpu == 0 || self.memory_gb == 0 {
            return Err(Error::Validation {
                field: "cpu/memory".into(),
                reason: "cpu and memory must both be at least 1".into(),
            });
        }

        for disk in &self.additional_disks {
            if disk.size_gb == 0 {
                return Err(Error::Validation {
                    field: "additional_disks".into(),
                    reason: "disk size must be at least 1 GB".into(),
                });
            }
            match (disk.disk_type, disk.path.as_deref()) {
                (DiskType::Partitioned, None | Some("")) => {
                    return Err(Error::Validation {
                        field: "additional_disks".into(),
                        reason: "partitioned disks need a mount path".into(),
                    });
                }
                (DiskType::Raw, Some(path)) => {
                    return Err(Error::Validation {
                        field: "additional_disks".into(),
                        reason: format!("raw disks cannot be mounted (got path '{path}')"),
                    });
                }
                _ => {}
            }
        }

        if self.custom_fields.iter().any(|f| f.id.is_empty()) {
            return Err(Error::Validation {
                field: "custom_fields".into(),
                reason: "every custom field needs an id".into(),
            });
        }

        Ok(())
    }

    /// JSON body for `POST servers/{alias}`, with the TTL anchored at `now`.
    pub(crate) fn to_body(&self, now: DateTime<Utc>) -> Result<Value, Error> {
        let mut body = Map::new();
        body.insert("name".into(), json!(self.name));
        body.insert(
            "description".into(),
            json!(self.description.as_deref().unwrap_or(&self.name)),
        );
        body.insert("groupId".into(), json!(self.group_id));
        body.insert("sourceServerId".into(), json!(self.template));
        body.insert("isManagedOS".into(), json!(self.managed_os));
        body.insert("primaryDns".into(), json!(self.primary_dns));
        body.insert("secondaryDns".into(), json!(self.secondary_dns));
        body.insert("cpu".into(), json!(self.cpu));
        body.insert("memoryGB".into(), json!(self.memory_gb));
        body.insert("type".into(), json!(self.server_type));
        body.insert("storageType".into(), json!(self.storage_type));
        body.insert("additionalDisks".into(), json!(self.additional_disks));
        body.insert("customFields".into(), json!(self.custom_fields));

        if let Some(ref network_id) = self.network_id {
            body.insert("networkId".into(), json!(network_id));
        }
        if let Some(ref ip) = self.ip_address {
            body.insert("ipAddress".into(), json!(ip));
        }
        if let Some(ref password) = self.password {
            body.insert("password".into(), json!(password.expose_secret()));
        }
        if let Some(ttl) = self.ttl {
            body.insert("ttl".into(), json!(format_ttl(now, ttl)?));
        }

        Ok(Value::Object(body))
    }
}

/// Expiry timestamp in the API's format, e.g. `2014-12-17T01:17:17Z`.
fn format_ttl(now: DateTime<Utc>, ttl: Duration) -> Result<String, Error> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::Validation {
        field: "ttl".into(),
        reason: e.to_string(),
    })?;
    let expires = now.checked_add_signed(ttl).ok_or_else(|| Error::Validation {
        field: "ttl".into(),
        reason: "expiry is out of range".into(),
    })?;
    Ok(expires.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl Server {
    /// Queue a new server build.
    ///
    /// `POST /v2/servers/{alias}`
    ///
    /// Validation runs before any network call.
    pub async fn create(
        client: &ClcClient,
        request: &CreateServer,
        alias: Option<&str>,
    ) -> Result<Requests, Error> {
        request.validate()?;
        let account = Account::resolve(client, alias)?;
        let body = request.to_body(Utc::now())?;

        debug!(name = %request.name, alias = account.alias(), "creating server");
        let response: Value = client
            .post(&format!("servers/{}", account.alias()), &body)
            .await?;
        Requests::from_response(response, account.alias())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;

    fn request() -> CreateServer {
        CreateServer::new("web", "UBUNTU-14-64-TEMPLATE", "wa1-12345", 2, 4)
    }

    #[test]
    fn hyperscale_premium_is_rejected() {
        let mut req = request();
        req.server_type = ServerType::Hyperscale;
        req.storage_type = StorageType::Premium;
        assert!(matches!(req.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn enum_parsing_is_case_insensitive_and_strict() {
        assert_eq!("HyperScale".parse::<ServerType>().unwrap(), ServerType::Hyperscale);
        assert_eq!("PREMIUM".parse::<StorageType>().unwrap(), StorageType::Premium);
        assert!("bare-metal".parse::<ServerType>().is_err());
        assert!("ssd".parse::<StorageType>().is_err());
    }

    #[test]
    fn disk_shape_is_checked() {
        let mut req = request();
        req.additional_disks.push(AdditionalDisk {
            path: None,
            size_gb: 10,
            disk_type: DiskType::Partitioned,
        });
        assert!(req.validate().is_err());

        req.additional_disks[0] = AdditionalDisk {
            path: Some("/data".into()),
            size_gb: 10,
            disk_type: DiskType::Raw,
        };
        assert!(req.validate().is_err());

        req.additional_disks[0].disk_type = DiskType::Partitioned;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn ttl_is_formatted_as_utc_seconds() {
        let now = Utc.with_ymd_and_hms(2014, 12, 17, 0, 0, 0).unwrap();
        let formatted = format_ttl(now, Duration::from_secs(4637)).unwrap();
        assert_eq!(formatted, "2014-12-17T01:17:17Z");
    }

    #[test]
    fn body_defaults_description_to_name() {
        let now = Utc.with_ymd_and_hms(2014, 12, 17, 0, 0, 0).unwrap();
        let body = request().to_body(now).unwrap();
        assert_eq!(body["description"], "web");
        assert_eq!(body["sourceServerId"], "UBUNTU-14-64-TEMPLATE");
        assert_eq!(body["type"], "standard");
        assert!(body.get("ttl").is_none());
        assert!(body.get("password").is_none());
    }
}
