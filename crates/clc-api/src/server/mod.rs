// Server proxy
//
// Local handle for one remote server. The document is fetched once by
// `Server::load` (or injected with `Server::from_document`) and never
// mutated afterwards: every operation is a remote call whose result is a
// request tracker, not a local state change.

mod create;

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::account::Account;
use crate::client::ClcClient;
use crate::error::Error;
use crate::group::Group;
use crate::model::{ServerData, Snapshot};
use crate::requests::{OperationOutcome, Requests};

pub use create::{AdditionalDisk, CreateServer, CustomField, DiskType, ServerType, StorageType};

/// Power and maintenance operations accepted by
/// `POST operations/{alias}/servers/{operation}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOperation {
    Pause,
    ShutDown,
    Reboot,
    Reset,
    PowerOn,
    PowerOff,
    StartMaintenance,
    StopMaintenance,
}

impl PowerOperation {
    pub const ALL: [Self; 8] = [
        Self::Pause,
        Self::ShutDown,
        Self::Reboot,
        Self::Reset,
        Self::PowerOn,
        Self::PowerOff,
        Self::StartMaintenance,
        Self::StopMaintenance,
    ];

    /// Path segment used by the API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::ShutDown => "shutDown",
            Self::Reboot => "reboot",
            Self::Reset => "reset",
            Self::PowerOn => "powerOn",
            Self::PowerOff => "powerOff",
            Self::StartMaintenance => "startMaintenance",
            Self::StopMaintenance => "stopMaintenance",
        }
    }
}

impl fmt::Display for PowerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy for a remote server.
#[derive(Debug, Clone)]
pub struct Server {
    client: ClcClient,
    id: String,
    alias: String,
    /// Raw document, kept for attribute lookup.
    document: Value,
    data: ServerData,
}

impl Server {
    // ── Construction ─────────────────────────────────────────────────

    /// Fetch a server document.
    ///
    /// `GET /v2/servers/{alias}/{id}`
    ///
    /// Without an `alias` the session's account alias is used. A 404 maps to
    /// [`Error::ServerNotFound`]; every other failure is returned unchanged.
    pub async fn load(client: &ClcClient, id: &str, alias: Option<&str>) -> Result<Self, Error> {
        let account = Account::resolve(client, alias)?;
        let alias = account.alias();
        debug!(id, alias, "loading server");

        let document: Value = client
            .get(&format!("servers/{alias}/{id}"))
            .await
            .map_err(|e| {
                if e.status() == Some(404) {
                    Error::ServerNotFound {
                        alias: alias.to_owned(),
                        id: id.to_owned(),
                    }
                } else {
                    e
                }
            })?;

        Self::from_document(client, id, Some(alias), document)
    }

    /// Wrap an already-fetched document. Never touches the network.
    ///
    /// Any JSON value is accepted. Fields the typed view cannot read fall
    /// back to defaults; [`attribute`](Self::attribute) still sees them.
    pub fn from_document(
        client: &ClcClient,
        id: &str,
        alias: Option<&str>,
        document: Value,
    ) -> Result<Self, Error> {
        let account = Account::resolve(client, alias)?;
        let data = ServerData::deserialize(&document).unwrap_or_else(|e| {
            warn!(id, error = %e, "server document has no typed view");
            ServerData::default()
        });

        Ok(Self {
            client: client.clone(),
            id: id.to_owned(),
            alias: account.alias().to_owned(),
            document,
            data,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Typed view of the document.
    pub fn data(&self) -> &ServerData {
        &self.data
    }

    /// The document exactly as the API returned it.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Look up a field by name: top-level keys first, then `details`.
    pub fn attribute(&self, field: &str) -> Result<&Value, Error> {
        self.document
            .get(field)
            .or_else(|| self.document.get("details").and_then(|d| d.get(field)))
            .ok_or_else(|| Error::AttributeNotFound {
                field: field.to_owned(),
            })
    }

    /// Account containing this server.
    pub fn account(&self) -> Account {
        Account::new(self.alias.clone())
    }

    /// Group containing this server.
    ///
    /// `GET /v2/groups/{alias}/{groupId}`
    pub async fn group(&self) -> Result<Group, Error> {
        let group_id = self
            .data
            .group_id
            .as_deref()
            .ok_or_else(|| Error::AttributeNotFound {
                field: "groupId".into(),
            })?;
        Group::load(&self.client, group_id, &self.alias).await
    }

    // ── Power & maintenance ──────────────────────────────────────────

    /// Run a power or maintenance operation against this server.
    ///
    /// `POST /v2/operations/{alias}/servers/{operation}` with `["{id}"]`
    ///
    /// A structured 4xx reply (typically "already powered on") is parsed
    /// instead of raised, so callers get [`OperationOutcome::AlreadyInState`].
    pub async fn operation(&self, operation: PowerOperation) -> Result<OperationOutcome, Error> {
        let path = format!("operations/{}/servers/{operation}", self.alias);
        let body = [self.id.as_str()];

        let response: Value = match self.client.post(&path, &body).await {
            Ok(value) => value,
            Err(Error::Api {
                status,
                body: Some(body),
                message,
            }) if (400..500).contains(&status) => {
                warn!(server = %self.id, %operation, status, %message, "operation refused");
                body
            }
            Err(e) => return Err(e),
        };

        OperationOutcome::from_response(response, &self.alias, &self.id)
    }

    pub async fn pause(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::Pause).await
    }

    pub async fn shut_down(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::ShutDown).await
    }

    pub async fn reboot(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::Reboot).await
    }

    pub async fn reset(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::Reset).await
    }

    pub async fn power_on(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::PowerOn).await
    }

    pub async fn power_off(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::PowerOff).await
    }

    pub async fn start_maintenance(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::StartMaintenance).await
    }

    pub async fn stop_maintenance(&self) -> Result<OperationOutcome, Error> {
        self.operation(PowerOperation::StopMaintenance).await
    }

    // ── Packages ─────────────────────────────────────────────────────

    /// Execute a Blueprint package on this server.
    ///
    /// Package ids are UUIDs, so a malformed id is rejected by the type
    /// before any request instead of by the API.
    ///
    /// `POST /v2/operations/{alias}/servers/executePackage`
    pub async fn execute_package(
        &self,
        package_id: Uuid,
        parameters: &HashMap<String, String>,
    ) -> Result<Requests, Error> {
        let path = format!("operations/{}/servers/executePackage", self.alias);
        let body = json!({
            "servers": [self.id],
            "package": {
                "packageId": package_id,
                "parameters": parameters,
            },
        });
        debug!(server = %self.id, %package_id, "executing package");

        let response: Value = self.client.post(&path, &body).await?;
        Requests::from_response(response, &self.alias)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Snapshot names in document order.
    pub fn snapshots(&self) -> Vec<String> {
        self.data
            .details
            .snapshots
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    fn snapshot(&self, name: &str) -> Result<&Snapshot, Error> {
        self.data
            .details
            .snapshots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SnapshotNotFound {
                name: name.to_owned(),
            })
    }

    fn snapshot_link(&self, name: &str, rel: &str) -> Result<&str, Error> {
        self.snapshot(name)?
            .link(rel)
            .ok_or_else(|| Error::LinkNotFound {
                name: name.to_owned(),
                rel: rel.to_owned(),
            })
    }

    /// Delete snapshots by name, or every snapshot when `names` is `None`.
    ///
    /// Issues one `DELETE` per snapshot on its `delete` link and returns the
    /// aggregated trackers. Every name is checked before the first call.
    pub async fn delete_snapshot(&self, names: Option<&[String]>) -> Result<Requests, Error> {
        let names = names.map_or_else(|| self.snapshots(), <[String]>::to_vec);

        let hrefs = names
            .iter()
            .map(|name| self.snapshot_link(name, "delete"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut parts = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            let response: Value = self.client.delete(href).await?;
            parts.push(Requests::from_response(response, &self.alias)?);
        }

        Ok(Requests::aggregate(parts))
    }

    /// Restore a snapshot by name, or the first one when `name` is `None`.
    ///
    /// `POST` on the snapshot's `restore` link.
    pub async fn restore_snapshot(&self, name: Option<&str>) -> Result<Requests, Error> {
        let first = self
            .data
            .details
            .snapshots
            .first()
            .ok_or(Error::NoSnapshots)?;
        let name = name.unwrap_or(first.name.as_str());

        let href = self.snapshot_link(name, "restore")?;
        debug!(server = %self.id, snapshot = name, "restoring snapshot");

        let response: Value = self.client.post_empty(href).await?;
        Requests::from_response(response, &self.alias)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Delete the remote server.
    ///
    /// `DELETE /v2/servers/{alias}/{id}`
    pub async fn delete(&self) -> Result<Requests, Error> {
        debug!(server = %self.id, "deleting server");
        let response: Value = self
            .client
            .delete(&format!("servers/{}/{}", self.alias, self.id))
            .await?;
        Requests::from_response(response, &self.alias)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data.name)
    }
}
