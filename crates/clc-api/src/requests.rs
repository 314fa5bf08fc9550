// Request tracking
//
// Mutating calls (power operations, snapshot actions, deletes) are queued by
// the API and answered with status links. `Requests` turns those replies into
// pollable handles and aggregates handles from several calls so they can be
// awaited together.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::ClcClient;
use crate::error::Error;
use crate::model::Link;

/// Replies that mean "nothing to do" rather than "failed".
const ALREADY_IN_STATE: &[&str] = &[
    "already powered on",
    "already powered off",
    "already paused",
    "already in maintenance mode",
    "not in maintenance mode",
];

// ── Wire shape ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueEntry {
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    is_queued: bool,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default, alias = "message")]
    error_message: Option<String>,
}

/// Normalise the response shapes the API uses into a list of queue entries:
/// a list of entries, a single entry, a bare status link, or (from 4xx
/// bodies) a lone `{message}` object.
fn normalize(value: Value) -> Result<Vec<QueueEntry>, Error> {
    let parsed = match &value {
        Value::Array(_) => serde_json::from_value(value.clone()),
        Value::Object(map) if map.contains_key("isQueued") || map.contains_key("message") => {
            serde_json::from_value(value.clone()).map(|entry| vec![entry])
        }
        Value::Object(map) if map.contains_key("href") => {
            serde_json::from_value::<Link>(value.clone()).map(|link| {
                vec![QueueEntry {
                    server: None,
                    is_queued: true,
                    links: vec![link],
                    error_message: None,
                }]
            })
        }
        _ => {
            return Err(Error::Deserialization {
                message: "unrecognised request response shape".into(),
                body: value.to_string(),
            });
        }
    };

    parsed.map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: value.to_string(),
    })
}

fn is_already_in_state(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ALREADY_IN_STATE.iter().any(|needle| message.contains(needle))
}

/// Split a response into queued requests and benign "already in state" replies.
fn classify(
    value: Value,
    alias: &str,
    fallback_server: Option<&str>,
) -> Result<(Vec<Request>, Vec<StateConflict>), Error> {
    let mut queued = Vec::new();
    let mut conflicts = Vec::new();

    for entry in normalize(value)? {
        let server = entry
            .server
            .or_else(|| fallback_server.map(str::to_owned));

        if entry.is_queued {
            let link = entry
                .links
                .iter()
                .find(|l| l.rel == "status")
                .ok_or_else(|| Error::Deserialization {
                    message: "queued request without a status link".into(),
                    body: String::new(),
                })?;
            queued.push(Request {
                id: link.id_or_last_segment(),
                alias: alias.to_owned(),
                server,
            });
            continue;
        }

        let message = entry.error_message.unwrap_or_default();
        let server = server.unwrap_or_default();
        if is_already_in_state(&message) {
            debug!(%server, %message, "request not queued, already in target state");
            conflicts.push(StateConflict { server, message });
        } else {
            return Err(Error::OperationFailed { server, message });
        }
    }

    Ok((queued, conflicts))
}

// ── Request ──────────────────────────────────────────────────────────

/// Lifecycle state reported by `operations/{alias}/status/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestStatus {
    NotStarted,
    Executing,
    Resumed,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RequestStatus {
    /// `true` once the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "notStarted",
            Self::Executing => "executing",
            Self::Resumed => "resumed",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Deserialize)]
struct StatusResponse {
    status: RequestStatus,
}

/// Handle to one queued remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub id: String,
    pub alias: String,
    /// Server the job acts on, when the API reports it.
    pub server: Option<String>,
}

impl Request {
    /// Fetch the current status of this job.
    pub async fn status(&self, client: &ClcClient) -> Result<RequestStatus, Error> {
        let path = format!("operations/{}/status/{}", self.alias, self.id);
        let resp: StatusResponse = client.get(&path).await?;
        trace!(id = %self.id, status = %resp.status, "polled request");
        Ok(resp.status)
    }
}

// ── Requests ─────────────────────────────────────────────────────────

/// Ordered collection of request handles, awaited together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Requests {
    requests: Vec<Request>,
}

impl Requests {
    /// Parse a raw API reply into request handles.
    ///
    /// "Already in state" entries are dropped (nothing to wait for); any
    /// other non-queued entry fails with [`Error::OperationFailed`].
    pub fn from_response(value: Value, alias: &str) -> Result<Self, Error> {
        let (requests, _) = classify(value, alias, None)?;
        Ok(Self { requests })
    }

    /// Combine several trackers into one, preserving order.
    pub fn aggregate(parts: impl IntoIterator<Item = Requests>) -> Self {
        parts.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Request> {
        self.requests.iter()
    }

    /// Poll every request until it reaches a terminal state.
    ///
    /// Returns the number of requests that ended in `failed`.
    pub async fn wait_until_complete(
        &self,
        client: &ClcClient,
        poll_interval: Duration,
    ) -> Result<usize, Error> {
        let mut pending: Vec<&Request> = self.requests.iter().collect();
        let mut failed = 0;

        loop {
            let mut still_pending = Vec::with_capacity(pending.len());
            for request in pending {
                match request.status(client).await? {
                    RequestStatus::Succeeded => {}
                    RequestStatus::Failed => {
                        warn!(id = %request.id, server = ?request.server, "request failed");
                        failed += 1;
                    }
                    _ => still_pending.push(request),
                }
            }

            if still_pending.is_empty() {
                return Ok(failed);
            }
            pending = still_pending;
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl FromIterator<Requests> for Requests {
    fn from_iter<I: IntoIterator<Item = Requests>>(iter: I) -> Self {
        let mut all = Self::default();
        all.extend(iter);
        all
    }
}

impl Extend<Requests> for Requests {
    fn extend<I: IntoIterator<Item = Requests>>(&mut self, iter: I) {
        for part in iter {
            self.requests.extend(part.requests);
        }
    }
}

impl<'a> IntoIterator for &'a Requests {
    type Item = &'a Request;
    type IntoIter = std::slice::Iter<'a, Request>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.iter()
    }
}

// ── Operation outcome ────────────────────────────────────────────────

/// Server already in the state an operation asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateConflict {
    pub server: String,
    pub message: String,
}

/// Result of a power or maintenance operation.
///
/// A server that is already in the requested state is not an error: the
/// API answers with a structured refusal, reported here as `AlreadyInState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    Accepted { requests: Requests },
    AlreadyInState(StateConflict),
}

impl OperationOutcome {
    /// Classify an operation reply (success body or structured 4xx body).
    pub fn from_response(value: Value, alias: &str, server: &str) -> Result<Self, Error> {
        let (requests, mut conflicts) = classify(value, alias, Some(server))?;
        if requests.is_empty() && !conflicts.is_empty() {
            return Ok(Self::AlreadyInState(conflicts.swap_remove(0)));
        }
        Ok(Self::Accepted {
            requests: Requests { requests },
        })
    }

    /// The queued requests, empty when nothing had to be done.
    pub fn requests(&self) -> Requests {
        match self {
            Self::Accepted { requests } => requests.clone(),
            Self::AlreadyInState(_) => Requests::default(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    fn queued(server: &str, id: &str) -> Value {
        json!({
            "server": server,
            "isQueued": true,
            "links": [
                { "rel": "status", "id": id, "href": format!("/v2/operations/BTDI/status/{id}") }
            ]
        })
    }

    #[test]
    fn list_of_entries_yields_one_request_each() {
        let body = json!([queued("WA1BTDIKRT01", "wa1-1"), queued("WA1BTDIKRT02", "wa1-2")]);
        let requests = Requests::from_response(body, "BTDI").unwrap();

        let ids: Vec<_> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["wa1-1", "wa1-2"]);
        assert_eq!(requests.iter().next().unwrap().server.as_deref(), Some("WA1BTDIKRT01"));
    }

    #[test]
    fn single_entry_and_bare_link_are_wrapped() {
        let single = Requests::from_response(queued("WA1BTDIKRT01", "wa1-9"), "BTDI").unwrap();
        assert_eq!(single.len(), 1);

        let link = json!({ "rel": "status", "href": "/v2/operations/BTDI/status/wa1-77" });
        let bare = Requests::from_response(link, "BTDI").unwrap();
        assert_eq!(bare.iter().next().unwrap().id, "wa1-77");
    }

    #[test]
    fn already_powered_on_is_an_outcome_not_an_error() {
        let body = json!([{
            "server": "WA1BTDIKRT02",
            "isQueued": false,
            "errorMessage": "The server already powered on"
        }]);
        let outcome = OperationOutcome::from_response(body, "BTDI", "WA1BTDIKRT02").unwrap();
        match outcome {
            OperationOutcome::AlreadyInState(conflict) => {
                assert_eq!(conflict.server, "WA1BTDIKRT02");
                assert!(conflict.message.contains("already powered on"));
            }
            other => panic!("expected AlreadyInState, got {other:?}"),
        }
    }

    #[test]
    fn other_refusals_fail() {
        let body = json!([{
            "server": "WA1BTDIKRT02",
            "isQueued": false,
            "errorMessage": "Server is archived"
        }]);
        let err = OperationOutcome::from_response(body, "BTDI", "WA1BTDIKRT02").unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }), "got {err:?}");
    }

    #[test]
    fn aggregation_preserves_order() {
        let a = Requests::from_response(queued("S1", "a"), "BTDI").unwrap();
        let b = Requests::from_response(queued("S2", "b"), "BTDI").unwrap();
        let combined = Requests::aggregate([a, b]);
        let ids: Vec<_> = combined.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn unknown_status_strings_deserialize_as_unknown() {
        let status: RequestStatus = serde_json::from_value(json!("queuedForever")).unwrap();
        assert_eq!(status, RequestStatus::Unknown);
        assert!(!status.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }
}
