// clc-api: Async Rust client for the CenturyLink Cloud v2 server API

pub mod account;
pub mod auth;
pub mod client;
pub mod error;
pub mod group;
pub mod model;
pub mod requests;
pub mod server;
pub mod transport;

pub use account::Account;
pub use auth::Session;
pub use client::{ClcClient, DEFAULT_ENDPOINT};
pub use error::Error;
pub use group::{Group, GroupData};
pub use model::{Link, ServerData, ServerDetails, Snapshot};
pub use requests::{OperationOutcome, Request, RequestStatus, Requests, StateConflict};
pub use server::{
    AdditionalDisk, CreateServer, CustomField, DiskType, PowerOperation, Server, ServerType,
    StorageType,
};
pub use transport::{TlsMode, TransportConfig};
