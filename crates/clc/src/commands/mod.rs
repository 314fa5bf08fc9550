//! Command handlers: CLI args -> `clc_api` calls -> output formatting.

pub mod config_cmd;
pub mod server;
pub mod util;
