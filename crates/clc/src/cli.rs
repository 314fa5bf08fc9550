//! Clap derive structures for the `clc` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use clc_api::{AdditionalDisk, CustomField, ServerType, StorageType};

use crate::commands::util::{parse_custom_field, parse_disk, parse_key_val};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// clc -- manage CenturyLink Cloud servers
#[derive(Debug, Parser)]
#[command(
    name = "clc",
    version,
    about = "Manage CenturyLink Cloud servers from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "CLC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API endpoint (overrides profile)
    #[arg(long, short = 'e', env = "CLC_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Account alias (defaults to the login account)
    #[arg(long, short = 'a', env = "CLC_ALIAS", global = true)]
    pub alias: Option<String>,

    /// Login username
    #[arg(long, short = 'u', env = "CLC_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "CLC_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CLC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "CLC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CLC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Wait for queued requests to finish
    #[arg(long, short = 'w', global = true)]
    pub wait: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and operate on servers
    #[command(alias = "srv", alias = "s")]
    Server(ServerArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Args)]
pub struct ServerRef {
    /// Server ID (e.g. WA1BTDIKRT01)
    pub server: String,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Show server details
    Get(ServerRef),

    /// Print one field of the server document
    Attr {
        /// Server ID
        server: String,

        /// Field name, looked up at the top level then under `details`
        field: String,
    },

    /// List snapshot names
    #[command(alias = "snaps")]
    Snapshots(ServerRef),

    /// Power the server on
    PowerOn(ServerRef),

    /// Power the server off (hard)
    PowerOff(ServerRef),

    /// Pause the server
    Pause(ServerRef),

    /// Shut the guest OS down
    ShutDown(ServerRef),

    /// Reboot the guest OS
    Reboot(ServerRef),

    /// Reset the server (hard)
    Reset(ServerRef),

    /// Put the server into maintenance mode
    StartMaintenance(ServerRef),

    /// Take the server out of maintenance mode
    StopMaintenance(ServerRef),

    /// Execute a Blueprint package on the server
    ExecutePackage {
        /// Server ID
        server: String,

        /// Package UUID
        #[arg(long)]
        package: Uuid,

        /// Package parameter (repeatable)
        #[arg(long = "param", short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Delete snapshots (all of them when no name is given)
    DeleteSnapshot {
        /// Server ID
        server: String,

        /// Snapshot names
        names: Vec<String>,
    },

    /// Restore a snapshot (the first one when no name is given)
    RestoreSnapshot {
        /// Server ID
        server: String,

        /// Snapshot name
        name: Option<String>,
    },

    /// Delete the server
    #[command(alias = "rm")]
    Delete(ServerRef),

    /// Show the group containing the server
    Group(ServerRef),

    /// Show the account owning the server
    Account(ServerRef),

    /// Create a server from a template
    Create(Box<CreateArgs>),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Server name; the API prefixes it with location and alias
    pub name: String,

    /// Template (source server) name
    #[arg(long, short = 't')]
    pub template: String,

    /// Parent group ID
    #[arg(long, short = 'g')]
    pub group: String,

    /// Number of CPUs
    #[arg(long, default_value = "1")]
    pub cpu: u32,

    /// Memory in GB
    #[arg(long, default_value = "1")]
    pub memory: u32,

    #[arg(long)]
    pub description: Option<String>,

    /// Network ID
    #[arg(long)]
    pub network: Option<String>,

    /// Static IP address
    #[arg(long)]
    pub ip_address: Option<String>,

    /// Prompt for an administrator password
    #[arg(long)]
    pub password_prompt: bool,

    #[arg(long, default_value = "8.8.8.8")]
    pub primary_dns: String,

    #[arg(long, default_value = "8.8.4.4")]
    pub secondary_dns: String,

    /// standard or hyperscale
    #[arg(long = "type", default_value = "standard")]
    pub server_type: ServerType,

    /// standard or premium
    #[arg(long, default_value = "standard")]
    pub storage_type: StorageType,

    /// Extra disk: PATH:SIZE_GB (partitioned) or raw:SIZE_GB (repeatable)
    #[arg(long = "disk", value_name = "PATH:GB", value_parser = parse_disk)]
    pub disks: Vec<AdditionalDisk>,

    /// Custom field: ID=VALUE (repeatable)
    #[arg(long = "custom-field", value_name = "ID=VALUE", value_parser = parse_custom_field)]
    pub custom_fields: Vec<CustomField>,

    /// Delete the server this many seconds after creation
    #[arg(long, value_name = "SECONDS")]
    pub ttl: Option<u64>,

    /// Request a managed OS
    #[arg(long)]
    pub managed_os: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the configuration with secrets masked
    Show,

    /// Print the config file path
    Path,

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
