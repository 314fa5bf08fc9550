//! Server command handlers.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tabled::Tabled;
use tracing::debug;

use clc_api::{
    Account, ClcClient, CreateServer, GroupData, OperationOutcome, PowerOperation, Request,
    Requests, Server,
};

use crate::cli::{CreateArgs, GlobalOpts, OutputFormat, ServerArgs, ServerCommand};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "Request")]
    id: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Server")]
    server: String,
}

impl From<&Request> for RequestRow {
    fn from(r: &Request) -> Self {
        Self {
            id: r.id.clone(),
            alias: r.alias.clone(),
            server: r.server.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Snapshot")]
    name: String,
}

fn detail(s: &Server) -> String {
    let d = s.data();
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_owned();
    let mut lines = vec![
        format!("ID:          {}", s.id()),
        format!("Name:        {}", d.name),
        format!("Description: {}", or_dash(d.description.as_deref())),
        format!("Account:     {}", s.alias()),
        format!("Location:    {}", or_dash(d.location_id.as_deref())),
        format!("Group:       {}", or_dash(d.group_id.as_deref())),
        format!("OS:          {}", or_dash(d.os_type.as_deref())),
        format!("Status:      {}", or_dash(d.status.as_deref())),
        format!("Power:       {}", or_dash(d.details.power_state.as_deref())),
        format!("Type:        {}", or_dash(d.server_type.as_deref())),
        format!("Storage:     {}", or_dash(d.storage_type.as_deref())),
    ];
    if let Some(cpu) = d.details.cpu {
        lines.push(format!("CPU:         {cpu}"));
    }
    if let Some(mb) = d.details.memory_mb {
        lines.push(format!("Memory:      {mb} MB"));
    }
    if let Some(gb) = d.details.storage_gb {
        lines.push(format!("Disk:        {gb} GB"));
    }
    if d.details.in_maintenance_mode == Some(true) {
        lines.push("Maintenance: yes".into());
    }
    if !d.details.snapshots.is_empty() {
        lines.push(format!("Snapshots:   {}", s.snapshots().join(", ")));
    }
    lines.join("\n")
}

fn group_detail(g: &GroupData) -> String {
    [
        format!("ID:          {}", g.id),
        format!("Name:        {}", g.name),
        format!(
            "Description: {}",
            g.description.as_deref().unwrap_or("-")
        ),
        format!("Location:    {}", g.location_id.as_deref().unwrap_or("-")),
        format!("Type:        {}", g.group_type.as_deref().unwrap_or("-")),
        format!("Status:      {}", g.status.as_deref().unwrap_or("-")),
        format!(
            "Servers:     {}",
            g.servers_count
                .map_or_else(|| "-".into(), |n| n.to_string())
        ),
    ]
    .join("\n")
}

/// Scalars print bare; objects and arrays print as JSON.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Connection ──────────────────────────────────────────────────────

struct Ctx {
    client: ClcClient,
    alias: Option<String>,
    poll_interval: Duration,
}

impl Ctx {
    async fn connect(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        let conn = config::resolve_client_config(global, cfg)?;
        debug!(endpoint = %conn.endpoint, username = %conn.username, "logging in");

        let client = ClcClient::login(
            conn.endpoint.as_str(),
            &conn.username,
            &conn.password,
            &conn.transport,
        )
        .await?;

        Ok(Self {
            client,
            alias: conn.alias,
            poll_interval: Duration::from_secs(cfg.defaults.poll_interval),
        })
    }

    async fn load(&self, id: &str) -> Result<Server, CliError> {
        Ok(Server::load(&self.client, id, self.alias.as_deref()).await?)
    }

    /// Print queued requests, then wait on them with `--wait`.
    async fn report(
        &self,
        requests: &Requests,
        what: &str,
        global: &GlobalOpts,
    ) -> Result<(), CliError> {
        let color = output::should_color(&global.color);
        let list: Vec<&Request> = requests.iter().collect();
        let out = output::render_list(
            &global.output,
            &list,
            |r| RequestRow::from(*r),
            |r| r.id.clone(),
        )?;
        output::print_output(&out, global.quiet);

        if global.wait {
            util::wait_for(&self.client, requests, self.poll_interval, global.quiet).await?;
            output::success(&format!("{what} complete"), color, global.quiet);
        } else {
            output::success(
                &format!("{what} queued ({} request(s))", requests.len()),
                color,
                global.quiet,
            );
        }
        Ok(())
    }
}

fn is_destructive(op: PowerOperation) -> bool {
    matches!(
        op,
        PowerOperation::PowerOff | PowerOperation::Reset | PowerOperation::ShutDown
    )
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(args: ServerArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();

    match args.command {
        ServerCommand::Get(r) => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&r.server).await?;
            let out = output::render_single(
                &global.output,
                server.document(),
                |_| detail(&server),
                |_| server.id().to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Attr { server, field } => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&server).await?;
            let value = server.attribute(&field)?;
            let out = output::render_single(&global.output, value, scalar_text, scalar_text)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Snapshots(r) => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let names = ctx.load(&r.server).await?.snapshots();
            let out = output::render_list(
                &global.output,
                &names,
                |n| SnapshotRow { name: n.clone() },
                String::clone,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::PowerOn(r) => {
            operation(&r.server, PowerOperation::PowerOn, global, &cfg).await
        }
        ServerCommand::PowerOff(r) => {
            operation(&r.server, PowerOperation::PowerOff, global, &cfg).await
        }
        ServerCommand::Pause(r) => {
            operation(&r.server, PowerOperation::Pause, global, &cfg).await
        }
        ServerCommand::ShutDown(r) => {
            operation(&r.server, PowerOperation::ShutDown, global, &cfg).await
        }
        ServerCommand::Reboot(r) => {
            operation(&r.server, PowerOperation::Reboot, global, &cfg).await
        }
        ServerCommand::Reset(r) => {
            operation(&r.server, PowerOperation::Reset, global, &cfg).await
        }
        ServerCommand::StartMaintenance(r) => {
            operation(&r.server, PowerOperation::StartMaintenance, global, &cfg).await
        }
        ServerCommand::StopMaintenance(r) => {
            operation(&r.server, PowerOperation::StopMaintenance, global, &cfg).await
        }

        ServerCommand::ExecutePackage {
            server,
            package,
            params,
        } => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&server).await?;
            let params: HashMap<String, String> = params.into_iter().collect();
            let requests = server.execute_package(package, &params).await?;
            ctx.report(&requests, &format!("package {package} on {server}"), global)
                .await
        }

        ServerCommand::DeleteSnapshot { server, names } => {
            let prompt = if names.is_empty() {
                format!("Delete every snapshot of {server}?")
            } else {
                format!("Delete snapshot(s) {} of {server}?", names.join(", "))
            };
            if !util::confirm(&prompt, "delete-snapshot", global.yes)? {
                return Ok(());
            }

            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&server).await?;
            let names = (!names.is_empty()).then_some(names);
            let requests = server.delete_snapshot(names.as_deref()).await?;
            ctx.report(&requests, &format!("snapshot delete on {server}"), global)
                .await
        }

        ServerCommand::RestoreSnapshot { server, name } => {
            let prompt = format!(
                "Restore {server} to snapshot {}?",
                name.as_deref().unwrap_or("(first)")
            );
            if !util::confirm(&prompt, "restore-snapshot", global.yes)? {
                return Ok(());
            }

            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&server).await?;
            let requests = server.restore_snapshot(name.as_deref()).await?;
            ctx.report(&requests, &format!("snapshot restore on {server}"), global)
                .await
        }

        ServerCommand::Delete(r) => {
            if !util::confirm(&format!("Delete server {}?", r.server), "delete", global.yes)? {
                return Ok(());
            }

            let ctx = Ctx::connect(global, &cfg).await?;
            let server = ctx.load(&r.server).await?;
            let requests = server.delete().await?;
            ctx.report(&requests, &format!("delete of {server}"), global)
                .await
        }

        ServerCommand::Group(r) => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let group = ctx.load(&r.server).await?.group().await?;
            let out = output::render_single(&global.output, group.data(), group_detail, |g| {
                g.id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Account(r) => {
            let ctx = Ctx::connect(global, &cfg).await?;
            let account: Account = ctx.load(&r.server).await?.account();
            let out = output::render_single(
                &global.output,
                &account,
                |a| format!("Alias: {a}"),
                ToString::to_string,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Create(args) => create(*args, global, &cfg).await,
    }
}

async fn operation(
    id: &str,
    op: PowerOperation,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<(), CliError> {
    if is_destructive(op)
        && !util::confirm(&format!("Run {op} on {id}?"), op.as_str(), global.yes)?
    {
        return Ok(());
    }

    let ctx = Ctx::connect(global, cfg).await?;
    let server = ctx.load(id).await?;
    let outcome = server.operation(op).await?;

    match outcome {
        OperationOutcome::Accepted { ref requests } => {
            ctx.report(requests, &format!("{op} on {server}"), global)
                .await
        }
        OperationOutcome::AlreadyInState(ref conflict) => {
            if !matches!(global.output, OutputFormat::Table | OutputFormat::Plain) {
                let out =
                    output::render_single(&global.output, &outcome, |_| String::new(), |_| {
                        String::new()
                    })?;
                output::print_output(&out, global.quiet);
            }
            output::warning(
                &format!("{server}: nothing to do ({})", conflict.message),
                output::should_color(&global.color),
            );
            Ok(())
        }
    }
}

async fn create(args: CreateArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let mut request =
        CreateServer::new(args.name, args.template, args.group, args.cpu, args.memory);
    request.description = args.description;
    request.network_id = args.network;
    request.ip_address = args.ip_address;
    request.primary_dns = args.primary_dns;
    request.secondary_dns = args.secondary_dns;
    request.server_type = args.server_type;
    request.storage_type = args.storage_type;
    request.additional_disks = args.disks;
    request.custom_fields = args.custom_fields;
    request.ttl = args.ttl.map(Duration::from_secs);
    request.managed_os = args.managed_os;

    // Fail fast on bad input before asking for a password or logging in.
    request.validate()?;

    if args.password_prompt {
        let password = rpassword::prompt_password("Administrator password: ")?;
        request.password = Some(password.into());
    }

    let ctx = Ctx::connect(global, cfg).await?;
    let requests = Server::create(&ctx.client, &request, ctx.alias.as_deref()).await?;
    ctx.report(&requests, &format!("build of {}", request.name), global)
        .await
}
