mod config;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{
    EmployeeActions, EmployeeState, EventHandlers, EventStreamClient, HttpGateway, Store,
};
use shared::{
    domain::Field,
    protocol::{EventName, StreamEvent},
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, normalize_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "hrctl", about = "Command-line client for the HR employee API")]
struct Args {
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    events_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides RUST_LOG, e.g. `debug` or `client_core=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one employee by identity.
    Find { identity: String },
    /// Create an employee from the given fields.
    Hire(EmployeeArgs),
    /// Load an employee, apply the given fields, and save it.
    Update(EmployeeArgs),
    /// Remove an employee.
    Fire { identity: String },
    /// List every employee.
    List,
    /// Print the configured department options.
    Departments,
    /// Follow the server's event feed until Ctrl-C.
    Watch {
        #[arg(long)]
        ping: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct EmployeeArgs {
    #[arg(long)]
    identity: String,
    #[arg(long)]
    fullname: Option<String>,
    #[arg(long)]
    salary: Option<String>,
    #[arg(long)]
    iban: Option<String>,
    #[arg(long)]
    birth_year: Option<String>,
    #[arg(long)]
    department: Option<String>,
    /// Image file, sent base64-encoded.
    #[arg(long)]
    photo: Option<PathBuf>,
    #[arg(long)]
    fulltime: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref())?;

    let settings = resolve_settings(&args)?;
    info!(api_url = %settings.api_url, events_url = %settings.events_url, "hrctl starting");

    match args.command {
        Command::Watch { ping } => {
            watch(&settings.events_url, ping).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Departments => {
            println!("{}", serde_json::to_string_pretty(&settings.departments)?);
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let actions = EmployeeActions::new(
                Arc::new(Store::new()),
                HttpGateway::new(&settings.api_url),
            );
            let state = run(&actions, &settings, command).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            if let Some(err) = &state.error {
                let api_error = err.to_api_error();
                error!(code = ?api_error.code, message = %api_error.message, "hr api operation failed");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = &args.api_url {
        settings.api_url = normalize_url(url).context("invalid --api-url")?;
    }
    if let Some(url) = &args.events_url {
        settings.events_url = normalize_url(url).context("invalid --events-url")?;
    }
    Ok(settings)
}

async fn run(
    actions: &EmployeeActions<HttpGateway>,
    settings: &Settings,
    command: Command,
) -> Result<EmployeeState> {
    let state = match command {
        Command::Find { identity } => {
            actions.change_field(Field::Identity.as_str(), &identity)?;
            actions.find_employee_by_id().await
        }
        Command::Hire(fields) => {
            apply_fields(actions, settings, &fields)?;
            actions.hire_employee().await
        }
        Command::Update(fields) => {
            actions.change_field(Field::Identity.as_str(), &fields.identity)?;
            let loaded = actions.find_employee_by_id().await;
            if loaded.error.is_some() {
                warn!(identity = %fields.identity, "cannot update an employee that failed to load");
                return Ok(loaded);
            }
            apply_fields(actions, settings, &fields)?;
            actions.update_employee().await
        }
        Command::Fire { identity } => {
            actions.change_field(Field::Identity.as_str(), &identity)?;
            actions.fire_employee().await
        }
        Command::List => actions.list_employees().await,
        Command::Departments | Command::Watch { .. } => actions.store().snapshot(),
    };
    Ok(state)
}

fn apply_fields(
    actions: &EmployeeActions<HttpGateway>,
    settings: &Settings,
    fields: &EmployeeArgs,
) -> Result<()> {
    if let Some(department) = &fields.department {
        settings.validate_department(department)?;
    }

    let text_fields = [
        (Field::Identity, Some(&fields.identity)),
        (Field::Fullname, fields.fullname.as_ref()),
        (Field::Salary, fields.salary.as_ref()),
        (Field::Iban, fields.iban.as_ref()),
        (Field::BirthYear, fields.birth_year.as_ref()),
        (Field::Department, fields.department.as_ref()),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            actions.change_field(field.as_str(), value)?;
        }
    }

    if let Some(path) = &fields.photo {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read photo '{}'", path.display()))?;
        actions.change_photo(&base64::engine::general_purpose::STANDARD.encode(bytes));
    }
    if let Some(fulltime) = fields.fulltime {
        actions.change_fulltime(fulltime);
    }
    Ok(())
}

async fn watch(events_url: &str, ping: bool) -> Result<()> {
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
    let mut handlers = EventHandlers::with_logging();
    for name in EventName::KNOWN {
        handlers.on(name, |event: &StreamEvent| {
            println!(
                "{}",
                serde_json::json!({ "event": event.name.as_str(), "payload": event.payload })
            );
        });
    }
    handlers.on(EventName::Disconnect, move |_: &StreamEvent| {
        let _ = closed_tx.send(());
    });

    let client = EventStreamClient::connect(events_url, handlers)
        .await
        .with_context(|| format!("failed to connect event stream at {events_url}"))?;
    if ping {
        client.ping().await.context("failed to send ping")?;
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("interrupted, closing event stream");
        }
        _ = closed_rx.recv() => {}
    }
    client.close().await;
    Ok(())
}
