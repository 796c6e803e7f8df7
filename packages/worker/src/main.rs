//! WhatsNext worker/CLI — a thin operator front-end over the broker's
//! HTTP surface, plus the worker dispatch loop (C6).

mod client;
mod cmd;
mod config;
mod dispatch;
mod error;
mod formatter;
mod model;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use client::BrokerClient;
use config::WorkerConfig;

#[derive(Parser)]
#[command(name = "whatsnext")]
#[command(about = "WhatsNext job queue: worker loop and operator CLI")]
#[command(version)]
struct Cli {
    /// Override the broker host from the config file.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Override the configured project name.
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the worker dispatch loop: fetch, run, report, repeat.
    Run {
        /// Seconds to sleep between empty polls.
        #[arg(long, default_value_t = 5)]
        poll_interval: u64,
        /// Exit as soon as the queue is empty instead of polling forever.
        #[arg(long)]
        one_shot: bool,
    },
    #[command(subcommand)]
    Project(ProjectCommands),
    #[command(subcommand)]
    Task(TaskCommands),
    #[command(subcommand)]
    Job(JobCommands),
    /// Print a registered worker's current status.
    Worker { id: String },
}

#[derive(Subcommand)]
enum ProjectCommands {
    List {
        #[arg(long, default_value = "ACTIVE")]
        status: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        skip: i64,
    },
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Delete {
        name: String,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    Create { project: String, name: String },
}

#[derive(Subcommand)]
enum JobCommands {
    Submit {
        project: String,
        name: String,
        task: String,
        #[arg(long, default_value = "{}")]
        parameters: String,
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    List {
        project: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = WorkerConfig::load()?;

    if let Some(server) = &cli.server {
        if let Some((host, port)) = server.split_once(':') {
            config.server.host = host.to_string();
            config.server.port = port.parse().unwrap_or(config.server.port);
        } else {
            config.server.host = server.clone();
        }
    }
    let project_name = cli
        .project
        .clone()
        .or_else(|| config.project.clone())
        .ok_or_else(|| anyhow::anyhow!("no project configured: pass --project or set `project` in whatsnext.toml"))?;

    match cli.command {
        Commands::Run { poll_interval, one_shot } => {
            cmd::run::run(config, &project_name, poll_interval, one_shot).await
        }
        Commands::Project(sub) => {
            let client = broker_client(&config)?;
            match sub {
                ProjectCommands::List { status, limit, skip } => cmd::projects::list(&client, &status, limit, skip).await,
                ProjectCommands::Create { name, description } => cmd::projects::create(&client, &name, &description).await,
                ProjectCommands::Delete { name } => cmd::projects::delete(&client, &name).await,
            }
        }
        Commands::Task(TaskCommands::Create { project, name }) => {
            let client = broker_client(&config)?;
            cmd::tasks::create(&client, &project, &name).await
        }
        Commands::Job(sub) => {
            let client = broker_client(&config)?;
            match sub {
                JobCommands::Submit { project, name, task, parameters, priority } => {
                    let parameters: serde_json::Value = serde_json::from_str(&parameters)?;
                    cmd::jobs::submit(&client, &project, &name, &task, parameters, priority).await
                }
                JobCommands::List { project } => cmd::jobs::list(&client, &project).await,
            }
        }
        Commands::Worker { id } => {
            let client = broker_client(&config)?;
            cmd::workers::status(&client, &id).await
        }
    }
}

fn broker_client(config: &WorkerConfig) -> Result<BrokerClient> {
    Ok(BrokerClient::new(
        &config.server.host,
        config.server.port,
        config.server.api_key.clone(),
    )?)
}
