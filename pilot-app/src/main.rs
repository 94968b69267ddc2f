use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pilot_common::observability::{LogConfig, LogFormat, init_logging};
use pilot_config::{PilotConfig, PilotConfigLoader, default_config_path};
use pilot_planner::commander_from_config;
use pilot_server::AppState;
use serde::Serialize;
use tracing::{info, warn};
use wiring::Pilot;

mod wiring;

#[derive(Parser, Debug)]
#[command(name = "webpilot", version, about = "Drive a browser from plain-language commands")]
struct Cli {
    /// Configuration file; defaults to ~/.config/webpilot/webpilot.yaml when present.
    #[arg(long, global = true, env = "WEBPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Also log to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP and event-stream API.
    Serve {
        /// Address to listen on, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Route one command, execute it in a fresh browser and print the outcome.
    Run {
        command: String,
        /// Page to open before the command runs.
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the script a command would run, without a browser.
    Plan { command: String },
    /// Execute a JSON action script from a file.
    Exec {
        script: PathBuf,
        #[arg(long)]
        url: Option<String>,
    },
    /// Generate a code snippet.
    Code {
        #[arg(short, long, default_value = "python")]
        language: String,
        prompt: String,
    },
    /// Print the effective configuration with secrets masked.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<PilotConfig> {
    let loader = match path {
        Some(path) => PilotConfigLoader::new().with_file(path),
        None => match default_config_path() {
            Some(path) => PilotConfigLoader::new().with_optional_file(path),
            None => PilotConfigLoader::new(),
        },
    };
    loader.load().context("failed to load configuration")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let log_path = init_logging(LogConfig {
        app_name: "webpilot",
        emit_stderr: cli.verbose,
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Text },
        ..LogConfig::default()
    })?;
    info!(target: "pilot.app", log = %log_path.display(), "logging.ready");

    match cli.command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Run { command, url } => {
            let pilot = Pilot::start(config)?;
            let report = pilot.run(&command, url.as_deref()).await;
            pilot.shutdown().await?;
            print_json(&report?)
        }
        Command::Plan { command } => {
            let commander = commander_from_config(&config)?;
            // Planning never touches a page; code requests assume the default language.
            let routed = commander
                .script_for(&command, || async { "python".to_string() })
                .await;
            print_json(&routed)
        }
        Command::Exec { script, url } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read {}", script.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", script.display()))?;
            let (actions, rejected) =
                pilot_script::parse_script(&value).map_err(anyhow::Error::msg)?;
            for skipped in &rejected {
                warn!(target: "pilot.app", index = skipped.index, reason = %skipped.reason, "script.step_rejected");
            }
            let pilot = Pilot::start(config)?;
            let outcome = async {
                if let Some(url) = url.as_deref() {
                    pilot.session().navigate(url).await?;
                }
                pilot.exec(actions).await
            }
            .await;
            pilot.shutdown().await?;
            print_json(&outcome?)
        }
        Command::Code { language, prompt } => {
            let commander = commander_from_config(&config)?;
            let generated = commander.codegen().generate(&language, &prompt).await;
            info!(target: "pilot.app", tier = ?generated.tier, "code.generated");
            print!("{}", generated.code);
            if !generated.code.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn serve(config: PilotConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let pilot = Pilot::start(config)?;
    let state = Arc::new(AppState::new(
        pilot.session().clone(),
        pilot.config().search.clone(),
        &pilot.config().server,
    ));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "pilot.app", error = %e, "signal.listen_failed");
        }
        info!(target: "pilot.app", "signal.shutdown");
    };
    let served = pilot_server::serve(listener, state, shutdown).await;
    pilot.shutdown().await?;
    served
}
