use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediafresh::config::PluginConfig;
use mediafresh::copilot::CopilotClient;
use mediafresh::history::{HistorySource, InMemoryHistory, JsonFileHistory};
use mediafresh::notify::{LogNotifier, Notifier, WebhookNotifier};
use mediafresh::refresh::{RefreshOrchestrator, RemoteCommand, RunStatus, REFRESH_ACTION};
use mediafresh::scheduler::start_scheduler;
use mediafresh::zspace::ZspaceClient;

#[derive(Parser, Debug)]
#[command(name = "mediafresh", version, about = "Refresh NAS media classifications after new transfers land")]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one refresh now and exit
    Run,
    /// Keep running and refresh on the configured cron schedule
    Daemon,
    /// Handle a remote command event as a chat bot would deliver it
    Command {
        #[arg(long, default_value = REFRESH_ACTION)]
        action: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// List containers known to the container update assistant
    Containers,
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        loggers.push(WriteLogger::new(level, log_config, file));
    }
    CombinedLogger::init(loggers).context("Failed to initialise logging")
}

fn load_config(path: &Path) -> Result<PluginConfig> {
    let config = PluginConfig::load(path).context("Failed to load configuration")?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn build_orchestrator(config: PluginConfig) -> Result<Arc<RefreshOrchestrator>> {
    let timeout = config.request_timeout();

    let history: Arc<dyn HistorySource> = match &config.history_path {
        Some(path) => Arc::new(JsonFileHistory::new(path)),
        None => {
            if !config.refresh_all {
                log::warn!("No history_path configured; only refresh_all runs will do anything");
            }
            Arc::new(InMemoryHistory::default())
        }
    };

    let api = ZspaceClient::new(config.host.as_deref().unwrap_or_default(), timeout)
        .context("Failed to create NAS client")?;

    let notifier: Arc<dyn Notifier> = match config.webhook_url.as_deref() {
        Some(url) if !url.is_empty() => Arc::new(
            WebhookNotifier::new(url, timeout).context("Failed to create webhook notifier")?,
        ),
        _ => Arc::new(LogNotifier),
    };

    Ok(Arc::new(RefreshOrchestrator::new(
        Arc::new(config),
        history,
        Arc::new(api),
        notifier,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config_path = match cli.config {
        Some(path) => path,
        None => PluginConfig::default_path()?,
    };

    match cli.command {
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            PluginConfig::default().save(&config_path)?;
            log::info!("Wrote default configuration to {}", config_path.display());
        }
        Command::Run => {
            let config = load_config(&config_path)?;
            let orchestrator = build_orchestrator(config)?;
            let report = orchestrator.run().await.context("Refresh run failed")?;
            match report.status {
                RunStatus::NothingToRefresh => println!("Nothing to refresh."),
                RunStatus::AlreadyRunning => println!("A refresh is already running."),
                RunStatus::Completed => {
                    for outcome in &report.refreshed {
                        print!("{}", outcome.message());
                    }
                    for name in &report.skipped {
                        println!("Skipped {}: not on the server", name);
                    }
                    for failure in &report.failed {
                        println!("Failed {}: {}", failure.category, failure.error);
                    }
                }
            }
        }
        Command::Daemon => {
            let mut config = load_config(&config_path)?;
            let orchestrator = build_orchestrator(config.clone())?;
            let schedule = start_scheduler(orchestrator).await?;
            config.clear_run_once(&config_path)?;

            let Some(schedule) = schedule else {
                log::info!("Nothing scheduled, exiting");
                return Ok(());
            };
            if schedule.is_recurring() {
                log::info!("Daemon started, press Ctrl-C to stop");
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for shutdown signal")?;
            } else {
                tokio::select! {
                    _ = schedule.run_once_finished() => {
                        log::info!("Run-once refresh finished, no cron job registered");
                    }
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for shutdown signal")?;
                    }
                }
            }
            log::info!("Shutting down scheduler");
            schedule.shutdown().await?;
        }
        Command::Command {
            action,
            channel,
            user,
        } => {
            let config = load_config(&config_path)?;
            let orchestrator = build_orchestrator(config)?;
            let command = RemoteCommand {
                action,
                channel,
                user,
            };
            if !orchestrator.handle_command(&command).await {
                log::warn!("Ignoring command with action `{}`", command.action);
            }
        }
        Command::Containers => {
            let config = load_config(&config_path)?;
            let client = CopilotClient::from_config(&config.copilot, config.request_timeout())?;
            let jwt = client.authenticate().await.context("Authentication failed")?;
            let containers = client
                .list_containers(&jwt)
                .await
                .context("Failed to list containers")?;
            for c in containers {
                println!(
                    "{}\t{}\t{}\t{}",
                    c.id,
                    c.name,
                    c.image.unwrap_or_default(),
                    c.status.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
