mod logging;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sienna_core::{ActivityTracker, Messenger, SiennaConfig};
use sienna_expression::{InactivityWatcher, LogRetention, ReminderDispatcher, SegmentDelivery};
use sienna_memory::{FileWatchSynchronizer, MtimePoller, UserRecordStore};
use sienna_reasoning::{providers, ChatEngine, EngineSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sienna", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "SIENNA_CONFIG", default_value = "sienna.toml")]
    config: PathBuf,

    /// Override the directory holding the user record files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the mock model backend
    #[arg(long)]
    mock: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Write logs to a daily-rolling file in this directory
    #[arg(long, env = "SIENNA_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway and the background loops (default)
    Serve,
    /// Chat with the companion in the terminal
    Chat {
        /// User id to chat as
        #[arg(short, long, default_value = "1000")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = logging::init(args.log_json, args.log_dir.as_deref());

    let mut config = SiennaConfig::load_or_default(&args.config);
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }
    if args.mock {
        config.llm.provider = "mock".to_string();
    }

    info!("Loading user records from {}...", config.storage.data_dir.display());
    let store = Arc::new(UserRecordStore::new(
        &config.storage.data_dir,
        &config.bot.default_companion_name,
    ));
    let loaded = store
        .load_all()
        .await
        .with_context(|| format!("Cannot open data directory {}", config.storage.data_dir.display()))?;
    info!("Loaded {} user records", loaded);

    let client = providers::create_client(&config.llm)?;
    let activity = Arc::new(ActivityTracker::new());
    let engine = Arc::new(ChatEngine::new(
        store.clone(),
        client,
        activity.clone(),
        EngineSettings::from_config(&config),
    ));

    let command = args.command.unwrap_or(Command::Serve);
    let terminal: Arc<dyn Messenger> = Arc::new(repl::StdoutMessenger::new(&config.bot.default_companion_name));
    let messenger = match &command {
        Command::Chat { .. } => Some(terminal.clone()),
        Command::Serve => outbound_messenger(&config),
    };

    spawn_background(&config, &store, &activity, messenger);

    match command {
        Command::Chat { user } => {
            let delivery = SegmentDelivery::new(terminal, Duration::from_millis(config.bot.segment_delay_ms));
            tokio::select! {
                result = repl::run(engine, delivery, user) => result?,
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        Command::Serve => serve(&config, engine).await?,
    }

    let saved = store.save_all().await;
    info!("Saved {} user records. Bye.", saved);
    Ok(())
}

#[cfg(feature = "discord")]
fn outbound_messenger(config: &SiennaConfig) -> Option<Arc<dyn Messenger>> {
    match &config.discord {
        Some(discord) => Some(Arc::new(sienna_discord::DiscordMessenger::from_config(discord))),
        None => {
            warn!("DISCORD_TOKEN not set: nudges, reminders and sync notices will not be delivered");
            None
        }
    }
}

#[cfg(not(feature = "discord"))]
fn outbound_messenger(_config: &SiennaConfig) -> Option<Arc<dyn Messenger>> {
    warn!("Built without Discord support: outbound messages are disabled");
    None
}

#[cfg(feature = "gateway")]
async fn serve(config: &SiennaConfig, engine: Arc<ChatEngine>) -> anyhow::Result<()> {
    let server = sienna_gateway::GatewayServer::new(engine, &config.gateway.host, config.gateway.port);
    let handle = server.start();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
        result = handle => result.context("Gateway task failed")?,
    }
    Ok(())
}

#[cfg(not(feature = "gateway"))]
async fn serve(_config: &SiennaConfig, _engine: Arc<ChatEngine>) -> anyhow::Result<()> {
    info!("Built without the gateway; running background loops only");
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Start the loops that run until process exit.
fn spawn_background(
    config: &SiennaConfig,
    store: &Arc<UserRecordStore>,
    activity: &Arc<ActivityTracker>,
    messenger: Option<Arc<dyn Messenger>>,
) {
    let storage = &config.storage;
    let bot = &config.bot;

    let poller = MtimePoller::new(store.clone(), Duration::from_secs(storage.watch_interval_secs));
    let mut sync = FileWatchSynchronizer::new(store.clone(), poller);
    if let Some(m) = &messenger {
        sync = sync.with_notifier(m.clone());
    }
    tokio::spawn(sync.run());

    let retention = LogRetention::new(store.clone(), storage.log_high_water, storage.log_keep);
    tokio::spawn(retention.run(Duration::from_secs(storage.retention_interval_secs)));

    let Some(messenger) = messenger else {
        return;
    };
    let watcher = InactivityWatcher::new(
        store.clone(),
        activity.clone(),
        messenger.clone(),
        Duration::from_secs(bot.inactivity_threshold_secs),
    );
    tokio::spawn(watcher.run(Duration::from_secs(bot.inactivity_interval_secs)));

    let reminders = ReminderDispatcher::new(store.clone(), messenger);
    tokio::spawn(reminders.run(Duration::from_secs(bot.reminder_interval_secs)));
    info!("Background loops started");
}
