//! snapback CLI - Bluesky image reply bot
//!
//! Usage:
//!   snapback run                Reply to mentions until Ctrl-C
//!   snapback run --cursor <us>  Start the first subscription from a Jetstream cursor
//!   snapback login              Authenticate and save the session only
//!
//! Credentials come from the `ACCOUNT` and `PASSWORD` environment variables.

use anyhow::Result;
use clap::{Parser, Subcommand};
use snapback_atproto::{AtprotoApi, XrpcClient};
use snapback_bot::{establish_session, ImageLibrary, ReplyComposer, SubscriptionLoop};
use snapback_core::{
    config::DEFAULT_CONFIG_FILE, AccountCredentials, Session, SessionStore, SnapbackConfig,
    SnapbackError,
};
use snapback_jetstream::Jetstream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "snapback")]
#[command(author, version, about = "Replies to Bluesky mentions with images")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the firehose and reply to mentions
    Run {
        /// Jetstream cursor (unix microseconds) for the first connection
        #[arg(long)]
        cursor: Option<i64>,
    },

    /// Log in, save the session and exit
    Login,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = match cli.command {
        Commands::Run { cursor } => cmd_run(&cli.config, cursor).await,
        Commands::Login => cmd_login(&cli.config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<SnapbackError>()
        .and_then(SnapbackError::exit_code)
        .unwrap_or(1)
}

/// Everything a command needs after a successful login
struct Bot {
    config: SnapbackConfig,
    client: Arc<XrpcClient>,
    session: Session,
}

/// Credentials are checked before the config file is read
fn load_settings(config_path: &Path) -> Result<(SnapbackConfig, AccountCredentials)> {
    let account = AccountCredentials::from_env()?;
    let config = SnapbackConfig::load_or_default(config_path)?;
    Ok((config, account))
}

async fn authenticate(config_path: &Path) -> Result<Bot> {
    let (config, account) = load_settings(config_path)?;

    let store = SessionStore::new(config.session_file.clone());
    let client = Arc::new(
        XrpcClient::new(config.service.clone()).with_session_sink(Arc::new(store.clone())),
    );

    let session = establish_session(client.as_ref(), &store, &account).await?;

    Ok(Bot {
        config,
        client,
        session,
    })
}

async fn cmd_run(config_path: &Path, cursor: Option<i64>) -> Result<()> {
    let bot = authenticate(config_path).await?;

    let self_did = match bot.client.session_did().await {
        Some(did) => did,
        None => bot.session.did.clone(),
    };

    let library = ImageLibrary::from_config(&bot.config);
    info!("Serving images from {}", library.dir().display());

    let composer = Arc::new(ReplyComposer::new(bot.client.clone(), library));
    let source = Arc::new(Jetstream::new(bot.config.jetstream_url.clone()));

    let subscription = SubscriptionLoop::new(source, composer, self_did)
        .with_reconnect_delay(bot.config.reconnect_delay())
        .with_initial_cursor(cursor);

    subscription
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

async fn cmd_login(config_path: &Path) -> Result<()> {
    let bot = authenticate(config_path).await?;

    println!("Logged in");
    println!("  DID:     {}", bot.session.did);
    println!("  Handle:  {}", bot.session.handle);
    println!(
        "  Session: {}",
        std::fs::canonicalize(&bot.config.session_file)
            .unwrap_or_else(|_| bot.config.session_file.clone())
            .display()
    );

    Ok(())
}
