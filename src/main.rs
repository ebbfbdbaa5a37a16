use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use pixfeed::api::ApiClient;
use pixfeed::app::{App, AppEvent};
use pixfeed::config::Config;
use pixfeed::feed::{FeedEvent, FeedView};
use pixfeed::ui;

/// Get the config directory path (~/.config/pixfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("pixfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "pixfeed", about = "Terminal client for a live photo-sharing feed")]
struct Args {
    /// Feed server base URL (overrides the config file)
    #[arg(long, env = "PIXFEED_SERVER", value_name = "URL")]
    server: Option<String>,

    /// Config file (default: ~/.config/pixfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start with the feed filtered by this tag
    #[arg(long, value_name = "TAG")]
    tag: Option<String>,

    /// Write logs to this file; the terminal is owned by the UI
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?
        .with_server_override(args.server);

    let api = ApiClient::new(&config.server_url, config.request_timeout())
        .with_context(|| format!("Invalid server URL '{}'", config.server_url))?;
    let channel_url = api
        .channel_url(&config.ws_path)
        .context("Failed to derive live updates URL")?;
    tracing::info!(
        server = %api.base_url(),
        channel = %channel_url,
        page_size = config.page_size,
        "Starting pixfeed"
    );

    // Feed traffic and app tasks travel on separate channels
    let (feed_tx, feed_rx) = mpsc::channel::<FeedEvent>(64);
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    let initial_term = args.tag.unwrap_or_default();
    let feed = FeedView::mount(
        Arc::new(api.clone()),
        Some(channel_url),
        &config.feed_settings(),
        &initial_term,
        feed_tx,
    );
    let mut app = App::new(api, feed, initial_term);

    ui::run(&mut app, feed_rx, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
