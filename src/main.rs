//! newsvoice: voice news reader for the desktop.

mod config;
mod news;
mod notifier;
mod proxy;
mod speech;
mod theme;
mod web;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use theme::system::SystemThemeSource;

#[derive(Parser, Debug)]
#[command(name = "newsvoice", about = "Voice news reader with narrated headlines")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the web UI (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not start the synthesis proxy
    #[arg(long)]
    no_proxy: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (suppress noisy HTTP internals)
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("newsvoice starting");

    let mut config = config::Config::load(args.config.as_deref());
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Theme: persisted choice, else the desktop setting
    let system_source: Arc<dyn SystemThemeSource> = Arc::new(theme::system::DesktopTheme);
    let initial_system = tokio::task::spawn_blocking({
        let source = system_source.clone();
        move || source.detect()
    })
    .await?
    .unwrap_or(theme::Theme::Light);
    let store: Box<dyn theme::storage::PreferenceStore> = if config.theme.persist {
        Box::new(theme::storage::FileStore::new(config.theme.state_path()))
    } else {
        info!("Theme persistence disabled");
        Box::new(theme::storage::MemoryStore::default())
    };
    let theme_store = Arc::new(theme::ThemeStore::new(store, initial_system));

    let shutdown = CancellationToken::new();
    tokio::spawn(theme::system::watch_system_theme(
        system_source,
        theme_store.clone(),
        Duration::from_secs(config.theme.poll_interval_secs.max(1)),
        shutdown.clone(),
    ));

    if config.proxy.enabled && !args.no_proxy {
        proxy::start_proxy(config.proxy.clone()).await;
    }

    // Narration: remote synthesis, rodio playback, espeak fallback
    let audio = tokio::task::spawn_blocking(speech::player::RodioOutput::open).await?;
    let narrator = Arc::new(speech::narrator::Narrator::new(
        Arc::new(speech::remote::RemoteSynthesizer::new(config.tts.clone())),
        Arc::new(audio),
        Arc::new(speech::fallback::EspeakSpeech::new(config.fallback.clone())),
        Arc::new(notifier::Notifier::new(config.feedback.notifications)),
    ));

    let state = web::AppState::new(
        theme_store,
        Arc::new(news::NewsClient::new(config.news.clone())),
        narrator.clone(),
        config.news.max_articles,
    );

    tokio::select! {
        result = web::serve(state, &config.server.host, config.server.port) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    narrator.stop();
    shutdown.cancel();

    Ok(())
}
