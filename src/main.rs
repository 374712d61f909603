//! bgloc-replay - drive the location provider core from recorded signals
//!
//! Wires in-process platform capabilities, runs a replay strategy through a
//! full create/configure/start/destroy lifecycle and prints every delivered
//! event as one JSON line on stdout. Logs go to stderr.

use anyhow::Context;
use bgloc_core::infra::{Config, Metrics};
use bgloc_core::io::loopback::{LocalRegistrar, LogNotifier, LogToneGenerator, StaticGeocoder, StaticSettings};
use bgloc_core::io::settings::{ALLOW_MOCK_LOCATION, SETTING_ENABLED};
use bgloc_core::io::create_event_channel;
use bgloc_core::services::replay::load_signals;
use bgloc_core::services::{LocationProvider, Platform, ReplayProvider};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Replay recorded location signals through the provider pipeline
#[derive(Parser, Debug)]
#[command(name = "bgloc-replay", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON lines file of recorded signals
    #[arg(short, long)]
    signals: PathBuf,

    /// JSON array of address fixtures for reverse geocoding
    #[arg(short, long)]
    addresses: Option<PathBuf>,

    /// Degrees within which an address fixture matches a fix
    #[arg(long)]
    match_radius_deg: Option<f64>,

    /// Report the mock-location developer setting as enabled
    #[arg(long)]
    mock_locations: bool,

    /// Force debugging on (cues and notices) regardless of the config file
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-signal visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let started_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    info!(git_hash = %env!("GIT_HASH"), started_at = %started_at, "bgloc-replay starting");

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if args.debug {
        config = config.with_debugging(true);
    }
    info!(
        config_file = %config.config_file(),
        debugging = %config.debugging(),
        tone_stream = %config.tone_stream().as_str(),
        tone_duration_ms = %config.tone_duration_ms(),
        geocoder_timeout_ms = %config.geocoder_timeout().as_millis(),
        channel_capacity = %config.event_channel_capacity(),
        "config_loaded"
    );

    let signals = load_signals(&args.signals)?;
    let mut geocoder = match &args.addresses {
        Some(path) => StaticGeocoder::from_json_file(path)?,
        None => StaticGeocoder::default(),
    };
    if let Some(radius) = args.match_radius_deg {
        geocoder = geocoder.with_match_radius_deg(radius);
    }
    let mut settings = StaticSettings::new();
    if args.mock_locations {
        settings = settings.with(ALLOW_MOCK_LOCATION, SETTING_ENABLED);
    }

    let tone = Arc::new(LogToneGenerator::new());
    let platform = Platform {
        geocoder: Arc::new(geocoder),
        tone: tone.clone(),
        settings: Arc::new(settings),
        registrar: Arc::new(LocalRegistrar::new()),
        notifier: Arc::new(LogNotifier),
    };
    let metrics = Arc::new(Metrics::new());

    // Bounded channel between the strategy thread and stdout
    let (event_tx, mut event_rx) = create_event_channel(config.event_channel_capacity(), metrics.clone());

    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    println!("{line}");
                    printed += 1;
                }
                Err(e) => warn!(kind = %event.kind(), error = %e, "event_serialize_failed"),
            }
        }
        printed
    });

    // Strategy callbacks are synchronous and may block on geocoding
    let provider = ReplayProvider::new(platform, config.clone(), metrics.clone(), signals);
    let replayed = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        provider.on_create()?;
        provider.on_configure(config);
        provider.set_delegate(Arc::new(event_tx));
        provider.on_start();
        let replayed = provider.replayed();
        provider.on_destroy()?;
        // Dropping the provider drops the delegate and closes the channel
        Ok(replayed)
    })
    .await
    .context("replay task failed")??;

    let printed = printer.await.context("printer task failed")?;

    let summary = metrics.report();
    summary.log();
    if summary.channel_dropped > 0 {
        warn!(dropped = %summary.channel_dropped, "events_dropped_channel_full");
    }

    info!(
        replayed = %replayed,
        printed = %printed,
        tones_started = %tone.cues_started(),
        "bgloc-replay complete"
    );
    Ok(())
}
