//! Provider configuration loading from TOML files
//!
//! The host application owns where configuration comes from; this module
//! only parses it. Config file for the replay tool is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::io::tone::AudioStream;
use anyhow::Context;
use parking_lot::RwLock;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DebugConfig {
    /// Enables audio cues and on-screen notices
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToneConfig {
    #[serde(default = "default_tone_stream")]
    pub stream: AudioStream,
    #[serde(default = "default_tone_volume")]
    pub volume_percent: u8,
    #[serde(default = "default_tone_duration_ms")]
    pub duration_ms: u32,
}

fn default_tone_stream() -> AudioStream {
    AudioStream::Notification
}

fn default_tone_volume() -> u8 {
    100
}

fn default_tone_duration_ms() -> u32 {
    1000
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            stream: default_tone_stream(),
            volume_percent: default_tone_volume(),
            duration_ms: default_tone_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    /// Upper bound for one reverse-geocoding lookup (0 disables the bound)
    #[serde(default = "default_geocoder_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_geocoder_timeout_ms() -> u64 {
    5000
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self { timeout_ms: default_geocoder_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1000
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { channel_capacity: default_channel_capacity() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub tone: ToneConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// Provider configuration, read-only once built
#[derive(Debug, Clone)]
pub struct Config {
    debugging: bool,
    tone_stream: AudioStream,
    tone_volume_percent: u8,
    tone_duration_ms: u32,
    geocoder_timeout_ms: u64,
    event_channel_capacity: usize,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            debugging: toml_config.debug.enabled,
            tone_stream: toml_config.tone.stream,
            tone_volume_percent: toml_config.tone.volume_percent.min(100),
            tone_duration_ms: toml_config.tone.duration_ms,
            geocoder_timeout_ms: toml_config.geocoder.timeout_ms,
            event_channel_capacity: toml_config.events.channel_capacity.max(1),
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn debugging(&self) -> bool {
        self.debugging
    }

    pub fn tone_stream(&self) -> AudioStream {
        self.tone_stream
    }

    pub fn tone_volume_percent(&self) -> u8 {
        self.tone_volume_percent
    }

    pub fn tone_duration_ms(&self) -> u32 {
        self.tone_duration_ms
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_millis(self.geocoder_timeout_ms)
    }

    pub fn event_channel_capacity(&self) -> usize {
        self.event_channel_capacity
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to toggle debugging (cues and notices)
    pub fn with_debugging(mut self, debugging: bool) -> Self {
        self.debugging = debugging;
        self
    }

    /// Builder method to set the geocoder timeout
    pub fn with_geocoder_timeout_ms(mut self, ms: u64) -> Self {
        self.geocoder_timeout_ms = ms;
        self
    }
}

/// Current configuration slot shared between `configure` and dispatch.
///
/// Readers take a cheap `Arc` snapshot so a concurrent `replace` never
/// tears an in-flight dispatch.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<Config>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self { current: RwLock::new(Arc::new(config)) }
    }

    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new configuration (last write wins)
    pub fn replace(&self, config: Config) {
        debug!(
            debugging = %config.debugging(),
            config_file = %config.config_file(),
            "config_replaced"
        );
        *self.current.write() = Arc::new(config);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
