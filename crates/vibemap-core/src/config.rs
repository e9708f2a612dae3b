//! Configuration loading and typed config structures for Vibemap.
//!
//! The canonical configuration lives in `vibemap-config.yaml`. This
//! module defines strongly-typed structs mirroring the YAML structure
//! and a loader that reads the file and applies environment overrides.
//! Every field has a default, so a missing file or an empty document
//! yields a working configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use vibemap_types::{Coordinate, Emotion, MapOptions, MapStyleRule};

/// Environment variable holding the mapping-library API key.
pub const MAPS_API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid environment override {name}: {reason}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Vibemap configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VibemapConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Place store connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Mapping library settings.
    #[serde(default)]
    pub map: MapConfig,

    /// Marker sizing and palette.
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Place normalization defaults.
    #[serde(default)]
    pub places: PlacesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VibemapConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// A path that does not exist yields the default configuration (still
    /// subject to overrides).
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `store.postgres_url`
    /// - `GOOGLE_MAPS_API_KEY` sets `map.api_key`
    /// - `VIBEMAP_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Env`] if an override is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::parse(&contents)?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override connection settings and secrets from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `VIBEMAP_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.store.postgres_url = Some(val);
        }
        if let Ok(val) = std::env::var(MAPS_API_KEY_ENV) {
            self.map.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("VIBEMAP_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Env {
                name: "VIBEMAP_PORT",
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Place store settings.
///
/// When `postgres_url` is unset the server falls back to an in-memory
/// store, optionally seeded from `seed_path`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// `PostgreSQL` connection string.
    #[serde(default)]
    pub postgres_url: Option<String>,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// JSON array of place documents for the in-memory store.
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            max_connections: default_max_connections(),
            seed_path: None,
        }
    }
}

/// Mapping library settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// DOM element id the map is mounted into.
    #[serde(default = "default_container_id")]
    pub container_id: String,

    /// Base URL of the mapping script (the API key is appended).
    #[serde(default = "default_script_url")]
    pub script_url: String,

    /// API key. Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Initial viewport center.
    #[serde(default = "default_center")]
    pub default_center: Coordinate,

    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// Styling rules passed through to the mapping library.
    #[serde(default)]
    pub styles: Vec<MapStyleRule>,
}

impl MapConfig {
    /// The script URL with the API key attached, if a key is configured.
    pub fn keyed_script_url(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(|key| format!("{}?key={key}&libraries=marker", self.script_url))
    }

    /// Options for constructing a map instance.
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            center: self.default_center,
            zoom: self.default_zoom,
            styles: self.styles.clone(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            script_url: default_script_url(),
            api_key: None,
            default_center: default_center(),
            default_zoom: default_zoom(),
            styles: Vec::new(),
        }
    }
}

/// Marker sizing and palette.
///
/// Marker size is `base_size + intensity * scale_factor`, where intensity
/// is the score of the place's dominant emotion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerConfig {
    /// Size of a marker with zero intensity.
    #[serde(default = "default_base_size")]
    pub base_size: f64,

    /// Size added at full intensity.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    /// Emotion key to CSS color.
    #[serde(default = "default_colors")]
    pub colors: BTreeMap<Emotion, String>,

    /// Color for emotions missing from `colors`.
    #[serde(default = "default_fallback_color")]
    pub fallback_color: String,
}

impl MarkerConfig {
    /// Color for an emotion, falling back for unknown keys.
    pub fn color_for(&self, emotion: &Emotion) -> &str {
        self.colors
            .get(emotion)
            .map_or(self.fallback_color.as_str(), String::as_str)
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            base_size: default_base_size(),
            scale_factor: default_scale_factor(),
            colors: default_colors(),
            fallback_color: default_fallback_color(),
        }
    }
}

/// Defaults applied while normalizing place documents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlacesConfig {
    /// Dominant emotion used when a place has no usable scores.
    #[serde(default = "default_emotion")]
    pub default_emotion: Emotion,

    /// Position given to places whose stored coordinate is unusable.
    #[serde(default = "default_center")]
    pub fallback_coordinate: Coordinate,

    /// Location queried when a request names none.
    #[serde(default = "default_location")]
    pub default_location: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            default_emotion: default_emotion(),
            fallback_coordinate: default_center(),
            default_location: default_location(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    10
}

fn default_container_id() -> String {
    String::from("vibe-heatmap")
}

fn default_script_url() -> String {
    String::from("https://maps.googleapis.com/maps/api/js")
}

const fn default_center() -> Coordinate {
    Coordinate::new(37.7749, -122.4194)
}

const fn default_zoom() -> u8 {
    12
}

const fn default_base_size() -> f64 {
    8.0
}

const fn default_scale_factor() -> f64 {
    12.0
}

fn default_colors() -> BTreeMap<Emotion, String> {
    [
        ("happy", "#FFD700"),
        ("relaxed", "#87CEEB"),
        ("energetic", "#FF6347"),
        ("nostalgic", "#DDA0DD"),
        ("contemplative", "#9370DB"),
        ("romantic", "#FF69B4"),
        ("anxious", "#FFA500"),
        ("lonely", "#708090"),
    ]
    .into_iter()
    .map(|(emotion, color)| (Emotion::from(emotion), String::from(color)))
    .collect()
}

fn default_fallback_color() -> String {
    String::from("#808080")
}

fn default_emotion() -> Emotion {
    Emotion::from("happy")
}

fn default_location() -> String {
    String::from("San Francisco, CA")
}

fn default_log_level() -> String {
    String::from("info")
}
