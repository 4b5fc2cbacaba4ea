//! Rover configuration
//!
//! Built-in defaults, then `rover.toml` (or the file named by
//! `ROVER_CONFIG`), then `ROVER__<SECTION>__<KEY>` environment overrides.

use arbitration::ControlConfig;
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use telemetry_link::SerialConfig;
use thiserror::Error;
use vision::VisionConfig;

/// Default config file name, looked up without extension
pub const DEFAULT_CONFIG_FILE: &str = "rover";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "ROVER_CONFIG";

const ENV_PREFIX: &str = "ROVER";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Operator console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// JPEG quality for frame snapshots (1-100)
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            jpeg_quality: 80,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable text
    pub json: bool,

    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Complete process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub serial: SerialConfig,
    pub camera: CameraConfig,
    pub vision: VisionConfig,
    pub control: ControlConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl RoverConfig {
    /// Load from the standard file and environment locations
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        Self::from_sources(
            path.as_deref(),
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Load from an optional explicit file plus an environment source.
    ///
    /// An explicit file must exist; the default `rover.toml` may be absent.
    pub fn from_sources(path: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: RoverConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the control core cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.vision.confidence_threshold)
            || !unit.contains(&self.vision.iou_threshold)
            || !unit.contains(&self.vision.obstacle_threshold)
        {
            return Err(ConfigError::Invalid(
                "vision thresholds must lie in 0..=1".to_string(),
            ));
        }
        if self.vision.input_size == 0 {
            return Err(ConfigError::Invalid("vision.input_size must be positive".to_string()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid("camera size must be positive".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".to_string()));
        }
        if self.control.autonomous_cadence_ms == 0
            || self.control.manual_cadence_ms == 0
            || self.control.halted_cadence_ms == 0
        {
            return Err(ConfigError::Invalid("control cadences must be positive".to_string()));
        }
        if !(1..=100).contains(&self.server.jpeg_quality) {
            return Err(ConfigError::Invalid("server.jpeg_quality must lie in 1..=100".to_string()));
        }
        Ok(())
    }
}
