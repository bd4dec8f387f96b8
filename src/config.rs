//! Layered configuration using Figment
//!
//! Configuration is loaded from:
//! 1. built-in defaults (the acquisition tool's classic defaults)
//! 2. a TOML file (default `config/picam_daq.toml`, optional)
//! 3. environment variables prefixed with `PICAM_DAQ_`, sections split on `__`
//!
//! Positional command-line arguments override all three (see [`crate::cli`]).
//!
//! # Example
//! ```no_run
//! use picam_daq::config::AcquireConfig;
//!
//! let config = AcquireConfig::load()?;
//! println!("Exposure: {} ms", config.camera.exposure_ms);
//! # Ok::<(), figment::Error>(())
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/picam_daq.toml";

/// Environment variable prefix. `PICAM_DAQ_CAMERA__EXPOSURE_MS=20` sets
/// `camera.exposure_ms`.
pub const ENV_PREFIX: &str = "PICAM_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    pub application: ApplicationConfig,
    pub camera: CameraConfig,
    pub acquisition: AcquisitionConfig,
    pub storage: StorageConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Camera settings applied before acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Exposure time in milliseconds
    pub exposure_ms: f64,
    /// 0 = low, 1 = medium, anything else = high
    pub gain: i32,
    /// 0 = slow (quiet), nonzero = fast (noisy)
    pub speed: i32,
    /// 0 = normal, 1 = always closed
    pub shutter: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            exposure_ms: 50.0,
            gain: 2,
            speed: 0,
            shutter: 0,
        }
    }
}

/// Acquisition loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Readouts to acquire (0 = until stopped)
    pub readout_count: u64,
    /// Poll timeout in milliseconds; negative blocks indefinitely
    pub poll_timeout_ms: i64,
    /// Wait for sensor temperature lock before acquiring
    pub wait_for_lock: bool,
    /// Lock wait timeout in milliseconds; negative blocks indefinitely
    pub lock_timeout_ms: i64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            readout_count: 1,
            poll_timeout_ms: -1,
            wait_for_lock: false,
            lock_timeout_ms: -1,
        }
    }
}

/// Output file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Output directory for readout and sidecar files
    pub output_dir: PathBuf,
    /// Prefix of raw readout files
    pub image_prefix: String,
    /// Prefix of metadata sidecar files
    pub parameter_prefix: String,
    /// Decimal places of the temperature line (0-9)
    pub temperature_precision: usize,
    /// Decimal places of the time lines (0-9)
    pub time_precision: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            image_prefix: "my_sample".to_string(),
            parameter_prefix: "exposure_params".to_string(),
            temperature_precision: 2,
            time_precision: 3,
        }
    }
}

impl AcquireConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// The provider stack used by [`AcquireConfig::load_from`]
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        if !(self.camera.exposure_ms.is_finite() && self.camera.exposure_ms > 0.0) {
            return Err(format!(
                "Invalid exposure_ms {}. Must be a positive number of milliseconds",
                self.camera.exposure_ms
            ));
        }

        if !matches!(self.camera.shutter, 0 | 1) {
            return Err(format!(
                "Invalid shutter {}. Must be 0 (normal) or 1 (always closed)",
                self.camera.shutter
            ));
        }

        for (name, precision) in [
            ("temperature_precision", self.storage.temperature_precision),
            ("time_precision", self.storage.time_precision),
        ] {
            if precision > 9 {
                return Err(format!("Invalid {} {}. Must be 0-9", name, precision));
            }
        }

        if self.storage.image_prefix.is_empty() || self.storage.parameter_prefix.is_empty() {
            return Err("File prefixes must not be empty".to_string());
        }

        Ok(())
    }
}
