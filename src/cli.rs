//! Command-line surface of `picam_acquire`
//!
//! ```text
//! picam_acquire [EXPOSURE_MS] [READOUT_COUNT] [SHUTTER] [GAIN] [SPEED]
//!               [IMAGE_PREFIX] [PARAMETER_PREFIX] [lock]
//! ```
//!
//! Every positional argument is optional. Omitted ones fall back to the
//! loaded configuration and are logged as defaults.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::AcquireConfig;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "picam_acquire")]
#[command(about = "Configure a camera, then acquire and save readouts", long_about = None)]
pub struct Cli {
    /// Exposure time in milliseconds
    #[arg(allow_negative_numbers = true)]
    pub exposure_ms: Option<f64>,

    /// Number of readouts to acquire (0 = until Ctrl-C)
    pub readout_count: Option<u64>,

    /// Shutter mode: 0 = normal, 1 = always closed
    #[arg(allow_negative_numbers = true)]
    pub shutter: Option<i32>,

    /// Analog gain: 0 = low, 1 = medium, anything else = high
    #[arg(allow_negative_numbers = true)]
    pub gain: Option<i32>,

    /// ADC speed: 0 = slow and quiet, nonzero = fast and noisy
    #[arg(allow_negative_numbers = true)]
    pub speed: Option<i32>,

    /// Prefix of raw readout files
    pub image_prefix: Option<String>,

    /// Prefix of metadata sidecar files
    pub parameter_prefix: Option<String>,

    /// The literal `lock` to wait for sensor temperature lock
    pub lock: Option<String>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// The trailing argument was present but not `lock`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid argument to lock temperature: {0:?}")]
pub struct InvalidLockArgument(pub String);

impl Cli {
    /// Whether the trailing `lock` argument asks for a temperature lock.
    ///
    /// `None` when the argument was omitted.
    pub fn lock_requested(&self) -> Result<Option<bool>, InvalidLockArgument> {
        match self.lock.as_deref() {
            None => Ok(None),
            Some("lock") => Ok(Some(true)),
            Some(other) => Err(InvalidLockArgument(other.to_string())),
        }
    }

    /// Fold command-line values over `config`.
    ///
    /// Values taken from the configuration are logged as defaults.
    pub fn apply(&self, config: &mut AcquireConfig) -> Result<(), InvalidLockArgument> {
        override_or_log(&mut config.camera.exposure_ms, self.exposure_ms, "exposure_ms");
        override_or_log(
            &mut config.acquisition.readout_count,
            self.readout_count,
            "readout_count",
        );
        override_or_log(&mut config.camera.shutter, self.shutter, "shutter");
        override_or_log(&mut config.camera.gain, self.gain, "gain");
        override_or_log(&mut config.camera.speed, self.speed, "speed");
        override_or_log(
            &mut config.storage.image_prefix,
            self.image_prefix.clone(),
            "image_prefix",
        );
        override_or_log(
            &mut config.storage.parameter_prefix,
            self.parameter_prefix.clone(),
            "parameter_prefix",
        );
        override_or_log(
            &mut config.acquisition.wait_for_lock,
            self.lock_requested()?,
            "wait_for_lock",
        );
        if let Some(level) = &self.log_level {
            config.application.log_level = level.clone();
        }
        Ok(())
    }
}

fn override_or_log<T: std::fmt::Debug>(slot: &mut T, value: Option<T>, name: &str) {
    match value {
        Some(value) => *slot = value,
        None => tracing::info!("Using default {}: {:?}", name, slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_positionals() {
        let cli = Cli::try_parse_from([
            "picam_acquire",
            "20.5",
            "3",
            "1",
            "0",
            "1",
            "dark",
            "dark_params",
            "lock",
        ])
        .unwrap();
        let mut config = AcquireConfig::default();

        cli.apply(&mut config).unwrap();

        assert_eq!(config.camera.exposure_ms, 20.5);
        assert_eq!(config.acquisition.readout_count, 3);
        assert_eq!(config.camera.shutter, 1);
        assert_eq!(config.camera.gain, 0);
        assert_eq!(config.camera.speed, 1);
        assert_eq!(config.storage.image_prefix, "dark");
        assert_eq!(config.storage.parameter_prefix, "dark_params");
        assert!(config.acquisition.wait_for_lock);
    }

    #[test]
    fn test_omitted_arguments_keep_config() {
        let cli = Cli::try_parse_from(["picam_acquire", "75"]).unwrap();
        let mut config = AcquireConfig::default();

        cli.apply(&mut config).unwrap();

        assert_eq!(config.camera.exposure_ms, 75.0);
        assert_eq!(config.acquisition.readout_count, 1);
        assert_eq!(config.storage.image_prefix, "my_sample");
        assert!(!config.acquisition.wait_for_lock);
    }

    #[test]
    fn test_invalid_lock_argument() {
        let cli = Cli::try_parse_from([
            "picam_acquire", "50", "1", "0", "2", "0", "img", "par", "lokc",
        ])
        .unwrap();

        assert_eq!(
            cli.lock_requested(),
            Err(InvalidLockArgument("lokc".to_string()))
        );
        assert!(cli.apply(&mut AcquireConfig::default()).is_err());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "picam_acquire",
            "--config",
            "alt.toml",
            "--log-level",
            "debug",
            "10",
        ])
        .unwrap();
        let mut config = AcquireConfig::default();

        cli.apply(&mut config).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.camera.exposure_ms, 10.0);
    }

    #[test]
    fn test_negative_exposure_parses_for_validation() {
        let cli = Cli::try_parse_from(["picam_acquire", "-5"]).unwrap();
        let mut config = AcquireConfig::default();
        cli.apply(&mut config).unwrap();
        assert!(config.validate().is_err());
    }
}
