//! Metadata sidecar files.
//!
//! A sidecar is plain text with one decimal value per line, each printed to
//! its own fixed precision. Readout sidecars hold three lines:
//!
//! ```text
//! -70.00          sensor temperature (°C), NaN when the read failed
//! 1714564800.000  run start, seconds since the Unix epoch
//! 1714564800.051  readout arrival, seconds since the Unix epoch
//! ```

use anyhow::{bail, Context, Result};
use daq_core::data::{epoch_seconds, CorrelatedSample};
use std::fs;
use std::path::Path;

/// Write `values` as `(value, precision)` pairs, one per line.
pub fn write_metadata<P: AsRef<Path>>(values: &[(f64, usize)], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut text = String::new();
    for (value, precision) in values {
        text.push_str(&format!("{:.*}\n", precision, value));
    }
    fs::write(path, text).with_context(|| format!("Failed to write metadata to {:?}", path))?;
    tracing::debug!(path = ?path, lines = values.len(), "Wrote metadata sidecar");
    Ok(())
}

/// Parse every non-empty line of a sidecar as a decimal value.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read metadata {:?}", path))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            line.parse::<f64>()
                .with_context(|| format!("Line {} of {:?} is not a number: {:?}", i + 1, path, line))
        })
        .collect()
}

/// The three values persisted next to each readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMetadata {
    /// `None` when the live read failed.
    pub temperature_c: Option<f64>,
    pub run_started: f64,
    pub arrived: f64,
}

impl SampleMetadata {
    pub fn from_sample(sample: &CorrelatedSample<'_>) -> Self {
        Self {
            temperature_c: sample.temperature.celsius(),
            run_started: epoch_seconds(sample.run_started),
            arrived: epoch_seconds(sample.arrived),
        }
    }

    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        temperature_precision: usize,
        time_precision: usize,
    ) -> Result<()> {
        write_metadata(
            &[
                (self.temperature_c.unwrap_or(f64::NAN), temperature_precision),
                (self.run_started, time_precision),
                (self.arrived, time_precision),
            ],
            path,
        )
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let values = read_metadata(path)?;
        match values.as_slice() {
            [temperature, run_started, arrived] => Ok(Self {
                temperature_c: (!temperature.is_nan()).then_some(*temperature),
                run_started: *run_started,
                arrived: *arrived,
            }),
            other => bail!(
                "Expected 3 metadata lines in {:?}, found {}",
                path,
                other.len()
            ),
        }
    }
}
