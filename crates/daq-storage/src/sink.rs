//! File-backed sample sink.
//!
//! Each readout `n` (1-based) produces a file pair in the output directory:
//!
//! - `<image_prefix>_<n>.raw`: raw readout bytes
//! - `<parameter_prefix>_<n>.txt`: metadata sidecar (see [`crate::sidecar`])

use anyhow::{Context, Result};
use daq_core::data::{CorrelatedSample, SampleSink};
use std::path::{Path, PathBuf};

use crate::raw_writer::write_raw;
use crate::sidecar::SampleMetadata;

/// Paths written for one readout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSample {
    pub index: u64,
    pub raw_path: PathBuf,
    pub metadata_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileSampleSink {
    output_dir: PathBuf,
    image_prefix: String,
    parameter_prefix: String,
    temperature_precision: usize,
    time_precision: usize,
    saved: u64,
    last: Option<WrittenSample>,
}

impl FileSampleSink {
    /// Create the sink, creating `output_dir` if needed.
    pub fn create<P: AsRef<Path>>(
        output_dir: P,
        image_prefix: impl Into<String>,
        parameter_prefix: impl Into<String>,
    ) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
        Ok(Self {
            output_dir,
            image_prefix: image_prefix.into(),
            parameter_prefix: parameter_prefix.into(),
            temperature_precision: 2,
            time_precision: 3,
            saved: 0,
            last: None,
        })
    }

    /// Decimal places for the temperature line and the two time lines.
    pub fn with_precision(mut self, temperature: usize, time: usize) -> Self {
        self.temperature_precision = temperature;
        self.time_precision = time;
        self
    }

    pub fn raw_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.raw", self.image_prefix, index))
    }

    pub fn metadata_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.txt", self.parameter_prefix, index))
    }

    /// Number of readouts saved so far.
    pub fn saved(&self) -> u64 {
        self.saved
    }

    pub fn last_written(&self) -> Option<&WrittenSample> {
        self.last.as_ref()
    }
}

impl SampleSink for FileSampleSink {
    fn consume(&mut self, sample: &CorrelatedSample<'_>) -> Result<()> {
        let index = sample.readout.index;
        let raw_path = self.raw_path(index);
        let metadata_path = self.metadata_path(index);

        let data = sample.readout.data();
        write_raw(data, data.len(), &raw_path)
            .with_context(|| format!("Failed to save readout {}", index))?;
        SampleMetadata::from_sample(sample)
            .write(
                &metadata_path,
                self.temperature_precision,
                self.time_precision,
            )
            .with_context(|| format!("Failed to save metadata for readout {}", index))?;

        tracing::info!(readout = index, path = ?raw_path, bytes = data.len(), "Saved readout");
        self.saved += 1;
        self.last = Some(WrittenSample {
            index,
            raw_path,
            metadata_path,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use daq_core::data::{Readout, Temperature};
    use tempfile::TempDir;

    fn sample(index: u64, data: &[u8], temperature: Temperature) -> CorrelatedSample<'_> {
        let run_started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        CorrelatedSample {
            readout: Readout::new(index, data),
            temperature,
            run_started,
            arrived: run_started + Duration::milliseconds(50 * index as i64),
        }
    }

    #[test]
    fn test_three_readouts_three_file_pairs() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FileSampleSink::create(temp_dir.path(), "my_sample", "exposure_params")
            .unwrap();

        for index in 1..=3 {
            let data = vec![index as u8; 16];
            sink.consume(&sample(index, &data, Temperature::Celsius(-70.0)))
                .unwrap();
        }

        assert_eq!(sink.saved(), 3);
        let last = sink.last_written().unwrap();
        assert_eq!(last.index, 3);
        assert_eq!(last.raw_path, temp_dir.path().join("my_sample_3.raw"));
        for index in 1..=3u64 {
            let raw = temp_dir.path().join(format!("my_sample_{}.raw", index));
            let txt = temp_dir.path().join(format!("exposure_params_{}.txt", index));
            assert_eq!(std::fs::read(&raw).unwrap(), vec![index as u8; 16]);

            let metadata = SampleMetadata::read(&txt).unwrap();
            assert_eq!(metadata.temperature_c, Some(-70.0));
            assert!((metadata.run_started - 1714564800.0).abs() < 1e-3);
            assert!((metadata.arrived - metadata.run_started - 0.05 * index as f64).abs() < 1e-3);
        }
    }

    #[test]
    fn test_failed_temperature_still_saves_readout() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FileSampleSink::create(temp_dir.path(), "img", "par")
            .unwrap()
            .with_precision(1, 0);

        sink.consume(&sample(1, &[9, 9], Temperature::ReadFailed))
            .unwrap();

        let text = std::fs::read_to_string(sink.metadata_path(1)).unwrap();
        assert_eq!(text, "NaN\n1714564800\n1714564800\n");
        assert_eq!(std::fs::read(sink.raw_path(1)).unwrap(), vec![9, 9]);
    }

    #[test]
    fn test_creates_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("run").join("001");

        let sink = FileSampleSink::create(&nested, "img", "par").unwrap();

        assert!(nested.is_dir());
        assert_eq!(sink.raw_path(2), nested.join("img_2.raw"));
    }
}
