use chrono::{DateTime, Utc};

use crate::parameter::PixelFormat;

/// Borrowed view of one readout in the camera's buffer.
///
/// The bytes belong to the device and stay valid only until the next poll.
/// The lifetime ties the view to a shared borrow of the device, so holding a
/// `Readout` across a poll does not compile.
#[derive(Debug, Clone, Copy)]
pub struct Readout<'a> {
    /// Sequence index within the run, starting at 1.
    pub index: u64,
    data: &'a [u8],
}

impl<'a> Readout<'a> {
    pub fn new(index: u64, data: &'a [u8]) -> Self {
        Self { index, data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mean pixel value, or `None` when the format is not 16-bit monochrome.
    ///
    /// 16-bit pixels are little endian.
    pub fn mean_intensity(&self, format: PixelFormat, bit_depth: u32) -> Option<f64> {
        if format != PixelFormat::Monochrome16Bit || bit_depth != 16 {
            return None;
        }
        let pixels = self.data.len() / 2;
        if pixels == 0 {
            return None;
        }
        let sum: u64 = self
            .data
            .chunks_exact(2)
            .map(|px| u64::from(u16::from_le_bytes([px[0], px[1]])))
            .sum();
        Some(sum as f64 / pixels as f64)
    }
}

/// Sensor temperature captured alongside a readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temperature {
    Celsius(f64),
    /// The live read failed; the readout is kept regardless.
    ReadFailed,
}

impl Temperature {
    pub fn celsius(&self) -> Option<f64> {
        match *self {
            Temperature::Celsius(c) => Some(c),
            Temperature::ReadFailed => None,
        }
    }
}

/// A readout paired with its temperature and capture-window timestamps.
#[derive(Debug, Clone, Copy)]
pub struct CorrelatedSample<'a> {
    pub readout: Readout<'a>,
    pub temperature: Temperature,
    /// Start of the acquisition run, captured once when the stream starts.
    pub run_started: DateTime<Utc>,
    /// Arrival time of this readout.
    pub arrived: DateTime<Utc>,
}

/// Seconds since the Unix epoch with sub-second resolution.
pub fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9
}

/// Consumer of correlated samples.
///
/// Called synchronously between polls. Implementations must copy or fully
/// consume the readout bytes before returning.
pub trait SampleSink {
    fn consume(&mut self, sample: &CorrelatedSample<'_>) -> anyhow::Result<()>;
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn consume(&mut self, sample: &CorrelatedSample<'_>) -> anyhow::Result<()> {
        (**self).consume(sample)
    }
}
