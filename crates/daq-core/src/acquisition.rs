//! Status types exchanged with the camera during acquisition.

use std::time::Duration;

bitflags::bitflags! {
    /// Soft, per-update capture-quality errors.
    ///
    /// Distinct from transport failures: a poll can succeed and still report
    /// flags here while the stream keeps running.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AcquisitionErrors: u32 {
        const DATA_LOST = 0x1;
        const CONNECTION_LOST = 0x2;
        const DATA_NOT_ARRIVING = 0x4;
        const SHUTTER_OVERHEATED = 0x8;
        const CAMERA_FAULTED = 0x10;
    }
}

impl std::fmt::Display for AcquisitionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = self
            .iter_names()
            .map(|(name, _)| match name {
                "DATA_LOST" => "Data Lost",
                "CONNECTION_LOST" => "Connection Lost",
                "DATA_NOT_ARRIVING" => "Data Not Arriving",
                "SHUTTER_OVERHEATED" => "Shutter Overheated",
                "CAMERA_FAULTED" => "Camera Faulted",
                other => other,
            })
            .collect();
        f.write_str(&names.join(" | "))?;
        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            write!(f, " | {:#x}", unknown)?;
        }
        Ok(())
    }
}

/// Outcome of one successful `wait for acquisition update` call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcquisitionStatus {
    /// Whether the camera is still acquiring.
    pub running: bool,
    /// Soft errors flagged on this update.
    pub errors: AcquisitionErrors,
    /// Readouts per second reported by the camera.
    pub readout_rate: f64,
    /// Number of readouts available in the device buffer for this update.
    pub readout_count: usize,
}

/// How long a single poll may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTimeout {
    /// Block until the next update, however long that takes.
    Infinite,
    Bounded(Duration),
}

impl PollTimeout {
    /// Driver convention: a negative timeout means "block indefinitely".
    pub fn from_millis(ms: i64) -> Self {
        if ms < 0 {
            PollTimeout::Infinite
        } else {
            PollTimeout::Bounded(Duration::from_millis(ms.unsigned_abs()))
        }
    }

    pub fn as_millis(self) -> i64 {
        match self {
            PollTimeout::Infinite => -1,
            PollTimeout::Bounded(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

/// Number of readouts the camera is asked to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadoutTarget {
    Finite(u64),
    /// Run until explicitly stopped.
    Unbounded,
}

impl ReadoutTarget {
    /// Driver convention: a readout count of zero means unbounded.
    pub fn from_count(count: u64) -> Self {
        if count == 0 {
            ReadoutTarget::Unbounded
        } else {
            ReadoutTarget::Finite(count)
        }
    }

    /// Value committed to the `ReadoutCount` parameter.
    pub fn as_count(self) -> i64 {
        match self {
            ReadoutTarget::Finite(n) => i64::try_from(n).unwrap_or(i64::MAX),
            ReadoutTarget::Unbounded => 0,
        }
    }

    pub fn is_satisfied_by(self, delivered: u64) -> bool {
        match self {
            ReadoutTarget::Finite(n) => delivered >= n,
            ReadoutTarget::Unbounded => false,
        }
    }
}
