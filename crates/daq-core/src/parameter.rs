//! Camera parameters and the in-memory Parameter Store.
//!
//! A parameter is identified by [`ParameterId`] and carries a value of one of
//! three kinds ([`ValueType`]). The [`ParameterStore`] tracks, per parameter,
//! the value the caller wants (pending) and the value hardware last accepted
//! (committed). A parameter is dirty while the two differ.
//!
//! ```text
//! stage(id, v) ──► pending = v ──► dirty if pending != committed
//!                                        │
//!                       commit accepted  ▼
//!                  committed = pending ──► clean
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppResult, DaqError};

/// Kind of value a parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Integer,
    FloatingPoint,
    LargeInteger,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ValueType::Integer => "integer",
            ValueType::FloatingPoint => "floating-point",
            ValueType::LargeInteger => "large-integer",
        };
        write!(f, "{}", label)
    }
}

/// Configurable or readable camera setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterId {
    ExposureTime,
    AdcAnalogGain,
    AdcSpeed,
    ShutterTimingMode,
    ReadoutCount,
    SensorTemperatureSetPoint,
    SensorTemperatureReading,
    SensorTemperatureStatus,
    PixelFormat,
    PixelBitDepth,
    ReadoutStride,
    FrameSize,
}

impl ParameterId {
    pub fn value_type(self) -> ValueType {
        match self {
            ParameterId::ExposureTime
            | ParameterId::AdcSpeed
            | ParameterId::SensorTemperatureSetPoint
            | ParameterId::SensorTemperatureReading => ValueType::FloatingPoint,
            ParameterId::ReadoutCount => ValueType::LargeInteger,
            ParameterId::AdcAnalogGain
            | ParameterId::ShutterTimingMode
            | ParameterId::SensorTemperatureStatus
            | ParameterId::PixelFormat
            | ParameterId::PixelBitDepth
            | ParameterId::ReadoutStride
            | ParameterId::FrameSize => ValueType::Integer,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::ExposureTime => "Exposure Time",
            ParameterId::AdcAnalogGain => "Adc Analog Gain",
            ParameterId::AdcSpeed => "Adc Speed",
            ParameterId::ShutterTimingMode => "Shutter Timing Mode",
            ParameterId::ReadoutCount => "Readout Count",
            ParameterId::SensorTemperatureSetPoint => "Sensor Temperature Set Point",
            ParameterId::SensorTemperatureReading => "Sensor Temperature Reading",
            ParameterId::SensorTemperatureStatus => "Sensor Temperature Status",
            ParameterId::PixelFormat => "Pixel Format",
            ParameterId::PixelBitDepth => "Pixel Bit Depth",
            ParameterId::ReadoutStride => "Readout Stride",
            ParameterId::FrameSize => "Frame Size",
        }
    }

    /// Read-only parameters are reported by hardware and never staged.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            ParameterId::SensorTemperatureReading
                | ParameterId::SensorTemperatureStatus
                | ParameterId::PixelFormat
                | ParameterId::PixelBitDepth
                | ParameterId::ReadoutStride
                | ParameterId::FrameSize
        )
    }
}

impl std::fmt::Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Integer(i32),
    FloatingPoint(f64),
    LargeInteger(i64),
}

impl ParameterValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ParameterValue::Integer(_) => ValueType::Integer,
            ParameterValue::FloatingPoint(_) => ValueType::FloatingPoint,
            ParameterValue::LargeInteger(_) => ValueType::LargeInteger,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            ParameterValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ParameterValue::LargeInteger(v) => Some(v),
            ParameterValue::Integer(v) => Some(i64::from(v)),
            ParameterValue::FloatingPoint(_) => None,
        }
    }

    /// Numeric view used for ordering capability sets.
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParameterValue::Integer(v) => f64::from(v),
            ParameterValue::FloatingPoint(v) => v,
            ParameterValue::LargeInteger(v) => v as f64,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::FloatingPoint(v) => write!(f, "{}", v),
            ParameterValue::LargeInteger(v) => write!(f, "{}", v),
        }
    }
}

/// Analog gain of the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcAnalogGain {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl AdcAnalogGain {
    /// Operator setting: 0 = low, 1 = medium, anything else = high.
    pub fn from_setting(setting: i32) -> Self {
        match setting {
            0 => AdcAnalogGain::Low,
            1 => AdcAnalogGain::Medium,
            _ => AdcAnalogGain::High,
        }
    }

    pub fn as_value(self) -> ParameterValue {
        ParameterValue::Integer(self as i32)
    }
}

/// When the shutter opens relative to exposures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutterTimingMode {
    Normal = 1,
    AlwaysClosed = 2,
    AlwaysOpen = 3,
}

impl ShutterTimingMode {
    /// Operator setting: 0 = normal, 1 = always closed.
    pub fn from_setting(setting: i32) -> AppResult<Self> {
        match setting {
            0 => Ok(ShutterTimingMode::Normal),
            1 => Ok(ShutterTimingMode::AlwaysClosed),
            other => Err(DaqError::Configuration(format!(
                "shutter setting must be 0 (normal) or 1 (always closed), got {}",
                other
            ))),
        }
    }

    pub fn as_value(self) -> ParameterValue {
        ParameterValue::Integer(self as i32)
    }
}

/// Cooling state reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorTemperatureStatus {
    Unlocked = 1,
    Locked = 2,
    Faulted = 3,
}

impl SensorTemperatureStatus {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(SensorTemperatureStatus::Unlocked),
            2 => Some(SensorTemperatureStatus::Locked),
            3 => Some(SensorTemperatureStatus::Faulted),
            _ => None,
        }
    }
}

/// Pixel encoding of readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Monochrome16Bit = 1,
    Monochrome32Bit = 3,
}

impl PixelFormat {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(PixelFormat::Monochrome16Bit),
            3 => Some(PixelFormat::Monochrome32Bit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    pending: ParameterValue,
    committed: Option<ParameterValue>,
}

/// Staged camera configuration with commit tracking.
///
/// Created fresh per configuration call and discarded once committed.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    entries: BTreeMap<ParameterId, Entry>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value hardware currently holds for `id`.
    ///
    /// Used to seed the store so that staging an unchanged value does not
    /// mark the parameter dirty.
    pub fn record_committed(&mut self, id: ParameterId, value: ParameterValue) {
        self.entries.insert(
            id,
            Entry {
                pending: value,
                committed: Some(value),
            },
        );
    }

    /// Stage a new pending value.
    pub fn stage(&mut self, id: ParameterId, value: ParameterValue) -> AppResult<()> {
        if value.value_type() != id.value_type() {
            return Err(DaqError::ValueTypeMismatch {
                parameter: id,
                expected: id.value_type(),
                actual: value.value_type(),
            });
        }
        if id.is_read_only() {
            return Err(DaqError::Configuration(format!(
                "parameter {} is read-only",
                id
            )));
        }
        let entry = self.entries.entry(id).or_insert(Entry {
            pending: value,
            committed: None,
        });
        entry.pending = value;
        Ok(())
    }

    pub fn committed(&self, id: ParameterId) -> Option<ParameterValue> {
        self.entries.get(&id).and_then(|e| e.committed)
    }

    pub fn is_dirty(&self, id: ParameterId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| e.committed != Some(e.pending))
    }

    /// Dirty parameters with their pending values, in parameter order.
    pub fn dirty(&self) -> Vec<(ParameterId, ParameterValue)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.committed != Some(e.pending))
            .map(|(id, e)| (*id, e.pending))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.entries.values().all(|e| e.committed == Some(e.pending))
    }

    /// Mark `ids` as accepted by hardware at their pending values.
    pub fn mark_committed(&mut self, ids: &[ParameterId]) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.committed = Some(entry.pending);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_marks_dirty_until_committed() {
        let mut store = ParameterStore::new();
        store
            .stage(ParameterId::ExposureTime, ParameterValue::FloatingPoint(50.0))
            .unwrap();
        assert!(store.is_dirty(ParameterId::ExposureTime));
        assert!(!store.is_clean());

        store.mark_committed(&[ParameterId::ExposureTime]);
        assert!(store.is_clean());
        assert_eq!(
            store.committed(ParameterId::ExposureTime),
            Some(ParameterValue::FloatingPoint(50.0))
        );
    }

    #[test]
    fn test_staging_committed_value_is_clean() {
        let mut store = ParameterStore::new();
        store.record_committed(ParameterId::AdcAnalogGain, AdcAnalogGain::High.as_value());
        store
            .stage(ParameterId::AdcAnalogGain, AdcAnalogGain::High.as_value())
            .unwrap();
        assert!(store.dirty().is_empty());

        store
            .stage(ParameterId::AdcAnalogGain, AdcAnalogGain::Low.as_value())
            .unwrap();
        assert_eq!(
            store.dirty(),
            vec![(ParameterId::AdcAnalogGain, AdcAnalogGain::Low.as_value())]
        );
    }

    #[test]
    fn test_stage_rejects_wrong_value_type() {
        let mut store = ParameterStore::new();
        let err = store
            .stage(ParameterId::ReadoutCount, ParameterValue::Integer(3))
            .unwrap_err();
        assert!(matches!(
            err,
            DaqError::ValueTypeMismatch {
                expected: ValueType::LargeInteger,
                ..
            }
        ));
    }

    #[test]
    fn test_stage_rejects_read_only() {
        let mut store = ParameterStore::new();
        assert!(store
            .stage(
                ParameterId::SensorTemperatureReading,
                ParameterValue::FloatingPoint(-70.0)
            )
            .is_err());
    }

    #[test]
    fn test_operator_settings() {
        assert_eq!(AdcAnalogGain::from_setting(0), AdcAnalogGain::Low);
        assert_eq!(AdcAnalogGain::from_setting(1), AdcAnalogGain::Medium);
        assert_eq!(AdcAnalogGain::from_setting(7), AdcAnalogGain::High);
        assert_eq!(
            ShutterTimingMode::from_setting(1).unwrap(),
            ShutterTimingMode::AlwaysClosed
        );
        assert!(ShutterTimingMode::from_setting(2).is_err());
    }
}
