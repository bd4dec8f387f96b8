//! Sample Correlator
//!
//! Pairs each delivered readout with a live sensor temperature read and the
//! wall-clock capture window. A failed temperature read degrades the sample
//! instead of dropping the readout.

use chrono::{DateTime, Utc};
use daq_core::data::{CorrelatedSample, Readout, Temperature};
use daq_core::error::{AppResult, DaqError, DeviceErrorCode};
use daq_core::parameter::{ParameterId, ParameterValue};

use crate::components::device::CameraDevice;

/// Source of wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Read the live sensor temperature, bypassing the commit state.
pub fn read_temperature<D: CameraDevice + ?Sized>(device: &D) -> AppResult<f64> {
    match device.read_parameter(ParameterId::SensorTemperatureReading) {
        Ok(ParameterValue::FloatingPoint(celsius)) => Ok(celsius),
        Ok(_) => Err(DaqError::TemperatureReadFailed(
            DeviceErrorCode::ParameterHasInvalidValueType,
        )),
        Err(code) => Err(DaqError::TemperatureReadFailed(code)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SampleCorrelator<C: Clock = SystemClock> {
    clock: C,
}

impl SampleCorrelator<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> SampleCorrelator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Build the sample for `readout`.
    ///
    /// Arrival time is taken before the temperature query so it reflects
    /// delivery rather than the extra hardware round trip.
    pub fn correlate<'a, D: CameraDevice + ?Sized>(
        &self,
        device: &D,
        readout: Readout<'a>,
        run_started: DateTime<Utc>,
    ) -> CorrelatedSample<'a> {
        let arrived = self.clock.now();
        let temperature = match read_temperature(device) {
            Ok(celsius) => {
                tracing::info!(readout = readout.index, temperature_c = celsius, "Temperature is {} degrees C", celsius);
                Temperature::Celsius(celsius)
            }
            Err(err) => {
                tracing::warn!(readout = readout.index, error = %err, "Temperature reading failed on this observation");
                Temperature::ReadFailed
            }
        };
        CorrelatedSample {
            readout,
            temperature,
            run_started,
            arrived,
        }
    }
}
