//! Sensor temperature monitoring and lock wait.

use daq_core::acquisition::PollTimeout;
use daq_core::error::{AppResult, DaqError};
use daq_core::parameter::{ParameterId, ParameterValue, SensorTemperatureStatus};

use crate::components::correlator::read_temperature;
use crate::components::device::CameraDevice;

/// Temperature and cooling status read directly from hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReport {
    /// `None` when the read failed.
    pub temperature_c: Option<f64>,
    pub status: Option<SensorTemperatureStatus>,
}

pub fn read_status<D: CameraDevice + ?Sized>(device: &D) -> AppResult<SensorTemperatureStatus> {
    let value = device
        .read_parameter(ParameterId::SensorTemperatureStatus)
        .map_err(|code| DaqError::device("temperature status read", code))?;
    match value {
        ParameterValue::Integer(raw) => SensorTemperatureStatus::from_raw(raw).ok_or_else(|| {
            DaqError::Configuration(format!("unknown temperature status {}", raw))
        }),
        other => Err(DaqError::ValueTypeMismatch {
            parameter: ParameterId::SensorTemperatureStatus,
            expected: ParameterId::SensorTemperatureStatus.value_type(),
            actual: other.value_type(),
        }),
    }
}

/// Read temperature and status. Failures are logged, never raised.
pub fn read_report<D: CameraDevice + ?Sized>(device: &D) -> TemperatureReport {
    let temperature_c = match read_temperature(device) {
        Ok(celsius) => {
            tracing::info!(temperature_c = celsius, "Read sensor temperature: Succeeded");
            Some(celsius)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Read sensor temperature: Failed");
            None
        }
    };
    let status = match read_status(device) {
        Ok(status) => {
            tracing::info!(?status, "Read sensor temperature status: Succeeded");
            Some(status)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Read sensor temperature status: Failed");
            None
        }
    };
    TemperatureReport {
        temperature_c,
        status,
    }
}

/// Block until the sensor reports `Locked`.
pub fn wait_for_lock<D: CameraDevice + ?Sized>(device: &mut D, timeout: PollTimeout) -> AppResult<()> {
    tracing::info!(timeout_ms = timeout.as_millis(), "Waiting for temperature lock");
    device
        .wait_for_status_parameter(
            ParameterId::SensorTemperatureStatus,
            SensorTemperatureStatus::Locked as i32,
            timeout,
        )
        .map_err(|code| DaqError::device("temperature lock wait", code))?;
    tracing::info!("Temperature locked");
    Ok(())
}
