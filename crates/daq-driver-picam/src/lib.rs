//! Picam-style Camera Driver (Componentized)
//!
//! Components:
//! - Device: the driver boundary trait and camera identity
//! - Constraints: capability-set selection
//! - Commit: staging and committing parameters
//! - Acquisition: the capture state machine
//! - Correlator: temperature and timing per readout
//! - Thermal: sensor temperature report and lock wait
//!
//! [`CameraSession`] ties the components to one open camera.

pub mod components;

use daq_core::acquisition::{PollTimeout, ReadoutTarget};
use daq_core::data::SampleSink;
use daq_core::error::{AppResult, DaqError};
use daq_core::parameter::{
    AdcAnalogGain, ParameterId, ParameterStore, ParameterValue, ShutterTimingMode,
};
use serde::{Deserialize, Serialize};

pub use crate::components::acquisition::{
    AcquisitionEngine, AcquisitionState, AcquisitionSummary, StopHandle,
};
pub use crate::components::commit::CommitResult;
pub use crate::components::constraints::SelectionPolicy;
pub use crate::components::correlator::{Clock, SampleCorrelator, SystemClock};
#[cfg(feature = "demo")]
pub use crate::components::demo::DemoCamera;
pub use crate::components::device::{CameraDevice, CameraId};
pub use crate::components::thermal::TemperatureReport;

use crate::components::commit::commit;
use crate::components::constraints::resolve;
use crate::components::thermal;

/// ADC readout speed preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadoutSpeed {
    /// Slowest available speed; lowest read noise.
    #[default]
    Slow,
    /// Fastest available speed; noisier.
    Fast,
}

impl ReadoutSpeed {
    /// Operator setting: 0 = slow, anything else = fast.
    pub fn from_setting(setting: i32) -> Self {
        if setting == 0 {
            ReadoutSpeed::Slow
        } else {
            ReadoutSpeed::Fast
        }
    }

    pub fn policy(self) -> SelectionPolicy {
        match self {
            ReadoutSpeed::Slow => SelectionPolicy::Slowest,
            ReadoutSpeed::Fast => SelectionPolicy::Fastest,
        }
    }
}

/// Exposure and readout settings applied by [`CameraSession::configure`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub exposure_ms: f64,
    pub gain: AdcAnalogGain,
    pub speed: ReadoutSpeed,
    pub shutter: ShutterTimingMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            exposure_ms: 50.0,
            gain: AdcAnalogGain::High,
            speed: ReadoutSpeed::Slow,
            shutter: ShutterTimingMode::Normal,
        }
    }
}

/// One open camera plus its acquisition engine.
///
/// The device is closed when the session is closed or dropped.
pub struct CameraSession<D: CameraDevice> {
    device: D,
    engine: AcquisitionEngine,
    closed: bool,
}

impl<D: CameraDevice> CameraSession<D> {
    pub fn open(device: D, poll_timeout: PollTimeout) -> Self {
        tracing::info!(camera = %device.camera_id(), "Opened camera");
        Self {
            device,
            engine: AcquisitionEngine::new(poll_timeout),
            closed: false,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn state(&self) -> &AcquisitionState {
        self.engine.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.engine.stop_handle()
    }

    /// Stage gain, ADC speed, shutter mode and exposure, then commit.
    ///
    /// Rejected parameters are reported in the result, not as an error; the
    /// camera keeps their previous values. Transport failures are errors.
    pub fn configure(&mut self, settings: &CameraSettings) -> AppResult<CommitResult> {
        let mut store = ParameterStore::new();
        if self
            .device
            .are_parameters_committed()
            .map_err(|code| DaqError::device("commit state query", code))?
        {
            for id in [
                ParameterId::AdcAnalogGain,
                ParameterId::AdcSpeed,
                ParameterId::ShutterTimingMode,
                ParameterId::ExposureTime,
            ] {
                if let Ok(value) = self.device.get_parameter(id) {
                    store.record_committed(id, value);
                }
            }
        }

        store.stage(ParameterId::AdcAnalogGain, settings.gain.as_value())?;
        tracing::info!(gain = ?settings.gain, "Staged analog gain");

        let speed = resolve(&self.device, ParameterId::AdcSpeed, settings.speed.policy())?;
        match settings.speed {
            ReadoutSpeed::Slow => {
                tracing::info!(adc_speed_mhz = %speed, "Setting Adc Speed to slow, less noisy readout speed")
            }
            ReadoutSpeed::Fast => {
                tracing::info!(adc_speed_mhz = %speed, "Setting Adc Speed to fast, noisier readout speed")
            }
        }
        store.stage(ParameterId::AdcSpeed, speed)?;

        store.stage(ParameterId::ShutterTimingMode, settings.shutter.as_value())?;
        tracing::info!(shutter = ?settings.shutter, "Staged shutter timing mode");

        store.stage(
            ParameterId::ExposureTime,
            ParameterValue::FloatingPoint(settings.exposure_ms),
        )?;
        tracing::info!(exposure_ms = settings.exposure_ms, "Staged exposure time");

        match self.device.are_parameters_committed() {
            Ok(true) => tracing::info!("Parameters are committed"),
            Ok(false) => tracing::info!("Parameters are not committed"),
            Err(code) => tracing::warn!(%code, "Failed to query commit state"),
        }

        let result = commit(&mut self.device, &mut store);
        if let Some(code) = result.error {
            return Err(DaqError::CommitFailed(code));
        }
        Ok(result)
    }

    /// Report sensor temperature and status, optionally waiting for lock.
    ///
    /// A failed or timed-out lock wait is logged and the run continues.
    pub fn read_temperature(&mut self, lock: Option<PollTimeout>) -> TemperatureReport {
        let report = thermal::read_report(&self.device);
        match lock {
            Some(timeout) => match thermal::wait_for_lock(&mut self.device, timeout) {
                Ok(()) => thermal::read_report(&self.device),
                Err(err) => {
                    tracing::warn!(error = %err, "Temperature lock wait failed");
                    report
                }
            },
            None => report,
        }
    }

    /// Run one acquisition of `target` readouts into `sink`.
    pub fn acquire<C, S>(
        &mut self,
        target: ReadoutTarget,
        correlator: &SampleCorrelator<C>,
        sink: &mut S,
    ) -> AppResult<AcquisitionSummary>
    where
        C: Clock,
        S: SampleSink + ?Sized,
    {
        self.engine.run(&mut self.device, target, correlator, sink)
    }

    pub fn close(mut self) -> AppResult<()> {
        self.closed = true;
        self.device
            .close()
            .map_err(|code| DaqError::device("close camera", code))
    }
}

impl<D: CameraDevice> Drop for CameraSession<D> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(code) = self.device.close() {
                tracing::warn!(%code, "Failed to close camera on drop");
            }
        }
    }
}
