//! Acquisition run orchestration
//!
//! One run: configure the camera, report (and optionally lock) the sensor
//! temperature, acquire the requested readouts into files, close the camera.

use anyhow::{Context, Result};
use daq_core::acquisition::{PollTimeout, ReadoutTarget};
use daq_core::error::AppResult;
use daq_core::parameter::{AdcAnalogGain, ShutterTimingMode};
use daq_driver_picam::{
    AcquisitionSummary, CameraDevice, CameraId, CameraSession, CameraSettings, CommitResult,
    DemoCamera, ReadoutSpeed, SampleCorrelator, TemperatureReport,
};
use daq_storage::{FileSampleSink, WrittenSample};

use crate::config::{AcquireConfig, CameraConfig, StorageConfig};

/// Serial number reported by the demo camera.
pub const DEMO_SERIAL_NUMBER: &str = "12345";

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub camera: CameraId,
    pub commit: CommitResult,
    pub temperature: TemperatureReport,
    pub summary: AcquisitionSummary,
    /// Readouts saved to disk.
    pub saved: u64,
    pub last_written: Option<WrittenSample>,
}

/// Translate operator settings into camera settings.
pub fn camera_settings(config: &CameraConfig) -> AppResult<CameraSettings> {
    Ok(CameraSettings {
        exposure_ms: config.exposure_ms,
        gain: AdcAnalogGain::from_setting(config.gain),
        speed: ReadoutSpeed::from_setting(config.speed),
        shutter: ShutterTimingMode::from_setting(config.shutter)?,
    })
}

/// Open the camera to acquire from.
///
/// No vendor driver is linked, so this is always the demo camera.
pub fn open_camera() -> DemoCamera {
    tracing::info!("No camera detected, opening demo camera");
    DemoCamera::connect(DEMO_SERIAL_NUMBER)
}

pub fn file_sink(storage: &StorageConfig) -> Result<FileSampleSink> {
    Ok(FileSampleSink::create(
        &storage.output_dir,
        storage.image_prefix.clone(),
        storage.parameter_prefix.clone(),
    )?
    .with_precision(storage.temperature_precision, storage.time_precision))
}

/// Configure, report temperature and acquire into files.
///
/// Rejected parameters are logged and the run continues with the values the
/// camera kept.
pub fn execute<D: CameraDevice>(
    session: &mut CameraSession<D>,
    config: &AcquireConfig,
) -> Result<RunReport> {
    let settings = camera_settings(&config.camera)?;
    let commit = session
        .configure(&settings)
        .context("Camera configuration failed")?;
    if !commit.rejected.is_empty() {
        tracing::warn!(
            rejected = commit.rejected.len(),
            "Continuing with previously committed values for rejected parameters"
        );
    }

    let lock = config
        .acquisition
        .wait_for_lock
        .then(|| PollTimeout::from_millis(config.acquisition.lock_timeout_ms));
    let temperature = session.read_temperature(lock);

    let mut sink = file_sink(&config.storage)?;
    let target = ReadoutTarget::from_count(config.acquisition.readout_count);
    let summary = session
        .acquire(target, &SampleCorrelator::new(), &mut sink)
        .context("Acquisition failed")?;

    if let Some(err) = summary.error_report() {
        tracing::warn!(
            error = %err,
            soft_errors = summary.soft_errors,
            "Acquisition reported soft errors"
        );
    }
    tracing::info!(
        delivered = summary.delivered,
        files = sink.saved() * 2,
        output_dir = ?config.storage.output_dir,
        "Acquisition finished"
    );

    Ok(RunReport {
        camera: session.device().camera_id().clone(),
        commit,
        temperature,
        summary,
        saved: sink.saved(),
        last_written: sink.last_written().cloned(),
    })
}

/// Run [`execute`] and close the camera whatever the outcome.
pub fn run_session<D: CameraDevice>(
    mut session: CameraSession<D>,
    config: &AcquireConfig,
) -> Result<RunReport> {
    let report = execute(&mut session, config);
    if let Err(err) = session.close() {
        tracing::warn!(error = %err, "Failed to close camera");
    }
    report
}
