//! Simulated camera for running without hardware.
//!
//! Models a Pixis 100B class detector: 1340x100 pixels, 16-bit monochrome,
//! two ADC speeds (0.1 MHz and 2 MHz), thermoelectric cooling toward the
//! temperature set point. Staged values are validated at commit time and
//! invalid ones are refused, leaving the previous committed value in place.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use daq_core::acquisition::{AcquisitionStatus, PollTimeout};
use daq_core::error::{DeviceErrorCode, DeviceResult};
use daq_core::parameter::{
    AdcAnalogGain, ParameterId, ParameterValue, PixelFormat, SensorTemperatureStatus,
    ShutterTimingMode,
};

use crate::components::device::{CameraDevice, CameraId};

const AMBIENT_C: f64 = 25.0;
/// Within this distance of the set point the sensor reports `Locked`.
const LOCK_BAND_C: f64 = 0.5;
const MAX_EXPOSURE_MS: f64 = 1.0e7;

struct DemoRun {
    remaining: Option<u64>,
    produced: u64,
    frame_period: Duration,
    next_due: Instant,
    stop_requested: bool,
}

/// Simulated camera implementing [`CameraDevice`].
pub struct DemoCamera {
    id: CameraId,
    width: u32,
    height: u32,
    committed: BTreeMap<ParameterId, ParameterValue>,
    staged: BTreeMap<ParameterId, ParameterValue>,
    cooling_time_constant: Duration,
    opened_at: Instant,
    run: Option<DemoRun>,
    buffer: Vec<u8>,
    closed: bool,
}

impl DemoCamera {
    /// Connect a demo Pixis 100B with the given serial number.
    pub fn connect(serial_number: &str) -> Self {
        let id = CameraId {
            model: "Pixis 100B".to_string(),
            serial_number: serial_number.to_string(),
            sensor_name: "PIXIS: 100B".to_string(),
        };
        tracing::info!(camera = %id, "Connected demo camera");

        let committed = BTreeMap::from([
            (ParameterId::ExposureTime, ParameterValue::FloatingPoint(100.0)),
            (ParameterId::AdcAnalogGain, AdcAnalogGain::Medium.as_value()),
            (ParameterId::AdcSpeed, ParameterValue::FloatingPoint(2.0)),
            (ParameterId::ShutterTimingMode, ShutterTimingMode::Normal.as_value()),
            (ParameterId::ReadoutCount, ParameterValue::LargeInteger(1)),
            (
                ParameterId::SensorTemperatureSetPoint,
                ParameterValue::FloatingPoint(-70.0),
            ),
        ]);

        Self {
            id,
            width: 1340,
            height: 100,
            committed,
            staged: BTreeMap::new(),
            cooling_time_constant: Duration::from_secs(1),
            opened_at: Instant::now(),
            run: None,
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Override the sensor geometry (smaller sensors read out faster).
    pub fn with_sensor_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Override how quickly the sensor cools toward the set point.
    pub fn with_cooling_time_constant(mut self, tau: Duration) -> Self {
        self.cooling_time_constant = tau;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> DeviceResult<()> {
        if self.closed {
            Err(DeviceErrorCode::InvalidHandle)
        } else {
            Ok(())
        }
    }

    fn committed_f64(&self, id: ParameterId, fallback: f64) -> f64 {
        self.committed
            .get(&id)
            .map(ParameterValue::as_f64)
            .unwrap_or(fallback)
    }

    fn stride_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }

    fn set_point(&self) -> f64 {
        self.committed_f64(ParameterId::SensorTemperatureSetPoint, -70.0)
    }

    fn sensor_temperature(&self) -> f64 {
        let set_point = self.set_point();
        let tau = self.cooling_time_constant.as_secs_f64();
        if tau <= 0.0 {
            return set_point;
        }
        let t = self.opened_at.elapsed().as_secs_f64();
        set_point + (AMBIENT_C - set_point) * (-t / tau).exp()
    }

    fn temperature_status(&self) -> SensorTemperatureStatus {
        if (self.sensor_temperature() - self.set_point()).abs() <= LOCK_BAND_C {
            SensorTemperatureStatus::Locked
        } else {
            SensorTemperatureStatus::Unlocked
        }
    }

    /// Time remaining until the sensor settles within the lock band.
    fn time_to_lock(&self) -> Duration {
        let gap = (AMBIENT_C - self.set_point()).abs();
        let tau = self.cooling_time_constant.as_secs_f64();
        if gap <= LOCK_BAND_C || tau <= 0.0 {
            return Duration::ZERO;
        }
        let lock_at = Duration::from_secs_f64(tau * (gap / LOCK_BAND_C).ln());
        lock_at.saturating_sub(self.opened_at.elapsed())
    }

    /// Exposure plus readout time at the committed ADC speed.
    fn frame_period(&self) -> Duration {
        let exposure_ms = self.committed_f64(ParameterId::ExposureTime, 100.0);
        let speed_mhz = self.committed_f64(ParameterId::AdcSpeed, 2.0);
        let pixels = f64::from(self.width) * f64::from(self.height);
        let readout_s = if speed_mhz > 0.0 {
            pixels / (speed_mhz * 1.0e6)
        } else {
            0.0
        };
        Duration::from_secs_f64(exposure_ms / 1000.0 + readout_s)
    }

    fn validate(&self, id: ParameterId, value: ParameterValue) -> bool {
        match id {
            ParameterId::ExposureTime => {
                let ms = value.as_f64();
                ms.is_finite() && (0.0..=MAX_EXPOSURE_MS).contains(&ms)
            }
            ParameterId::ReadoutCount => value.as_i64().is_some_and(|n| n >= 0),
            _ => match self.collection(id) {
                Some(values) => values.contains(&value),
                None => false,
            },
        }
    }

    fn collection(&self, id: ParameterId) -> Option<Vec<ParameterValue>> {
        match id {
            ParameterId::AdcSpeed => Some(vec![
                ParameterValue::FloatingPoint(2.0),
                ParameterValue::FloatingPoint(0.1),
            ]),
            ParameterId::AdcAnalogGain => Some(vec![
                AdcAnalogGain::Low.as_value(),
                AdcAnalogGain::Medium.as_value(),
                AdcAnalogGain::High.as_value(),
            ]),
            ParameterId::ShutterTimingMode => Some(vec![
                ShutterTimingMode::Normal.as_value(),
                ShutterTimingMode::AlwaysClosed.as_value(),
                ShutterTimingMode::AlwaysOpen.as_value(),
            ]),
            ParameterId::SensorTemperatureSetPoint => Some(
                (0..=11)
                    .map(|step| ParameterValue::FloatingPoint(-90.0 + 10.0 * f64::from(step)))
                    .collect(),
            ),
            _ => None,
        }
    }

    fn fill_frame(&mut self, frame_number: u64) {
        let width = self.width as u64;
        let height = self.height as u64;
        self.buffer.clear();
        self.buffer.reserve(self.stride_bytes());
        for y in 0..height {
            for x in 0..width {
                let value = (((x + y + frame_number) % 4096) as u16).saturating_add(100);
                self.buffer.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
}

impl CameraDevice for DemoCamera {
    fn camera_id(&self) -> &CameraId {
        &self.id
    }

    fn get_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        self.ensure_open()?;
        if let Some(value) = self.staged.get(&id) {
            return Ok(*value);
        }
        match id {
            ParameterId::PixelFormat => {
                Ok(ParameterValue::Integer(PixelFormat::Monochrome16Bit as i32))
            }
            ParameterId::PixelBitDepth => Ok(ParameterValue::Integer(16)),
            ParameterId::ReadoutStride | ParameterId::FrameSize => {
                i32::try_from(self.stride_bytes())
                    .map(ParameterValue::Integer)
                    .map_err(|_| DeviceErrorCode::UnexpectedError)
            }
            ParameterId::SensorTemperatureReading | ParameterId::SensorTemperatureStatus => {
                self.read_parameter(id)
            }
            _ => self
                .committed
                .get(&id)
                .copied()
                .ok_or(DeviceErrorCode::ParameterDoesNotExist),
        }
    }

    fn set_parameter(&mut self, id: ParameterId, value: ParameterValue) -> DeviceResult<()> {
        self.ensure_open()?;
        if self.run.is_some() {
            return Err(DeviceErrorCode::AcquisitionInProgress);
        }
        if id.is_read_only() {
            return Err(DeviceErrorCode::ParameterValueIsReadOnly);
        }
        if value.value_type() != id.value_type() {
            return Err(DeviceErrorCode::ParameterHasInvalidValueType);
        }
        if self.committed.get(&id) == Some(&value) {
            self.staged.remove(&id);
        } else {
            self.staged.insert(id, value);
        }
        Ok(())
    }

    fn capability_set(&self, id: ParameterId) -> DeviceResult<Vec<ParameterValue>> {
        self.ensure_open()?;
        self.collection(id)
            .ok_or(DeviceErrorCode::ParameterHasInvalidConstraintType)
    }

    fn are_parameters_committed(&self) -> DeviceResult<bool> {
        self.ensure_open()?;
        Ok(self.staged.is_empty())
    }

    fn commit_parameters(&mut self) -> DeviceResult<Vec<ParameterId>> {
        self.ensure_open()?;
        if self.run.is_some() {
            return Err(DeviceErrorCode::AcquisitionInProgress);
        }
        let staged = std::mem::take(&mut self.staged);
        let mut rejected = Vec::new();
        for (id, value) in staged {
            if self.validate(id, value) {
                self.committed.insert(id, value);
            } else {
                rejected.push(id);
            }
        }
        Ok(rejected)
    }

    fn start_acquisition(&mut self) -> DeviceResult<()> {
        self.ensure_open()?;
        if self.run.is_some() {
            return Err(DeviceErrorCode::AcquisitionInProgress);
        }
        if !self.staged.is_empty() {
            return Err(DeviceErrorCode::InvalidOperation);
        }
        let count = self
            .committed
            .get(&ParameterId::ReadoutCount)
            .and_then(ParameterValue::as_i64)
            .unwrap_or(1);
        let frame_period = self.frame_period();
        self.run = Some(DemoRun {
            remaining: u64::try_from(count).ok().filter(|n| *n > 0),
            produced: 0,
            frame_period,
            next_due: Instant::now() + frame_period,
            stop_requested: false,
        });
        self.buffer.clear();
        Ok(())
    }

    fn stop_acquisition(&mut self) -> DeviceResult<()> {
        self.ensure_open()?;
        if let Some(run) = self.run.as_mut() {
            run.stop_requested = true;
        }
        Ok(())
    }

    fn wait_for_acquisition_update(
        &mut self,
        timeout: PollTimeout,
    ) -> DeviceResult<AcquisitionStatus> {
        self.ensure_open()?;
        self.buffer.clear();
        let run = self
            .run
            .as_mut()
            .ok_or(DeviceErrorCode::AcquisitionNotInProgress)?;

        if run.stop_requested || run.remaining == Some(0) {
            self.run = None;
            return Ok(AcquisitionStatus::default());
        }

        let now = Instant::now();
        let wait = run.next_due.saturating_duration_since(now);
        if let PollTimeout::Bounded(limit) = timeout {
            if limit < wait {
                thread::sleep(limit);
                return Err(DeviceErrorCode::TimeOutOccurred);
            }
        }
        thread::sleep(wait);

        run.next_due += run.frame_period;
        run.produced += 1;
        if let Some(remaining) = run.remaining.as_mut() {
            *remaining -= 1;
        }
        let running = run.remaining != Some(0);
        let frame_number = run.produced;
        let readout_rate = 1.0 / run.frame_period.as_secs_f64().max(f64::EPSILON);
        if !running {
            self.run = None;
        }

        self.fill_frame(frame_number);
        Ok(AcquisitionStatus {
            running,
            errors: Default::default(),
            readout_rate,
            readout_count: 1,
        })
    }

    fn available_data(&self) -> &[u8] {
        &self.buffer
    }

    fn read_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        self.ensure_open()?;
        match id {
            ParameterId::SensorTemperatureReading => {
                Ok(ParameterValue::FloatingPoint(self.sensor_temperature()))
            }
            ParameterId::SensorTemperatureStatus => {
                Ok(ParameterValue::Integer(self.temperature_status() as i32))
            }
            _ => self
                .committed
                .get(&id)
                .copied()
                .ok_or(DeviceErrorCode::ParameterIsNotReadable),
        }
    }

    fn wait_for_status_parameter(
        &mut self,
        id: ParameterId,
        target: i32,
        timeout: PollTimeout,
    ) -> DeviceResult<()> {
        self.ensure_open()?;
        if id != ParameterId::SensorTemperatureStatus
            || target != SensorTemperatureStatus::Locked as i32
        {
            return Err(DeviceErrorCode::InvalidWaitableStatusParameterValue);
        }
        let remaining = self.time_to_lock();
        match timeout {
            PollTimeout::Bounded(limit) if limit < remaining => {
                thread::sleep(limit);
                Err(DeviceErrorCode::TimeOutOccurred)
            }
            _ => {
                thread::sleep(remaining);
                Ok(())
            }
        }
    }

    fn close(&mut self) -> DeviceResult<()> {
        if self.closed {
            return Ok(());
        }
        self.run = None;
        self.buffer.clear();
        self.closed = true;
        tracing::info!(camera = %self.id, "Closed demo camera");
        Ok(())
    }
}
