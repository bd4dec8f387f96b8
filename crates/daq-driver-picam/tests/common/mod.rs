//! Shared test utilities for driver integration tests.
//!
//! - `ScriptedCamera`: a `CameraDevice` whose poll results come from a queue
//! - `RecordingSink`: a `SampleSink` that copies every sample it receives
//! - `SteppingClock`: a clock that advances a fixed step per reading

#![allow(dead_code)] // Utilities may not all be used in every test file

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use daq_core::acquisition::{AcquisitionErrors, AcquisitionStatus, PollTimeout};
use daq_core::data::{CorrelatedSample, SampleSink, Temperature};
use daq_core::error::{DeviceErrorCode, DeviceResult};
use daq_core::parameter::{ParameterId, ParameterValue, PixelFormat};
use daq_driver_picam::{CameraDevice, CameraId, Clock, StopHandle};

/// One scripted answer to `wait_for_acquisition_update`.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedPoll {
    Update { running: bool, readouts: usize },
    Errors { running: bool, errors: AcquisitionErrors },
    Timeout,
    Transport(DeviceErrorCode),
}

pub fn update(running: bool, readouts: usize) -> ScriptedPoll {
    ScriptedPoll::Update { running, readouts }
}

/// Camera double driven by a poll script.
///
/// Readout `n` (1-based across the run) is filled with the byte `n as u8`.
/// Once stopped, or once the script runs dry, polls report a finished stream.
pub struct ScriptedCamera {
    id: CameraId,
    pub committed: BTreeMap<ParameterId, ParameterValue>,
    pub staged: BTreeMap<ParameterId, ParameterValue>,
    pub capabilities: BTreeMap<ParameterId, Vec<ParameterValue>>,
    /// Parameters refused by `set_parameter`.
    pub refuse_on_set: Vec<ParameterId>,
    /// Parameters reported invalid by `commit_parameters`.
    pub refuse_on_commit: Vec<ParameterId>,
    pub commit_error: Option<DeviceErrorCode>,
    pub stop_error: Option<DeviceErrorCode>,
    pub script: VecDeque<ScriptedPoll>,
    pub stride: usize,
    /// Temperature reads (1-based) that fail.
    pub failing_temperature_reads: Vec<usize>,
    pub lock_result: DeviceResult<()>,
    /// Poll (1-based) whose buffer holds only half of its readout bytes.
    pub truncated_poll: Option<usize>,
    /// Request a stop through this handle once `polls` reaches the count.
    pub stop_after: Option<(usize, StopHandle)>,

    pub polls: usize,
    pub set_calls: Vec<(ParameterId, ParameterValue)>,
    pub commit_calls: usize,
    pub starts: usize,
    pub stops: usize,
    pub closed: bool,
    temperature_reads: Cell<usize>,
    produced: usize,
    stopped: bool,
    buffer: Vec<u8>,
}

impl ScriptedCamera {
    pub fn new(script: impl IntoIterator<Item = ScriptedPoll>) -> Self {
        Self {
            id: CameraId {
                model: "Scripted".to_string(),
                serial_number: "0001".to_string(),
                sensor_name: "Test Sensor".to_string(),
            },
            committed: BTreeMap::from([
                (ParameterId::ExposureTime, ParameterValue::FloatingPoint(100.0)),
                (ParameterId::AdcSpeed, ParameterValue::FloatingPoint(2.0)),
                (ParameterId::ReadoutCount, ParameterValue::LargeInteger(1)),
            ]),
            staged: BTreeMap::new(),
            capabilities: BTreeMap::from([(
                ParameterId::AdcSpeed,
                vec![
                    ParameterValue::FloatingPoint(1.0),
                    ParameterValue::FloatingPoint(0.1),
                    ParameterValue::FloatingPoint(2.0),
                    ParameterValue::FloatingPoint(0.5),
                ],
            )]),
            refuse_on_set: Vec::new(),
            refuse_on_commit: Vec::new(),
            commit_error: None,
            stop_error: None,
            script: script.into_iter().collect(),
            stride: 8,
            failing_temperature_reads: Vec::new(),
            lock_result: Ok(()),
            truncated_poll: None,
            stop_after: None,
            polls: 0,
            set_calls: Vec::new(),
            commit_calls: 0,
            starts: 0,
            stops: 0,
            closed: false,
            temperature_reads: Cell::new(0),
            produced: 0,
            stopped: false,
            buffer: Vec::new(),
        }
    }

    /// Camera with an empty poll script.
    pub fn idle() -> Self {
        Self::new(Vec::<ScriptedPoll>::new())
    }

    pub fn temperature_reads(&self) -> usize {
        self.temperature_reads.get()
    }

    fn fill(&mut self, readouts: usize) {
        self.buffer.clear();
        for _ in 0..readouts {
            self.produced += 1;
            let byte = (self.produced % 256) as u8;
            self.buffer.extend(std::iter::repeat(byte).take(self.stride));
        }
        if self.truncated_poll == Some(self.polls) {
            self.buffer.truncate(self.buffer.len() / 2);
        }
    }
}

impl CameraDevice for ScriptedCamera {
    fn camera_id(&self) -> &CameraId {
        &self.id
    }

    fn get_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        match id {
            ParameterId::ReadoutStride => Ok(ParameterValue::Integer(self.stride as i32)),
            ParameterId::PixelFormat => Ok(ParameterValue::Integer(
                PixelFormat::Monochrome16Bit as i32,
            )),
            ParameterId::PixelBitDepth => Ok(ParameterValue::Integer(16)),
            _ => self
                .staged
                .get(&id)
                .or_else(|| self.committed.get(&id))
                .copied()
                .ok_or(DeviceErrorCode::ParameterDoesNotExist),
        }
    }

    fn set_parameter(&mut self, id: ParameterId, value: ParameterValue) -> DeviceResult<()> {
        self.set_calls.push((id, value));
        if self.refuse_on_set.contains(&id) {
            return Err(DeviceErrorCode::InvalidParameterValue);
        }
        self.staged.insert(id, value);
        Ok(())
    }

    fn capability_set(&self, id: ParameterId) -> DeviceResult<Vec<ParameterValue>> {
        self.capabilities
            .get(&id)
            .cloned()
            .ok_or(DeviceErrorCode::ParameterHasInvalidConstraintType)
    }

    fn are_parameters_committed(&self) -> DeviceResult<bool> {
        Ok(self.staged.is_empty())
    }

    fn commit_parameters(&mut self) -> DeviceResult<Vec<ParameterId>> {
        self.commit_calls += 1;
        if let Some(code) = self.commit_error {
            return Err(code);
        }
        let staged = std::mem::take(&mut self.staged);
        let mut rejected = Vec::new();
        for (id, value) in staged {
            if self.refuse_on_commit.contains(&id) {
                rejected.push(id);
            } else {
                self.committed.insert(id, value);
            }
        }
        Ok(rejected)
    }

    fn start_acquisition(&mut self) -> DeviceResult<()> {
        self.starts += 1;
        self.stopped = false;
        Ok(())
    }

    fn stop_acquisition(&mut self) -> DeviceResult<()> {
        self.stops += 1;
        if let Some(code) = self.stop_error {
            return Err(code);
        }
        self.stopped = true;
        Ok(())
    }

    fn wait_for_acquisition_update(
        &mut self,
        _timeout: PollTimeout,
    ) -> DeviceResult<AcquisitionStatus> {
        self.polls += 1;
        self.buffer.clear();
        if let Some((after, handle)) = &self.stop_after {
            if self.polls >= *after {
                handle.request_stop();
            }
        }
        if self.stopped {
            return Ok(AcquisitionStatus::default());
        }
        match self.script.pop_front() {
            None => Ok(AcquisitionStatus::default()),
            Some(ScriptedPoll::Timeout) => Err(DeviceErrorCode::TimeOutOccurred),
            Some(ScriptedPoll::Transport(code)) => Err(code),
            Some(ScriptedPoll::Errors { running, errors }) => {
                self.fill(1);
                Ok(AcquisitionStatus {
                    running,
                    errors,
                    readout_rate: 0.0,
                    readout_count: 1,
                })
            }
            Some(ScriptedPoll::Update { running, readouts }) => {
                self.fill(readouts);
                Ok(AcquisitionStatus {
                    running,
                    errors: AcquisitionErrors::empty(),
                    readout_rate: 10.0,
                    readout_count: readouts,
                })
            }
        }
    }

    fn available_data(&self) -> &[u8] {
        &self.buffer
    }

    fn read_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        match id {
            ParameterId::SensorTemperatureReading => {
                let n = self.temperature_reads.get() + 1;
                self.temperature_reads.set(n);
                if self.failing_temperature_reads.contains(&n) {
                    Err(DeviceErrorCode::DeviceCommunicationFailed)
                } else {
                    Ok(ParameterValue::FloatingPoint(-70.0))
                }
            }
            ParameterId::SensorTemperatureStatus => Ok(ParameterValue::Integer(2)),
            _ => self.get_parameter(id),
        }
    }

    fn wait_for_status_parameter(
        &mut self,
        _id: ParameterId,
        _target: i32,
        _timeout: PollTimeout,
    ) -> DeviceResult<()> {
        self.lock_result
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Owned copy of a correlated sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSample {
    pub index: u64,
    pub data: Vec<u8>,
    pub temperature: Temperature,
    pub run_started: DateTime<Utc>,
    pub arrived: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub samples: Vec<RecordedSample>,
    /// Fail when asked to consume this readout index.
    pub fail_at: Option<u64>,
}

impl SampleSink for RecordingSink {
    fn consume(&mut self, sample: &CorrelatedSample<'_>) -> anyhow::Result<()> {
        if self.fail_at == Some(sample.readout.index) {
            anyhow::bail!("disk full");
        }
        self.samples.push(RecordedSample {
            index: sample.readout.index,
            data: sample.readout.data().to_vec(),
            temperature: sample.temperature,
            run_started: sample.run_started,
            arrived: sample.arrived,
        });
        Ok(())
    }
}

/// Clock starting at a fixed instant and advancing 1 ms per reading.
#[derive(Debug)]
pub struct SteppingClock {
    next: Cell<DateTime<Utc>>,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            next: Cell::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.next.get();
        self.next.set(now + ChronoDuration::milliseconds(1));
        now
    }
}
