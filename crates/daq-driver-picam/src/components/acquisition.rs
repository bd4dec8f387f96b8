//! Acquisition Engine
//!
//! Drives one asynchronous capture stream from start to a terminal state.
//!
//! ```text
//! Idle ──► Starting ──► Running ──► (Draining) ──► Stopped
//!              │           │             │
//!              └───────────┴─────────────┴──────► Failed
//! ```
//!
//! Every state change goes through [`transition`], a pure function of the
//! current state, one [`Event`] and the readout target. The engine loop only
//! performs the side effects the transition asks for: delivering readouts,
//! reporting soft errors and halting the stream when entering `Draining`.
//!
//! Readouts are delivered synchronously between polls. The borrowed readout
//! bytes cannot survive into the next poll (see
//! [`CameraDevice`](crate::components::device::CameraDevice)).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use daq_core::acquisition::{AcquisitionErrors, AcquisitionStatus, PollTimeout, ReadoutTarget};
use daq_core::data::{Readout, SampleSink};
use daq_core::error::{AppResult, DaqError, DeviceErrorCode, DeviceResult};
use daq_core::parameter::{ParameterId, ParameterStore, ParameterValue, PixelFormat};

use crate::components::commit::commit;
use crate::components::correlator::{Clock, SampleCorrelator};
use crate::components::device::CameraDevice;

/// Thread-safe stop request, honoured between polls.
///
/// A poll blocked with an infinite timeout is not interrupted; the request
/// takes effect once that poll returns.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport or hardware error reported by the camera.
    Device(DeviceErrorCode),
    /// Commit at start refused parameters.
    Rejected(Vec<ParameterId>),
    /// Host-side failure, e.g. the sample sink.
    Aborted(String),
}

impl FailureReason {
    fn from_error(err: &DaqError) -> Self {
        match err {
            DaqError::ParametersRejected(ids) => FailureReason::Rejected(ids.clone()),
            other => match other.device_code() {
                Some(code) => FailureReason::Device(code),
                None => FailureReason::Aborted(other.to_string()),
            },
        }
    }

    fn into_error(self, context: &'static str) -> DaqError {
        match self {
            FailureReason::Device(code) => DaqError::device(context, code),
            FailureReason::Rejected(ids) => DaqError::ParametersRejected(ids),
            FailureReason::Aborted(message) => DaqError::Persistence(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Starting,
    Running { delivered: u64 },
    /// Stop was requested or the target was met while hardware still runs.
    Draining { delivered: u64 },
    Stopped { delivered: u64 },
    Failed { delivered: u64, reason: FailureReason },
}

impl AcquisitionState {
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "Idle",
            AcquisitionState::Starting => "Starting",
            AcquisitionState::Running { .. } => "Running",
            AcquisitionState::Draining { .. } => "Draining",
            AcquisitionState::Stopped { .. } => "Stopped",
            AcquisitionState::Failed { .. } => "Failed",
        }
    }

    pub fn delivered(&self) -> u64 {
        match self {
            AcquisitionState::Idle | AcquisitionState::Starting => 0,
            AcquisitionState::Running { delivered }
            | AcquisitionState::Draining { delivered }
            | AcquisitionState::Stopped { delivered }
            | AcquisitionState::Failed { delivered, .. } => *delivered,
        }
    }

    /// States in which the engine polls.
    pub fn is_polling(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Running { .. } | AcquisitionState::Draining { .. }
        )
    }

    fn with_delivered(&self, delivered: u64) -> Self {
        match self {
            AcquisitionState::Running { .. } => AcquisitionState::Running { delivered },
            AcquisitionState::Draining { .. } => AcquisitionState::Draining { delivered },
            AcquisitionState::Stopped { .. } => AcquisitionState::Stopped { delivered },
            other => other.clone(),
        }
    }
}

/// Classification of one poll result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Transport(DeviceErrorCode),
    TimedOut,
    Update(AcquisitionStatus),
}

impl PollOutcome {
    pub fn classify(result: DeviceResult<AcquisitionStatus>) -> Self {
        match result {
            Ok(status) => PollOutcome::Update(status),
            Err(code) if code.is_timeout() => PollOutcome::TimedOut,
            Err(code) => PollOutcome::Transport(code),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin,
    Started,
    StartFailed(FailureReason),
    StopRequested,
    Poll(PollOutcome),
    /// The camera failed outside a poll, e.g. refusing to stop or handing
    /// over a truncated buffer.
    DeviceFault(DeviceErrorCode),
    /// The sink failed after `delivered` readouts in total were consumed.
    SinkFailed { delivered: u64, message: String },
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    None,
    /// Timeout with no data; poll again.
    Retry,
    /// Soft acquisition errors to report.
    Report(AcquisitionErrors),
    /// Hand `count` readouts to the correlator. `discarded` readouts beyond
    /// the target are dropped.
    Deliver { count: usize, discarded: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: AcquisitionState,
    pub action: PollAction,
}

impl Transition {
    fn to(next: AcquisitionState) -> Self {
        Self {
            next,
            action: PollAction::None,
        }
    }
}

/// The acquisition state machine.
///
/// Returns `None` when `event` is not valid in `state`.
pub fn transition(
    state: &AcquisitionState,
    event: &Event,
    target: ReadoutTarget,
) -> Option<Transition> {
    use AcquisitionState::*;

    match (state, event) {
        (Idle | Stopped { .. } | Failed { .. }, Event::Begin) => Some(Transition::to(Starting)),
        (Starting, Event::Started) => Some(Transition::to(Running { delivered: 0 })),
        (Starting, Event::StartFailed(reason)) => Some(Transition::to(Failed {
            delivered: 0,
            reason: reason.clone(),
        })),
        (Starting, Event::StopRequested) => Some(Transition::to(Stopped { delivered: 0 })),
        (Running { delivered }, Event::StopRequested) => Some(Transition::to(Draining {
            delivered: *delivered,
        })),
        (Draining { .. }, Event::StopRequested) => Some(Transition::to(state.clone())),
        (Running { .. } | Draining { .. }, Event::SinkFailed { delivered, message }) => {
            Some(Transition::to(Failed {
                delivered: *delivered,
                reason: FailureReason::Aborted(message.clone()),
            }))
        }
        (Running { delivered } | Draining { delivered }, Event::DeviceFault(code)) => {
            Some(Transition::to(Failed {
                delivered: *delivered,
                reason: FailureReason::Device(*code),
            }))
        }
        (Running { delivered } | Draining { delivered }, Event::Poll(outcome)) => {
            Some(on_poll(state, *delivered, outcome, target))
        }
        _ => None,
    }
}

fn on_poll(
    state: &AcquisitionState,
    delivered: u64,
    outcome: &PollOutcome,
    target: ReadoutTarget,
) -> Transition {
    match outcome {
        PollOutcome::Transport(code) => Transition::to(AcquisitionState::Failed {
            delivered,
            reason: FailureReason::Device(*code),
        }),
        PollOutcome::TimedOut => Transition {
            next: state.clone(),
            action: PollAction::Retry,
        },
        PollOutcome::Update(status) if !status.errors.is_empty() => Transition {
            next: if status.running {
                state.clone()
            } else {
                AcquisitionState::Stopped { delivered }
            },
            action: PollAction::Report(status.errors),
        },
        PollOutcome::Update(status) => {
            let available = status.readout_count;
            let count = match target {
                ReadoutTarget::Finite(n) => {
                    let remaining = n.saturating_sub(delivered);
                    available.min(usize::try_from(remaining).unwrap_or(usize::MAX))
                }
                ReadoutTarget::Unbounded => available,
            };
            let total = delivered + count as u64;
            let next = if !status.running {
                AcquisitionState::Stopped { delivered: total }
            } else if target.is_satisfied_by(total) {
                AcquisitionState::Draining { delivered: total }
            } else {
                state.with_delivered(total)
            };
            Transition {
                next,
                action: PollAction::Deliver {
                    count,
                    discarded: available - count,
                },
            }
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSummary {
    pub delivered: u64,
    pub polls: u64,
    pub timeouts: u64,
    /// Updates that carried soft errors.
    pub soft_errors: u64,
    /// Every soft error flag seen during the run.
    pub errors: AcquisitionErrors,
    pub run_started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl AcquisitionSummary {
    /// The soft errors of the run as an error value, if any were flagged.
    pub fn error_report(&self) -> Option<DaqError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(DaqError::AcquisitionMask(self.errors))
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StreamLayout {
    stride: usize,
    format: Option<(PixelFormat, u32)>,
}

impl StreamLayout {
    /// Bytes per readout for an update carrying `count` readouts.
    ///
    /// `None` when the device buffer cannot hold `count` whole readouts.
    fn stride_for(&self, available: usize, count: usize) -> Option<usize> {
        if count == 0 {
            return Some(self.stride);
        }
        let stride = if self.stride > 0 {
            self.stride
        } else {
            available / count
        };
        (stride > 0 && available >= stride * count).then_some(stride)
    }
}

pub struct AcquisitionEngine {
    state: AcquisitionState,
    timeout: PollTimeout,
    stop: StopHandle,
    polls: u64,
    timeouts: u64,
    soft_errors: u64,
    errors: AcquisitionErrors,
}

impl AcquisitionEngine {
    pub fn new(timeout: PollTimeout) -> Self {
        Self {
            state: AcquisitionState::Idle,
            timeout,
            stop: StopHandle::default(),
            polls: 0,
            timeouts: 0,
            soft_errors: 0,
            errors: AcquisitionErrors::empty(),
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn apply(&mut self, event: Event, target: ReadoutTarget) -> AppResult<PollAction> {
        let t = transition(&self.state, &event, target).ok_or(DaqError::InvalidState {
            expected: "a state accepting this event",
            found: self.state.name(),
        })?;
        tracing::trace!(from = self.state.name(), to = t.next.name(), ?event, "Transition");
        self.state = t.next;
        Ok(t.action)
    }

    /// Start a capture stream and poll it until `Stopped` or `Failed`.
    ///
    /// Every delivered readout is correlated and handed to `sink` before the
    /// next poll is issued. A stop requested before the call ends the run
    /// without starting the stream. The stop request is cleared once the run
    /// has reached a terminal state.
    pub fn run<D, C, S>(
        &mut self,
        device: &mut D,
        target: ReadoutTarget,
        correlator: &SampleCorrelator<C>,
        sink: &mut S,
    ) -> AppResult<AcquisitionSummary>
    where
        D: CameraDevice + ?Sized,
        C: Clock,
        S: SampleSink + ?Sized,
    {
        self.apply(Event::Begin, target)?;
        self.polls = 0;
        self.timeouts = 0;
        self.soft_errors = 0;
        self.errors = AcquisitionErrors::empty();

        let result = self.drive(device, target, correlator, sink);
        self.stop.reset();
        result
    }

    fn drive<D, C, S>(
        &mut self,
        device: &mut D,
        target: ReadoutTarget,
        correlator: &SampleCorrelator<C>,
        sink: &mut S,
    ) -> AppResult<AcquisitionSummary>
    where
        D: CameraDevice + ?Sized,
        C: Clock,
        S: SampleSink + ?Sized,
    {
        if self.stop.is_requested() {
            tracing::info!("Stop requested before acquisition start");
            self.apply(Event::StopRequested, target)?;
            let now = correlator.now();
            return Ok(self.summary(0, now, now));
        }

        let layout = match Self::start_stream(device, target) {
            Ok(layout) => layout,
            Err(err) => {
                tracing::error!(error = %err, "Acquisition start: Failed");
                self.apply(Event::StartFailed(FailureReason::from_error(&err)), target)?;
                return Err(err);
            }
        };
        let run_started = correlator.now();
        self.apply(Event::Started, target)?;
        tracing::info!(target = target.as_count(), timeout_ms = self.timeout.as_millis(), "Acquisition start: Succeeded");

        while self.state.is_polling() {
            if self.stop.is_requested() && matches!(self.state, AcquisitionState::Running { .. }) {
                tracing::info!("Stop requested");
                self.apply(Event::StopRequested, target)?;
                self.halt_stream(device, target)?;
                continue;
            }

            let outcome = PollOutcome::classify(device.wait_for_acquisition_update(self.timeout));
            self.polls += 1;

            let was_running = matches!(self.state, AcquisitionState::Running { .. });
            let delivered_before = self.state.delivered();
            let Some(t) = transition(&self.state, &Event::Poll(outcome), target) else {
                break;
            };

            match t.action {
                PollAction::None => {}
                PollAction::Retry => {
                    self.timeouts += 1;
                    tracing::trace!(polls = self.polls, "Poll timed out, retrying");
                }
                PollAction::Report(errors) => {
                    self.soft_errors += 1;
                    self.errors |= errors;
                    tracing::warn!(%errors, "The following acquisition errors occurred");
                }
                PollAction::Deliver { count, discarded } => {
                    let available = device.available_data().len();
                    let Some(stride) = layout.stride_for(available, count) else {
                        tracing::error!(count, available, stride = layout.stride, "Readout buffer shorter than the reported readouts");
                        self.apply(Event::DeviceFault(DeviceErrorCode::UnexpectedError), target)?;
                        continue;
                    };
                    if discarded > 0 {
                        tracing::warn!(discarded, "Discarding readouts beyond the requested target");
                    }
                    if let Err((consumed, err)) = Self::deliver(
                        &*device,
                        count,
                        stride,
                        delivered_before,
                        layout,
                        correlator,
                        run_started,
                        &mut *sink,
                    ) {
                        tracing::error!(error = %err, "Sample sink failed, aborting acquisition");
                        self.apply(
                            Event::SinkFailed {
                                delivered: delivered_before + consumed as u64,
                                message: err.to_string(),
                            },
                            target,
                        )?;
                        Self::stop_quietly(device);
                        return Err(err);
                    }
                }
            }

            if let PollOutcome::Transport(code) = outcome {
                tracing::error!(%code, "Acquisition failed");
            }
            let entering_drain = was_running && matches!(t.next, AcquisitionState::Draining { .. });
            self.state = t.next;
            if entering_drain {
                self.halt_stream(device, target)?;
            }
        }

        let finished = correlator.now();
        match self.state.clone() {
            AcquisitionState::Stopped { delivered } => {
                if let ReadoutTarget::Finite(n) = target {
                    if delivered < n {
                        tracing::warn!(delivered, requested = n, "Camera stopped before the requested readout count");
                    }
                }
                tracing::info!(delivered, polls = self.polls, timeouts = self.timeouts, "Acquisition complete");
                Ok(self.summary(delivered, run_started, finished))
            }
            AcquisitionState::Failed { reason, .. } => {
                Self::stop_quietly(device);
                Err(reason.into_error("acquisition update"))
            }
            other => Err(DaqError::InvalidState {
                expected: "Stopped",
                found: other.name(),
            }),
        }
    }

    fn summary(
        &self,
        delivered: u64,
        run_started: DateTime<Utc>,
        finished: DateTime<Utc>,
    ) -> AcquisitionSummary {
        AcquisitionSummary {
            delivered,
            polls: self.polls,
            timeouts: self.timeouts,
            soft_errors: self.soft_errors,
            errors: self.errors,
            run_started,
            finished,
        }
    }

    /// Commit pending configuration including the readout count, then start.
    fn start_stream<D: CameraDevice + ?Sized>(
        device: &mut D,
        target: ReadoutTarget,
    ) -> AppResult<StreamLayout> {
        let mut store = ParameterStore::new();
        if let Ok(current) = device.get_parameter(ParameterId::ReadoutCount) {
            store.record_committed(ParameterId::ReadoutCount, current);
        }
        store.stage(
            ParameterId::ReadoutCount,
            ParameterValue::LargeInteger(target.as_count()),
        )?;
        commit(device, &mut store).into_result()?;

        let stride = device
            .get_parameter(ParameterId::ReadoutStride)
            .map_err(|code| DaqError::device("readout stride query", code))?
            .as_i64()
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or(0);
        let format = device
            .get_parameter(ParameterId::PixelFormat)
            .ok()
            .and_then(|v| v.as_i32())
            .and_then(PixelFormat::from_raw)
            .zip(
                device
                    .get_parameter(ParameterId::PixelBitDepth)
                    .ok()
                    .and_then(|v| v.as_i32())
                    .and_then(|b| u32::try_from(b).ok()),
            );

        device
            .start_acquisition()
            .map_err(|code| DaqError::device("start acquisition", code))?;
        Ok(StreamLayout { stride, format })
    }

    /// Ask hardware to stop; a transport failure here fails the run.
    fn halt_stream<D: CameraDevice + ?Sized>(
        &mut self,
        device: &mut D,
        target: ReadoutTarget,
    ) -> AppResult<()> {
        match device.stop_acquisition() {
            Ok(()) => {
                tracing::debug!(delivered = self.state.delivered(), target = target.as_count(), "Draining stream");
            }
            Err(code) => {
                tracing::error!(%code, "Stop acquisition: Failed");
                self.apply(Event::DeviceFault(code), target)?;
            }
        }
        Ok(())
    }

    fn stop_quietly<D: CameraDevice + ?Sized>(device: &mut D) {
        if let Err(code) = device.stop_acquisition() {
            tracing::debug!(%code, "Stop after failure was refused");
        }
    }

    /// Correlate and consume `count` readouts of `stride` bytes each.
    ///
    /// On sink failure returns how many readouts were consumed first.
    #[allow(clippy::too_many_arguments)]
    fn deliver<D, C, S>(
        device: &D,
        count: usize,
        stride: usize,
        delivered_before: u64,
        layout: StreamLayout,
        correlator: &SampleCorrelator<C>,
        run_started: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<(), (usize, DaqError)>
    where
        D: CameraDevice + ?Sized,
        C: Clock,
        S: SampleSink + ?Sized,
    {
        let data = device.available_data();
        for (i, bytes) in data.chunks_exact(stride).take(count).enumerate() {
            let readout = Readout::new(delivered_before + i as u64 + 1, bytes);
            if let Some(mean) = layout
                .format
                .and_then(|(format, depth)| readout.mean_intensity(format, depth))
            {
                tracing::info!(readout = readout.index, mean, "Mean Intensity: {:.1}", mean);
            }
            let sample = correlator.correlate(device, readout, run_started);
            sink.consume(&sample)
                .map_err(|e| (i, DaqError::Persistence(format!("{e:#}"))))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(running: bool, readouts: usize) -> Event {
        Event::Poll(PollOutcome::Update(AcquisitionStatus {
            running,
            errors: AcquisitionErrors::empty(),
            readout_rate: 10.0,
            readout_count: readouts,
        }))
    }

    fn running(delivered: u64) -> AcquisitionState {
        AcquisitionState::Running { delivered }
    }

    #[test]
    fn test_transport_error_fails() {
        let t = transition(
            &running(2),
            &Event::Poll(PollOutcome::Transport(DeviceErrorCode::DeviceDisconnected)),
            ReadoutTarget::Finite(5),
        )
        .unwrap();
        assert_eq!(
            t.next,
            AcquisitionState::Failed {
                delivered: 2,
                reason: FailureReason::Device(DeviceErrorCode::DeviceDisconnected)
            }
        );
        assert_eq!(t.action, PollAction::None);
    }

    #[test]
    fn test_timeout_retries_in_place() {
        let t = transition(
            &running(1),
            &Event::Poll(PollOutcome::TimedOut),
            ReadoutTarget::Finite(5),
        )
        .unwrap();
        assert_eq!(t.next, running(1));
        assert_eq!(t.action, PollAction::Retry);
    }

    #[test]
    fn test_soft_errors_keep_running_stream() {
        let errors = AcquisitionErrors::DATA_LOST;
        let status = |running| {
            Event::Poll(PollOutcome::Update(AcquisitionStatus {
                running,
                errors,
                readout_rate: 0.0,
                readout_count: 1,
            }))
        };
        let t = transition(&running(0), &status(true), ReadoutTarget::Finite(2)).unwrap();
        assert_eq!(t.next, running(0));
        assert_eq!(t.action, PollAction::Report(errors));

        let t = transition(&running(0), &status(false), ReadoutTarget::Finite(2)).unwrap();
        assert_eq!(t.next, AcquisitionState::Stopped { delivered: 0 });
    }

    #[test]
    fn test_clean_update_delivers() {
        let t = transition(&running(1), &update(true, 2), ReadoutTarget::Finite(5)).unwrap();
        assert_eq!(t.next, running(3));
        assert_eq!(t.action, PollAction::Deliver { count: 2, discarded: 0 });
    }

    #[test]
    fn test_final_update_stops() {
        let t = transition(&running(2), &update(false, 1), ReadoutTarget::Finite(3)).unwrap();
        assert_eq!(t.next, AcquisitionState::Stopped { delivered: 3 });
    }

    #[test]
    fn test_target_met_while_running_drains() {
        let t = transition(&running(2), &update(true, 3), ReadoutTarget::Finite(3)).unwrap();
        assert_eq!(t.next, AcquisitionState::Draining { delivered: 3 });
        assert_eq!(t.action, PollAction::Deliver { count: 1, discarded: 2 });
    }

    #[test]
    fn test_unbounded_never_drains_on_its_own() {
        let t = transition(&running(1_000), &update(true, 4), ReadoutTarget::Unbounded).unwrap();
        assert_eq!(t.next, running(1_004));
    }

    #[test]
    fn test_stop_request_drains() {
        let t = transition(&running(4), &Event::StopRequested, ReadoutTarget::Unbounded).unwrap();
        assert_eq!(t.next, AcquisitionState::Draining { delivered: 4 });
        let t = transition(&t.next, &update(false, 0), ReadoutTarget::Unbounded).unwrap();
        assert_eq!(t.next, AcquisitionState::Stopped { delivered: 4 });
    }

    #[test]
    fn test_stop_before_start_ends_run() {
        let t = transition(
            &AcquisitionState::Starting,
            &Event::StopRequested,
            ReadoutTarget::Unbounded,
        )
        .unwrap();
        assert_eq!(t.next, AcquisitionState::Stopped { delivered: 0 });
    }

    #[test]
    fn test_device_fault_fails_from_draining() {
        let t = transition(
            &AcquisitionState::Draining { delivered: 3 },
            &Event::DeviceFault(DeviceErrorCode::CameraFaulted),
            ReadoutTarget::Finite(3),
        )
        .unwrap();
        assert_eq!(
            t.next,
            AcquisitionState::Failed {
                delivered: 3,
                reason: FailureReason::Device(DeviceErrorCode::CameraFaulted)
            }
        );
    }

    #[test]
    fn test_stride_for_rejects_short_buffers() {
        let layout = StreamLayout {
            stride: 8,
            format: None,
        };
        assert_eq!(layout.stride_for(24, 3), Some(8));
        assert_eq!(layout.stride_for(23, 3), None);
        assert_eq!(layout.stride_for(0, 1), None);

        let unknown = StreamLayout {
            stride: 0,
            format: None,
        };
        assert_eq!(unknown.stride_for(12, 2), Some(6));
        assert_eq!(unknown.stride_for(0, 2), None);
    }

    #[test]
    fn test_invalid_events_rejected() {
        assert!(transition(&AcquisitionState::Idle, &update(true, 1), ReadoutTarget::Unbounded).is_none());
        assert!(transition(&running(0), &Event::Begin, ReadoutTarget::Unbounded).is_none());
        assert!(transition(
            &AcquisitionState::Failed {
                delivered: 0,
                reason: FailureReason::Aborted("x".into())
            },
            &Event::Poll(PollOutcome::TimedOut),
            ReadoutTarget::Unbounded
        )
        .is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            PollOutcome::classify(Err(DeviceErrorCode::TimeOutOccurred)),
            PollOutcome::TimedOut
        );
        assert_eq!(
            PollOutcome::classify(Err(DeviceErrorCode::CameraFaulted)),
            PollOutcome::Transport(DeviceErrorCode::CameraFaulted)
        );
    }

    #[test]
    fn test_stop_handle_shared() {
        let engine = AcquisitionEngine::new(PollTimeout::Infinite);
        let handle = engine.stop_handle();
        handle.request_stop();
        assert!(engine.stop_handle().is_requested());
    }
}
