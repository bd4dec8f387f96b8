//! Error types for camera configuration and acquisition.
//!
//! Two layers of errors exist:
//!
//! - [`DeviceErrorCode`]: the raw status code returned by the camera driver
//!   boundary. Every device call returns [`DeviceResult`]. Codes carry a
//!   human-readable classification through `Display` so that failures can be
//!   reported the way an operator expects ("Failed (Time Out Occurred)").
//! - [`DaqError`]: the application error taxonomy. Device codes are wrapped
//!   with the context of the operation that produced them.
//!
//! ## Propagation Policy
//!
//! | Error                      | Fatal to acquisition loop? |
//! |----------------------------|----------------------------|
//! | `Timeout`                  | No, retried at loop level  |
//! | `Transport`                | Yes, surfaced to caller    |
//! | `AcquisitionMask`          | No, reported               |
//! | `ParametersRejected`       | No, caller decides         |
//! | `UnsupportedParameter`     | Fails the resolve call     |
//! | `TemperatureReadFailed`    | Never thrown, recorded     |

use thiserror::Error;

use crate::acquisition::AcquisitionErrors;
use crate::parameter::{ParameterId, ValueType};

/// Result of a call across the device driver boundary.
pub type DeviceResult<T> = std::result::Result<T, DeviceErrorCode>;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Status code reported by the camera driver.
///
/// The numeric values are the driver's wire codes. Codes the library does not
/// know are preserved in [`DeviceErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorCode {
    LibraryNotInitialized,
    UnexpectedNullPointer,
    UnexpectedError,
    InvalidHandle,
    InvalidCameraId,
    TimeOutOccurred,
    OperationCanceled,
    InvalidOperation,
    InvalidCount,
    AcquisitionInProgress,
    AcquisitionNotInProgress,
    ParameterDoesNotExist,
    ParameterHasInvalidValueType,
    ParameterValueIsReadOnly,
    InvalidParameterValue,
    ParameterHasInvalidConstraintType,
    ParameterIsNotReadable,
    InvalidWaitableStatusParameterValue,
    CameraFaulted,
    DeviceCommunicationFailed,
    DeviceDisconnected,
    Unknown(i32),
}

impl DeviceErrorCode {
    /// Wire code for this error.
    pub fn code(self) -> i32 {
        match self {
            Self::LibraryNotInitialized => 1,
            Self::UnexpectedNullPointer => 3,
            Self::UnexpectedError => 4,
            Self::InvalidHandle => 13,
            Self::InvalidCameraId => 14,
            Self::TimeOutOccurred => 32,
            Self::OperationCanceled => 43,
            Self::InvalidOperation => 42,
            Self::InvalidCount => 39,
            Self::AcquisitionInProgress => 18,
            Self::AcquisitionNotInProgress => 52,
            Self::ParameterDoesNotExist => 11,
            Self::ParameterHasInvalidValueType => 10,
            Self::ParameterValueIsReadOnly => 12,
            Self::InvalidParameterValue => 17,
            Self::ParameterHasInvalidConstraintType => 19,
            Self::ParameterIsNotReadable => 21,
            Self::InvalidWaitableStatusParameterValue => 23,
            Self::CameraFaulted => 6,
            Self::DeviceCommunicationFailed => 7,
            Self::DeviceDisconnected => 44,
            Self::Unknown(code) => code,
        }
    }

    /// Map a raw wire code back to a classified error.
    pub fn from_code(code: i32) -> Self {
        const KNOWN: [DeviceErrorCode; 21] = [
            DeviceErrorCode::LibraryNotInitialized,
            DeviceErrorCode::UnexpectedNullPointer,
            DeviceErrorCode::UnexpectedError,
            DeviceErrorCode::InvalidHandle,
            DeviceErrorCode::InvalidCameraId,
            DeviceErrorCode::TimeOutOccurred,
            DeviceErrorCode::OperationCanceled,
            DeviceErrorCode::InvalidOperation,
            DeviceErrorCode::InvalidCount,
            DeviceErrorCode::AcquisitionInProgress,
            DeviceErrorCode::AcquisitionNotInProgress,
            DeviceErrorCode::ParameterDoesNotExist,
            DeviceErrorCode::ParameterHasInvalidValueType,
            DeviceErrorCode::ParameterValueIsReadOnly,
            DeviceErrorCode::InvalidParameterValue,
            DeviceErrorCode::ParameterHasInvalidConstraintType,
            DeviceErrorCode::ParameterIsNotReadable,
            DeviceErrorCode::InvalidWaitableStatusParameterValue,
            DeviceErrorCode::CameraFaulted,
            DeviceErrorCode::DeviceCommunicationFailed,
            DeviceErrorCode::DeviceDisconnected,
        ];
        KNOWN
            .into_iter()
            .find(|known| known.code() == code)
            .unwrap_or(Self::Unknown(code))
    }

    /// True for the expected idle-poll outcome.
    pub fn is_timeout(self) -> bool {
        matches!(self, Self::TimeOutOccurred)
    }

    /// Human-readable classification, as shown to operators.
    pub fn description(self) -> &'static str {
        match self {
            Self::LibraryNotInitialized => "Library Not Initialized",
            Self::UnexpectedNullPointer => "Unexpected Null Pointer",
            Self::UnexpectedError => "Unexpected Error",
            Self::InvalidHandle => "Invalid Handle",
            Self::InvalidCameraId => "Invalid Camera ID",
            Self::TimeOutOccurred => "Time Out Occurred",
            Self::OperationCanceled => "Operation Canceled",
            Self::InvalidOperation => "Invalid Operation",
            Self::InvalidCount => "Invalid Count",
            Self::AcquisitionInProgress => "Acquisition In Progress",
            Self::AcquisitionNotInProgress => "Acquisition Not In Progress",
            Self::ParameterDoesNotExist => "Parameter Does Not Exist",
            Self::ParameterHasInvalidValueType => "Parameter Has Invalid Value Type",
            Self::ParameterValueIsReadOnly => "Parameter Value Is Read Only",
            Self::InvalidParameterValue => "Invalid Parameter Value",
            Self::ParameterHasInvalidConstraintType => "Parameter Has Invalid Constraint Type",
            Self::ParameterIsNotReadable => "Parameter Is Not Readable",
            Self::InvalidWaitableStatusParameterValue => {
                "Invalid Waitable Status Parameter Value"
            }
            Self::CameraFaulted => "Camera Faulted",
            Self::DeviceCommunicationFailed => "Device Communication Failed",
            Self::DeviceDisconnected => "Device Disconnected",
            Self::Unknown(_) => "Unknown Error",
        }
    }
}

impl std::fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown Error (code {})", code),
            other => write!(f, "{} (code {})", other.description(), other.code()),
        }
    }
}

impl std::error::Error for DeviceErrorCode {}

/// Primary error type for camera configuration and acquisition.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Communication with the camera failed.
    ///
    /// **Error Type**: Fatal for the acquisition loop. The loop transitions to
    /// `Failed` and the last device code is surfaced here.
    #[error("Transport error during {context}: {code}")]
    Transport {
        context: &'static str,
        code: DeviceErrorCode,
    },

    /// A poll returned without data before its deadline.
    ///
    /// **Error Type**: Expected and non-fatal. Retried by the acquisition loop
    /// and only surfaced by single-shot helpers.
    #[error("Timed out waiting for the camera")]
    Timeout,

    /// One or more soft capture-quality errors were flagged by the camera.
    #[error("Acquisition errors occurred: {0}")]
    AcquisitionMask(AcquisitionErrors),

    /// Commit applied only part of the staged configuration.
    ///
    /// **Recovery Strategy**: rejected parameters keep their previously
    /// committed value. Re-query the camera before relying on them.
    #[error("Camera rejected parameters: {}", format_parameters(.0))]
    ParametersRejected(Vec<ParameterId>),

    /// Commit transaction itself failed at the transport level.
    #[error("Commit to hardware failed: {0}")]
    CommitFailed(DeviceErrorCode),

    /// The camera reported an empty capability set for the parameter.
    #[error("Parameter {0} is not supported by this camera")]
    UnsupportedParameter(ParameterId),

    /// Live temperature read failed. Recorded in samples, never propagated
    /// out of the correlator.
    #[error("Temperature reading failed: {0}")]
    TemperatureReadFailed(DeviceErrorCode),

    /// A value of the wrong kind was supplied for a parameter.
    #[error("Parameter {parameter} expects a {expected} value, got {actual}")]
    ValueTypeMismatch {
        parameter: ParameterId,
        expected: ValueType,
        actual: ValueType,
    },

    /// An operation was requested in a state that does not permit it.
    #[error("Invalid acquisition state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// Configuration values parsed but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Persisting a sample failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DaqError {
    /// Wrap a device code raised by `context`.
    ///
    /// Timeouts map to [`DaqError::Timeout`] so callers can treat them apart
    /// from transport failures.
    pub fn device(context: &'static str, code: DeviceErrorCode) -> Self {
        if code.is_timeout() {
            DaqError::Timeout
        } else {
            DaqError::Transport { context, code }
        }
    }

    /// Device code behind this error, if any.
    pub fn device_code(&self) -> Option<DeviceErrorCode> {
        match self {
            DaqError::Transport { code, .. }
            | DaqError::CommitFailed(code)
            | DaqError::TemperatureReadFailed(code) => Some(*code),
            DaqError::Timeout => Some(DeviceErrorCode::TimeOutOccurred),
            _ => None,
        }
    }
}

fn format_parameters(parameters: &[ParameterId]) -> String {
    parameters
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_code_round_trip() {
        for raw in [1, 4, 32, 42, 44, 17, 999] {
            assert_eq!(DeviceErrorCode::from_code(raw).code(), raw);
        }
        assert_eq!(DeviceErrorCode::from_code(32), DeviceErrorCode::TimeOutOccurred);
        assert_eq!(DeviceErrorCode::from_code(999), DeviceErrorCode::Unknown(999));
    }

    #[test]
    fn test_device_code_display() {
        assert_eq!(
            DeviceErrorCode::TimeOutOccurred.to_string(),
            "Time Out Occurred (code 32)"
        );
        assert_eq!(
            DeviceErrorCode::Unknown(77).to_string(),
            "Unknown Error (code 77)"
        );
    }

    #[test]
    fn test_device_helper_separates_timeouts() {
        assert!(matches!(
            DaqError::device("poll", DeviceErrorCode::TimeOutOccurred),
            DaqError::Timeout
        ));
        let err = DaqError::device("poll", DeviceErrorCode::DeviceDisconnected);
        assert_eq!(err.device_code(), Some(DeviceErrorCode::DeviceDisconnected));
        assert!(err.to_string().contains("Transport error during poll"));
    }

    #[test]
    fn test_rejected_parameters_display() {
        let err = DaqError::ParametersRejected(vec![
            ParameterId::AdcSpeed,
            ParameterId::ExposureTime,
        ]);
        assert_eq!(
            err.to_string(),
            "Camera rejected parameters: Adc Speed, Exposure Time"
        );
    }
}
