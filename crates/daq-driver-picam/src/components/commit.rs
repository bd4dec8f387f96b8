//! Commit Protocol
//!
//! Pushes the dirty entries of a [`ParameterStore`] to the camera and commits
//! them in one transaction. Hardware may refuse some values; those stay dirty
//! in the store and keep their previously committed value on the device.

use daq_core::error::{AppResult, DaqError, DeviceErrorCode};
use daq_core::parameter::{ParameterId, ParameterStore};

use crate::components::device::CameraDevice;

/// Outcome of a commit attempt.
///
/// A transport failure and a rejection set can both be present: values can be
/// refused while staging and the final transaction can still fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    pub rejected: Vec<ParameterId>,
    pub error: Option<DeviceErrorCode>,
}

impl CommitResult {
    pub fn is_success(&self) -> bool {
        self.rejected.is_empty() && self.error.is_none()
    }

    /// Transport failures take precedence over rejections.
    pub fn into_result(self) -> AppResult<()> {
        if let Some(code) = self.error {
            return Err(DaqError::CommitFailed(code));
        }
        if !self.rejected.is_empty() {
            return Err(DaqError::ParametersRejected(self.rejected));
        }
        Ok(())
    }
}

/// Codes meaning the camera refused the value itself, as opposed to a
/// communication failure.
fn is_value_refusal(code: DeviceErrorCode) -> bool {
    matches!(
        code,
        DeviceErrorCode::InvalidParameterValue
            | DeviceErrorCode::ParameterHasInvalidValueType
            | DeviceErrorCode::ParameterValueIsReadOnly
            | DeviceErrorCode::ParameterDoesNotExist
    )
}

/// Stage every dirty parameter on the device and commit.
pub fn commit<D: CameraDevice + ?Sized>(device: &mut D, store: &mut ParameterStore) -> CommitResult {
    let dirty = store.dirty();
    let device_committed = match device.are_parameters_committed() {
        Ok(committed) => committed,
        Err(code) => {
            tracing::error!(%code, "Failed to query commit state");
            return CommitResult {
                rejected: Vec::new(),
                error: Some(code),
            };
        }
    };

    if dirty.is_empty() && device_committed {
        tracing::debug!("Parameters have not changed");
        return CommitResult::default();
    }

    let mut result = CommitResult::default();
    for (id, value) in &dirty {
        match device.set_parameter(*id, *value) {
            Ok(()) => tracing::info!(parameter = %id, %value, "Set parameter: Succeeded"),
            Err(code) if is_value_refusal(code) => {
                tracing::warn!(parameter = %id, %value, %code, "Set parameter: Failed");
                result.rejected.push(*id);
            }
            Err(code) => {
                tracing::error!(parameter = %id, %code, "Set parameter: Failed");
                result.error = Some(code);
                return result;
            }
        }
    }
    tracing::info!(count = dirty.len(), "Parameters have been modified");

    match device.commit_parameters() {
        Ok(refused) => {
            for id in refused {
                if !result.rejected.contains(&id) {
                    result.rejected.push(id);
                }
            }
            let accepted: Vec<ParameterId> = dirty
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| !result.rejected.contains(id))
                .collect();
            store.mark_committed(&accepted);

            if result.rejected.is_empty() {
                tracing::info!("Commit to hardware: Succeeded");
            } else {
                tracing::warn!("Commit to hardware: the following parameters are invalid");
                for id in &result.rejected {
                    tracing::warn!("    {}", id);
                }
            }
        }
        Err(code) => {
            tracing::error!(%code, "Commit to hardware: Failed");
            result.error = Some(code);
        }
    }
    result
}
