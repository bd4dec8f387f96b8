//! Constraint Resolver
//!
//! Picks a value for a parameter from the capability set the camera reports.
//! Read-only: nothing is staged or committed here.

use daq_core::error::{AppResult, DaqError};
use daq_core::parameter::{ParameterId, ParameterValue};

use crate::components::device::CameraDevice;

/// How to choose among admissible values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionPolicy {
    /// Smallest value (for ADC speed: slow, low-noise readout).
    Slowest,
    /// Largest value (for ADC speed: fast, noisier readout).
    Fastest,
    /// Value closest to the target; earliest wins ties.
    NearestTo(f64),
}

/// Query the capability set for `id` and select a value under `policy`.
///
/// Fails with [`DaqError::UnsupportedParameter`] when the set is empty.
pub fn resolve<D: CameraDevice + ?Sized>(
    device: &D,
    id: ParameterId,
    policy: SelectionPolicy,
) -> AppResult<ParameterValue> {
    let capabilities = device
        .capability_set(id)
        .map_err(|code| DaqError::device("capability query", code))?;
    tracing::debug!(parameter = %id, count = capabilities.len(), "Acquired collection constraint");
    select(&capabilities, policy).ok_or(DaqError::UnsupportedParameter(id))
}

/// Running-extremum reduction over a capability set.
///
/// NaN entries are never selected.
pub fn select(capabilities: &[ParameterValue], policy: SelectionPolicy) -> Option<ParameterValue> {
    let mut candidates = capabilities.iter().copied().filter(|v| !v.as_f64().is_nan());
    let first = candidates.next()?;
    let best = candidates.fold(first, |best, candidate| {
        let better = match policy {
            SelectionPolicy::Slowest => candidate.as_f64() < best.as_f64(),
            SelectionPolicy::Fastest => candidate.as_f64() > best.as_f64(),
            SelectionPolicy::NearestTo(target) => {
                (candidate.as_f64() - target).abs() < (best.as_f64() - target).abs()
            }
        };
        if better {
            candidate
        } else {
            best
        }
    });
    Some(best)
}
