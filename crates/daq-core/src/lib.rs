//! `daq-core`
//!
//! Core types shared by the picam-daq crates.
//!
//! ## Key Types
//!
//! - [`ParameterStore`](parameter::ParameterStore): staged configuration with commit tracking
//! - [`DeviceErrorCode`](error::DeviceErrorCode): classified device status codes
//! - [`DaqError`](error::DaqError): application error taxonomy
//! - [`Readout`](data::Readout) / [`CorrelatedSample`](data::CorrelatedSample): per-readout data
//! - [`SampleSink`](data::SampleSink): consumer seam between acquisition and persistence
//!
//! The driver and storage crates both depend on this crate and never on each
//! other.

pub mod acquisition;
pub mod data;
pub mod error;
pub mod parameter;

pub use acquisition::{AcquisitionErrors, AcquisitionStatus, PollTimeout, ReadoutTarget};
pub use data::{CorrelatedSample, Readout, SampleSink, Temperature};
pub use error::{AppResult, DaqError, DeviceErrorCode, DeviceResult};
pub use parameter::{ParameterId, ParameterStore, ParameterValue, ValueType};
