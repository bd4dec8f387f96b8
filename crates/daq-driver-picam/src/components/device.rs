//! Camera Driver Boundary
//!
//! Every interaction with camera hardware goes through [`CameraDevice`].
//! Implementations wrap a vendor SDK handle or, for development without
//! hardware, the simulated [`DemoCamera`](crate::components::demo::DemoCamera).
//!
//! ## Buffer Lending
//!
//! [`CameraDevice::wait_for_acquisition_update`] takes `&mut self` while
//! [`CameraDevice::available_data`] returns a slice borrowed from `&self`.
//! Readout bytes therefore cannot outlive the next poll: the borrow checker
//! rejects any attempt to hold them across it. Live reads such as the sensor
//! temperature also take `&self`, so they can be issued while a readout is
//! still borrowed.

use daq_core::acquisition::{AcquisitionStatus, PollTimeout};
use daq_core::error::DeviceResult;
use daq_core::parameter::{ParameterId, ParameterValue};

/// Identity of an opened camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraId {
    pub model: String,
    pub serial_number: String,
    pub sensor_name: String,
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (SN:{}) [{}]",
            self.model, self.serial_number, self.sensor_name
        )
    }
}

/// Operations offered by a camera driver.
pub trait CameraDevice {
    /// Identity of the opened camera.
    fn camera_id(&self) -> &CameraId;

    /// Current value of a parameter, including uncommitted changes.
    fn get_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue>;

    /// Stage a value on the device. Takes effect at the next commit.
    fn set_parameter(&mut self, id: ParameterId, value: ParameterValue) -> DeviceResult<()>;

    /// Admissible values for a parameter, queried live from hardware.
    ///
    /// An empty set means the camera does not support the parameter.
    fn capability_set(&self, id: ParameterId) -> DeviceResult<Vec<ParameterValue>>;

    /// Whether every staged value has been applied to hardware.
    fn are_parameters_committed(&self) -> DeviceResult<bool>;

    /// Apply all staged values in one transaction.
    ///
    /// Returns the parameters hardware refused. Refused parameters keep their
    /// previously committed value.
    fn commit_parameters(&mut self) -> DeviceResult<Vec<ParameterId>>;

    /// Start an asynchronous capture stream using the committed configuration.
    fn start_acquisition(&mut self) -> DeviceResult<()>;

    /// Ask the stream to stop. The stream reports `running == false` on a
    /// subsequent update.
    fn stop_acquisition(&mut self) -> DeviceResult<()>;

    /// Block until data arrives, the stream changes status, or `timeout`
    /// elapses (`DeviceErrorCode::TimeOutOccurred`).
    fn wait_for_acquisition_update(&mut self, timeout: PollTimeout)
        -> DeviceResult<AcquisitionStatus>;

    /// Bytes delivered by the most recent update: `readout_count` readouts,
    /// each `ReadoutStride` bytes long. Invalidated by the next poll.
    fn available_data(&self) -> &[u8];

    /// Read a value directly from hardware, bypassing the commit state.
    fn read_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue>;

    /// Block until a status parameter reaches `target` or `timeout` elapses.
    fn wait_for_status_parameter(
        &mut self,
        id: ParameterId,
        target: i32,
        timeout: PollTimeout,
    ) -> DeviceResult<()>;

    /// Release the camera. Further calls fail with `InvalidHandle`.
    fn close(&mut self) -> DeviceResult<()>;
}

impl<D: CameraDevice + ?Sized> CameraDevice for Box<D> {
    fn camera_id(&self) -> &CameraId {
        (**self).camera_id()
    }

    fn get_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        (**self).get_parameter(id)
    }

    fn set_parameter(&mut self, id: ParameterId, value: ParameterValue) -> DeviceResult<()> {
        (**self).set_parameter(id, value)
    }

    fn capability_set(&self, id: ParameterId) -> DeviceResult<Vec<ParameterValue>> {
        (**self).capability_set(id)
    }

    fn are_parameters_committed(&self) -> DeviceResult<bool> {
        (**self).are_parameters_committed()
    }

    fn commit_parameters(&mut self) -> DeviceResult<Vec<ParameterId>> {
        (**self).commit_parameters()
    }

    fn start_acquisition(&mut self) -> DeviceResult<()> {
        (**self).start_acquisition()
    }

    fn stop_acquisition(&mut self) -> DeviceResult<()> {
        (**self).stop_acquisition()
    }

    fn wait_for_acquisition_update(
        &mut self,
        timeout: PollTimeout,
    ) -> DeviceResult<AcquisitionStatus> {
        (**self).wait_for_acquisition_update(timeout)
    }

    fn available_data(&self) -> &[u8] {
        (**self).available_data()
    }

    fn read_parameter(&self, id: ParameterId) -> DeviceResult<ParameterValue> {
        (**self).read_parameter(id)
    }

    fn wait_for_status_parameter(
        &mut self,
        id: ParameterId,
        target: i32,
        timeout: PollTimeout,
    ) -> DeviceResult<()> {
        (**self).wait_for_status_parameter(id, target, timeout)
    }

    fn close(&mut self) -> DeviceResult<()> {
        (**self).close()
    }
}
