//! Vendor camera SDK capability consumed by the exposure controller.

use super::types::ParamRange;

/// Errors reported by a camera driver call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// The device handle was never opened or has been closed
    #[error("camera not found or not opened")]
    NotOpened,
    /// An SDK call returned an error status
    #[error("{call} failed: {message}")]
    CallFailed { call: &'static str, message: String },
}

impl DriverError {
    pub fn call_failed(call: &'static str, message: impl Into<String>) -> Self {
        DriverError::CallFailed {
            call,
            message: message.into(),
        }
    }
}

/// Blocking camera SDK operations addressed by device index.
///
/// Every call may fail with a driver-defined error; callers treat failures
/// uniformly and never retry.
pub trait CameraDriver: Send {
    /// Open the device and configure 16-bit raw readout.
    fn open(&mut self, id: u32) -> Result<(), DriverError>;

    /// Release the device. Closing an unopened device is not an error.
    fn close(&mut self, id: u32) -> Result<(), DriverError>;

    fn device_name(&self, id: u32) -> Result<String, DriverError>;

    fn device_serial(&self, id: u32) -> Result<String, DriverError>;

    /// Exposure time in microseconds.
    fn set_exposure_time(&mut self, id: u32, micros: u32) -> Result<(), DriverError>;

    /// Current, minimum and maximum exposure time in microseconds.
    fn exposure_time(&self, id: u32) -> Result<ParamRange<u32>, DriverError>;

    /// Gain in decibels.
    fn set_gain(&mut self, id: u32, db: f64) -> Result<(), DriverError>;

    /// Current, minimum and maximum gain in decibels.
    fn gain(&self, id: u32) -> Result<ParamRange<f64>, DriverError>;

    /// Acquire `frame_count` frames and return their pixel-wise sum
    /// (row-major, 16-bit wrapping accumulation).
    fn capture(&mut self, id: u32, frame_count: u32) -> Result<Vec<u16>, DriverError>;
}
