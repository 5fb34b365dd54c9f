//! Camera access for the fiber viewing camera.
//!
//! - The SDK capability the controller drives: [`CameraDriver`]
//! - A hardware-free implementation: [`SimulatedCamera`]
//! - Camera and frame data: [`CameraState`], [`Frame`], [`ExposureRequest`]

mod driver;
mod simulated;
mod types;

pub use driver::{CameraDriver, DriverError};
pub use simulated::{CaptureRecord, SimulatedCamera, SimulatedFailures};
pub use types::{CameraState, ExposureRequest, ExposureType, Frame, ParamRange, Resolution};
