//! Error types for camera control and frame storage.
//!
//! `FvcError` is what a command fails with. Each variant keeps the structured
//! cause; turning it into reply text happens only in the command layer.

use std::path::PathBuf;

use crate::camera::DriverError;

/// Convenience alias for results using the actor error type.
pub type FvcResult<T> = std::result::Result<T, FvcError>;

#[derive(Debug, thiserror::Error)]
pub enum FvcError {
    /// Opening or configuring the camera failed
    #[error("camera device error: {0}")]
    Device(#[source] DriverError),

    /// A capture call failed
    #[error("exposure failed: {0}")]
    Capture(#[source] DriverError),

    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("camera is not connected")]
    NotConnected,

    /// Another camera command is still in flight
    #[error("camera busy: another command is in progress")]
    Busy,
}

/// A requested exposure time or gain outside the device limits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutOfRange {
    #[error("exposure time too small {requested} < {min}")]
    ExposureTooSmall { requested: i64, min: u32 },

    #[error("exposure time too large {requested} > {max}")]
    ExposureTooLarge { requested: i64, max: u32 },

    #[error("gain too small {requested:.2} < {min:.2}")]
    GainTooSmall { requested: f64, min: f64 },

    #[error("gain too large {requested:.2} > {max:.2}")]
    GainTooLarge { requested: f64, max: f64 },
}

/// Failures creating, writing or reading image files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create data directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no image available")]
    NoData,

    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid FITS file: {0}")]
    Format(String),

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_messages() {
        let err = OutOfRange::ExposureTooLarge {
            requested: 2_000_000,
            max: 1_000_000,
        };
        assert_eq!(err.to_string(), "exposure time too large 2000000 > 1000000");

        let err = OutOfRange::ExposureTooSmall {
            requested: 5,
            min: 10,
        };
        assert_eq!(err.to_string(), "exposure time too small 5 < 10");

        let err = OutOfRange::GainTooSmall {
            requested: -1.0,
            min: 0.0,
        };
        assert_eq!(err.to_string(), "gain too small -1.00 < 0.00");

        let err = OutOfRange::GainTooLarge {
            requested: 30.0,
            max: 24.0,
        };
        assert_eq!(err.to_string(), "gain too large 30.00 > 24.00");
    }

    #[test]
    fn test_fvc_error_is_transparent_for_range() {
        let err: FvcError = OutOfRange::GainTooLarge {
            requested: 30.0,
            max: 24.0,
        }
        .into();
        assert_eq!(err.to_string(), "gain too large 30.00 > 24.00");
    }

    #[test]
    fn test_device_error_display() {
        let err = FvcError::Device(DriverError::NotOpened);
        assert_eq!(
            err.to_string(),
            "camera device error: camera not found or not opened"
        );
        let err = FvcError::Capture(DriverError::call_failed("xiGetImage", "timeout"));
        assert_eq!(err.to_string(), "exposure failed: xiGetImage failed: timeout");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::CreateDir {
            path: PathBuf::from("/data/fvc"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/fvc"));
        assert!(msg.contains("denied"));
        assert_eq!(StorageError::NoData.to_string(), "no image available");
    }
}
