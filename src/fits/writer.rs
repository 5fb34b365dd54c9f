//! Frame persistence as single-HDU FITS images.

use std::path::{Path, PathBuf};

use super::checksum::{self, ZERO_CHECKSUM};
use super::header::{Card, Header, Value, BLOCK_LEN};
use crate::camera::{CameraState, Frame};
use crate::error::StorageError;

/// Offset that maps unsigned 16-bit samples onto FITS signed 16-bit integers.
pub const UINT16_BZERO: i64 = 32768;

/// Writes frames with their camera metadata, overwriting existing files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageWriter;

impl ImageWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `frame` to `path` with DATE, INSTRUME, EXPTIME, NFRAME, GAIN,
    /// IMTYPE, CHECKSUM and DATASUM cards.
    ///
    /// An empty frame is refused without touching the filesystem. The file is
    /// written next to `path` and renamed into place, so a failed write never
    /// leaves a partial image under the final name.
    pub fn write(&self, path: &Path, frame: &Frame, state: &CameraState) -> Result<(), StorageError> {
        if frame.pixels.is_empty() {
            log::warn!("No image available, not writing {}", path.display());
            return Err(StorageError::NoData);
        }
        if frame.pixels.len() != frame.resolution.pixel_count() {
            return Err(StorageError::Format(format!(
                "frame has {} samples, expected {}x{}",
                frame.pixels.len(),
                frame.resolution.width,
                frame.resolution.height
            )));
        }

        let bytes = encode(frame, state);
        let staging = staging_path(path);
        std::fs::write(&staging, &bytes).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            StorageError::Write {
                path: staging.clone(),
                source: e,
            }
        })?;
        std::fs::rename(&staging, path).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            StorageError::Write {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Primary header for `frame`, with placeholder checksum cards.
pub fn build_header(frame: &Frame, state: &CameraState) -> Header {
    let mut header = Header::new();
    header.push(Card::new("SIMPLE", Value::Logical(true), "conforms to FITS standard"));
    header.push(Card::new("BITPIX", Value::Integer(16), "array data type"));
    header.push(Card::new("NAXIS", Value::Integer(2), "number of array dimensions"));
    header.push(Card::new("NAXIS1", Value::Integer(i64::from(frame.resolution.width)), ""));
    header.push(Card::new("NAXIS2", Value::Integer(i64::from(frame.resolution.height)), ""));
    header.push(Card::new("EXTEND", Value::Logical(true), ""));
    header.push(Card::new("BSCALE", Value::Integer(1), ""));
    header.push(Card::new("BZERO", Value::Integer(UINT16_BZERO), ""));
    header.push(Card::new(
        "DATE",
        Value::Text(frame.timestamp.clone()),
        "file creation date (local)",
    ));
    header.push(Card::new(
        "INSTRUME",
        Value::Text(state.instrument()),
        "instrument used to acquire image",
    ));
    header.push(Card::new(
        "EXPTIME",
        Value::Integer(i64::from(state.exposure_time_for(frame.exposure_type))),
        "exposure time (us)",
    ));
    header.push(Card::new(
        "NFRAME",
        Value::Integer(i64::from(frame.frame_count)),
        "number of frames",
    ));
    header.push(Card::new("GAIN", Value::Float(state.gain_db), "gain in db"));
    header.push(Card::new(
        "IMTYPE",
        Value::Text(frame.exposure_type.as_str().to_string()),
        "exposure type",
    ));
    header.push(Card::new(
        "CHECKSUM",
        Value::Text(ZERO_CHECKSUM.to_string()),
        "HDU checksum",
    ));
    header.push(Card::new("DATASUM", Value::Text("0".to_string()), "data unit checksum"));
    header
}

/// Big-endian signed samples (unsigned shifted by BZERO), zero-padded to a block.
pub fn encode_data(pixels: &[u16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(pixels.len() * 2 + BLOCK_LEN);
    for &p in pixels {
        data.extend_from_slice(&(p ^ 0x8000).to_be_bytes());
    }
    let padded = data.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
    data.resize(padded, 0);
    data
}

/// Complete FITS file contents for `frame`.
pub fn encode(frame: &Frame, state: &CameraState) -> Vec<u8> {
    let data = encode_data(&frame.pixels);
    let data_sum = checksum::checksum(&data);

    let mut header = build_header(frame, state);
    header.set("DATASUM", Value::Text(data_sum.to_string()));
    let hdu_sum = checksum::add(checksum::checksum(&header.to_bytes()), data_sum);
    header.set("CHECKSUM", Value::Text(checksum::encode(!hdu_sum)));

    let mut bytes = header.to_bytes();
    bytes.extend_from_slice(&data);
    bytes
}
