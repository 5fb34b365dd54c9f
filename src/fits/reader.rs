//! Read-back of single-HDU 16-bit FITS images with checksum verification.

use std::path::Path;

use super::checksum;
use super::header::{Header, Value, BLOCK_LEN};
use crate::camera::Resolution;
use crate::error::StorageError;

/// A decoded primary image.
#[derive(Debug, Clone)]
pub struct FitsImage {
    pub header: Header,
    pub resolution: Resolution,
    /// Row-major samples with BZERO/BSCALE applied
    pub pixels: Vec<u16>,
}

impl FitsImage {
    /// Read and verify an image file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let bytes = std::fs::read(path).map_err(|e| StorageError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Decode a 16-bit, two-axis primary HDU. When CHECKSUM/DATASUM cards
    /// are present they must match the contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let (header, header_len) = Header::parse(bytes)?;

        if header.get_bool("SIMPLE") != Some(true) {
            return Err(StorageError::Format("not a FITS primary header".to_string()));
        }
        let bitpix = require_int(&header, "BITPIX")?;
        if bitpix != 16 {
            return Err(StorageError::Format(format!("unsupported BITPIX {}", bitpix)));
        }
        let naxis = require_int(&header, "NAXIS")?;
        if naxis != 2 {
            return Err(StorageError::Format(format!("unsupported NAXIS {}", naxis)));
        }
        let width = dimension(&header, "NAXIS1")?;
        let height = dimension(&header, "NAXIS2")?;
        let resolution = Resolution { width, height };

        let data_end = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| count.checked_mul(2))
            .and_then(|len| header_len.checked_add(len))
            .ok_or_else(|| {
                StorageError::Format(format!("image size {}x{} too large", width, height))
            })?;
        let data = bytes
            .get(header_len..data_end)
            .ok_or_else(|| StorageError::Format("truncated data unit".to_string()))?;

        if header.get("CHECKSUM").is_some() {
            // The data fits in memory, so its padded length cannot overflow
            let padded_end = header_len + data.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
            let unit = bytes.get(header_len..padded_end).unwrap_or(data);
            verify(&header, &bytes[..header_len], unit)?;
        }

        let bzero = header.get_float("BZERO").unwrap_or(0.0);
        let bscale = header.get_float("BSCALE").unwrap_or(1.0);
        let mut pixels = Vec::with_capacity(data.len() / 2);
        for sample in data.chunks_exact(2) {
            let raw = i16::from_be_bytes([sample[0], sample[1]]);
            let value = f64::from(raw) * bscale + bzero;
            if !(0.0..=65535.0).contains(&value) {
                return Err(StorageError::Format(format!(
                    "sample {} outside unsigned 16-bit range",
                    value
                )));
            }
            pixels.push(value as u16);
        }

        Ok(Self {
            header,
            resolution,
            pixels,
        })
    }
}

fn require_int(header: &Header, keyword: &str) -> Result<i64, StorageError> {
    header
        .get_int(keyword)
        .ok_or_else(|| StorageError::Format(format!("missing {} card", keyword)))
}

fn dimension(header: &Header, keyword: &str) -> Result<u32, StorageError> {
    let value = require_int(header, keyword)?;
    u32::try_from(value)
        .map_err(|_| StorageError::Format(format!("invalid {} {}", keyword, value)))
}

fn verify(header: &Header, header_bytes: &[u8], data: &[u8]) -> Result<(), StorageError> {
    let data_sum = checksum::checksum(data);
    if let Some(Value::Text(recorded)) = header.get("DATASUM") {
        let recorded: u32 = recorded
            .parse()
            .map_err(|_| StorageError::Format(format!("invalid DATASUM '{}'", recorded)))?;
        if recorded != data_sum {
            return Err(StorageError::ChecksumMismatch {
                expected: recorded,
                actual: data_sum,
            });
        }
    }

    let hdu_sum = checksum::add(checksum::checksum(header_bytes), data_sum);
    if hdu_sum != checksum::VALID_SUM {
        return Err(StorageError::ChecksumMismatch {
            expected: checksum::VALID_SUM,
            actual: hdu_sum,
        });
    }
    Ok(())
}
