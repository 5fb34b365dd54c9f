//! Output path allocation for exposures.
//!
//! Files land in `<data_root>/fvc/FVC_<type>_<NNNNNN>.fits`. The sequence
//! number is process-wide, starts at 1 and is never reused, even when the
//! directory cannot be created.

use std::path::PathBuf;

use crate::camera::ExposureType;
use crate::error::StorageError;

/// Subdirectory of the data root that holds camera images.
pub const SUBDIR: &str = "fvc";

/// Monotonic exposure sequence number, starting at 0 before the first exposure.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    value: u64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value.
    pub fn next(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    /// Last value handed out (0 if none).
    pub fn current(&self) -> u64 {
        self.value
    }
}

/// Produces a unique FITS path per exposure.
#[derive(Debug)]
pub struct FilenameAllocator {
    data_root: PathBuf,
    counter: SequenceCounter,
}

impl FilenameAllocator {
    /// Create an allocator rooted at an already resolved data directory.
    /// Does not create anything on disk until the first `next()`.
    pub fn new(data_root: PathBuf) -> Self {
        Self {
            data_root,
            counter: SequenceCounter::new(),
        }
    }

    /// Directory the images are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.data_root.join(SUBDIR)
    }

    pub fn last_sequence(&self) -> u64 {
        self.counter.current()
    }

    /// Allocate the next path, creating the output directory if needed.
    ///
    /// The sequence number is consumed before the directory is created, so a
    /// failed call still advances it.
    pub fn next(&mut self, exposure_type: ExposureType) -> Result<PathBuf, StorageError> {
        let sequence = self.counter.next();
        let dir = self.output_dir();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        let path = dir.join(file_name(exposure_type, sequence));
        log::debug!("Allocated sequence {} -> {}", sequence, path.display());
        Ok(path)
    }
}

/// `FVC_<type>_<sequence zero-padded to 6 digits>.fits`
pub fn file_name(exposure_type: ExposureType, sequence: u64) -> String {
    format!("FVC_{}_{:06}.fits", exposure_type.as_str(), sequence)
}
