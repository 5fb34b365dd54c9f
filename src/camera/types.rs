//! Camera types and data structures.

use std::fmt;
use std::str::FromStr;

/// Sensor resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Fixed readout of the fiber viewing camera sensor (1280 columns x 1024 rows).
    pub const SENSOR: Resolution = Resolution {
        width: 1280,
        height: 1024,
    };

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::SENSOR
    }
}

/// A device parameter reading: current value plus the device limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange<T> {
    pub current: T,
    pub min: T,
    pub max: T,
}

/// Kind of exposure requested from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureType {
    /// Single frame at the minimum exposure time
    Bias,
    /// Science frame at the configured exposure time and gain
    Object,
    /// Synthetic frame, no hardware access
    Test,
}

impl ExposureType {
    /// Name used on the command line, in filenames and in the IMTYPE card.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureType::Bias => "bias",
            ExposureType::Object => "object",
            ExposureType::Test => "test",
        }
    }
}

impl fmt::Display for ExposureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExposureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bias" => Ok(ExposureType::Bias),
            "object" => Ok(ExposureType::Object),
            "test" => Ok(ExposureType::Test),
            other => Err(format!(
                "Unknown exposure type '{}'. Available types: bias, object, test",
                other
            )),
        }
    }
}

/// One exposure command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureRequest {
    pub exposure_type: ExposureType,
    pub frame_count: u32,
}

impl ExposureRequest {
    /// Build a request. Bias and test exposures always carry a frame count of 0.
    pub fn new(exposure_type: ExposureType, frame_count: u32) -> Self {
        let frame_count = match exposure_type {
            ExposureType::Object => frame_count,
            ExposureType::Bias | ExposureType::Test => 0,
        };
        Self {
            exposure_type,
            frame_count,
        }
    }
}

/// Camera identity and configuration, read at connect time.
///
/// After a successful connect `min <= current <= max` holds for both the
/// exposure time and the gain; only the controller's validated setters mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub device_name: String,
    pub device_serial: String,
    pub exposure_time_us: u32,
    pub min_exposure_time_us: u32,
    pub max_exposure_time_us: u32,
    pub gain_db: f64,
    pub min_gain_db: f64,
    pub max_gain_db: f64,
}

impl CameraState {
    /// Instrument identity string written into the INSTRUME card.
    pub fn instrument(&self) -> String {
        format!("{} SN{}", self.device_name, self.device_serial)
    }

    /// Exposure time recorded for a frame of the given type: the configured
    /// time for object frames, the minimum for bias frames, 0 for test frames.
    pub fn exposure_time_for(&self, exposure_type: ExposureType) -> u32 {
        match exposure_type {
            ExposureType::Object => self.exposure_time_us,
            ExposureType::Bias => self.min_exposure_time_us,
            ExposureType::Test => 0,
        }
    }
}

/// A captured (or synthesized) image.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Row-major pixel samples, `resolution.height` rows of `resolution.width`
    pub pixels: Vec<u16>,
    pub resolution: Resolution,
    /// Number of frames summed into `pixels`
    pub frame_count: u32,
    /// Local capture time, `%Y-%m-%dT%H:%M:%S`
    pub timestamp: String,
    pub exposure_type: ExposureType,
}

impl Frame {
    /// Current local time in the format used for the DATE card.
    pub fn timestamp_now() -> String {
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}
