//! In-process camera used when no vendor SDK binding is linked.
//!
//! Behaves like the USB camera as far as the controller can tell: it has an
//! identity, bounded exposure time and gain, and returns summed 16-bit frames
//! at the sensor resolution. Individual calls can be made to fail so error
//! paths can be exercised without hardware.

use std::cell::Cell;

use super::driver::{CameraDriver, DriverError};
use super::types::{ParamRange, Resolution};

/// Offset level of every simulated sample, in ADU.
const BIAS_LEVEL: u32 = 100;

/// Calls that can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFailures {
    pub open: bool,
    pub identity: bool,
    pub set_exposure_time: bool,
    pub set_gain: bool,
    pub capture: bool,
}

/// A capture as seen by the simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRecord {
    pub exposure_time_us: u32,
    pub frame_count: u32,
}

/// Simulated fiber viewing camera.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    name: String,
    serial: String,
    resolution: Resolution,
    exposure: ParamRange<u32>,
    gain: ParamRange<f64>,
    opened: bool,
    /// Failure switches, public so tests can flip them through the controller
    pub failures: SimulatedFailures,
    /// Every trait call, reads included
    calls: Cell<usize>,
    captures: Vec<CaptureRecord>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    /// A camera with 10us..1s exposure (500us current) and 0..24db gain (10db current).
    pub fn new() -> Self {
        Self {
            name: "MQ013MG-E2".to_string(),
            serial: "1a2b3c".to_string(),
            resolution: Resolution::SENSOR,
            exposure: ParamRange {
                current: 500,
                min: 10,
                max: 1_000_000,
            },
            gain: ParamRange {
                current: 10.0,
                min: 0.0,
                max: 24.0,
            },
            opened: false,
            failures: SimulatedFailures::default(),
            calls: Cell::new(0),
            captures: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_identity(mut self, name: &str, serial: &str) -> Self {
        self.name = name.to_string();
        self.serial = serial.to_string();
        self
    }

    #[must_use]
    pub fn with_exposure_range(mut self, exposure: ParamRange<u32>) -> Self {
        self.exposure = exposure;
        self
    }

    #[must_use]
    pub fn with_gain_range(mut self, gain: ParamRange<f64>) -> Self {
        self.gain = gain;
        self
    }

    /// Override the readout size (a mismatched size is a capture error upstream).
    #[must_use]
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Total number of driver calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    /// Every successful capture, oldest first.
    pub fn captures(&self) -> &[CaptureRecord] {
        &self.captures
    }

    /// Exposure time currently programmed into the sensor.
    pub fn programmed_exposure_time(&self) -> u32 {
        self.exposure.current
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    fn record_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.opened {
            Ok(())
        } else {
            Err(DriverError::NotOpened)
        }
    }

    /// Single-frame sample at (x, y): bias level plus a diagonal ramp that
    /// scales with exposure time.
    fn sample(&self, x: u32, y: u32) -> u32 {
        let ramp = (x + y) % 64;
        let signal = (u64::from(ramp) * u64::from(self.exposure.current) / 1000).min(4000);
        BIAS_LEVEL + signal as u32
    }
}

impl CameraDriver for SimulatedCamera {
    fn open(&mut self, _id: u32) -> Result<(), DriverError> {
        self.record_call();
        if self.failures.open {
            return Err(DriverError::call_failed("xiOpenDevice", "no device"));
        }
        self.opened = true;
        Ok(())
    }

    fn close(&mut self, _id: u32) -> Result<(), DriverError> {
        self.record_call();
        self.opened = false;
        Ok(())
    }

    fn device_name(&self, _id: u32) -> Result<String, DriverError> {
        self.record_call();
        self.ensure_open()?;
        if self.failures.identity {
            return Err(DriverError::call_failed("XI_PRM_DEVICE_NAME", "read error"));
        }
        Ok(self.name.clone())
    }

    fn device_serial(&self, _id: u32) -> Result<String, DriverError> {
        self.record_call();
        self.ensure_open()?;
        if self.failures.identity {
            return Err(DriverError::call_failed("XI_PRM_DEVICE_SN", "read error"));
        }
        Ok(self.serial.clone())
    }

    fn set_exposure_time(&mut self, _id: u32, micros: u32) -> Result<(), DriverError> {
        self.record_call();
        self.ensure_open()?;
        if self.failures.set_exposure_time {
            return Err(DriverError::call_failed("XI_PRM_EXPOSURE", "write error"));
        }
        self.exposure.current = micros.clamp(self.exposure.min, self.exposure.max);
        Ok(())
    }

    fn exposure_time(&self, _id: u32) -> Result<ParamRange<u32>, DriverError> {
        self.record_call();
        self.ensure_open()?;
        Ok(self.exposure)
    }

    fn set_gain(&mut self, _id: u32, db: f64) -> Result<(), DriverError> {
        self.record_call();
        self.ensure_open()?;
        if self.failures.set_gain {
            return Err(DriverError::call_failed("XI_PRM_GAIN", "write error"));
        }
        self.gain.current = db.clamp(self.gain.min, self.gain.max);
        Ok(())
    }

    fn gain(&self, _id: u32) -> Result<ParamRange<f64>, DriverError> {
        self.record_call();
        self.ensure_open()?;
        Ok(self.gain)
    }

    fn capture(&mut self, _id: u32, frame_count: u32) -> Result<Vec<u16>, DriverError> {
        self.record_call();
        self.ensure_open()?;
        if self.failures.capture {
            return Err(DriverError::call_failed("xiGetImage", "timeout"));
        }

        let mut pixels = Vec::with_capacity(self.resolution.pixel_count());
        for y in 0..self.resolution.height {
            for x in 0..self.resolution.width {
                // Summing n identical frames with 16-bit wraparound
                pixels.push(self.sample(x, y).wrapping_mul(frame_count) as u16);
            }
        }

        self.captures.push(CaptureRecord {
            exposure_time_us: self.exposure.current,
            frame_count,
        });
        Ok(pixels)
    }
}
