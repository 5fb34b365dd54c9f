//! Exposure control: camera configuration and the three exposure modes.
//!
//! `ExposureController` is the only component that talks to the camera
//! driver. It starts disconnected; a successful [`ExposureController::connect`]
//! reads the device identity and limits into a [`CameraState`], after which
//! setters and exposures operate on that state.

use crate::camera::{
    CameraDriver, CameraState, DriverError, ExposureRequest, ExposureType, Frame, Resolution,
};
use crate::error::{FvcError, FvcResult, OutOfRange};

/// Result of one exposure: the frame plus the camera state it was taken with.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub frame: Frame,
    pub state: CameraState,
}

impl Exposure {
    /// Exposure time recorded for this frame.
    pub fn exposure_time_us(&self) -> u32 {
        self.state.exposure_time_for(self.frame.exposure_type)
    }
}

/// Owner of the camera handle and its configuration.
pub struct ExposureController<D: CameraDriver> {
    driver: D,
    device_id: u32,
    /// `None` while disconnected
    state: Option<CameraState>,
    /// Frame count of the last successful exposure; test frames reuse it
    frame_count: u32,
}

impl<D: CameraDriver> std::fmt::Debug for ExposureController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureController")
            .field("device_id", &self.device_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<D: CameraDriver> ExposureController<D> {
    /// Create a disconnected controller for SDK device `device_id`.
    pub fn new(driver: D, device_id: u32) -> Self {
        Self {
            driver,
            device_id,
            state: None,
            frame_count: 1,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    /// Camera state, `None` while disconnected.
    pub fn state(&self) -> Option<&CameraState> {
        self.state.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Open the device and read its identity, exposure time and gain.
    ///
    /// Any previous handle is released first. On failure the controller is
    /// left disconnected and a later call may try again.
    pub fn connect(&mut self) -> FvcResult<&CameraState> {
        if self.state.take().is_some() {
            if let Err(e) = self.driver.close(self.device_id) {
                log::warn!("Closing camera {} before reconnect failed: {}", self.device_id, e);
            }
        }

        self.driver.open(self.device_id).map_err(FvcError::Device)?;
        let state = match self.read_state() {
            Ok(state) => state,
            Err(e) => {
                let _ = self.driver.close(self.device_id);
                return Err(FvcError::Device(e));
            }
        };

        log::info!(
            "Camera {} connected: {} ({}us in [{}, {}], {:.2}db in [{:.2}, {:.2}])",
            self.device_id,
            state.instrument(),
            state.exposure_time_us,
            state.min_exposure_time_us,
            state.max_exposure_time_us,
            state.gain_db,
            state.min_gain_db,
            state.max_gain_db
        );
        Ok(&*self.state.insert(state))
    }

    fn read_state(&self) -> Result<CameraState, DriverError> {
        let id = self.device_id;
        let device_name = self.driver.device_name(id)?;
        let device_serial = self.driver.device_serial(id)?;
        let exposure = self.driver.exposure_time(id)?;
        let gain = self.driver.gain(id)?;
        Ok(CameraState {
            device_name,
            device_serial,
            exposure_time_us: exposure.current,
            min_exposure_time_us: exposure.min,
            max_exposure_time_us: exposure.max,
            gain_db: gain.current,
            min_gain_db: gain.min,
            max_gain_db: gain.max,
        })
    }

    /// Close the device. The controller becomes disconnected.
    pub fn disconnect(&mut self) -> FvcResult<()> {
        if self.state.take().is_some() {
            self.driver.close(self.device_id).map_err(FvcError::Device)?;
            log::info!("Camera {} closed", self.device_id);
        }
        Ok(())
    }

    fn connected(&self) -> FvcResult<&CameraState> {
        self.state.as_ref().ok_or(FvcError::NotConnected)
    }

    /// Set the exposure time in microseconds.
    ///
    /// Values outside the device limits are rejected and the state is left
    /// unchanged; so is a value the driver refuses.
    pub fn set_exposure_time(&mut self, micros: i64) -> FvcResult<u32> {
        let state = self.connected()?;
        if micros < i64::from(state.min_exposure_time_us) {
            return Err(OutOfRange::ExposureTooSmall {
                requested: micros,
                min: state.min_exposure_time_us,
            }
            .into());
        }
        if micros > i64::from(state.max_exposure_time_us) {
            return Err(OutOfRange::ExposureTooLarge {
                requested: micros,
                max: state.max_exposure_time_us,
            }
            .into());
        }

        // In range, so it fits the u32 bounds
        let micros = micros as u32;
        self.driver
            .set_exposure_time(self.device_id, micros)
            .map_err(FvcError::Device)?;
        if let Some(state) = self.state.as_mut() {
            state.exposure_time_us = micros;
        }
        log::info!("Exposure time set to {}us", micros);
        Ok(micros)
    }

    /// Set the gain in decibels, with the same contract as `set_exposure_time`.
    pub fn set_gain(&mut self, db: f64) -> FvcResult<f64> {
        let state = self.connected()?;
        if db.is_nan() || db < state.min_gain_db {
            return Err(OutOfRange::GainTooSmall {
                requested: db,
                min: state.min_gain_db,
            }
            .into());
        }
        if db > state.max_gain_db {
            return Err(OutOfRange::GainTooLarge {
                requested: db,
                max: state.max_gain_db,
            }
            .into());
        }

        self.driver
            .set_gain(self.device_id, db)
            .map_err(FvcError::Device)?;
        if let Some(state) = self.state.as_mut() {
            state.gain_db = db;
        }
        log::info!("Gain set to {:.2}db", db);
        Ok(db)
    }

    /// Run one exposure.
    ///
    /// - object: sum `frame_count` frames at the configured exposure time and gain
    /// - bias: one frame at the minimum exposure time; the configured time is
    ///   programmed back afterwards whether or not the capture succeeded
    /// - test: all-ones frame at the sensor resolution, the driver is not touched
    pub fn expose(&mut self, request: ExposureRequest) -> FvcResult<Exposure> {
        let state = self.connected()?.clone();
        let id = self.device_id;

        let (pixels, frame_count) = match request.exposure_type {
            ExposureType::Object => {
                log::info!(
                    "Exposing object: {} frame(s) at {}us, {:.2}db",
                    request.frame_count,
                    state.exposure_time_us,
                    state.gain_db
                );
                let pixels = self
                    .driver
                    .capture(id, request.frame_count)
                    .map_err(FvcError::Capture)?;
                (pixels, request.frame_count)
            }
            ExposureType::Bias => {
                log::info!("Exposing bias at {}us", state.min_exposure_time_us);
                let pixels = self.capture_at(state.min_exposure_time_us, state.exposure_time_us)?;
                (pixels, 1)
            }
            ExposureType::Test => {
                log::info!("Generating test frame");
                (vec![1u16; Resolution::SENSOR.pixel_count()], self.frame_count)
            }
        };

        if pixels.len() != Resolution::SENSOR.pixel_count() {
            return Err(FvcError::Capture(DriverError::call_failed(
                "capture",
                format!(
                    "image size mismatched: {} samples, expected {}",
                    pixels.len(),
                    Resolution::SENSOR.pixel_count()
                ),
            )));
        }

        self.frame_count = frame_count;
        Ok(Exposure {
            frame: Frame {
                pixels,
                resolution: Resolution::SENSOR,
                frame_count,
                timestamp: Frame::timestamp_now(),
                exposure_type: request.exposure_type,
            },
            state,
        })
    }

    /// Capture one frame at `exposure_us`, then program `restore_us` back.
    ///
    /// The restore runs even when the capture fails; a capture failure takes
    /// precedence over a restore failure in the returned error.
    fn capture_at(&mut self, exposure_us: u32, restore_us: u32) -> FvcResult<Vec<u16>> {
        let id = self.device_id;
        self.driver
            .set_exposure_time(id, exposure_us)
            .map_err(FvcError::Capture)?;

        let captured = self.driver.capture(id, 1);
        let restored = self.driver.set_exposure_time(id, restore_us);
        if let Err(e) = &restored {
            log::error!("Failed to restore exposure time {}us: {}", restore_us, e);
        }

        let pixels = captured.map_err(FvcError::Capture)?;
        restored.map_err(FvcError::Capture)?;
        Ok(pixels)
    }
}
