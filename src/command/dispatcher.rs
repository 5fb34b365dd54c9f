//! Maps parsed commands onto the exposure controller, filename allocator and
//! image writer, and reports the outcome as reply lines.

use crate::camera::{CameraDriver, CameraState, ExposureRequest, ExposureType};
use crate::error::{FvcError, FvcResult};
use crate::exposure::ExposureController;
use crate::filename::FilenameAllocator;
use crate::fits::ImageWriter;

use super::parse::Command;
use super::reply::{text, Reply, Responder};

/// Actor version reported by `status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `ping` reply text.
pub const PING_TEXT: &str = "I am fiber viewing actor";

/// Exposure time and gain programmed after every successful connect.
/// Values that are absent or not positive leave the camera's own setting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraDefaults {
    pub exposure_time_us: Option<i64>,
    pub gain_db: Option<f64>,
}

pub struct CommandDispatcher<D: CameraDriver> {
    controller: ExposureController<D>,
    allocator: FilenameAllocator,
    writer: ImageWriter,
    defaults: CameraDefaults,
}

impl<D: CameraDriver> CommandDispatcher<D> {
    pub fn new(controller: ExposureController<D>, allocator: FilenameAllocator) -> Self {
        Self {
            controller,
            allocator,
            writer: ImageWriter::new(),
            defaults: CameraDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: CameraDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn controller(&self) -> &ExposureController<D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ExposureController<D> {
        &mut self.controller
    }

    pub fn allocator(&self) -> &FilenameAllocator {
        &self.allocator
    }

    /// Copy of the current camera state, `None` while disconnected.
    pub fn snapshot(&self) -> Option<CameraState> {
        self.controller.state().cloned()
    }

    /// Connect (or reconnect) the camera and program the configured defaults.
    pub fn connect(&mut self) -> FvcResult<CameraState> {
        self.controller.connect()?;
        if let Some(micros) = self.defaults.exposure_time_us.filter(|v| *v > 0) {
            self.controller.set_exposure_time(micros)?;
        }
        if let Some(db) = self.defaults.gain_db.filter(|v| *v > 0.0) {
            self.controller.set_gain(db)?;
        }
        self.controller.state().cloned().ok_or(FvcError::NotConnected)
    }

    /// Release the camera.
    pub fn close(&mut self) -> FvcResult<()> {
        self.controller.disconnect()
    }

    /// Run one command, sending its informs and the final reply to `out`.
    /// Returns whether the command succeeded.
    pub fn dispatch(&mut self, command: &Command, out: &mut dyn Responder) -> bool {
        log::debug!("Dispatching {:?}", command);
        let result = match command {
            Command::Ping => {
                ping(out);
                Ok(())
            }
            Command::Status => {
                return report_status(self.controller.state(), false, out);
            }
            Command::Reconnect => self.connect().map(|_| {
                out.send(Reply::finish(text("camera connected!")));
            }),
            Command::Expose(request) => self.expose(*request, out),
            Command::SetExposureTime(micros) => {
                self.controller.set_exposure_time(*micros).map(|micros| {
                    out.send(Reply::inform(format!("exptime={}us", micros)));
                    out.send(Reply::finish(""));
                })
            }
            Command::SetGain(db) => self.controller.set_gain(*db).map(|db| {
                out.send(Reply::inform(format!("gain={:.2}db", db)));
                out.send(Reply::finish(""));
            }),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("{} failed: {}", command.verb(), e);
                out.send(Reply::fail_with(&e));
                false
            }
        }
    }

    fn expose(&mut self, request: ExposureRequest, out: &mut dyn Responder) -> FvcResult<()> {
        out.send(Reply::inform("exposureState=\"exposing\""));
        let exposure = self.controller.expose(request)?;
        let state = &exposure.state;

        match request.exposure_type {
            ExposureType::Object => out.send(Reply::inform(format!(
                "exptime={}us nframe={} gain={:.2}db",
                state.exposure_time_us, exposure.frame.frame_count, state.gain_db
            ))),
            ExposureType::Bias => out.send(Reply::inform(format!(
                "exptime={}us gain={:.2}db",
                state.min_exposure_time_us, state.gain_db
            ))),
            ExposureType::Test => {}
        }

        let path = self.allocator.next(request.exposure_type)?;
        out.send(Reply::inform(format!("filename={}", path.display())));
        self.writer.write(&path, &exposure.frame, state)?;

        log::info!(
            "{} exposure saved to {}",
            request.exposure_type,
            path.display()
        );
        out.send(Reply::finish("exposureState=\"done\""));
        Ok(())
    }
}

/// Liveness reply; never touches the camera.
pub fn ping(out: &mut dyn Responder) {
    out.send(Reply::finish(text(PING_TEXT)));
}

/// Status report for `state`. With `exposing` set the report comes from a
/// snapshot taken while another command holds the camera.
pub fn report_status(state: Option<&CameraState>, exposing: bool, out: &mut dyn Responder) -> bool {
    out.send(Reply::inform(format!("version=\"{}\"", VERSION)));
    let Some(state) = state else {
        out.send(Reply::fail_with(&FvcError::NotConnected));
        return false;
    };

    out.send(Reply::inform(format!(
        "model=\"{}\"  SN=\"{}\"",
        state.device_name, state.device_serial
    )));
    out.send(Reply::inform(format!(
        "exptime={}us  gain={:.2}db",
        state.exposure_time_us, state.gain_db
    )));
    if exposing {
        out.send(Reply::inform("exposureState=\"exposing\""));
    }
    out.send(Reply::inform(text("Present!")));
    out.send(Reply::finish(""));
    true
}
