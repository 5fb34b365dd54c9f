//! fvc-actor library crate.
//!
//! Exposure control, output file naming and FITS storage for the fiber
//! viewing camera, plus the command protocol and TCP server around them.

pub mod camera;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod exposure;
pub mod filename;
pub mod fits;
pub mod server;

pub use error::{FvcError, FvcResult};
