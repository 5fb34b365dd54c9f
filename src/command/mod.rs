//! Text command vocabulary: request parsing, reply lines and dispatch.

mod dispatcher;
mod parse;
mod reply;

pub use dispatcher::{ping, report_status, CameraDefaults, CommandDispatcher, PING_TEXT, VERSION};
pub use parse::{Command, ParseError, Request};
pub use reply::{text, Reply, ReplyCode, Responder};
