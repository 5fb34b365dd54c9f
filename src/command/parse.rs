//! Request-line grammar.
//!
//! A request is `[<cmdId>] <verb> [args...]`. Verbs and keywords are
//! case-insensitive; values may be given bare (`setgain 12`) or as a keyword
//! (`setgain gain=12`).

use crate::camera::{ExposureRequest, ExposureType};

/// A parsed actor command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Status,
    Reconnect,
    Expose(ExposureRequest),
    SetExposureTime(i64),
    SetGain(f64),
}

impl Command {
    /// Command verb as typed by clients.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Status => "status",
            Command::Reconnect => "reconnect",
            Command::Expose(_) => "expose",
            Command::SetExposureTime(_) => "setexptime",
            Command::SetGain(_) => "setgain",
        }
    }

    /// Whether the command needs exclusive use of the camera.
    pub fn uses_camera(&self) -> bool {
        !matches!(self, Command::Ping | Command::Status)
    }

    /// Parse the command part of a request (without the id).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut words = input.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?.to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match verb.as_str() {
            "ping" => {
                no_more(&args)?;
                Command::Ping
            }
            "status" => {
                no_more(&args)?;
                Command::Status
            }
            "reconnect" => {
                no_more(&args)?;
                Command::Reconnect
            }
            "expose" => {
                let kind = args.first().ok_or(ParseError::MissingArgument {
                    command: "expose",
                    argument: "bias|object|test",
                })?;
                let exposure_type: ExposureType =
                    kind.parse().map_err(|_| ParseError::InvalidValue {
                        argument: "exposure type",
                        value: kind.to_string(),
                    })?;
                let frame_count = match args.get(1) {
                    Some(word) => parse_value::<u32>(word, "nframe")?,
                    None => 1,
                };
                no_more(args.get(2..).unwrap_or_default())?;
                Command::Expose(ExposureRequest::new(exposure_type, frame_count))
            }
            "setexptime" => {
                let word = args.first().ok_or(ParseError::MissingArgument {
                    command: "setexptime",
                    argument: "exptime",
                })?;
                no_more(&args[1..])?;
                Command::SetExposureTime(parse_value(word, "exptime")?)
            }
            "setgain" => {
                let word = args.first().ok_or(ParseError::MissingArgument {
                    command: "setgain",
                    argument: "gain",
                })?;
                no_more(&args[1..])?;
                let gain: f64 = parse_value(word, "gain")?;
                if !gain.is_finite() {
                    return Err(ParseError::InvalidValue {
                        argument: "gain",
                        value: word.to_string(),
                    });
                }
                Command::SetGain(gain)
            }
            _ => return Err(ParseError::UnknownCommand(verb)),
        };
        Ok(command)
    }
}

/// A request line: command id plus the parse outcome. The id is kept even
/// when the command is invalid so the failure can be addressed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u32,
    pub command: Result<Command, ParseError>,
}

impl Request {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (id, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => match first.parse::<u32>() {
                Ok(id) => (id, rest),
                Err(_) => (0, trimmed),
            },
            None => match trimmed.parse::<u32>() {
                Ok(id) => (id, ""),
                Err(_) => (0, trimmed),
            },
        };
        Self {
            id,
            command: Command::parse(rest),
        }
    }
}

/// Errors from parsing a request line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0} (expected ping, status, reconnect, expose, setexptime or setgain)")]
    UnknownCommand(String),

    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("invalid {argument}: {value}")]
    InvalidValue {
        argument: &'static str,
        value: String,
    },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

fn no_more(args: &[&str]) -> Result<(), ParseError> {
    match args.first() {
        Some(extra) => Err(ParseError::UnexpectedArgument(extra.to_string())),
        None => Ok(()),
    }
}

/// Parse `word` as either a bare value or `<keyword>=<value>`.
fn parse_value<T: std::str::FromStr>(word: &str, keyword: &'static str) -> Result<T, ParseError> {
    let value = match word.split_once('=') {
        Some((key, value)) if key.eq_ignore_ascii_case(keyword) => value,
        Some(_) => return Err(ParseError::UnexpectedArgument(word.to_string())),
        None => word,
    };
    value.parse().map_err(|_| ParseError::InvalidValue {
        argument: keyword,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_verbs() {
        assert_eq!(Command::parse("ping"), Ok(Command::Ping));
        assert_eq!(Command::parse("STATUS"), Ok(Command::Status));
        assert_eq!(Command::parse("  reconnect  "), Ok(Command::Reconnect));
    }

    #[test]
    fn test_parse_expose_object_frame_count() {
        let expected = Command::Expose(ExposureRequest::new(ExposureType::Object, 3));
        assert_eq!(Command::parse("expose object 3"), Ok(expected.clone()));
        assert_eq!(Command::parse("expose object nframe=3"), Ok(expected.clone()));
        assert_eq!(Command::parse("expose Object NFRAME=3"), Ok(expected));
    }

    #[test]
    fn test_parse_expose_object_defaults_to_one_frame() {
        assert_eq!(
            Command::parse("expose object"),
            Ok(Command::Expose(ExposureRequest::new(ExposureType::Object, 1)))
        );
    }

    #[test]
    fn test_parse_expose_bias_forces_zero_frames() {
        match Command::parse("expose bias nframe=5").unwrap() {
            Command::Expose(request) => {
                assert_eq!(request.exposure_type, ExposureType::Bias);
                assert_eq!(request.frame_count, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_expose_errors() {
        assert!(matches!(
            Command::parse("expose"),
            Err(ParseError::MissingArgument { .. })
        ));
        assert!(matches!(
            Command::parse("expose flat"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("expose object -1"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("expose object exptime=3"),
            Err(ParseError::UnexpectedArgument(_))
        ));
        assert!(matches!(
            Command::parse("expose object 1 2"),
            Err(ParseError::UnexpectedArgument(_))
        ));
    }

    #[test]
    fn test_parse_setexptime() {
        assert_eq!(Command::parse("setexptime 1000"), Ok(Command::SetExposureTime(1000)));
        assert_eq!(
            Command::parse("setexptime exptime=-5"),
            Ok(Command::SetExposureTime(-5))
        );
        assert!(matches!(
            Command::parse("setexptime"),
            Err(ParseError::MissingArgument { .. })
        ));
        assert!(matches!(
            Command::parse("setexptime 1.5"),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_setgain() {
        assert_eq!(Command::parse("setgain 12.5"), Ok(Command::SetGain(12.5)));
        assert_eq!(Command::parse("setgain GAIN=3"), Ok(Command::SetGain(3.0)));
        assert!(matches!(
            Command::parse("setgain nan"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            Command::parse("setgain 1 2"),
            Err(ParseError::UnexpectedArgument(_))
        ));
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("focus"),
            Err(ParseError::UnknownCommand("focus".to_string()))
        );
        assert!(matches!(
            Command::parse("ping now"),
            Err(ParseError::UnexpectedArgument(_))
        ));
    }

    #[test]
    fn test_request_id() {
        let request = Request::parse("42 ping");
        assert_eq!(request.id, 42);
        assert_eq!(request.command, Ok(Command::Ping));

        let request = Request::parse("status");
        assert_eq!(request.id, 0);
        assert_eq!(request.command, Ok(Command::Status));

        let request = Request::parse("7");
        assert_eq!(request.id, 7);
        assert_eq!(request.command, Err(ParseError::Empty));

        let request = Request::parse("9 bogus");
        assert_eq!(request.id, 9);
        assert!(request.command.is_err());
    }

    #[test]
    fn test_uses_camera() {
        assert!(!Command::Ping.uses_camera());
        assert!(!Command::Status.uses_camera());
        assert!(Command::Reconnect.uses_camera());
        assert!(Command::SetGain(1.0).uses_camera());
    }
}
