//! Reply lines sent back to the commanding client.
//!
//! Every line is `<cmdId> <code> <keywords>`: code `i` for an intermediate
//! inform, `:` for successful completion and `f` for failure. A command
//! produces any number of informs followed by exactly one `:` or `f`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Inform,
    Finish,
    Fail,
}

impl ReplyCode {
    pub fn as_char(&self) -> char {
        match self {
            ReplyCode::Inform => 'i',
            ReplyCode::Finish => ':',
            ReplyCode::Fail => 'f',
        }
    }

    /// Whether this code ends the command.
    pub fn is_final(&self) -> bool {
        !matches!(self, ReplyCode::Inform)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    /// Keyword payload, possibly empty
    pub keywords: String,
}

impl Reply {
    pub fn inform(keywords: impl Into<String>) -> Self {
        Self {
            code: ReplyCode::Inform,
            keywords: keywords.into(),
        }
    }

    pub fn finish(keywords: impl Into<String>) -> Self {
        Self {
            code: ReplyCode::Finish,
            keywords: keywords.into(),
        }
    }

    pub fn fail(keywords: impl Into<String>) -> Self {
        Self {
            code: ReplyCode::Fail,
            keywords: keywords.into(),
        }
    }

    /// Failure carrying an error's message as `text="..."`.
    pub fn fail_with(err: &dyn std::error::Error) -> Self {
        Self::fail(text(&err.to_string()))
    }

    /// Full wire line for command `id`, without the trailing newline.
    pub fn line(&self, id: u32) -> String {
        format!("{} {}", id, self)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keywords.is_empty() {
            write!(f, "{}", self.code.as_char())
        } else {
            write!(f, "{} {}", self.code.as_char(), self.keywords)
        }
    }
}

/// `text="<message>"` with embedded double quotes replaced by single ones.
pub fn text(message: &str) -> String {
    format!("text=\"{}\"", message.replace('"', "'"))
}

/// Sink for the replies of one command.
pub trait Responder {
    fn send(&mut self, reply: Reply);
}

/// Collects replies in order; used by `exec` and tests.
impl Responder for Vec<Reply> {
    fn send(&mut self, reply: Reply) {
        self.push(reply);
    }
}
