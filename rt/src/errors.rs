use std::error;
use std::fmt::Display;

use crate::control::PromptId;

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    /// A suspension reached the top of the program without meeting a
    /// handler for its prompt. The compiler guarantees this does not
    /// happen for well-typed programs, so observing it means the
    /// program bypassed the compiler's effect checking.
    UnhandledPrompt(PromptId),

    TypeError {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::UnhandledPrompt(prompt) => {
                write!(f, "unhandled prompt: {}", prompt)
            }

            ErrorKind::TypeError { expected, actual } => write!(
                f,
                "expected value of type '{}', but found a '{}'",
                expected, actual
            ),
        }
    }
}

impl error::Error for Error {}

/// Result type used for runtime operations that can fail terminally.
pub type RuntimeResult<T> = Result<T, Error>;
