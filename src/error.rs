use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Fatal errors that propagate out of setup code (CLI parsing, directory discovery, spawn
/// failures). These never cross into the match loop; see [`ErrorKind`] for that.
pub type Res<T> = anyhow::Result<T>;

/// The per-player error taxonomy from the wire protocol (§3, §4.2, §4.3 of the spec).
///
/// An `ErrorKind` is never returned as an `Err` from the match engine: it is recorded in the
/// match's `errors` map and the offending player is eliminated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidInput,
    OutOfBounds,
    ColumnFull,
    Timeout,
    RuntimeError,
    UserInterrupt,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::OutOfBounds => "out_of_bounds",
            ErrorKind::ColumnFull => "column_full",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RuntimeError => "runtime_error",
            ErrorKind::UserInterrupt => "user_interrupt",
        };
        write!(f, "{str}")
    }
}

impl ErrorKind {
    /// Whether a `Human` player gets to retry after this error instead of being eliminated.
    /// Per §7, only the three sanitisation errors are ever recoverable, and only for humans.
    pub fn human_recoverable(self) -> bool {
        matches!(self, ErrorKind::InvalidInput | ErrorKind::OutOfBounds | ErrorKind::ColumnFull)
    }
}

/// Internal error type for the subprocess channel (§4.3). Converted to an [`ErrorKind`] by the
/// player adapter; never surfaced to the match engine directly.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("the read deadline elapsed before a move line arrived")]
    Timeout,
    #[error("the child exited before producing a move line")]
    StreamClosed,
    #[error("the child produced a runtime error: {0}")]
    RuntimeError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
