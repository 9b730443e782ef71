//! Error types of the server.
//!
//! Errors fall in two groups. Framing, codec and unknown-command errors are
//! fatal: the connection is dropped without a reply. Everything else is
//! reported to the client as an `Rlerror` carrying an errno and the
//! connection keeps serving.

use std::{fmt, io};

use thiserror::Error;

use crate::serialize::FieldType;

/// POSIX error numbers sent in `Rlerror`.
pub mod errno {
    pub use nix::errno::Errno;
    pub use nix::errno::Errno::*;
}

use self::errno::Errno;

/// Errors raised while cutting a byte stream into frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream ended in the middle of a frame.
    #[error("stream ended inside a frame")]
    Truncated,

    /// The declared frame length is below the minimum or above the
    /// negotiated maximum.
    #[error("invalid frame size {size} (allowed 5..={max})")]
    BadSize { size: u32, max: u32 },

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while converting between frame bodies and field values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The body is shorter than its template requires.
    #[error("frame body shorter than its template")]
    Truncated,

    /// A template contains a character outside the field alphabet.
    #[error("invalid template character {0:?}")]
    InvalidSpec(char),

    /// A value does not have the kind its template position asks for.
    #[error("expected {expected:?} field, found {found:?}")]
    Mismatch { expected: FieldType, found: FieldType },

    /// The number of values does not match the template.
    #[error("template has {expected} fields, got {found} values")]
    Arity { expected: usize, found: usize },

    /// A length does not fit its wire representation.
    #[error("{what} of {value} does not fit its wire field")]
    Overflow { what: &'static str, value: usize },
}

/// Errors raised by the command layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The command byte has no catalog entry.
    #[error("unknown or unsupported command {0}")]
    UnknownCommand(u8),

    /// The request references a handle that is not attached.
    #[error("handle {0} is not attached")]
    UnknownHandle(u32),
}

/// The crate wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A plain errno reported by a resource provider.
    #[error("{0}")]
    No(Errno),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Get the errno this error is reported as in `Rlerror`.
    pub fn errno(&self) -> Errno {
        match self {
            Error::No(e) => *e,
            Error::Io(e) => e.raw_os_error().map(Errno::from_raw).unwrap_or(match e.kind() {
                io::ErrorKind::NotFound => Errno::ENOENT,
                io::ErrorKind::PermissionDenied => Errno::EACCES,
                io::ErrorKind::InvalidInput => Errno::EINVAL,
                _ => Errno::EIO,
            }),
            Error::Protocol(ProtocolError::UnknownHandle(_)) => Errno::EBADF,
            Error::Protocol(ProtocolError::UnknownCommand(_)) => Errno::EOPNOTSUPP,
            Error::Frame(_) | Error::Codec(_) => Errno::EPROTO,
        }
    }

    /// Whether the error must terminate the connection instead of being
    /// answered with `Rlerror`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Frame(_) | Error::Codec(_) | Error::Protocol(ProtocolError::UnknownCommand(_))
        )
    }
}

impl From<Errno> for Error {
    fn from(e: Errno) -> Self {
        Error::No(e)
    }
}

/// Renders an errno the way `Rlerror` logs show it.
pub fn string(e: Errno) -> impl fmt::Display {
    e.desc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(Error::from(FrameError::Truncated).is_fatal());
        assert!(Error::from(CodecError::InvalidSpec('x')).is_fatal());
        assert!(Error::from(ProtocolError::UnknownCommand(3)).is_fatal());
        assert!(!Error::from(ProtocolError::UnknownHandle(1)).is_fatal());
        assert!(!Error::No(Errno::ENOENT).is_fatal());
        assert!(!Error::from(io::Error::from(io::ErrorKind::NotFound)).is_fatal());
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(Error::from(ProtocolError::UnknownHandle(9)).errno(), Errno::EBADF);
        assert_eq!(
            Error::from(io::Error::from(io::ErrorKind::NotFound)).errno(),
            Errno::ENOENT
        );
        assert_eq!(
            Error::from(io::Error::from_raw_os_error(Errno::ENOTDIR as i32)).errno(),
            Errno::ENOTDIR
        );
        assert_eq!(Error::No(Errno::EACCES).errno(), Errno::EACCES);
    }
}
