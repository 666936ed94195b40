use std::io;
use thiserror::Error;

/// Custom error types for the streamcodec library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors from std::io operations.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// Fewer bytes were available than a field or frame requires.
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Structurally impossible data (overlong varint, missing crypto header, bad tag).
    #[error("Malformed input: {message}")]
    Malformed { message: String },

    /// The API was called with arguments it cannot accept.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The API was called in a state that does not allow the operation.
    #[error("Illegal state: {message}")]
    IllegalState { message: String },

    /// Object-graph serializer failures other than plain I/O.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    Serialization(bincode::Error),
}

impl Error {
    /// Create a new `Malformed` error with a descriptive message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a new `InvalidArgument` error with a descriptive message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new `IllegalState` error with a descriptive message.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Returns true for the end-of-stream subtype.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof)
    }
}

/// Stream errors are normalized so that end-of-stream and corrupt data stay
/// distinguishable from device faults.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            io::ErrorKind::InvalidData => Error::Malformed {
                message: e.to_string(),
            },
            _ => Error::Io(e),
        }
    }
}

/// Lets stream layers, which speak `io::Error`, carry crate errors through `Read`/`Write`.
impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::UnexpectedEof => io::Error::from(io::ErrorKind::UnexpectedEof),
            Error::Malformed { message } => io::Error::new(io::ErrorKind::InvalidData, message),
            Error::InvalidArgument { message } => {
                io::Error::new(io::ErrorKind::InvalidInput, message)
            }
            Error::IllegalState { message } => io::Error::new(io::ErrorKind::Other, message),
            #[cfg(feature = "serde")]
            Error::Serialization(e) => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

#[cfg(feature = "serde")]
impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) => io.into(),
            _ => Error::Serialization(e),
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_kind_is_normalized() {
        let err: Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(err.is_eof());
    }

    #[test]
    fn invalid_data_becomes_malformed() {
        let err: Error = io::Error::new(io::ErrorKind::InvalidData, "bad tag").into();
        assert!(matches!(err, Error::Malformed { ref message } if message == "bad tag"));
    }

    #[test]
    fn device_faults_stay_io() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn crate_errors_survive_io_round_trip() {
        let io_err: io::Error = Error::malformed("overlong varint").into();
        let back: Error = io_err.into();
        assert!(matches!(back, Error::Malformed { .. }));

        let io_err: io::Error = Error::UnexpectedEof.into();
        assert!(Error::from(io_err).is_eof());
    }
}
