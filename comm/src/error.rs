//! Error types for communicator operations.

use crate::Tag;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Transport(tonic::transport::Error),
    Status(tonic::Status),
    Decode(prost::DecodeError),
    InvalidRank { rank: usize, size: usize },
    ReservedTag(Tag),
    InvalidCount { expected: usize, actual: usize },
    DuplicateMessage { source: usize, tag: Tag, seq: u64 },
    ConnectionClosed,
    Join(tokio::task::JoinError),
}

// Display/Error are implemented by hand because thiserror treats any field
// named `source` (as in `DuplicateMessage`) as the error source.
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "gRPC transport error: {e}"),
            Error::Status(e) => write!(f, "gRPC status error: {e}"),
            Error::Decode(e) => write!(f, "malformed message payload: {e}"),
            Error::InvalidRank { rank, size } => {
                write!(f, "invalid rank {rank} for a group of size {size}")
            }
            Error::ReservedTag(tag) => write!(f, "tag {tag} is reserved for collective operations"),
            Error::InvalidCount { expected, actual } => {
                write!(f, "expected {expected} parts, got {actual}")
            }
            Error::DuplicateMessage { source, tag, seq } => {
                write!(f, "message {seq} from rank {source} with tag {tag} arrived twice")
            }
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::Join(e) => write!(f, "pending operation failed to complete: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Status(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Join(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(e: tonic::transport::Error) -> Self {
        Error::Transport(e)
    }
}

impl From<tonic::Status> for Error {
    fn from(e: tonic::Status) -> Self {
        Error::Status(e)
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Join(e)
    }
}
