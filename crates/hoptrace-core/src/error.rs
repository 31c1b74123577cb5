use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A tracer error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A tracer error.
///
/// [`Error::PermissionDenied`], [`Error::IoError`] and [`Error::PrivilegeError`] abort a trace.
/// [`Error::ProbeFailed`] is absorbed by the prober and recorded as an attempt with no response.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid hop limit {0}, must be in the range 1..={1}")]
    InvalidHopLimit(u8, u8),
    #[error("invalid packet size: {0}")]
    InvalidPacketSize(usize),
    #[error("invalid packet: {0}")]
    PacketError(#[from] hoptrace_packet::error::Error),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("permission denied: {0}")]
    PermissionDenied(IoError),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("Probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("transport session is closed")]
    SessionClosed,
    #[error("sequence {0} is already outstanding")]
    DuplicateSequence(u16),
    #[error("missing address from socket call")]
    MissingAddr,
    #[error("privilege error: {0}")]
    PrivilegeError(#[from] hoptrace_privilege::Error),
    #[error("tracer error: {0}")]
    Other(String),
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Connect error for {1}: {0}")]
    Connect(io::Error, SocketAddr),
    #[error("Sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("Failed to {0}: {1}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// Get the custom error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(e, _) | Self::SendTo(e, _) | Self::Other(e, _) => ErrorKind::from(e),
        }
    }
}

/// Custom error kind.
///
/// This includes additional error kinds that are not part of the standard [`io::ErrorKind`].
#[derive(Debug, Eq, PartialEq)]
pub enum ErrorKind {
    HostUnreachable,
    NetUnreachable,
    PermissionDenied,
    Std(io::ErrorKind),
}

/// Io operation.
#[derive(Debug)]
pub enum IoOperation {
    NewSocket,
    SetNonBlocking,
    SetHeaderIncluded,
    Select,
    Read,
    Shutdown,
    LocalAddr,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::SetNonBlocking => write!(f, "set non-blocking"),
            Self::SetHeaderIncluded => write!(f, "set header included"),
            Self::Select => write!(f, "select"),
            Self::Read => write!(f, "read"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::LocalAddr => write!(f, "local addr"),
        }
    }
}
