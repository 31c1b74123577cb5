use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// The buffer is too small to hold the named packet.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The buffer is too small for the header length declared within the packet.
    #[error("truncated {0} packet, header length={1}, provided={2}")]
    TruncatedHeader(String, usize, usize),
}
