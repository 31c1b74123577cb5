use crate::error::Result;
use crate::probe::Probe;
use std::time::{Duration, SystemTime};

/// Common types and helper functions.
mod common;

/// IPv4 probe encoding and response parsing.
pub mod ipv4;

/// Platform specific network code.
pub mod platform;

/// A network socket.
pub mod socket;

/// The transport session for sending and receiving probes.
pub mod channel;

/// Determine the source address.
pub mod source;

/// The platform specific socket type.
pub use platform::{PlatformImpl, SocketImpl};

/// A raw `IPv4` datagram read from the receive channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Datagram {
    /// The full datagram, including the `IPv4` header.
    pub bytes: Vec<u8>,
    /// The time the datagram was read.
    pub received: SystemTime,
}

impl Datagram {
    #[must_use]
    pub fn new(bytes: Vec<u8>, received: SystemTime) -> Self {
        Self { bytes, received }
    }
}

/// An abstraction over the raw network channels used for tracing.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Transmit a `Probe` immediately.
    fn send(&mut self, probe: &Probe) -> Result<()>;

    /// Wait up to `timeout` for the next datagram on the receive channel.
    ///
    /// Returns `None` if nothing arrived before the timeout.
    fn receive_within(&mut self, timeout: Duration) -> Result<Option<Datagram>>;

    /// Release the underlying channels.
    ///
    /// Calling `close` more than once has no further effect.
    fn close(&mut self);
}
