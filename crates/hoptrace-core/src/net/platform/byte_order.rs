use crate::error::Result;
use crate::net::platform::{Platform, PlatformImpl};
use std::net::Ipv4Addr;

/// The byte order to encode the `total_length`, `flags` and `fragment_offset` fields of the IPv4
/// header.
///
/// Nearly every field of a raw IPv4 header is passed to the kernel in network byte order. The
/// length and fragment fields are the exception: Linux accepts either order, some BSD derived
/// systems (including macOS) require host byte order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Ipv4ByteOrder {
    #[cfg(all(unix, not(target_os = "linux")))]
    Host,
    Network,
}

impl Ipv4ByteOrder {
    /// Discover the required byte ordering for the IPv4 header fields `total_length`, `flags` and
    /// `fragment_offset`.
    ///
    /// This is achieved by sending a packet to localhost with the `total_length` set in network
    /// byte order and, if the OS rejects it with `InvalidInput`, again with the bytes swapped.
    ///
    /// For a packet of length 4660 bytes (dec) on a little-endian architecture:
    ///
    /// Try        Host (LE)    Wire (BE)   Order (if succeeds)
    /// normal     34 12        12 34       `Ipv4ByteOrder::Network`
    /// swapped    12 34        34 12       `Ipv4ByteOrder::Host`
    pub fn for_address(addr: Ipv4Addr) -> Result<Self> {
        PlatformImpl::byte_order_for_address(addr)
    }

    /// Adjust the IPv4 `total_length` (or `flags`) header.
    #[must_use]
    pub const fn adjust_length(self, ipv4_total_length: u16) -> u16 {
        match self {
            #[cfg(all(unix, not(target_os = "linux")))]
            Self::Host => ipv4_total_length.swap_bytes(),
            Self::Network => ipv4_total_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_order_unchanged() {
        assert_eq!(0x4000, Ipv4ByteOrder::Network.adjust_length(0x4000));
        assert_eq!(84, Ipv4ByteOrder::Network.adjust_length(84));
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    #[test]
    fn test_host_order_swapped() {
        assert_eq!(0x0040, Ipv4ByteOrder::Host.adjust_length(0x4000));
        assert_eq!(0x5400, Ipv4ByteOrder::Host.adjust_length(84));
    }
}
