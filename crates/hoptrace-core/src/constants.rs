/// The maximum time-to-live value allowed.
///
/// The IP `ttl` is an u8 (0..255) but since a `ttl` of zero isn't useful we only allow 254 distinct
/// hops (1..255).
pub const MAX_TTL: u8 = 254;

/// The maximum size of the IP packet we allow.
pub const MAX_PACKET_SIZE: usize = 1024;

/// The minimum size of an `IPv4/ICMP` probe (20 byte `IPv4` header + 8 byte `ICMP` header).
pub const MIN_PACKET_SIZE_ICMP: usize = 28;

/// The maximum number of hops which may be probed concurrently.
pub const MAX_INFLIGHT: u8 = 32;
