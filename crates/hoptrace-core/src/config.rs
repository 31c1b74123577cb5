use crate::types::{
    MaxAttempts, MaxInflight, PacketSize, PayloadPattern, Sequence, TimeToLive, TraceId,
    TypeOfService,
};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `first_ttl`.
    pub const DEFAULT_FIRST_TTL: u8 = 1;

    /// The default value for `max_ttl` (the maximum number of hops).
    pub const DEFAULT_MAX_TTL: u8 = 30;

    /// The default number of probes sent to each hop before it is declared unresponsive.
    pub const DEFAULT_PROBES_PER_HOP: u8 = 3;

    /// The default time to wait for a response to a single probe.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

    /// The default slice of time spent waiting on the receive socket before checking for
    /// cancellation and expired probes.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// The default number of hops probed concurrently.
    ///
    /// A value of 1 resolves each hop (including retries) before the next is started.
    pub const DEFAULT_MAX_INFLIGHT: u8 = 1;

    /// The default value for `packet_size`.
    pub const DEFAULT_PACKET_SIZE: u16 = 60;

    /// The default value for `payload_pattern`.
    pub const DEFAULT_PAYLOAD_PATTERN: u8 = 0;

    /// The default value for `tos`.
    pub const DEFAULT_TOS: u8 = 0;

    /// The default value for `initial_sequence`.
    pub const DEFAULT_INITIAL_SEQUENCE: u16 = 33434;

    /// The default value for `drop_privileges`.
    pub const DEFAULT_DROP_PRIVILEGES: bool = true;
}

/// Configuration of the transport session.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionConfig {
    pub source_addr: Ipv4Addr,
    pub target_addr: Ipv4Addr,
    pub packet_size: PacketSize,
    pub payload_pattern: PayloadPattern,
    pub tos: TypeOfService,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_addr: Ipv4Addr::UNSPECIFIED,
            target_addr: Ipv4Addr::UNSPECIFIED,
            packet_size: PacketSize(defaults::DEFAULT_PACKET_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            tos: TypeOfService(defaults::DEFAULT_TOS),
        }
    }
}

/// Configuration of the probing strategy.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StrategyConfig {
    pub target_addr: Ipv4Addr,
    pub trace_identifier: TraceId,
    pub first_ttl: TimeToLive,
    pub max_ttl: TimeToLive,
    pub max_attempts: MaxAttempts,
    pub max_inflight: MaxInflight,
    pub initial_sequence: Sequence,
    pub probe_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            target_addr: Ipv4Addr::UNSPECIFIED,
            trace_identifier: TraceId::default(),
            first_ttl: TimeToLive(defaults::DEFAULT_FIRST_TTL),
            max_ttl: TimeToLive(defaults::DEFAULT_MAX_TTL),
            max_attempts: MaxAttempts(defaults::DEFAULT_PROBES_PER_HOP),
            max_inflight: MaxInflight(defaults::DEFAULT_MAX_INFLIGHT),
            initial_sequence: Sequence(defaults::DEFAULT_INITIAL_SEQUENCE),
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
        }
    }
}
