use crate::config::{defaults, SessionConfig, StrategyConfig};
use crate::constants::{MAX_INFLIGHT, MAX_PACKET_SIZE, MAX_TTL, MIN_PACKET_SIZE_ICMP};
use crate::error::{Error, Result};
use crate::tracer::Tracer;
use crate::types::{
    MaxAttempts, MaxInflight, PacketSize, PayloadPattern, Sequence, TimeToLive, TraceId,
    TypeOfService,
};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Build a tracer.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// # use hoptrace_core::Builder;
/// # use std::net::Ipv4Addr;
/// # use std::time::Duration;
/// let tracer = Builder::new(Ipv4Addr::new(1, 1, 1, 1))
///     .trace_identifier(12345)
///     .max_ttl(20)
///     .probes_per_hop(2)
///     .probe_timeout(Duration::from_secs(1))
///     .max_inflight(4)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Builder {
    source_addr: Option<Ipv4Addr>,
    target_addr: Ipv4Addr,
    packet_size: PacketSize,
    payload_pattern: PayloadPattern,
    tos: TypeOfService,
    trace_identifier: TraceId,
    first_ttl: TimeToLive,
    max_ttl: TimeToLive,
    probes_per_hop: MaxAttempts,
    max_inflight: MaxInflight,
    initial_sequence: Sequence,
    probe_timeout: Duration,
    read_timeout: Duration,
    drop_privileges: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            source_addr: None,
            target_addr: StrategyConfig::default().target_addr,
            packet_size: SessionConfig::default().packet_size,
            payload_pattern: SessionConfig::default().payload_pattern,
            tos: SessionConfig::default().tos,
            trace_identifier: StrategyConfig::default().trace_identifier,
            first_ttl: StrategyConfig::default().first_ttl,
            max_ttl: StrategyConfig::default().max_ttl,
            probes_per_hop: StrategyConfig::default().max_attempts,
            max_inflight: StrategyConfig::default().max_inflight,
            initial_sequence: StrategyConfig::default().initial_sequence,
            probe_timeout: StrategyConfig::default().probe_timeout,
            read_timeout: StrategyConfig::default().read_timeout,
            drop_privileges: defaults::DEFAULT_DROP_PRIVILEGES,
        }
    }
}

impl Builder {
    /// Create a new `Builder` for tracing to `target_addr`.
    #[must_use]
    pub fn new(target_addr: Ipv4Addr) -> Self {
        Self {
            target_addr,
            ..Default::default()
        }
    }

    /// Set the source address.
    ///
    /// If not set, the source address is discovered from the route to the target.
    #[must_use]
    pub fn source_addr(self, source_addr: Option<Ipv4Addr>) -> Self {
        Self {
            source_addr,
            ..self
        }
    }

    /// Set the identifier which marks probes as belonging to this trace.
    #[must_use]
    pub fn trace_identifier(self, trace_id: u16) -> Self {
        Self {
            trace_identifier: TraceId(trace_id),
            ..self
        }
    }

    /// Set the total size of each probe datagram, including the `IPv4` header.
    #[must_use]
    pub fn packet_size(self, packet_size: u16) -> Self {
        Self {
            packet_size: PacketSize(packet_size),
            ..self
        }
    }

    #[must_use]
    pub fn payload_pattern(self, payload_pattern: u8) -> Self {
        Self {
            payload_pattern: PayloadPattern(payload_pattern),
            ..self
        }
    }

    /// Set the type-of-service byte of each probe.
    #[must_use]
    pub fn tos(self, tos: u8) -> Self {
        Self {
            tos: TypeOfService(tos),
            ..self
        }
    }

    /// Set the hop limit of the first hop probed.
    #[must_use]
    pub fn first_ttl(self, first_ttl: u8) -> Self {
        Self {
            first_ttl: TimeToLive(first_ttl),
            ..self
        }
    }

    /// Set the maximum number of hops probed.
    #[must_use]
    pub fn max_ttl(self, max_ttl: u8) -> Self {
        Self {
            max_ttl: TimeToLive(max_ttl),
            ..self
        }
    }

    /// Set the number of probes sent to a hop before it is declared unresponsive.
    #[must_use]
    pub fn probes_per_hop(self, probes_per_hop: u8) -> Self {
        Self {
            probes_per_hop: MaxAttempts(probes_per_hop),
            ..self
        }
    }

    /// Set the number of hops probed concurrently.
    #[must_use]
    pub fn max_inflight(self, max_inflight: u8) -> Self {
        Self {
            max_inflight: MaxInflight(max_inflight),
            ..self
        }
    }

    #[must_use]
    pub fn initial_sequence(self, initial_sequence: u16) -> Self {
        Self {
            initial_sequence: Sequence(initial_sequence),
            ..self
        }
    }

    /// Set the time to wait for a response to a single probe.
    #[must_use]
    pub fn probe_timeout(self, probe_timeout: Duration) -> Self {
        Self {
            probe_timeout,
            ..self
        }
    }

    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Drop privileges once the transport session is open.
    #[must_use]
    pub fn drop_privileges(self, drop_privileges: bool) -> Self {
        Self {
            drop_privileges,
            ..self
        }
    }

    /// Build the `Tracer`.
    ///
    /// Fails with [`Error::BadConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<Tracer> {
        if self.first_ttl.0 == 0 {
            return Err(Error::BadConfig(String::from("first_ttl must be at least 1")));
        }
        if self.max_ttl.0 > MAX_TTL {
            return Err(Error::BadConfig(format!(
                "max_ttl {} > {MAX_TTL}",
                self.max_ttl.0
            )));
        }
        if self.first_ttl > self.max_ttl {
            return Err(Error::BadConfig(format!(
                "first_ttl {} > max_ttl {}",
                self.first_ttl.0, self.max_ttl.0
            )));
        }
        if self.probes_per_hop.0 == 0 {
            return Err(Error::BadConfig(String::from(
                "probes_per_hop must be at least 1",
            )));
        }
        if !(1..=MAX_INFLIGHT).contains(&self.max_inflight.0) {
            return Err(Error::BadConfig(format!(
                "max_inflight {} not in range 1..={MAX_INFLIGHT}",
                self.max_inflight.0
            )));
        }
        let packet_size = usize::from(self.packet_size.0);
        if !(MIN_PACKET_SIZE_ICMP..=MAX_PACKET_SIZE).contains(&packet_size) {
            return Err(Error::BadConfig(format!(
                "packet_size {packet_size} not in range {MIN_PACKET_SIZE_ICMP}..={MAX_PACKET_SIZE}"
            )));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "probe_timeout must be greater than zero",
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "read_timeout must be greater than zero",
            )));
        }
        let strategy = StrategyConfig {
            target_addr: self.target_addr,
            trace_identifier: self.trace_identifier,
            first_ttl: self.first_ttl,
            max_ttl: self.max_ttl,
            max_attempts: self.probes_per_hop,
            max_inflight: self.max_inflight,
            initial_sequence: self.initial_sequence,
            probe_timeout: self.probe_timeout,
            read_timeout: self.read_timeout,
        };
        Ok(Tracer::new(
            self.source_addr,
            self.packet_size,
            self.payload_pattern,
            self.tos,
            strategy,
            self.drop_privileges,
        ))
    }
}
