use crate::types::TimeToLive;
use std::net::Ipv4Addr;
use std::time::Duration;

/// How a hop resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopOutcome {
    /// An intermediate router reported the hop limit expired.
    Intermediate,
    /// The destination responded.
    Destination,
    /// The destination was reported unreachable, with the `ICMP` code.
    Unreachable(u8),
    /// No response was received for any attempt.
    NoResponse,
}

/// The result of probing a single hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopResult {
    /// The hop index (1-based) which is also the hop limit used to probe it.
    pub ttl: TimeToLive,
    /// The host which responded, if any.
    pub responder: Option<Ipv4Addr>,
    /// The round trip time of the answered probe, if any.
    pub rtt: Option<Duration>,
    pub outcome: HopOutcome,
    /// The number of probes sent for this hop.
    pub attempts: u8,
}

impl HopResult {
    /// Does this hop end the trace?
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.outcome,
            HopOutcome::Destination | HopOutcome::Unreachable(_)
        )
    }
}

/// How a trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSummary {
    /// The destination responded.
    DestinationReached,
    /// A hop reported the destination unreachable.
    Unreachable,
    /// The maximum number of hops was probed without reaching the destination.
    NotReached,
    /// The trace was cancelled before it completed.
    Cancelled,
}

/// The ordered result of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceReport {
    pub destination: Ipv4Addr,
    /// One entry per hop, in increasing hop order with no gaps.
    pub hops: Vec<HopResult>,
    pub summary: TraceSummary,
}

impl TraceReport {
    /// The last hop of the report, if any.
    #[must_use]
    pub fn last_hop(&self) -> Option<&HopResult> {
        self.hops.last()
    }

    /// Was the destination reached?
    #[must_use]
    pub fn destination_reached(&self) -> bool {
        self.summary == TraceSummary::DestinationReached
    }
}
