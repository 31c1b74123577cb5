use crate::error::{Error, Result};
use crate::types::{Sequence, TimeToLive, TraceId};
use std::time::SystemTime;

/// A single outbound probe attempt.
///
/// A `Probe` is immutable once built; a retry for the same hop is a new `Probe` with a fresh
/// [`Sequence`].
///
/// # Examples
///
/// ```
/// use hoptrace_core::{ProbeBuilder, Sequence, TimeToLive, TraceId};
/// use std::time::SystemTime;
///
/// let builder = ProbeBuilder::new(TraceId(1234), TimeToLive(30));
/// let probe = builder.build(TimeToLive(1), Sequence(33434), 1, SystemTime::now())?;
/// assert_eq!(TimeToLive(1), probe.ttl);
/// assert!(builder.build(TimeToLive(31), Sequence(33435), 1, SystemTime::now()).is_err());
/// # Ok::<(), hoptrace_core::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// The sequence of the probe, used as the correlation token.
    pub sequence: Sequence,
    /// The trace identifier.
    pub identifier: TraceId,
    /// The TTL of the probe.
    pub ttl: TimeToLive,
    /// Which attempt (1-based) at this hop the probe represents.
    pub attempt: u8,
    /// Timestamp when the probe was sent.
    pub sent: SystemTime,
}

/// Builds [`Probe`]s, enforcing the allowed hop limit range.
#[derive(Debug, Clone, Copy)]
pub struct ProbeBuilder {
    identifier: TraceId,
    max_ttl: TimeToLive,
}

impl ProbeBuilder {
    #[must_use]
    pub const fn new(identifier: TraceId, max_ttl: TimeToLive) -> Self {
        Self {
            identifier,
            max_ttl,
        }
    }

    /// Build a `Probe` for hop `ttl`.
    ///
    /// Fails with [`Error::InvalidHopLimit`] if `ttl` is not in `1..=max_ttl`.
    pub fn build(
        &self,
        ttl: TimeToLive,
        sequence: Sequence,
        attempt: u8,
        sent: SystemTime,
    ) -> Result<Probe> {
        if ttl.0 == 0 || ttl > self.max_ttl {
            return Err(Error::InvalidHopLimit(ttl.0, self.max_ttl.0));
        }
        Ok(Probe {
            sequence,
            identifier: self.identifier,
            ttl,
            attempt,
            sent,
        })
    }
}

/// The classification of a response which matched one of our probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The probe's hop limit expired at an intermediate router.
    TimeExceeded,
    /// The destination answered the probe.
    EchoReply,
    /// A router or the destination reported the destination unreachable, with the `ICMP` code.
    DestinationUnreachable(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, 30; "first hop")]
    #[test_case(30, 30; "last hop")]
    #[test_case(254, 254; "absolute max")]
    fn test_build_valid_ttl(ttl: u8, max_ttl: u8) -> anyhow::Result<()> {
        let builder = ProbeBuilder::new(TraceId(1234), TimeToLive(max_ttl));
        let sent = SystemTime::now();
        let probe = builder.build(TimeToLive(ttl), Sequence(33434), 1, sent)?;
        assert_eq!(TimeToLive(ttl), probe.ttl);
        assert_eq!(Sequence(33434), probe.sequence);
        assert_eq!(TraceId(1234), probe.identifier);
        assert_eq!(sent, probe.sent);
        Ok(())
    }

    #[test_case(0, 30; "zero")]
    #[test_case(31, 30; "above max")]
    #[test_case(255, 254; "above absolute max")]
    fn test_build_invalid_ttl(ttl: u8, max_ttl: u8) {
        let builder = ProbeBuilder::new(TraceId(1234), TimeToLive(max_ttl));
        let res = builder.build(TimeToLive(ttl), Sequence(33434), 1, SystemTime::now());
        assert!(
            matches!(res, Err(Error::InvalidHopLimit(t, m)) if t == ttl && m == max_ttl),
            "{res:?}"
        );
    }
}
