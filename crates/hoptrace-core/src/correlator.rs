use crate::error::{Error, Result};
use crate::net::ipv4::parse_response;
use crate::net::Datagram;
use crate::probe::{Probe, ResponseKind};
use crate::types::{Sequence, TraceId};
use indexmap::IndexMap;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime};
use tracing::instrument;

/// The probes which have been sent and are awaiting a response, keyed by correlation token.
///
/// Every token inserted leaves the table exactly once, either by [`OutstandingProbes::remove`]
/// when a response matches, by [`OutstandingProbes::expire`] when it times out or by
/// [`OutstandingProbes::drain`] when the trace ends with it still awaited.
///
/// Insertion order is not preserved; lookup and removal are constant time.
#[derive(Debug, Default)]
pub struct OutstandingProbes {
    probes: IndexMap<Sequence, Probe>,
}

impl OutstandingProbes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a probe which has just been sent.
    ///
    /// Fails with [`Error::DuplicateSequence`] if the token is already outstanding.
    pub fn insert(&mut self, probe: Probe) -> Result<()> {
        if self.probes.contains_key(&probe.sequence) {
            return Err(Error::DuplicateSequence(probe.sequence.0));
        }
        self.probes.insert(probe.sequence, probe);
        Ok(())
    }

    /// Remove and return the probe for `sequence`, if outstanding.
    pub fn remove(&mut self, sequence: Sequence) -> Option<Probe> {
        self.probes.swap_remove(&sequence)
    }

    /// Remove and return every probe sent at least `timeout` before `now`, oldest first.
    pub fn expire(&mut self, now: SystemTime, timeout: Duration) -> Vec<Probe> {
        let is_expired =
            |probe: &Probe| now.duration_since(probe.sent).unwrap_or_default() >= timeout;
        let mut expired = self
            .probes
            .values()
            .filter(|probe| is_expired(probe))
            .copied()
            .collect::<Vec<_>>();
        self.probes.retain(|_, probe| !is_expired(probe));
        expired.sort_by_key(|probe| probe.sent);
        expired
    }

    /// Remove and return every outstanding probe, oldest first.
    pub fn drain(&mut self) -> Vec<Probe> {
        let mut drained = self.probes.drain(..).map(|(_, probe)| probe).collect::<Vec<_>>();
        drained.sort_by_key(|probe| probe.sent);
        drained
    }

    /// The number of outstanding probes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

/// The result of correlating a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// The datagram is a response to an outstanding probe.
    Matched(MatchedProbe),
    /// The datagram is foreign traffic or a response to a probe which is no longer outstanding.
    Unmatched,
    /// The datagram could not be parsed.
    Malformed,
}

/// A response matched to the probe which produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedProbe {
    pub probe: Probe,
    pub kind: ResponseKind,
    pub responder: Ipv4Addr,
    pub received: SystemTime,
}

impl MatchedProbe {
    /// The round trip time of the probe.
    #[must_use]
    pub fn rtt(&self) -> Duration {
        self.received
            .duration_since(self.probe.sent)
            .unwrap_or_default()
    }
}

/// Matches received datagrams to outstanding probes.
#[derive(Debug, Clone, Copy)]
pub struct Correlator {
    trace_identifier: TraceId,
}

impl Correlator {
    #[must_use]
    pub const fn new(trace_identifier: TraceId) -> Self {
        Self { trace_identifier }
    }

    /// Correlate a received datagram against the outstanding probes.
    ///
    /// A matched probe is removed from `outstanding`.
    #[instrument(skip_all, level = "trace")]
    pub fn correlate(
        &self,
        datagram: &Datagram,
        outstanding: &mut OutstandingProbes,
    ) -> Correlation {
        let response = match parse_response(&datagram.bytes) {
            Ok(Some(response)) => response,
            Ok(None) => return Correlation::Unmatched,
            Err(err) => {
                tracing::debug!(%err, "discarding malformed response");
                return Correlation::Malformed;
            }
        };
        if response.identifier != self.trace_identifier.0 {
            tracing::trace!(response.identifier, "discarding foreign response");
            return Correlation::Unmatched;
        }
        match outstanding.remove(Sequence(response.sequence)) {
            Some(probe) => Correlation::Matched(MatchedProbe {
                probe,
                kind: response.kind,
                responder: response.responder,
                received: datagram.received,
            }),
            None => {
                tracing::debug!(response.sequence, "discarding response for unknown probe");
                Correlation::Unmatched
            }
        }
    }
}
