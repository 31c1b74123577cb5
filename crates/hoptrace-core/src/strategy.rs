use self::state::TracerState;
use crate::cancel::CancelToken;
use crate::config::StrategyConfig;
use crate::correlator::Correlation;
use crate::error::{Error, Result};
use crate::net::Transport;
use crate::report::{HopOutcome, HopResult, TraceReport, TraceSummary};
use std::time::SystemTime;
use tracing::instrument;

/// Trace a path to a target.
///
/// Hops are probed in a sliding window of `max_inflight` hop limits starting at `first_ttl`. With
/// a window of one (the default) each hop, including its retries, is resolved before the next is
/// started. With a larger window several hop limits are probed concurrently and the lowest hop
/// which reaches the target (or reports it unreachable) becomes the last hop of the trace; hops
/// beyond it are abandoned.
///
/// Each resolved hop is published to `on_hop` in increasing hop order, regardless of the order
/// in which responses arrive.
#[derive(Debug, Clone)]
pub struct Strategy<F> {
    config: StrategyConfig,
    on_hop: F,
}

impl<F: FnMut(&HopResult)> Strategy<F> {
    #[instrument(skip_all, level = "trace")]
    pub fn new(config: &StrategyConfig, on_hop: F) -> Self {
        tracing::debug!(?config);
        Self {
            config: *config,
            on_hop,
        }
    }

    /// Run the trace to completion, or until cancelled, and return the report.
    ///
    /// Probes still awaiting a response when the trace ends (those beyond the last hop of a
    /// pipelined trace, or any probe of a cancelled trace) are abandoned; a later response to one
    /// of them is never matched.
    ///
    /// A transport failure aborts the trace; hops already published to `on_hop` are unaffected.
    #[instrument(skip_all, level = "trace")]
    pub fn run<T: Transport>(mut self, transport: &mut T, cancel: &CancelToken) -> Result<TraceReport> {
        let mut st = TracerState::new(self.config);
        let summary = loop {
            if cancel.is_cancelled() {
                tracing::debug!("trace cancelled");
                break TraceSummary::Cancelled;
            }
            st.expire_probes(SystemTime::now());
            if let Some(summary) = self.publish_hops(&mut st) {
                break summary;
            }
            self.send_probes(transport, &mut st)?;
            self.recv_response(transport, &mut st)?;
        };
        st.abandon_probes();
        Ok(st.into_report(summary))
    }

    /// Publish every resolved hop which directly follows the last published hop.
    ///
    /// Returns the summary once the last hop of the trace has been published.
    fn publish_hops(&mut self, st: &mut TracerState) -> Option<TraceSummary> {
        while let Some(hop) = st.next_resolved_hop() {
            tracing::debug!(?hop);
            (self.on_hop)(&hop);
            match hop.outcome {
                HopOutcome::Destination => return Some(TraceSummary::DestinationReached),
                HopOutcome::Unreachable(_) => return Some(TraceSummary::Unreachable),
                HopOutcome::Intermediate | HopOutcome::NoResponse => {}
            }
            if hop.ttl >= self.config.max_ttl {
                return Some(TraceSummary::NotReached);
            }
        }
        None
    }

    /// Send a probe for every hop in the window which needs one.
    fn send_probes<T: Transport>(&self, transport: &mut T, st: &mut TracerState) -> Result<()> {
        for ttl in st.window() {
            if st.needs_probe(ttl) {
                let probe = st.next_probe(ttl, SystemTime::now())?;
                match transport.send(&probe) {
                    Ok(()) => st.probe_sent(probe)?,
                    Err(Error::ProbeFailed(err)) => {
                        tracing::debug!(%err, ?probe, "probe failed");
                        st.probe_failed(probe);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    /// Wait up to `read_timeout` for a response and apply it to the hop it belongs to.
    fn recv_response<T: Transport>(&self, transport: &mut T, st: &mut TracerState) -> Result<()> {
        if let Some(datagram) = transport.receive_within(self.config.read_timeout)? {
            match st.correlate(&datagram) {
                Correlation::Matched(matched) => {
                    tracing::debug!(?matched);
                    st.probe_matched(&matched);
                }
                Correlation::Unmatched => tracing::trace!("unmatched datagram"),
                Correlation::Malformed => {}
            }
        }
        Ok(())
    }
}

/// Mutable state needed for the tracing algorithm.
///
/// This is contained within a submodule to ensure that mutations are only performed via methods
/// on the `TracerState` struct.
mod state {
    use crate::config::StrategyConfig;
    use crate::correlator::{Correlation, Correlator, MatchedProbe, OutstandingProbes};
    use crate::error::Result;
    use crate::net::Datagram;
    use crate::probe::{Probe, ProbeBuilder};
    use crate::prober::HopProber;
    use crate::report::{HopResult, TraceReport, TraceSummary};
    use crate::types::{Sequence, TimeToLive};
    use std::ops::RangeInclusive;
    use std::time::SystemTime;
    use tracing::instrument;

    #[derive(Debug)]
    pub struct TracerState {
        config: StrategyConfig,
        builder: ProbeBuilder,
        correlator: Correlator,
        /// Probes awaiting a response.
        outstanding: OutstandingProbes,
        /// One prober per hop, indexed from `first_ttl`, created as the window advances.
        hops: Vec<HopProber>,
        /// The sequence for the next probe.
        sequence: Sequence,
        /// The hop to be published next.
        next_publish: TimeToLive,
        /// The lowest hop which reached the target or reported it unreachable.
        terminal_ttl: Option<TimeToLive>,
        /// Hops published so far.
        published: Vec<HopResult>,
    }

    impl TracerState {
        pub fn new(config: StrategyConfig) -> Self {
            Self {
                config,
                builder: ProbeBuilder::new(config.trace_identifier, config.max_ttl),
                correlator: Correlator::new(config.trace_identifier),
                outstanding: OutstandingProbes::new(),
                hops: Vec::new(),
                sequence: config.initial_sequence,
                next_publish: config.first_ttl,
                terminal_ttl: None,
                published: Vec::new(),
            }
        }

        /// The hops which may currently be probed.
        ///
        /// The window starts at the next hop to publish and spans at most `max_inflight` hops,
        /// ending no later than the terminal hop (if known) or `max_ttl`.
        pub fn window(&self) -> RangeInclusive<u8> {
            let start = self.next_publish.0;
            let width = self.config.max_inflight.0.max(1);
            let limit = self.terminal_ttl.unwrap_or(self.config.max_ttl).0;
            let end = start.saturating_add(width - 1).min(limit);
            start..=end
        }

        pub fn needs_probe(&mut self, ttl: u8) -> bool {
            self.hop_mut(TimeToLive(ttl))
                .is_some_and(|hop| hop.needs_probe())
        }

        /// Build the probe for the next attempt at hop `ttl`.
        #[instrument(skip(self), level = "trace")]
        pub fn next_probe(&mut self, ttl: u8, sent: SystemTime) -> Result<Probe> {
            let ttl = TimeToLive(ttl);
            let attempt = self.hop_mut(ttl).map_or(1, |hop| hop.attempts() + 1);
            let probe = self.builder.build(ttl, self.sequence, attempt, sent)?;
            self.sequence = self.sequence.next();
            Ok(probe)
        }

        /// Record a probe as sent and awaiting a response.
        pub fn probe_sent(&mut self, probe: Probe) -> Result<()> {
            self.outstanding.insert(probe)?;
            if let Some(hop) = self.hop_mut(probe.ttl) {
                hop.on_sent(probe.sequence);
            }
            Ok(())
        }

        /// Record a probe which could not be sent as an attempt with no response.
        pub fn probe_failed(&mut self, probe: Probe) {
            if let Some(hop) = self.hop_mut(probe.ttl) {
                hop.on_sent(probe.sequence);
                hop.on_timeout(probe.sequence);
            }
        }

        /// Time out every probe which has been outstanding for at least `probe_timeout`.
        pub fn expire_probes(&mut self, now: SystemTime) {
            for probe in self.outstanding.expire(now, self.config.probe_timeout) {
                tracing::trace!(?probe, "probe timed out");
                if let Some(hop) = self.hop_mut(probe.ttl) {
                    hop.on_timeout(probe.sequence);
                }
            }
        }

        pub fn correlate(&mut self, datagram: &Datagram) -> Correlation {
            self.correlator.correlate(datagram, &mut self.outstanding)
        }

        /// Apply a matched response to its hop.
        pub fn probe_matched(&mut self, matched: &MatchedProbe) {
            let ttl = matched.probe.ttl;
            let Some(hop) = self.hop_mut(ttl) else {
                return;
            };
            hop.on_response(matched);
            if hop.is_terminal() && self.terminal_ttl.map_or(true, |terminal| ttl < terminal) {
                self.terminal_ttl = Some(ttl);
            }
        }

        /// Take the next hop to publish if it has resolved.
        pub fn next_resolved_hop(&mut self) -> Option<HopResult> {
            if self.next_publish > self.config.max_ttl {
                return None;
            }
            let hop = self.hop_mut(self.next_publish)?;
            if !hop.is_final() {
                return None;
            }
            let result = hop.result();
            self.published.push(result);
            self.next_publish += TimeToLive(1);
            Some(result)
        }

        /// Discard every probe still awaiting a response.
        pub fn abandon_probes(&mut self) -> Vec<Probe> {
            let abandoned = self.outstanding.drain();
            if !abandoned.is_empty() {
                tracing::debug!(count = abandoned.len(), "abandoned outstanding probes");
            }
            abandoned
        }

        /// The number of probes awaiting a response.
        pub fn outstanding(&self) -> usize {
            self.outstanding.len()
        }

        pub fn into_report(self, summary: TraceSummary) -> TraceReport {
            TraceReport {
                destination: self.config.target_addr,
                hops: self.published,
                summary,
            }
        }

        /// The prober for hop `ttl`, creating the probers for all hops up to `ttl` as needed.
        fn hop_mut(&mut self, ttl: TimeToLive) -> Option<&mut HopProber> {
            if ttl < self.config.first_ttl || ttl > self.config.max_ttl {
                return None;
            }
            let index = usize::from(ttl.0 - self.config.first_ttl.0);
            while self.hops.len() <= index {
                let offset = u8::try_from(self.hops.len()).ok()?;
                self.hops.push(HopProber::new(
                    self.config.first_ttl + TimeToLive(offset),
                    self.config.target_addr,
                    self.config.max_attempts,
                ));
            }
            self.hops.get_mut(index)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::state::TracerState;
    use super::*;
    use crate::error::{IoError, IoOperation};
    use crate::net::{Datagram, MockTransport};
    use crate::probe::Probe;
    use crate::report::{HopOutcome, HopResult};
    use crate::types::{MaxAttempts, MaxInflight, TimeToLive, TraceId};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    const TRACE_ID: TraceId = TraceId(4321);
    const SOURCE: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 21);
    const TARGET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);

    const fn router(ttl: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 1, ttl)
    }

    fn config(max_ttl: u8, max_inflight: u8) -> StrategyConfig {
        StrategyConfig {
            target_addr: TARGET,
            trace_identifier: TRACE_ID,
            max_ttl: TimeToLive(max_ttl),
            max_attempts: MaxAttempts(3),
            max_inflight: MaxInflight(max_inflight),
            probe_timeout: Duration::ZERO,
            read_timeout: Duration::from_millis(1),
            ..StrategyConfig::default()
        }
    }

    fn ipv4_header(responder: Ipv4Addr, total_length: u8) -> Vec<u8> {
        let mut buf = vec![0x45, 0x00, 0x00, total_length, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00];
        buf.extend(responder.octets());
        buf.extend(SOURCE.octets());
        buf
    }

    /// An `ICMP` error of `icmp_type` and `code` quoting the `EchoRequest` for `probe`.
    fn icmp_error(responder: Ipv4Addr, icmp_type: u8, code: u8, probe: &Probe) -> Vec<u8> {
        let mut buf = ipv4_header(responder, 56);
        buf.extend([icmp_type, code, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        buf.extend([0x45, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x40, 0x00, probe.ttl.0, 0x01, 0x00, 0x00]);
        buf.extend(SOURCE.octets());
        buf.extend(TARGET.octets());
        buf.extend([0x08, 0x00, 0x00, 0x00]);
        buf.extend(probe.identifier.0.to_be_bytes());
        buf.extend(probe.sequence.0.to_be_bytes());
        buf
    }

    fn time_exceeded(responder: Ipv4Addr, probe: &Probe) -> Vec<u8> {
        icmp_error(responder, 11, 0, probe)
    }

    fn unreachable(responder: Ipv4Addr, code: u8, probe: &Probe) -> Vec<u8> {
        icmp_error(responder, 3, code, probe)
    }

    fn echo_reply(probe: &Probe) -> Vec<u8> {
        let mut buf = ipv4_header(TARGET, 28);
        buf.extend([0x00, 0x00, 0x00, 0x00]);
        buf.extend(probe.identifier.0.to_be_bytes());
        buf.extend(probe.sequence.0.to_be_bytes());
        buf
    }

    type Respond = dyn Fn(&Probe) -> Option<(Vec<u8>, Duration)> + Send + Sync;

    /// A `MockTransport` which answers each probe using `respond`, one datagram per receive.
    ///
    /// Responses are delivered in the order probes were sent, or in reverse order if `reverse`.
    /// The receive time of each response is the probe send time plus the returned rtt.
    fn simulated(
        respond: Arc<Respond>,
        reverse: bool,
    ) -> (MockTransport, Arc<Mutex<Vec<Probe>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let pending = Arc::new(Mutex::new(VecDeque::<Probe>::new()));
        let mut transport = MockTransport::new();
        let sent_probes = sent.clone();
        let sent_pending = pending.clone();
        transport.expect_send().returning(move |probe| {
            sent_probes.lock().push(*probe);
            sent_pending.lock().push_back(*probe);
            Ok(())
        });
        transport.expect_receive_within().returning(move |_| {
            loop {
                let next = if reverse {
                    pending.lock().pop_back()
                } else {
                    pending.lock().pop_front()
                };
                let Some(probe) = next else {
                    return Ok(None);
                };
                if let Some((bytes, rtt)) = respond(&probe) {
                    return Ok(Some(Datagram::new(bytes, probe.sent + rtt)));
                }
            }
        });
        (transport, sent)
    }

    fn run(
        config: &StrategyConfig,
        transport: &mut MockTransport,
        cancel: &CancelToken,
    ) -> anyhow::Result<(TraceReport, Vec<HopResult>)> {
        let published = Arc::new(Mutex::new(Vec::new()));
        let on_hop = {
            let published = published.clone();
            move |hop: &HopResult| published.lock().push(*hop)
        };
        let report = Strategy::new(config, on_hop).run(transport, cancel)?;
        let published = published.lock().clone();
        Ok((report, published))
    }

    fn hop(ttl: u8, responder: Ipv4Addr, rtt_ms: u64, outcome: HopOutcome) -> HopResult {
        HopResult {
            ttl: TimeToLive(ttl),
            responder: Some(responder),
            rtt: Some(Duration::from_millis(rtt_ms)),
            outcome,
            attempts: 1,
        }
    }

    fn no_response(ttl: u8, attempts: u8) -> HopResult {
        HopResult {
            ttl: TimeToLive(ttl),
            responder: None,
            rtt: None,
            outcome: HopOutcome::NoResponse,
            attempts,
        }
    }

    fn silent_path(_: &Probe) -> Option<(Vec<u8>, Duration)> {
        None
    }

    /// A path with the target at hop 3.
    fn five_hop_path(probe: &Probe) -> Option<(Vec<u8>, Duration)> {
        match probe.ttl.0 {
            1 => Some((time_exceeded(router(1), probe), Duration::from_millis(10))),
            2 => Some((time_exceeded(router(2), probe), Duration::from_millis(15))),
            _ => Some((echo_reply(probe), Duration::from_millis(8))),
        }
    }

    #[test]
    fn test_destination_reached_at_hop_three() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(five_hop_path), false);
        let (report, published) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        let expected = vec![
            hop(1, router(1), 10, HopOutcome::Intermediate),
            hop(2, router(2), 15, HopOutcome::Intermediate),
            hop(3, TARGET, 8, HopOutcome::Destination),
        ];
        assert_eq!(expected, report.hops);
        assert_eq!(expected, published);
        assert_eq!(TraceSummary::DestinationReached, report.summary);
        assert_eq!(TARGET, report.destination);
        let ttls = sent.lock().iter().map(|p| p.ttl.0).collect::<Vec<_>>();
        assert_eq!(vec![1, 2, 3], ttls);
        Ok(())
    }

    #[test]
    fn test_all_hops_time_out() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(silent_path), false);
        let (report, published) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        let expected = (1..=30).map(|ttl| no_response(ttl, 3)).collect::<Vec<_>>();
        assert_eq!(expected, report.hops);
        assert_eq!(expected, published);
        assert_eq!(TraceSummary::NotReached, report.summary);
        let sent = sent.lock();
        assert_eq!(90, sent.len());
        let mut sequences = sent.iter().map(|p| p.sequence).collect::<Vec<_>>();
        sequences.dedup();
        assert_eq!(90, sequences.len());
        Ok(())
    }

    #[test]
    fn test_unresponsive_hop_then_unreachable() -> anyhow::Result<()> {
        let respond = |probe: &Probe| match probe.ttl.0 {
            1 => Some((time_exceeded(router(1), probe), Duration::from_millis(10))),
            2 => None,
            _ => Some((unreachable(router(3), 1, probe), Duration::from_millis(20))),
        };
        let (mut transport, sent) = simulated(Arc::new(respond), false);
        let (report, _) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        let expected = vec![
            hop(1, router(1), 10, HopOutcome::Intermediate),
            no_response(2, 3),
            hop(3, router(3), 20, HopOutcome::Unreachable(1)),
        ];
        assert_eq!(expected, report.hops);
        assert_eq!(TraceSummary::Unreachable, report.summary);
        let ttls = sent.lock().iter().map(|p| p.ttl.0).collect::<Vec<_>>();
        assert_eq!(vec![1, 2, 2, 2, 3], ttls);
        Ok(())
    }

    #[test]
    fn test_hop_answers_on_retry() -> anyhow::Result<()> {
        let respond = |probe: &Probe| match (probe.ttl.0, probe.attempt) {
            (1, 1) => None,
            (1, _) => Some((time_exceeded(router(1), probe), Duration::from_millis(5))),
            _ => Some((echo_reply(probe), Duration::from_millis(9))),
        };
        let (mut transport, _) = simulated(Arc::new(respond), false);
        let (report, _) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        let expected = vec![
            HopResult {
                attempts: 2,
                ..hop(1, router(1), 5, HopOutcome::Intermediate)
            },
            hop(2, TARGET, 9, HopOutcome::Destination),
        ];
        assert_eq!(expected, report.hops);
        Ok(())
    }

    #[test]
    fn test_malformed_and_foreign_responses_ignored() -> anyhow::Result<()> {
        let respond = |probe: &Probe| match (probe.ttl.0, probe.attempt) {
            (1, 1) => Some((vec![0x45, 0x00, 0x00], Duration::from_millis(1))),
            (1, 2) => {
                let foreign = Probe {
                    identifier: TraceId(1),
                    ..*probe
                };
                Some((time_exceeded(router(1), &foreign), Duration::from_millis(1)))
            }
            (1, _) => Some((time_exceeded(router(1), probe), Duration::from_millis(7))),
            _ => Some((echo_reply(probe), Duration::from_millis(9))),
        };
        let (mut transport, _) = simulated(Arc::new(respond), false);
        let (report, _) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        let expected = vec![
            HopResult {
                attempts: 3,
                ..hop(1, router(1), 7, HopOutcome::Intermediate)
            },
            hop(2, TARGET, 9, HopOutcome::Destination),
        ];
        assert_eq!(expected, report.hops);
        Ok(())
    }

    #[test]
    fn test_time_exceeded_from_target_is_destination() -> anyhow::Result<()> {
        let respond = |probe: &Probe| match probe.ttl.0 {
            1 => Some((time_exceeded(router(1), probe), Duration::from_millis(3))),
            _ => Some((time_exceeded(TARGET, probe), Duration::from_millis(4))),
        };
        let (mut transport, _) = simulated(Arc::new(respond), false);
        let (report, _) = run(&config(30, 1), &mut transport, &CancelToken::new())?;
        assert_eq!(2, report.hops.len());
        assert_eq!(HopOutcome::Destination, report.hops[1].outcome);
        assert_eq!(TraceSummary::DestinationReached, report.summary);
        Ok(())
    }

    #[test]
    fn test_pipelined_out_of_order_responses() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(five_hop_path), true);
        let config = StrategyConfig {
            probe_timeout: Duration::from_secs(3600),
            ..config(30, 4)
        };
        let (report, published) = run(&config, &mut transport, &CancelToken::new())?;
        let expected = vec![
            hop(1, router(1), 10, HopOutcome::Intermediate),
            hop(2, router(2), 15, HopOutcome::Intermediate),
            hop(3, TARGET, 8, HopOutcome::Destination),
        ];
        assert_eq!(expected, report.hops);
        assert_eq!(expected, published);
        assert_eq!(TraceSummary::DestinationReached, report.summary);
        let sent = sent.lock();
        let ttls = sent.iter().map(|p| p.ttl.0).collect::<Vec<_>>();
        assert_eq!(vec![1, 2, 3, 4], ttls);
        Ok(())
    }

    #[test]
    fn test_pipelined_probes_beyond_destination_abandoned() -> anyhow::Result<()> {
        let config = StrategyConfig {
            probe_timeout: Duration::from_secs(3600),
            ..config(30, 4)
        };
        let mut st = TracerState::new(config);
        let now = SystemTime::now();
        let mut probes = Vec::new();
        for ttl in st.window() {
            let probe = st.next_probe(ttl, now)?;
            st.probe_sent(probe)?;
            probes.push(probe);
        }
        assert_eq!(4, st.outstanding());
        let responses = [
            echo_reply(&probes[2]),
            time_exceeded(router(1), &probes[0]),
            time_exceeded(router(2), &probes[1]),
        ];
        for bytes in responses {
            let datagram = Datagram::new(bytes, now + Duration::from_millis(5));
            let Correlation::Matched(matched) = st.correlate(&datagram) else {
                anyhow::bail!("expected a match");
            };
            st.probe_matched(&matched);
        }
        let outcomes = std::iter::from_fn(|| st.next_resolved_hop())
            .map(|hop| hop.outcome)
            .collect::<Vec<_>>();
        assert_eq!(
            vec![HopOutcome::Intermediate, HopOutcome::Intermediate, HopOutcome::Destination],
            outcomes
        );
        assert_eq!(1, st.outstanding());
        assert_eq!(vec![probes[3]], st.abandon_probes());
        assert_eq!(0, st.outstanding());
        let late = Datagram::new(echo_reply(&probes[3]), now + Duration::from_millis(9));
        assert_eq!(Correlation::Unmatched, st.correlate(&late));
        Ok(())
    }

    #[test]
    fn test_pipelined_all_hops_time_out() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(silent_path), false);
        let (report, _) = run(&config(10, 4), &mut transport, &CancelToken::new())?;
        let expected = (1..=10).map(|ttl| no_response(ttl, 3)).collect::<Vec<_>>();
        assert_eq!(expected, report.hops);
        assert_eq!(TraceSummary::NotReached, report.summary);
        assert_eq!(30, sent.lock().len());
        Ok(())
    }

    #[test]
    fn test_cancelled_before_start() -> anyhow::Result<()> {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        transport.expect_receive_within().never();
        let cancel = CancelToken::new();
        cancel.cancel();
        let (report, published) = run(&config(30, 1), &mut transport, &cancel)?;
        assert!(report.hops.is_empty());
        assert!(published.is_empty());
        assert_eq!(TraceSummary::Cancelled, report.summary);
        Ok(())
    }

    #[test]
    fn test_cancelled_returns_partial_report() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(silent_path), false);
        let cancel = CancelToken::new();
        let on_hop = {
            let cancel = cancel.clone();
            move |hop: &HopResult| {
                if hop.ttl == TimeToLive(2) {
                    cancel.cancel();
                }
            }
        };
        let report = Strategy::new(&config(30, 1), on_hop).run(&mut transport, &cancel)?;
        assert_eq!(vec![no_response(1, 3), no_response(2, 3)], report.hops);
        assert_eq!(TraceSummary::Cancelled, report.summary);
        assert!(sent.lock().iter().all(|p| p.ttl.0 <= 3));
        Ok(())
    }

    #[test]
    fn test_probe_failed_is_absorbed() -> anyhow::Result<()> {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        for _ in 0..3 {
            transport
                .expect_send()
                .times(1)
                .in_sequence(&mut seq)
                .withf(|probe| probe.ttl == TimeToLive(1))
                .returning(|_| {
                    Err(Error::ProbeFailed(IoError::SendTo(
                        io::Error::from(io::ErrorKind::InvalidInput),
                        SocketAddr::new(IpAddr::V4(TARGET), 0),
                    )))
                });
            transport
                .expect_receive_within()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(None));
        }
        let (report, _) = run(&config(1, 1), &mut transport, &CancelToken::new())?;
        assert_eq!(vec![no_response(1, 3)], report.hops);
        assert_eq!(TraceSummary::NotReached, report.summary);
        Ok(())
    }

    #[test]
    fn test_transport_error_is_fatal() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        transport.expect_receive_within().times(1).returning(|_| {
            Err(Error::IoError(IoError::Other(
                io::Error::from(io::ErrorKind::Other),
                IoOperation::Read,
            )))
        });
        let res = run(&config(30, 1), &mut transport, &CancelToken::new());
        assert!(res.is_err());
    }

    #[test]
    fn test_first_ttl() -> anyhow::Result<()> {
        let (mut transport, sent) = simulated(Arc::new(five_hop_path), false);
        let config = StrategyConfig {
            first_ttl: TimeToLive(2),
            ..config(30, 1)
        };
        let (report, _) = run(&config, &mut transport, &CancelToken::new())?;
        let ttls = report.hops.iter().map(|h| h.ttl.0).collect::<Vec<_>>();
        assert_eq!(vec![2, 3], ttls);
        assert_eq!(2, sent.lock().len());
        Ok(())
    }
}
