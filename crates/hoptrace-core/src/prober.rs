use crate::correlator::MatchedProbe;
use crate::probe::ResponseKind;
use crate::report::{HopOutcome, HopResult};
use crate::types::{MaxAttempts, Sequence, TimeToLive};
use std::net::Ipv4Addr;
use std::time::Duration;

/// The state of a hop.
///
/// ```text
/// Idle -> Sent -> MatchedIntermediate
///                 MatchedDestination
///                 Unreachable
///                 TimedOut -> Sent (while attempts remain)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopState {
    Idle,
    Sent,
    MatchedIntermediate,
    MatchedDestination,
    TimedOut,
    Unreachable,
}

/// Tracks the attempts made to probe a single hop.
///
/// At most one probe is in flight for a hop at any time and every attempt uses the fresh
/// [`Sequence`] it was sent with, so a response can only resolve the attempt which produced it.
#[derive(Debug, Clone)]
pub struct HopProber {
    ttl: TimeToLive,
    target_addr: Ipv4Addr,
    max_attempts: MaxAttempts,
    state: HopState,
    attempts: u8,
    in_flight: Option<Sequence>,
    responder: Option<Ipv4Addr>,
    rtt: Option<Duration>,
    unreachable_code: u8,
}

impl HopProber {
    #[must_use]
    pub const fn new(ttl: TimeToLive, target_addr: Ipv4Addr, max_attempts: MaxAttempts) -> Self {
        Self {
            ttl,
            target_addr,
            max_attempts,
            state: HopState::Idle,
            attempts: 0,
            in_flight: None,
            responder: None,
            rtt: None,
            unreachable_code: 0,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    #[must_use]
    pub const fn state(&self) -> HopState {
        self.state
    }

    #[must_use]
    pub const fn attempts(&self) -> u8 {
        self.attempts
    }

    /// Should another probe be sent for this hop?
    #[must_use]
    pub const fn needs_probe(&self) -> bool {
        match self.state {
            HopState::Idle => true,
            HopState::TimedOut => self.attempts < self.max_attempts.0,
            _ => false,
        }
    }

    /// Has the hop resolved such that no further probes will be sent?
    #[must_use]
    pub const fn is_final(&self) -> bool {
        match self.state {
            HopState::Idle | HopState::Sent => false,
            HopState::TimedOut => self.attempts >= self.max_attempts.0,
            HopState::MatchedIntermediate
            | HopState::MatchedDestination
            | HopState::Unreachable => true,
        }
    }

    /// Has the hop resolved such that the trace ends here?
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            HopState::MatchedDestination | HopState::Unreachable
        )
    }

    /// `Idle | TimedOut -> Sent`
    pub fn on_sent(&mut self, sequence: Sequence) {
        debug_assert!(self.needs_probe());
        self.attempts += 1;
        self.in_flight = Some(sequence);
        self.state = HopState::Sent;
    }

    /// `Sent -> TimedOut`
    ///
    /// Ignored unless `sequence` is the attempt in flight.
    pub fn on_timeout(&mut self, sequence: Sequence) {
        if self.state == HopState::Sent && self.in_flight == Some(sequence) {
            self.in_flight = None;
            self.state = HopState::TimedOut;
        }
    }

    /// `Sent -> MatchedIntermediate | MatchedDestination | Unreachable`
    ///
    /// Ignored unless the matched probe is the attempt in flight.
    ///
    /// A `TimeExceeded` sent by the target itself is treated as reaching the destination.
    pub fn on_response(&mut self, matched: &MatchedProbe) {
        if self.state != HopState::Sent || self.in_flight != Some(matched.probe.sequence) {
            return;
        }
        self.in_flight = None;
        self.responder = Some(matched.responder);
        self.rtt = Some(matched.rtt());
        self.state = match matched.kind {
            ResponseKind::EchoReply => HopState::MatchedDestination,
            ResponseKind::TimeExceeded if matched.responder == self.target_addr => {
                HopState::MatchedDestination
            }
            ResponseKind::TimeExceeded => HopState::MatchedIntermediate,
            ResponseKind::DestinationUnreachable(code) => {
                self.unreachable_code = code;
                HopState::Unreachable
            }
        };
    }

    /// The result for this hop.
    ///
    /// A hop which has not resolved is reported as having no response.
    #[must_use]
    pub const fn result(&self) -> HopResult {
        let outcome = match self.state {
            HopState::MatchedIntermediate => HopOutcome::Intermediate,
            HopState::MatchedDestination => HopOutcome::Destination,
            HopState::Unreachable => HopOutcome::Unreachable(self.unreachable_code),
            HopState::Idle | HopState::Sent | HopState::TimedOut => HopOutcome::NoResponse,
        };
        let (responder, rtt) = match outcome {
            HopOutcome::NoResponse => (None, None),
            _ => (self.responder, self.rtt),
        };
        HopResult {
            ttl: self.ttl,
            responder,
            rtt,
            outcome,
            attempts: self.attempts,
        }
    }
}
