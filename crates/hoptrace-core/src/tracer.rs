use crate::cancel::CancelToken;
use crate::config::StrategyConfig;
use crate::error::{Error, Result};
use crate::report::{HopResult, TraceReport};
use crate::types::{
    MaxAttempts, MaxInflight, PacketSize, PayloadPattern, Sequence, TimeToLive, TraceId,
    TypeOfService,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

/// A path tracer.
///
/// Build a `Tracer` with a [`Builder`](crate::Builder).
///
/// A `Tracer` is cheap to clone; all clones share the same configuration and [`CancelToken`].
///
/// # Examples
///
/// Trace the path to a target and print each hop as it resolves:
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// # use std::net::Ipv4Addr;
/// # use hoptrace_core::Builder;
/// let tracer = Builder::new(Ipv4Addr::new(1, 1, 1, 1)).build()?;
/// let report = tracer.run_with(|hop| println!("{hop:?}"))?;
/// println!("{:?}", report.summary);
/// # Ok(())
/// # }
/// ```
///
/// Trace on a background thread and cancel it:
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// # use std::net::Ipv4Addr;
/// # use hoptrace_core::Builder;
/// let (tracer, handle) = Builder::new(Ipv4Addr::new(1, 1, 1, 1)).build()?.spawn()?;
/// tracer.cancel();
/// let report = handle.join().expect("tracer thread panicked")?;
/// println!("traced {} hops", report.hops.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<inner::TracerInner>,
}

impl Tracer {
    #[must_use]
    pub(crate) fn new(
        source_addr: Option<Ipv4Addr>,
        packet_size: PacketSize,
        payload_pattern: PayloadPattern,
        tos: TypeOfService,
        strategy: StrategyConfig,
        drop_privileges: bool,
    ) -> Self {
        Self {
            inner: Arc::new(inner::TracerInner::new(
                source_addr,
                packet_size,
                payload_pattern,
                tos,
                strategy,
                drop_privileges,
            )),
        }
    }

    /// Run the tracer on the current thread.
    ///
    /// Blocks until the trace completes, is cancelled or fails.
    pub fn run(&self) -> Result<TraceReport> {
        self.inner.run_with(|_| ())
    }

    /// Run the tracer on the current thread, calling `func` as each hop resolves.
    ///
    /// Hops are passed to `func` in increasing hop order.
    pub fn run_with<F: FnMut(&HopResult)>(&self, func: F) -> Result<TraceReport> {
        self.inner.run_with(func)
    }

    /// Run the tracer on a new thread.
    ///
    /// Returns a clone of the `Tracer`, which may be used to cancel the trace, and the handle of
    /// the tracing thread.
    pub fn spawn(self) -> Result<(Self, JoinHandle<Result<TraceReport>>)> {
        self.spawn_with(|_| ())
    }

    /// Run the tracer on a new thread, calling `func` as each hop resolves.
    pub fn spawn_with<F: FnMut(&HopResult) + Send + 'static>(
        self,
        func: F,
    ) -> Result<(Self, JoinHandle<Result<TraceReport>>)> {
        let tracer = self.clone();
        let handle = thread::Builder::new()
            .name(format!("tracer-{}", self.trace_identifier().0))
            .spawn(move || tracer.run_with(func))
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok((self, handle))
    }

    /// Request that a running trace stops.
    ///
    /// The trace returns a report of the hops resolved so far.
    pub fn cancel(&self) {
        self.inner.cancel_token().cancel();
    }

    /// The token used to cancel this tracer.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel_token().clone()
    }

    /// The source address.
    ///
    /// If no source address was configured this is `None` until the tracer has discovered it.
    #[must_use]
    pub fn source_addr(&self) -> Option<Ipv4Addr> {
        self.inner.source_addr()
    }

    #[must_use]
    pub fn target_addr(&self) -> Ipv4Addr {
        self.inner.strategy().target_addr
    }

    #[must_use]
    pub fn packet_size(&self) -> PacketSize {
        self.inner.packet_size()
    }

    #[must_use]
    pub fn payload_pattern(&self) -> PayloadPattern {
        self.inner.payload_pattern()
    }

    #[must_use]
    pub fn tos(&self) -> TypeOfService {
        self.inner.tos()
    }

    #[must_use]
    pub fn trace_identifier(&self) -> TraceId {
        self.inner.strategy().trace_identifier
    }

    #[must_use]
    pub fn first_ttl(&self) -> TimeToLive {
        self.inner.strategy().first_ttl
    }

    #[must_use]
    pub fn max_ttl(&self) -> TimeToLive {
        self.inner.strategy().max_ttl
    }

    #[must_use]
    pub fn max_attempts(&self) -> MaxAttempts {
        self.inner.strategy().max_attempts
    }

    #[must_use]
    pub fn max_inflight(&self) -> MaxInflight {
        self.inner.strategy().max_inflight
    }

    #[must_use]
    pub fn initial_sequence(&self) -> Sequence {
        self.inner.strategy().initial_sequence
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        self.inner.strategy().probe_timeout
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.inner.strategy().read_timeout
    }

    #[must_use]
    pub fn drop_privileges(&self) -> bool {
        self.inner.drop_privileges()
    }
}

mod inner {
    use crate::cancel::CancelToken;
    use crate::config::{SessionConfig, StrategyConfig};
    use crate::error::{Error, Result};
    use crate::net::channel::Session;
    use crate::net::source::SourceAddr;
    use crate::net::{PlatformImpl, SocketImpl, Transport};
    use crate::report::{HopResult, TraceReport};
    use crate::strategy::Strategy;
    use crate::types::{PacketSize, PayloadPattern, TypeOfService};
    use hoptrace_privilege::Privilege;
    use std::net::Ipv4Addr;
    use std::sync::OnceLock;
    use tracing::instrument;

    #[derive(Debug)]
    pub(super) struct TracerInner {
        source_addr: Option<Ipv4Addr>,
        packet_size: PacketSize,
        payload_pattern: PayloadPattern,
        tos: TypeOfService,
        strategy: StrategyConfig,
        drop_privileges: bool,
        cancel: CancelToken,
        src: OnceLock<Ipv4Addr>,
    }

    impl TracerInner {
        pub(super) fn new(
            source_addr: Option<Ipv4Addr>,
            packet_size: PacketSize,
            payload_pattern: PayloadPattern,
            tos: TypeOfService,
            strategy: StrategyConfig,
            drop_privileges: bool,
        ) -> Self {
            Self {
                source_addr,
                packet_size,
                payload_pattern,
                tos,
                strategy,
                drop_privileges,
                cancel: CancelToken::new(),
                src: OnceLock::new(),
            }
        }

        #[instrument(skip_all, level = "trace")]
        pub(super) fn run_with<F: FnMut(&HopResult)>(&self, func: F) -> Result<TraceReport> {
            self.run_internal(func).map_err(|err| {
                tracing::error!(%err, "trace failed");
                err
            })
        }

        pub(super) const fn cancel_token(&self) -> &CancelToken {
            &self.cancel
        }

        pub(super) fn source_addr(&self) -> Option<Ipv4Addr> {
            self.src.get().copied().or(self.source_addr)
        }

        pub(super) const fn packet_size(&self) -> PacketSize {
            self.packet_size
        }

        pub(super) const fn payload_pattern(&self) -> PayloadPattern {
            self.payload_pattern
        }

        pub(super) const fn tos(&self) -> TypeOfService {
            self.tos
        }

        pub(super) const fn strategy(&self) -> &StrategyConfig {
            &self.strategy
        }

        pub(super) const fn drop_privileges(&self) -> bool {
            self.drop_privileges
        }

        /// Open the transport session and trace the path.
        ///
        /// The session is always closed before returning, whether or not the trace succeeded.
        fn run_internal<F: FnMut(&HopResult)>(&self, func: F) -> Result<TraceReport> {
            let source_addr = match self.source_addr {
                None => SourceAddr::discover::<PlatformImpl>(self.strategy.target_addr)?,
                Some(addr) => addr,
            };
            if self.src.get().is_none() {
                self.src
                    .set(source_addr)
                    .map_err(|_| Error::Other(String::from("failed to set source_addr")))?;
            }
            let session_config = self.make_session_config(source_addr);
            let mut session = Session::<SocketImpl>::open(&session_config)?;
            let result = self.trace(&mut session, func);
            session.close();
            result
        }

        fn trace<F: FnMut(&HopResult)>(
            &self,
            session: &mut Session<SocketImpl>,
            func: F,
        ) -> Result<TraceReport> {
            if self.drop_privileges {
                Privilege::drop_privileges()?;
            }
            Strategy::new(&self.strategy, func).run(session, &self.cancel)
        }

        const fn make_session_config(&self, source_addr: Ipv4Addr) -> SessionConfig {
            SessionConfig {
                source_addr,
                target_addr: self.strategy.target_addr,
                packet_size: self.packet_size,
                payload_pattern: self.payload_pattern,
                tos: self.tos,
            }
        }
    }
}
