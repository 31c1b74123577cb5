//! hoptrace - hop-by-hop path discovery.
//!
//! This crate provides the tracing engine used by the `hoptrace` command line tool. It discovers
//! the sequence of routers between this host and an `IPv4` target by sending `ICMP` echo requests
//! with increasing hop limits and correlating the `ICMP` responses they provoke.
//!
//! # Example
//!
//! The following example builds and runs a tracer with default configuration and prints each hop
//! as it resolves:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::Ipv4Addr;
//! # use std::str::FromStr;
//! use hoptrace_core::Builder;
//!
//! let addr = Ipv4Addr::from_str("1.1.1.1")?;
//! let report = Builder::new(addr)
//!     .build()?
//!     .run_with(|hop| println!("{:?}", hop))?;
//! println!("{:?}", report.summary);
//! # Ok(())
//! # }
//! ```
//!
//! The following example probes up to 8 hops concurrently, sending 2 probes to each hop with a 1
//! second timeout:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::Ipv4Addr;
//! # use std::time::Duration;
//! use hoptrace_core::Builder;
//!
//! let report = Builder::new(Ipv4Addr::new(1, 1, 1, 1))
//!     .max_inflight(8)
//!     .probes_per_hop(2)
//!     .probe_timeout(Duration::from_secs(1))
//!     .build()?
//!     .run()?;
//! println!("{} hops", report.hops.len());
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Tracer`].
//! - [`Tracer::run`] - Run the tracer on the current thread.
//! - [`Tracer::run_with`] - Run the tracer with a custom hop handler.
//! - [`Tracer::spawn`] - Run the tracer on a new thread.
//! - [`Strategy`] - Drive a trace over any [`Transport`].
#![deny(unsafe_code)]

mod builder;
mod cancel;
mod config;
mod constants;
mod correlator;
mod error;
mod net;
mod probe;
mod prober;
mod report;
mod strategy;
mod tracer;
mod types;

pub use builder::Builder;
pub use cancel::CancelToken;
pub use config::{defaults, SessionConfig, StrategyConfig};
pub use constants::{MAX_INFLIGHT, MAX_PACKET_SIZE, MAX_TTL, MIN_PACKET_SIZE_ICMP};
pub use correlator::{Correlation, Correlator, MatchedProbe, OutstandingProbes};
pub use error::{Error, ErrorKind, IoError, IoOperation, Result};
pub use net::{Datagram, Transport};
pub use probe::{Probe, ProbeBuilder, ResponseKind};
pub use prober::{HopProber, HopState};
pub use report::{HopOutcome, HopResult, TraceReport, TraceSummary};
pub use strategy::Strategy;
pub use tracer::Tracer;
pub use types::{
    MaxAttempts, MaxInflight, PacketSize, PayloadPattern, Sequence, TimeToLive, TraceId,
    TypeOfService,
};
