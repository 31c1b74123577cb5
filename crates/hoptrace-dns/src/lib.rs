//! Blocking hostname resolution for the tracer.
//!
//! The tracer only probes `IPv4` destinations, so a hostname resolves to the first `IPv4` address
//! returned by the system resolver.  Literal addresses are accepted as-is without a lookup.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use hoptrace_dns::{DnsResolver, Resolver};
//!
//! let resolver = DnsResolver::new();
//! let addr = resolver.resolve_ipv4("example.com")?;
//! println!("example.com resolved to {addr}");
//! let names = resolver.reverse_lookup(addr.into())?;
//! println!("{addr} has the name {names}");
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod resolver;

pub use resolver::{DnsResolver, Error, ResolvedIpAddrs, Resolver, Result};
