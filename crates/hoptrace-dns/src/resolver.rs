use itertools::{Either, Itertools};
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use tracing::instrument;

/// A DNS resolver.
pub trait Resolver {
    /// Perform a blocking DNS hostname lookup and return the resolved IPv4 or IPv6 addresses.
    fn lookup(&self, hostname: &str) -> Result<ResolvedIpAddrs>;

    /// Perform a blocking reverse DNS lookup of `IpAddr`.
    fn reverse_lookup(&self, addr: IpAddr) -> Result<String>;

    /// Resolve a hostname or literal address to a single `IPv4` address.
    ///
    /// The first `IPv4` address of the lookup is chosen, any `IPv6` addresses are ignored.
    fn resolve_ipv4(&self, hostname: &str) -> Result<Ipv4Addr> {
        match hostname.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => return Ok(addr),
            Ok(IpAddr::V6(_)) => return Err(Error::NoIpv4Address(hostname.to_string())),
            Err(_) => {}
        }
        self.lookup(hostname)?
            .first_ipv4()
            .ok_or_else(|| Error::NoIpv4Address(hostname.to_string()))
    }
}

/// A DNS resolver error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A DNS resolver error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("DNS lookup of {0} failed: {1}")]
    LookupFailed(String, Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("DNS reverse lookup of {0} failed: {1}")]
    ReverseLookupFailed(IpAddr, Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("no A records found for {0}")]
    NoIpv4Address(String),
}

/// The output of a successful DNS lookup.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResolvedIpAddrs(Vec<IpAddr>);

impl ResolvedIpAddrs {
    #[must_use]
    pub fn new(addrs: Vec<IpAddr>) -> Self {
        Self(addrs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'_ IpAddr> {
        self.0.iter()
    }

    /// The first `IPv4` address in resolution order, if any.
    #[must_use]
    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        let (ipv4, ipv6): (Vec<Ipv4Addr>, Vec<_>) = self.0.iter().partition_map(|ip| match ip {
            IpAddr::V4(addr) => Either::Left(*addr),
            IpAddr::V6(addr) => Either::Right(*addr),
        });
        tracing::debug!(ipv4 = ipv4.len(), ipv6 = ipv6.len(), "partitioned addresses");
        ipv4.first().copied()
    }
}

impl IntoIterator for ResolvedIpAddrs {
    type Item = IpAddr;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A resolver backed by the system resolver (`getaddrinfo` and `getnameinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl DnsResolver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Resolver for DnsResolver {
    #[instrument(skip(self), level = "debug")]
    fn lookup(&self, hostname: &str) -> Result<ResolvedIpAddrs> {
        let addrs = dns_lookup::lookup_host(hostname)
            .map_err(|err| Error::LookupFailed(hostname.to_string(), Box::new(err)))?;
        tracing::debug!(?addrs);
        Ok(ResolvedIpAddrs(addrs))
    }

    #[instrument(skip(self), level = "debug")]
    fn reverse_lookup(&self, addr: IpAddr) -> Result<String> {
        dns_lookup::lookup_addr(&addr).map_err(|err| Error::ReverseLookupFailed(addr, Box::new(err)))
    }
}
