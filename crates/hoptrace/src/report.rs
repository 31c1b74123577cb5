use hoptrace_core::{HopOutcome, HopResult, TraceReport, TraceSummary};
use hoptrace_dns::Resolver;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Format the line printed before the first hop.
pub fn format_header(hostname: &str, addr: Ipv4Addr, max_ttl: u8, packet_size: u16) -> String {
    format!("traceroute to {hostname} ({addr}), {max_ttl} hops max, {packet_size} byte packets")
}

/// Format a single hop.
///
/// If a `resolver` is given the responder is shown as `hostname (addr)`, falling back to the
/// bare address if the reverse lookup fails.
pub fn format_hop<R: Resolver>(hop: &HopResult, resolver: Option<&R>) -> String {
    let ttl = hop.ttl.0;
    match (hop.responder, hop.rtt, hop.outcome) {
        (Some(addr), Some(rtt), HopOutcome::Unreachable(code)) => format!(
            "{ttl:>2}  {}  {} {}",
            format_addr(addr, resolver),
            format_rtt(rtt),
            unreachable_marker(code)
        ),
        (Some(addr), Some(rtt), _) => {
            format!("{ttl:>2}  {}  {}", format_addr(addr, resolver), format_rtt(rtt))
        }
        _ => format!("{ttl:>2}  * * *"),
    }
}

/// Format the summary line printed after the last hop.
pub fn format_summary(report: &TraceReport, max_ttl: u8) -> String {
    let dest = report.destination;
    let last_ttl = report.last_hop().map_or(0, |hop| hop.ttl.0);
    match report.summary {
        TraceSummary::DestinationReached => {
            format!("destination {dest} reached in {last_ttl} hops")
        }
        TraceSummary::Unreachable => format!("destination {dest} unreachable at hop {last_ttl}"),
        TraceSummary::NotReached => format!("destination {dest} not reached within {max_ttl} hops"),
        TraceSummary::Cancelled => format!("trace cancelled after {} hops", report.hops.len()),
    }
}

fn format_addr<R: Resolver>(addr: Ipv4Addr, resolver: Option<&R>) -> String {
    match resolver.map(|r| r.reverse_lookup(IpAddr::V4(addr))) {
        Some(Ok(host)) => format!("{host} ({addr})"),
        Some(Err(err)) => {
            tracing::debug!(%err, "reverse lookup failed");
            addr.to_string()
        }
        None => addr.to_string(),
    }
}

fn format_rtt(rtt: Duration) -> String {
    format!("{:.3} ms", rtt.as_secs_f64() * 1000_f64)
}

/// The traditional traceroute marker for an `ICMP` `DestinationUnreachable` code.
fn unreachable_marker(code: u8) -> String {
    match code {
        0 => String::from("!N"),
        1 => String::from("!H"),
        2 => String::from("!P"),
        4 => String::from("!F"),
        5 => String::from("!S"),
        9 | 10 | 13 => String::from("!X"),
        14 => String::from("!V"),
        15 => String::from("!C"),
        code => format!("!{code}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoptrace_core::TimeToLive;
    use hoptrace_dns::{ResolvedIpAddrs, Result};
    use test_case::test_case;

    struct NamedResolver;

    impl Resolver for NamedResolver {
        fn lookup(&self, _hostname: &str) -> Result<ResolvedIpAddrs> {
            Ok(ResolvedIpAddrs::new(vec![]))
        }

        fn reverse_lookup(&self, addr: IpAddr) -> Result<String> {
            match addr {
                IpAddr::V4(v4) if v4.octets()[3] == 1 => Ok(String::from("gateway.lan")),
                _ => Err(hoptrace_dns::Error::NoIpv4Address(addr.to_string())),
            }
        }
    }

    const NO_RESOLVER: Option<&NamedResolver> = None;

    fn hop(ttl: u8, responder: Option<[u8; 4]>, rtt_us: Option<u64>, outcome: HopOutcome) -> HopResult {
        HopResult {
            ttl: TimeToLive(ttl),
            responder: responder.map(Ipv4Addr::from),
            rtt: rtt_us.map(Duration::from_micros),
            outcome,
            attempts: 1,
        }
    }

    #[test]
    fn test_header() {
        assert_eq!(
            "traceroute to example.com (93.184.215.14), 30 hops max, 60 byte packets",
            format_header("example.com", Ipv4Addr::new(93, 184, 215, 14), 30, 60)
        );
    }

    #[test_case(hop(1, Some([192, 168, 1, 1]), Some(1234), HopOutcome::Intermediate), " 1  192.168.1.1  1.234 ms"; "intermediate")]
    #[test_case(hop(2, None, None, HopOutcome::NoResponse), " 2  * * *"; "no response")]
    #[test_case(hop(12, Some([10, 0, 0, 3]), Some(8100), HopOutcome::Destination), "12  10.0.0.3  8.100 ms"; "destination")]
    #[test_case(hop(3, Some([10, 0, 0, 9]), Some(20000), HopOutcome::Unreachable(1)), " 3  10.0.0.9  20.000 ms !H"; "host unreachable")]
    #[test_case(hop(3, Some([10, 0, 0, 9]), Some(20000), HopOutcome::Unreachable(13)), " 3  10.0.0.9  20.000 ms !X"; "prohibited")]
    #[test_case(hop(3, Some([10, 0, 0, 9]), Some(20000), HopOutcome::Unreachable(3)), " 3  10.0.0.9  20.000 ms !3"; "port unreachable")]
    #[test_case(hop(4, None, None, HopOutcome::Unreachable(1)), " 4  * * *"; "unreachable without responder")]
    fn test_format_hop(hop: HopResult, expected: &str) {
        assert_eq!(expected, format_hop(&hop, NO_RESOLVER));
    }

    #[test]
    fn test_format_hop_reverse_dns() {
        let resolver = NamedResolver;
        let named = hop(1, Some([192, 168, 1, 1]), Some(500), HopOutcome::Intermediate);
        assert_eq!(" 1  gateway.lan (192.168.1.1)  0.500 ms", format_hop(&named, Some(&resolver)));
        let unnamed = hop(2, Some([10, 0, 0, 2]), Some(500), HopOutcome::Intermediate);
        assert_eq!(" 2  10.0.0.2  0.500 ms", format_hop(&unnamed, Some(&resolver)));
    }

    #[test_case(TraceSummary::DestinationReached, "destination 10.0.0.3 reached in 3 hops"; "reached")]
    #[test_case(TraceSummary::Unreachable, "destination 10.0.0.3 unreachable at hop 3"; "unreachable")]
    #[test_case(TraceSummary::NotReached, "destination 10.0.0.3 not reached within 30 hops"; "not reached")]
    #[test_case(TraceSummary::Cancelled, "trace cancelled after 3 hops"; "cancelled")]
    fn test_format_summary(summary: TraceSummary, expected: &str) {
        let report = TraceReport {
            destination: Ipv4Addr::new(10, 0, 0, 3),
            hops: vec![
                hop(1, Some([192, 168, 1, 1]), Some(1000), HopOutcome::Intermediate),
                hop(2, None, None, HopOutcome::NoResponse),
                hop(3, Some([10, 0, 0, 3]), Some(3000), HopOutcome::Destination),
            ],
            summary,
        };
        assert_eq!(expected, format_summary(&report, 30));
    }

    #[test]
    fn test_format_summary_cancelled_before_first_hop() {
        let report = TraceReport {
            destination: Ipv4Addr::new(10, 0, 0, 3),
            hops: vec![],
            summary: TraceSummary::Cancelled,
        };
        assert_eq!("trace cancelled after 0 hops", format_summary(&report, 30));
    }
}
