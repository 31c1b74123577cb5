use crate::config::{HoptraceConfig, LogFormat};
use crate::error::CliError;
use crate::report;
use anyhow::Context;
use hoptrace_core::{Builder, Tracer};
use hoptrace_dns::{DnsResolver, Resolver};
use hoptrace_privilege::Privilege;
use std::net::Ipv4Addr;

/// Run the hoptrace application.
pub fn run_hoptrace(cfg: &HoptraceConfig, privilege: &Privilege, pid: u16) -> anyhow::Result<()> {
    configure_logging(cfg);
    let resolver = DnsResolver::new();
    println!("Traceroute to {}", cfg.hostname);
    let addr = resolver.resolve_ipv4(&cfg.hostname).map_err(CliError::from)?;
    println!("Resolved {} -> {addr}", cfg.hostname);
    privilege
        .ensure()
        .map_err(|err| CliError::Permission(err.into()))?;
    let tracer = make_tracer(cfg, addr, pid)?;
    let cancel = tracer.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl-C handler")?;
    println!(
        "{}",
        report::format_header(
            &cfg.hostname,
            tracer.target_addr(),
            tracer.max_ttl().0,
            tracer.packet_size().0
        )
    );
    let reverse = cfg.reverse_dns.then_some(&resolver);
    let trace_report = tracer
        .run_with(|hop| println!("{}", report::format_hop(hop, reverse)))
        .map_err(CliError::from)?;
    tracing::debug!(
        destination_reached = trace_report.destination_reached(),
        summary = ?trace_report.summary
    );
    println!(
        "{}",
        report::format_summary(&trace_report, tracer.max_ttl().0)
    );
    Ok(())
}

/// Build a tracer for `addr` from the configuration.
fn make_tracer(cfg: &HoptraceConfig, addr: Ipv4Addr, pid: u16) -> anyhow::Result<Tracer> {
    Ok(Builder::new(addr)
        .trace_identifier(pid)
        .first_ttl(cfg.first_ttl)
        .max_ttl(cfg.max_ttl)
        .probes_per_hop(cfg.probes_per_hop)
        .probe_timeout(cfg.probe_timeout)
        .read_timeout(cfg.read_timeout)
        .max_inflight(cfg.max_inflight)
        .packet_size(cfg.packet_size)
        .payload_pattern(cfg.payload_pattern)
        .tos(cfg.tos)
        .drop_privileges(cfg.drop_privileges)
        .build()
        .map_err(CliError::from)?)
}

/// Configure debug logging to stderr, if enabled.
fn configure_logging(cfg: &HoptraceConfig) {
    if cfg.verbose {
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(&cfg.log_filter);
        match cfg.log_format {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Pretty => builder.pretty().init(),
            LogFormat::Json => builder.json().init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoptrace_core::{MaxAttempts, MaxInflight, TraceId};
    use std::time::Duration;

    fn config() -> HoptraceConfig {
        HoptraceConfig {
            hostname: String::from("10.0.0.3"),
            first_ttl: 1,
            max_ttl: 30,
            probes_per_hop: 2,
            probe_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(10),
            max_inflight: 4,
            packet_size: 60,
            payload_pattern: 0,
            tos: 0,
            reverse_dns: false,
            drop_privileges: true,
            verbose: false,
            log_format: LogFormat::Pretty,
            log_filter: String::from("hoptrace=debug"),
        }
    }

    #[test]
    fn test_make_tracer() -> anyhow::Result<()> {
        let tracer = make_tracer(&config(), Ipv4Addr::new(10, 0, 0, 3), 4321)?;
        assert_eq!(Ipv4Addr::new(10, 0, 0, 3), tracer.target_addr());
        assert_eq!(TraceId(4321), tracer.trace_identifier());
        assert_eq!(MaxInflight(4), tracer.max_inflight());
        assert_eq!(MaxAttempts(2), tracer.max_attempts());
        assert_eq!(Duration::from_secs(1), tracer.probe_timeout());
        Ok(())
    }

    #[test]
    fn test_make_tracer_invalid_is_usage_error() {
        let cfg = HoptraceConfig {
            first_ttl: 20,
            max_ttl: 10,
            ..config()
        };
        let err = make_tracer(&cfg, Ipv4Addr::new(10, 0, 0, 3), 1).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Usage(_))));
    }
}
