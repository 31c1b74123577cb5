use crate::config::LogFormat;
use clap::Parser;
use std::time::Duration;

/// Discover the route to an IPv4 host, one hop at a time
#[derive(Parser, Debug)]
#[command(name = "hoptrace", author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Args {
    /// The hostname or IPv4 address to trace
    pub hostname: String,

    /// Config file
    #[arg(short = 'c', long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// The TTL to start from [default: 1]
    #[arg(short = 'f', long)]
    pub first_ttl: Option<u8>,

    /// The maximum number of hops [default: 30]
    #[arg(short = 'm', long = "max-hops")]
    pub max_ttl: Option<u8>,

    /// The number of probes sent to each hop before it is declared unresponsive [default: 3]
    #[arg(short = 'q', long)]
    pub probes_per_hop: Option<u8>,

    /// The time to wait for a response to each probe [default: 3s]
    #[arg(short = 'w', long = "timeout", value_parser = parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// The maximum time to block on the receive socket [default: 10ms]
    #[arg(long, value_parser = parse_duration)]
    pub read_timeout: Option<Duration>,

    /// The number of hops to probe concurrently [default: 1]
    #[arg(long)]
    pub max_inflight: Option<u8>,

    /// The size of each probe in bytes, including the IPv4 header [default: 60]
    #[arg(long)]
    pub packet_size: Option<u16>,

    /// The repeating byte pattern of the probe payload [default: 0]
    #[arg(long)]
    pub payload_pattern: Option<u8>,

    /// The type-of-service byte of each probe [default: 0]
    #[arg(long)]
    pub tos: Option<u8>,

    /// Show the hostname of each responder
    #[arg(short = 'r', long)]
    pub reverse_dns: bool,

    /// Keep raw socket privileges for the duration of the trace
    #[arg(long)]
    pub no_drop_privileges: bool,

    /// Enable verbose debug logging to stderr
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// The debug log format [default: pretty]
    #[arg(value_enum, long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: hoptrace=debug]
    #[arg(long)]
    pub log_filter: Option<String>,
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}
