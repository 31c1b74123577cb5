use crate::error::CliError;
use clap::ValueEnum;
use file::ConfigFile;
use hoptrace_core::defaults;
use serde::Deserialize;
use std::time::Duration;

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// Fully resolved hoptrace configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HoptraceConfig {
    pub hostname: String,
    pub first_ttl: u8,
    pub max_ttl: u8,
    pub probes_per_hop: u8,
    pub probe_timeout: Duration,
    pub read_timeout: Duration,
    pub max_inflight: u8,
    pub packet_size: u16,
    pub payload_pattern: u8,
    pub tos: u8,
    pub reverse_dns: bool,
    pub drop_privileges: bool,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl HoptraceConfig {
    /// Build the configuration from the command line arguments and the config file.
    ///
    /// An explicitly named config file must exist; otherwise the default locations are searched.
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg).map_err(CliError::Usage)?
        } else {
            file::read_default_config_file()
                .map_err(CliError::Usage)?
                .unwrap_or_default()
        };
        Ok(Self::build_config(args, cfg_file))
    }

    fn build_config(args: Args, cfg_file: ConfigFile) -> Self {
        let cfg_file_trace = cfg_file.trace.unwrap_or_default();
        let cfg_file_log = cfg_file.log.unwrap_or_default();
        let log_filter = cfg_layer(
            args.log_filter.clone(),
            cfg_file_log.filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let verbose = args.verbose
            || args.log_filter.is_some()
            || cfg_file_log.verbose.unwrap_or(constants::DEFAULT_VERBOSE);
        Self {
            hostname: args.hostname,
            first_ttl: cfg_layer(
                args.first_ttl,
                cfg_file_trace.first_ttl,
                defaults::DEFAULT_FIRST_TTL,
            ),
            max_ttl: cfg_layer(
                args.max_ttl,
                cfg_file_trace.max_hops,
                defaults::DEFAULT_MAX_TTL,
            ),
            probes_per_hop: cfg_layer(
                args.probes_per_hop,
                cfg_file_trace.probes_per_hop,
                defaults::DEFAULT_PROBES_PER_HOP,
            ),
            probe_timeout: cfg_layer(
                args.probe_timeout,
                cfg_file_trace.timeout,
                defaults::DEFAULT_PROBE_TIMEOUT,
            ),
            read_timeout: cfg_layer(
                args.read_timeout,
                cfg_file_trace.read_timeout,
                defaults::DEFAULT_READ_TIMEOUT,
            ),
            max_inflight: cfg_layer(
                args.max_inflight,
                cfg_file_trace.max_inflight,
                defaults::DEFAULT_MAX_INFLIGHT,
            ),
            packet_size: cfg_layer(
                args.packet_size,
                cfg_file_trace.packet_size,
                defaults::DEFAULT_PACKET_SIZE,
            ),
            payload_pattern: cfg_layer(
                args.payload_pattern,
                cfg_file_trace.payload_pattern,
                defaults::DEFAULT_PAYLOAD_PATTERN,
            ),
            tos: cfg_layer(args.tos, cfg_file_trace.tos, defaults::DEFAULT_TOS),
            reverse_dns: cfg_layer_bool_flag(
                args.reverse_dns,
                cfg_file_trace.reverse_dns,
                constants::DEFAULT_REVERSE_DNS,
            ),
            drop_privileges: !cfg_layer_bool_flag(
                args.no_drop_privileges,
                cfg_file_trace.drop_privileges.map(|drop| !drop),
                !defaults::DEFAULT_DROP_PRIVILEGES,
            ),
            verbose,
            log_format: cfg_layer(
                args.log_format,
                cfg_file_log.format,
                constants::DEFAULT_LOG_FORMAT,
            ),
            log_filter,
        }
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use file::{ConfigLog, ConfigTrace};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    fn default_config(hostname: &str) -> HoptraceConfig {
        HoptraceConfig {
            hostname: String::from(hostname),
            first_ttl: 1,
            max_ttl: 30,
            probes_per_hop: 3,
            probe_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_millis(10),
            max_inflight: 1,
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
    fn test_defaults() {
        let cfg = HoptraceConfig::build_config(parse(&["hoptrace", "example.com"]), ConfigFile::default());
        assert_eq!(default_config("example.com"), cfg);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let cfg_file = ConfigFile {
            trace: Some(ConfigTrace {
                max_hops: Some(12),
                timeout: Some(Duration::from_millis(250)),
                reverse_dns: Some(true),
                drop_privileges: Some(false),
                ..ConfigTrace::default()
            }),
            log: Some(ConfigLog {
                format: Some(LogFormat::Json),
                ..ConfigLog::default()
            }),
        };
        let cfg = HoptraceConfig::build_config(parse(&["hoptrace", "example.com"]), cfg_file);
        let expected = HoptraceConfig {
            max_ttl: 12,
            probe_timeout: Duration::from_millis(250),
            reverse_dns: true,
            drop_privileges: false,
            log_format: LogFormat::Json,
            ..default_config("example.com")
        };
        assert_eq!(expected, cfg);
    }

    #[test]
    fn test_args_override_file() {
        let cfg_file = ConfigFile {
            trace: Some(ConfigTrace {
                max_hops: Some(12),
                max_inflight: Some(2),
                ..ConfigTrace::default()
            }),
            log: None,
        };
        let args = parse(&["hoptrace", "-m", "20", "--max-inflight", "6", "example.com"]);
        let cfg = HoptraceConfig::build_config(args, cfg_file);
        assert_eq!(20, cfg.max_ttl);
        assert_eq!(6, cfg.max_inflight);
    }

    #[test_case(false, None, true; "default drops")]
    #[test_case(true, None, false; "flag keeps")]
    #[test_case(false, Some(false), false; "file keeps")]
    #[test_case(false, Some(true), true; "file drops")]
    #[test_case(true, Some(true), false; "flag wins over file")]
    fn test_drop_privileges(no_drop_flag: bool, file_drop: Option<bool>, expected: bool) {
        let mut args = vec!["hoptrace", "example.com"];
        if no_drop_flag {
            args.push("--no-drop-privileges");
        }
        let cfg_file = ConfigFile {
            trace: Some(ConfigTrace {
                drop_privileges: file_drop,
                ..ConfigTrace::default()
            }),
            log: None,
        };
        let cfg = HoptraceConfig::build_config(parse(&args), cfg_file);
        assert_eq!(expected, cfg.drop_privileges);
    }

    #[test]
    fn test_log_filter_enables_logging() {
        let args = parse(&["hoptrace", "--log-filter", "hoptrace_core=trace", "example.com"]);
        let cfg = HoptraceConfig::build_config(args, ConfigFile::default());
        assert!(cfg.verbose);
        assert_eq!("hoptrace_core=trace", cfg.log_filter);
    }

    #[test]
    fn test_missing_config_file_is_usage_error() {
        let args = parse(&["hoptrace", "-c", "/nonexistent/hoptrace.toml", "example.com"]);
        let err = HoptraceConfig::from_args(args).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Usage(_))));
    }
}
