use crate::config::LogFormat;

/// The default value for `log-format`.
pub const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Pretty;

/// The default value for `log-filter`.
pub const DEFAULT_LOG_FILTER: &str = "hoptrace=debug";

/// The default value for `verbose`.
pub const DEFAULT_VERBOSE: bool = false;

/// The default value for `reverse-dns`.
pub const DEFAULT_REVERSE_DNS: bool = false;
