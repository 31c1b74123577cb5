use std::process::ExitCode;
use thiserror::Error;

/// A fatal error which ends the process.
///
/// Each category maps to a distinct process exit code. Per-hop problems (timeouts, malformed or
/// foreign responses) never surface here.
#[derive(Error, Debug)]
pub enum CliError {
    /// An invalid argument or configuration value.
    #[error("{0:#}")]
    Usage(anyhow::Error),
    /// The target could not be resolved to an `IPv4` address.
    #[error("Failed to resolve host: {0}")]
    Resolution(#[from] hoptrace_dns::Error),
    /// The raw transport could not be opened.
    #[error("{0:#}")]
    Permission(anyhow::Error),
    /// The transport failed during the trace.
    #[error("{0:#}")]
    Transport(anyhow::Error),
}

impl CliError {
    /// The process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Resolution(_) => 3,
            Self::Permission(_) => 4,
            Self::Transport(_) => 5,
        }
    }
}

impl From<hoptrace_core::Error> for CliError {
    fn from(err: hoptrace_core::Error) -> Self {
        use hoptrace_core::Error;
        match err {
            Error::BadConfig(_) | Error::InvalidPacketSize(_) | Error::InvalidHopLimit(..) => {
                Self::Usage(err.into())
            }
            Error::PermissionDenied(_) | Error::PrivilegeError(_) => Self::Permission(err.into()),
            _ => Self::Transport(err.into()),
        }
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        Self::from(err.exit_code())
    }
}

/// The exit code for any error escaping the application.
///
/// Errors not categorised as a [`CliError`] are reported as transport failures.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<CliError>()
        .map_or(ExitCode::from(5), ExitCode::from)
}
