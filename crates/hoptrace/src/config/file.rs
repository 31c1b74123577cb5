use crate::config::LogFormat;
use anyhow::Context;
use encoding_rs_io::DecodeReaderBytes;
use etcetera::BaseStrategy;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_CONFIG_DIR: &str = "hoptrace";
const DEFAULT_CONFIG_FILE: &str = "hoptrace.toml";
const DEFAULT_HIDDEN_CONFIG_FILE: &str = ".hoptrace.toml";

/// Read the config from the default location of user config for the platform.
///
/// Returns the parsed `Some(ConfigFile)` if a config file exists, `None` otherwise.
///
/// The following locations are checked in order and only the first file found is used:
///     - the XDG app config directory: `$XDG_CONFIG_HOME/hoptrace/hoptrace.toml`
///     - the user home directory: `~/.hoptrace.toml`
pub fn read_default_config_file() -> anyhow::Result<Option<ConfigFile>> {
    use etcetera::base_strategy as base;
    let basedirs = base::choose_base_strategy()?;
    default_config_paths(basedirs.config_dir(), basedirs.home_dir())
        .into_iter()
        .find(|path| path.exists())
        .map(read_config_file)
        .transpose()
}

/// Read the config from the given path.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    let mut decoder = DecodeReaderBytes::new(BufReader::new(file));
    let mut dest = String::new();
    decoder.read_to_string(&mut dest)?;
    parse_config(&dest)
        .with_context(|| format!("invalid config file: {}", path.as_ref().display()))
}

fn parse_config(toml: &str) -> anyhow::Result<ConfigFile> {
    Ok(toml::from_str(toml)?)
}

fn default_config_paths(config_dir: PathBuf, home_dir: &Path) -> [PathBuf; 2] {
    [
        config_dir.join(APP_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        home_dir.join(DEFAULT_HIDDEN_CONFIG_FILE),
    ]
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub trace: Option<ConfigTrace>,
    pub log: Option<ConfigLog>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigTrace {
    pub first_ttl: Option<u8>,
    pub max_hops: Option<u8>,
    pub probes_per_hop: Option<u8>,
    #[serde(default, deserialize_with = "duration_deser")]
    pub timeout: Option<Duration>,
    #[serde(default, deserialize_with = "duration_deser")]
    pub read_timeout: Option<Duration>,
    pub max_inflight: Option<u8>,
    pub packet_size: Option<u16>,
    pub payload_pattern: Option<u8>,
    pub tos: Option<u8>,
    pub reverse_dns: Option<bool>,
    pub drop_privileges: Option<bool>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLog {
    pub verbose: Option<bool>,
    pub format: Option<LogFormat>,
    pub filter: Option<String>,
}

fn duration_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let duration_string = String::deserialize(deserializer)?;
    humantime::parse_duration(&duration_string)
        .map(Some)
        .map_err(serde::de::Error::custom)
}
