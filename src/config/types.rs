use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration_value;
use crate::error::ValidationError;

/// Options of `grpcload load` as read from a TOML or JSON file. Every field
/// is optional; values given on the command line win.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub destination: Option<String>,
    pub qps: Option<f64>,
    pub concurrency: Option<usize>,
    pub duration: Option<DurationValue>,
    pub exactly: Option<u64>,
    pub resolution: Option<f64>,
    pub cacert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub cert_override: Option<String>,
    pub service: Option<String>,
    pub streams: Option<usize>,
    pub ping: Option<bool>,
    pub payload: Option<String>,
    pub delay: Option<DurationValue>,
    pub allow_initial_errors: Option<bool>,
    pub profile: Option<PathBuf>,
    pub label: Option<String>,
    pub connect_timeout: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub json: Option<bool>,
    pub output: Option<PathBuf>,
}

/// Seconds as a number, or text such as `"250ms"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
