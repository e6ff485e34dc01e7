use std::time::Duration;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::{check_qps, check_resolution};
use crate::args::{LoadArgs, PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue};

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &'static str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value)
        .map_err(|source| AppError::config(ConfigError::FieldMustBePositive { field, source }))
}

fn ensure_positive_usize(value: usize, field: &'static str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value)
        .map_err(|source| AppError::config(ConfigError::FieldMustBePositive { field, source }))
}

fn duration_field(value: &DurationValue, field: &'static str) -> AppResult<Duration> {
    value
        .to_duration()
        .map_err(|source| AppError::config(ConfigError::InvalidDuration { field, source }))
}

fn nonzero_duration_field(value: &DurationValue, field: &'static str) -> AppResult<Duration> {
    let duration = duration_field(value, field)?;
    if duration.is_zero() {
        return Err(AppError::config(ConfigError::InvalidDuration {
            field,
            source: ValidationError::DurationZero,
        }));
    }
    Ok(duration)
}

/// Fills `args` from `config` wherever the option was not given on the
/// command line. `matches` are the `load` subcommand's matches.
///
/// # Errors
///
/// Returns an error when config values are invalid or conflict.
pub fn apply_config(
    args: &mut LoadArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if config.duration.is_some() && config.exactly.is_some() {
        return Err(AppError::config(ConfigError::Conflict {
            left: "duration",
            right: "exactly",
        }));
    }

    if !is_cli(matches, "destination")
        && let Some(destination) = config.destination.clone()
    {
        args.destination = Some(destination);
    }
    if !is_cli(matches, "qps")
        && let Some(qps) = config.qps
    {
        args.qps = check_qps(qps)?;
    }
    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    let stop_from_cli = is_cli(matches, "duration") || is_cli(matches, "exactly");
    if !stop_from_cli {
        if let Some(duration) = config.duration.as_ref() {
            args.duration = nonzero_duration_field(duration, "duration")?;
            args.exactly = None;
        }
        if let Some(exactly) = config.exactly {
            args.exactly = Some(ensure_positive_u64(exactly, "exactly")?);
        }
    }

    if !is_cli(matches, "resolution")
        && let Some(resolution) = config.resolution
    {
        args.resolution = check_resolution(resolution)?;
    }
    if !is_cli(matches, "ca_cert")
        && let Some(ca_cert) = config.cacert.clone()
    {
        args.ca_cert = Some(ca_cert);
    }
    if !is_cli(matches, "cert")
        && let Some(cert) = config.cert.clone()
    {
        args.cert = Some(cert);
    }
    if !is_cli(matches, "cert_override")
        && let Some(cert_override) = config.cert_override.clone()
    {
        args.cert_override = Some(cert_override);
    }
    if !is_cli(matches, "service")
        && let Some(service) = config.service.clone()
    {
        args.service = service;
    }
    if !is_cli(matches, "streams")
        && let Some(streams) = config.streams
    {
        args.streams = ensure_positive_usize(streams, "streams")?;
    }
    if !is_cli(matches, "ping")
        && let Some(ping) = config.ping
    {
        args.ping = ping;
    }
    if !is_cli(matches, "payload")
        && let Some(payload) = config.payload.clone()
    {
        args.payload = payload;
    }
    if !is_cli(matches, "delay")
        && let Some(delay) = config.delay.as_ref()
    {
        args.delay = duration_field(delay, "delay")?;
    }
    if !is_cli(matches, "allow_initial_errors")
        && let Some(allow) = config.allow_initial_errors
    {
        args.allow_initial_errors = allow;
    }
    if !is_cli(matches, "profile")
        && let Some(profile) = config.profile.clone()
    {
        args.profile = Some(profile);
    }
    if !is_cli(matches, "label")
        && let Some(label) = config.label.clone()
    {
        args.label = Some(label);
    }
    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = nonzero_duration_field(timeout, "connect_timeout")?;
    }
    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = nonzero_duration_field(timeout, "timeout")?;
    }
    if !is_cli(matches, "json")
        && let Some(json) = config.json
    {
        args.json = json;
    }
    if !is_cli(matches, "output")
        && let Some(output) = config.output.clone()
    {
        args.output = Some(output);
    }

    Ok(())
}
