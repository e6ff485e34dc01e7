use std::time::Duration;

use super::types::{PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ValidationError};

pub(super) fn parse_positive_u64(s: &str) -> AppResult<PositiveU64> {
    s.parse::<PositiveU64>().map_err(AppError::from)
}

pub(super) fn parse_positive_usize(s: &str) -> AppResult<PositiveUsize> {
    s.parse::<PositiveUsize>().map_err(AppError::from)
}

fn parse_float(s: &str) -> Result<f64, ValidationError> {
    let value = s.trim();
    value
        .parse::<f64>()
        .map_err(|err| ValidationError::InvalidFloat {
            value: value.to_owned(),
            source: err,
        })
}

/// Aggregate calls per second; fractions such as `0.5` are allowed.
pub(crate) fn parse_qps(s: &str) -> AppResult<f64> {
    check_qps(parse_float(s)?).map_err(AppError::from)
}

pub(crate) fn check_qps(qps: f64) -> Result<f64, ValidationError> {
    if !qps.is_finite() || qps <= 0.0 {
        return Err(ValidationError::InvalidQps { value: qps });
    }
    Ok(qps)
}

/// Histogram bucket width in seconds.
pub(crate) fn parse_resolution(s: &str) -> AppResult<f64> {
    check_resolution(parse_float(s)?).map_err(AppError::from)
}

pub(crate) fn check_resolution(resolution: f64) -> Result<f64, ValidationError> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(ValidationError::InvalidResolution { value: resolution });
    }
    Ok(resolution)
}

/// Parses `250ms`, `5s`, `2m`, `1h` or a bare number of seconds.
pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    let duration = parse_duration_value(s)?;
    if duration.is_zero() {
        return Err(AppError::validation(ValidationError::DurationZero));
    }
    Ok(duration)
}

/// Same syntax as [`parse_duration_arg`], `0` included.
pub(crate) fn parse_duration_allow_zero(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::from)
}

pub(crate) fn parse_duration_value(s: &str) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };
    Ok(duration)
}
