use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::MetricsError;

const SIGNIFICANT_DIGITS: u8 = 3;
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Latency distribution recorded in buckets of `resolution` seconds.
///
/// The bucket state lives in an hdr histogram so percentiles stay queryable
/// after merging; count, sum, min and max are tracked exactly next to it so
/// the average does not depend on bucket width or on merge order.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    hist: Histogram<u64>,
    resolution_nanos: u64,
    sum_nanos: u128,
    min_nanos: u64,
    max_nanos: u64,
}

impl LatencyHistogram {
    /// Create an empty histogram whose bucket width is `resolution` seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying histogram cannot be created.
    pub fn new(resolution: f64) -> Result<Self, MetricsError> {
        let hist =
            Histogram::<u64>::new(SIGNIFICANT_DIGITS).map_err(|err| MetricsError::Histogram {
                context: "create",
                source: Box::new(err),
            })?;
        Ok(Self {
            hist,
            resolution_nanos: resolution_to_nanos(resolution),
            sum_nanos: 0,
            min_nanos: u64::MAX,
            max_nanos: 0,
        })
    }

    /// Record one observed latency. Values beyond the trackable range are
    /// clamped instead of rejected.
    pub fn record(&mut self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        let ticks = nanos.checked_div(self.resolution_nanos).unwrap_or(nanos);
        self.hist.saturating_record(ticks);
        self.sum_nanos = self.sum_nanos.saturating_add(u128::from(nanos));
        self.min_nanos = self.min_nanos.min(nanos);
        self.max_nanos = self.max_nanos.max(nanos);
    }

    /// Merge another histogram into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolutions differ or the bucket merge fails.
    pub fn merge(&mut self, other: &LatencyHistogram) -> Result<(), MetricsError> {
        if self.resolution_nanos != other.resolution_nanos {
            return Err(MetricsError::ResolutionMismatch {
                left: self.resolution(),
                right: other.resolution(),
            });
        }
        self.hist
            .add(&other.hist)
            .map_err(|err| MetricsError::Histogram {
                context: "merge",
                source: Box::new(err),
            })?;
        self.sum_nanos = self.sum_nanos.saturating_add(other.sum_nanos);
        self.min_nanos = self.min_nanos.min(other.min_nanos);
        self.max_nanos = self.max_nanos.max(other.max_nanos);
        Ok(())
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }

    /// Average latency in seconds, `0.0` when empty.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Average is reported in fractional seconds."
    )]
    pub fn avg(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum_nanos as f64 / count as f64 / NANOS_PER_SEC
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        if self.count() == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.min_nanos)
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos)
    }

    /// Latency at percentile `p` (0-100). Bucketed, so accurate to one
    /// resolution step, and never above the observed maximum.
    #[must_use]
    pub fn percentile(&self, p: f64) -> Duration {
        if self.count() == 0 {
            return Duration::ZERO;
        }
        let ticks = self.hist.value_at_percentile(p.clamp(0.0, 100.0));
        let nanos = ticks
            .saturating_add(1)
            .saturating_mul(self.resolution_nanos)
            .min(self.max_nanos);
        Duration::from_nanos(nanos)
    }

    /// Bucket width in seconds.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Resolution is configured in fractional seconds."
    )]
    pub fn resolution(&self) -> f64 {
        self.resolution_nanos as f64 / NANOS_PER_SEC
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Resolution is configured in fractional seconds."
)]
fn resolution_to_nanos(resolution: f64) -> u64 {
    let nanos = (resolution * NANOS_PER_SEC).round();
    if nanos.is_finite() && nanos >= 1.0 {
        nanos as u64
    } else {
        1
    }
}
