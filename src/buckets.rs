use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::range::{Instant, TimeRange};

/// A fixed-duration slice of processing time holding a raw arrival
/// count. The slice starts at the first batch observed after the
/// previous bucket expired; later batches inside the slice only grow
/// the count, never the span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogBucket {
    pub bucket_start: Instant,
    pub count: u64,
}

/// Aggregates an unbounded log stream into ordered count buckets.
///
/// Buckets are keyed by the processing time of each batch, not by any
/// timestamp embedded in the events, so batches must be applied in
/// arrival order. Counts are raw arrival-rate data; there is no decay
/// or averaging.
#[derive(Debug)]
pub struct LogBucketAggregator {
    duration_ms: f64,
    buckets: Vec<LogBucket>,
}

impl LogBucketAggregator {
    pub fn new(duration_ms: f64) -> Result<Self, ConfigError> {
        if !(duration_ms > 0.0) {
            return Err(ConfigError::NonPositiveBucketDuration(duration_ms));
        }
        Ok(Self {
            duration_ms,
            buckets: Vec::new(),
        })
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn buckets(&self) -> &[LogBucket] {
        &self.buckets
    }

    /// Records a batch of `n` events observed at `now`.
    ///
    /// The latest bucket absorbs the batch while `now` is within its
    /// duration of the bucket start; past that, a fresh bucket opens at
    /// `now`. Starts therefore stay strictly increasing.
    pub fn add_batch(&mut self, n: usize, now: Instant) {
        let n = n as u64;
        match self.buckets.last_mut() {
            Some(last) if now - last.bucket_start <= self.duration_ms => {
                last.count += n;
            }
            _ => {
                self.buckets.push(LogBucket {
                    bucket_start: now,
                    count: n,
                });
            }
        }
    }

    /// Drops every bucket that ends before the visible window starts.
    ///
    /// Pure filter, idempotent; must be re-run whenever the range
    /// changes since panning alone can strand old buckets.
    pub fn evict(&mut self, range: &TimeRange) {
        let duration = self.duration_ms;
        let before = self.buckets.len();
        self.buckets
            .retain(|b| b.bucket_start + duration >= range.from);
        let dropped = before - self.buckets.len();
        if dropped > 0 {
            debug!(dropped, retained = self.buckets.len(), "evicted log buckets");
        }
    }

    /// Maximum retained count, 0 when empty. Recomputed on demand; with
    /// at most a few hundred buckets caching would not pay for itself.
    pub fn max_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> LogBucketAggregator {
        LogBucketAggregator::new(5_000.0).unwrap()
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(LogBucketAggregator::new(0.0).is_err());
        assert!(LogBucketAggregator::new(-1.0).is_err());
    }

    #[test]
    fn merges_within_duration_then_opens_new_bucket() {
        let mut agg = aggregator();
        agg.add_batch(1, 1_000.0);
        agg.add_batch(2, 3_000.0);
        assert_eq!(
            agg.buckets(),
            &[LogBucket {
                bucket_start: 1_000.0,
                count: 3
            }]
        );

        // 7000 - 1000 = 6000 > 5000: previous bucket expired.
        agg.add_batch(1, 7_000.0);
        assert_eq!(agg.buckets().len(), 2);
        assert_eq!(
            agg.buckets()[1],
            LogBucket {
                bucket_start: 7_000.0,
                count: 1
            }
        );
    }

    #[test]
    fn boundary_batch_still_merges() {
        let mut agg = aggregator();
        agg.add_batch(1, 1_000.0);
        agg.add_batch(1, 6_000.0); // exactly duration later
        assert_eq!(agg.buckets().len(), 1);
        assert_eq!(agg.buckets()[0].count, 2);
    }

    #[test]
    fn eviction_drops_expired_keeps_overlapping() {
        let mut agg = aggregator();
        agg.add_batch(3, 1_000.0);
        agg.add_batch(1, 7_000.0);

        let range = TimeRange::new(9_000.0, 20_000.0);
        agg.evict(&range);
        // 1000+5000 = 6000 < 9000 drops; 7000+5000 = 12000 >= 9000 stays.
        assert_eq!(
            agg.buckets(),
            &[LogBucket {
                bucket_start: 7_000.0,
                count: 1
            }]
        );

        // Idempotent.
        agg.evict(&range);
        assert_eq!(agg.buckets().len(), 1);
    }

    #[test]
    fn max_count_on_empty_is_zero() {
        assert_eq!(aggregator().max_count(), 0);
    }

    #[test]
    fn conserves_total_count_without_eviction() {
        let mut agg = aggregator();
        let sizes = [3usize, 0, 7, 1, 12];
        let mut t = 0.0;
        for &n in &sizes {
            agg.add_batch(n, t);
            t += 2_100.0;
        }
        let total: u64 = agg.buckets().iter().map(|b| b.count).sum();
        assert_eq!(total, sizes.iter().map(|&n| n as u64).sum::<u64>());
    }
}
