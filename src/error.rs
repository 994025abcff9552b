use thiserror::Error;

/// Construction-time misconfiguration.
///
/// Steady-state recomputation (aggregation, layout, interaction) never
/// returns errors; degenerate numeric input there degrades to empty or
/// zero-sized output instead. Only configuration rejects eagerly.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bucket duration must be positive, got {0} ms")]
    NonPositiveBucketDuration(f64),
    #[error("zoom factor must be greater than 1, got {0}")]
    InvalidZoomFactor(f64),
    #[error("follow period must be positive, got {0} ms")]
    NonPositiveFollowPeriod(f64),
    #[error("layout dimension `{name}` must be non-negative, got {value}")]
    NegativeDimension { name: &'static str, value: f64 },
}
