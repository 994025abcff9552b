//! Windowing, coordinate-mapping and aggregation engine for an
//! operations timeline.
//!
//! The engine correlates three time-indexed streams for a running
//! application: deployment events, instance lifecycle intervals, and a
//! high-volume log stream. It owns the visible [`TimeRange`], converts
//! between wall-clock instants and horizontal pixel offsets, aggregates
//! incoming log batches into fixed-duration count buckets, and lays the
//! whole thing out into a positioned, clipped [`SceneGraph`] that an
//! external renderer paints.
//!
//! Nothing in this crate draws. Rendering, log search, transport and
//! date localisation are collaborators on the far side of the
//! [`SceneGraph`] and the injected [`TextMeasurer`] / [`Clock`]
//! capabilities.
//!
//! ```
//! use timelane::{EngineConfig, FixedClock, FixedWidthMeasurer, LogEvent, TimeRange, TimelineEngine};
//!
//! let clock = FixedClock::new(10_000.0);
//! let mut engine = TimelineEngine::new(
//!     EngineConfig::default(),
//!     Box::new(clock.clone()),
//!     Box::new(FixedWidthMeasurer::new(7.0, 12.0)),
//! )
//! .unwrap();
//! engine.set_canvas_width(800.0);
//! engine.set_range(TimeRange::new(0.0, 10_000.0));
//! engine.push_log_batch(&[LogEvent::default()]);
//! assert_eq!(engine.scene_graph().log_bars.len(), 1);
//! ```

mod buckets;
mod engine;
mod error;
mod interaction;
mod layout;
mod mapper;
mod range;
mod records;

pub use buckets::{LogBucket, LogBucketAggregator};
pub use engine::{
    Clock, FixedClock, ManualScheduler, Scheduler, SystemClock, TimelineEngine,
};
pub use error::ConfigError;
pub use interaction::{InteractionController, PointerState, Selection};
pub use layout::{
    FixedWidthMeasurer, LayoutConfig, LayoutEngine, PositionedDeployment, PositionedInstance,
    PositionedLogBar, SceneGraph, TextMeasurer, TextSize, Tick,
};
pub use mapper::CoordinateMapper;
pub use range::{Instant, TimeRange};
pub use records::{DeploymentRecord, InstanceRecord, InstanceState, LogEvent};

/// Top-level engine configuration, validated at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Width of one log-count bucket in milliseconds.
    pub bucket_duration_ms: f64,
    /// Multiplicative zoom step per wheel notch.
    pub zoom_factor: f64,
    /// Period the follow-mode scheduler is started with.
    pub follow_period_ms: f64,
    pub layout: LayoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket_duration_ms: 5_000.0,
            zoom_factor: 1.2,
            follow_period_ms: 10.0,
            layout: LayoutConfig::default(),
        }
    }
}

impl EngineConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bucket_duration_ms > 0.0) {
            return Err(ConfigError::NonPositiveBucketDuration(
                self.bucket_duration_ms,
            ));
        }
        if !(self.zoom_factor > 1.0) {
            return Err(ConfigError::InvalidZoomFactor(self.zoom_factor));
        }
        if !(self.follow_period_ms > 0.0) {
            return Err(ConfigError::NonPositiveFollowPeriod(self.follow_period_ms));
        }
        self.layout.validate()
    }
}
