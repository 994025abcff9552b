use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buckets::LogBucket;
use crate::error::ConfigError;
use crate::mapper::CoordinateMapper;
use crate::range::{Instant, TimeRange};
use crate::records::{DeploymentRecord, InstanceRecord};

/// Measured extent of a rendered text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSize {
    pub width: f64,
    pub height: f64,
}

/// Injected text-measurement capability.
///
/// In a browser host this wraps whatever the renderer uses to measure
/// DOM/canvas text; headless targets supply [`FixedWidthMeasurer`].
/// Treated as a pure function; the engine does no caching of its own.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style_class: &str) -> TextSize;
}

/// Deterministic per-character measurer for tests and headless use.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl FixedWidthMeasurer {
    pub fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
        }
    }
}

impl TextMeasurer for FixedWidthMeasurer {
    fn measure(&self, text: &str, _style_class: &str) -> TextSize {
        TextSize {
            width: text.chars().count() as f64 * self.char_width,
            height: self.line_height,
        }
    }
}

/// Fixed geometry of the layout. All values are pixels unless noted.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Space reserved above the first row for the hover/selection date
    /// label.
    pub header_height: f64,
    pub row_height: f64,
    pub row_gap: f64,
    /// Height of the log-volume section when any bucket exists.
    pub log_chart_height: f64,
    /// Horizontal breathing room subtracted from each log bar.
    pub log_bar_gap: f64,
    /// Number of tick intervals across the axis (tick count is one more).
    pub tick_intervals: u32,
    pub axis_height: f64,
    pub bottom_margin: f64,
    /// Style class handed to the text measurer for tick labels.
    pub tick_label_class: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header_height: 24.0,
            row_height: 20.0,
            row_gap: 4.0,
            log_chart_height: 150.0,
            log_bar_gap: 1.0,
            tick_intervals: 10,
            axis_height: 16.0,
            bottom_margin: 8.0,
            tick_label_class: "tick-label".to_owned(),
        }
    }
}

impl LayoutConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("header_height", self.header_height),
            ("row_height", self.row_height),
            ("row_gap", self.row_gap),
            ("log_chart_height", self.log_chart_height),
            ("log_bar_gap", self.log_bar_gap),
            ("axis_height", self.axis_height),
            ("bottom_margin", self.bottom_margin),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeDimension { name, value });
            }
        }
        Ok(())
    }
}

/// An instance row, clipped to the visible window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedInstance {
    pub instance: InstanceRecord,
    pub left: f64,
    pub right: f64,
    pub top: f64,
}

/// A vertical marker line for one deployment. Not clipped
/// horizontally; off-canvas markers carry off-canvas coordinates and
/// the renderer culls them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedDeployment {
    pub deployment: DeploymentRecord,
    pub left: f64,
    pub top: f64,
    pub height: f64,
}

/// One log-volume bar, scaled against the tallest visible bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedLogBar {
    pub bucket: LogBucket,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
}

/// An axis tick with a pre-formatted time label. `label_left` is
/// clamped so the label never runs past the right canvas edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub left: f64,
    pub label_left: f64,
    pub label: String,
    pub instant: Instant,
}

/// The positioned output of one layout pass. Pure data; recomputed
/// wholesale, never patched in place. An empty scene graph is a valid
/// displayable state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub instances: Vec<PositionedInstance>,
    pub deployments: Vec<PositionedDeployment>,
    pub log_bars: Vec<PositionedLogBar>,
    pub ticks: Vec<Tick>,
    pub height: f64,
}

/// Turns raw records plus the current window into a positioned scene
/// graph. Pure: the same inputs always produce an equivalent graph.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn layout(
        &self,
        range: TimeRange,
        instances: &[InstanceRecord],
        deployments: &[DeploymentRecord],
        buckets: &[LogBucket],
        bucket_duration_ms: f64,
        width: f64,
        measurer: &dyn TextMeasurer,
    ) -> SceneGraph {
        let mapper = CoordinateMapper::new(range, width);
        if mapper.is_degenerate() {
            // Transient state before the canvas is measured, or a
            // collapsed window. Nothing to draw yet.
            return SceneGraph::default();
        }

        let cfg = &self.config;
        let mut scene = SceneGraph::default();

        // Instance rows stack by instance_number below the header.
        let mut rows_bottom = cfg.header_height;
        for instance in instances {
            let x1 = mapper.to_pixel(instance.creation_date);
            // A still-alive instance extends to the canvas right edge
            // rather than to a mapped instant.
            let x2 = match instance.deletion_date {
                Some(deleted) => mapper.to_pixel(deleted),
                None => width,
            };
            let (left, x2) = CoordinateMapper::clamp_interval(x1, x2, 0.0, width);
            // Rows fully outside the window keep their slot with a
            // collapsed extent; hiding them is the renderer's call.
            let right = x2.max(left);

            let top = cfg.header_height
                + f64::from(instance.instance_number) * (cfg.row_height + cfg.row_gap);
            // No trailing gap: the next section sits flush below the
            // last row.
            rows_bottom = rows_bottom.max(top + cfg.row_height);

            scene.instances.push(PositionedInstance {
                instance: instance.clone(),
                left,
                right,
                top,
            });
        }

        // Log-volume section stacks strictly below the last row and
        // collapses entirely when no buckets are retained.
        let chart_top = rows_bottom;
        let chart_height = if buckets.is_empty() {
            0.0
        } else {
            cfg.log_chart_height
        };
        let axis_top = chart_top + chart_height;

        if !buckets.is_empty() {
            let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
            for bucket in buckets {
                let x1 = mapper.to_pixel(bucket.bucket_start);
                let x2 = mapper.to_pixel(bucket.bucket_start + bucket_duration_ms) - cfg.log_bar_gap;
                let (left, x2) = CoordinateMapper::clamp_interval(x1, x2, 0.0, width);
                let bar_width = (x2 - left).max(0.0);
                let height = bucket.count as f64 / max_count as f64 * chart_height;
                scene.log_bars.push(PositionedLogBar {
                    bucket: *bucket,
                    left,
                    width: bar_width,
                    top: axis_top - height,
                    height,
                });
            }
        }

        // Deployment markers span from the header down to the axis.
        for deployment in deployments {
            scene.deployments.push(PositionedDeployment {
                deployment: deployment.clone(),
                left: mapper.to_pixel(deployment.date),
                top: cfg.header_height,
                height: axis_top - cfg.header_height,
            });
        }

        // Evenly spaced ticks; labels pushed left so they stay on
        // canvas at the right edge.
        let intervals = cfg.tick_intervals.max(1);
        for i in 0..=intervals {
            let left = f64::from(i) * width / f64::from(intervals);
            let instant = mapper.to_instant(left);
            let label = format_clock_time(instant);
            let label_width = measurer.measure(&label, &cfg.tick_label_class).width;
            let label_left = left.min(width - label_width).max(0.0);
            scene.ticks.push(Tick {
                left,
                label_left,
                label,
                instant,
            });
        }

        scene.height = axis_top + cfg.axis_height + cfg.bottom_margin;
        trace!(
            instances = scene.instances.len(),
            log_bars = scene.log_bars.len(),
            height = scene.height,
            "recomputed scene graph"
        );
        scene
    }
}

/// Formats an instant as wall-clock `HH:MM:SS` (UTC). Localised date
/// formatting belongs to the host; this is the engine's plain fallback
/// for axis ticks.
pub(crate) fn format_clock_time(instant: Instant) -> String {
    let total_secs = (instant / 1_000.0).floor() as i64;
    let day_secs = total_secs.rem_euclid(86_400);
    let (h, m, s) = (day_secs / 3_600, day_secs / 60 % 60, day_secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}
