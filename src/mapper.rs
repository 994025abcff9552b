use crate::range::{Instant, TimeRange};

/// Converts between instants and horizontal pixel offsets for one
/// `(range, width)` pair.
///
/// `to_pixel` is deliberately unclamped; callers that need an on-canvas
/// position clamp through [`CoordinateMapper::clamp_interval`] or
/// against `[0, width]` themselves. A mapper built from a zero-size
/// range or a non-positive width is degenerate: it never panics or
/// divides by zero, it just collapses everything to the left edge. That
/// state is expected transiently before the canvas has a measured size.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    range: TimeRange,
    width: f64,
    /// Milliseconds per pixel; `None` when degenerate.
    scale: Option<f64>,
}

impl CoordinateMapper {
    pub fn new(range: TimeRange, width: f64) -> Self {
        let scale = if width > 0.0 && range.size() > 0.0 {
            Some(range.size() / width)
        } else {
            None
        };
        Self { range, width, scale }
    }

    pub fn is_degenerate(&self) -> bool {
        self.scale.is_none()
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Milliseconds covered by one pixel, 0 when degenerate.
    pub fn millis_per_pixel(&self) -> f64 {
        self.scale.unwrap_or(0.0)
    }

    pub fn to_pixel(&self, instant: Instant) -> f64 {
        match self.scale {
            Some(scale) => (instant - self.range.from) / scale,
            None => 0.0,
        }
    }

    pub fn to_instant(&self, pixel: f64) -> Instant {
        match self.scale {
            Some(scale) => pixel * scale + self.range.from,
            None => self.range.from,
        }
    }

    /// Bounds both ends of a pixel interval into `[min, max]`. The
    /// input ends may arrive in either order and keep their order.
    pub fn clamp_interval(x1: f64, x2: f64, min: f64, max: f64) -> (f64, f64) {
        (x1.clamp(min, max), x2.clamp(min, max))
    }
}
