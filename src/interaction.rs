use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapper::CoordinateMapper;
use crate::range::{Instant, TimeRange};

/// Pointer state machine over the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerState {
    Idle,
    Hover { cursor: f64 },
    Selecting { start: f64, end: Option<f64> },
}

/// A pending drag selection in pixel space, unordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub start: f64,
    pub end: f64,
}

/// Translates pointer input into hover positions, pending selections,
/// and replacement [`TimeRange`]s for zoom and drag-to-select.
///
/// The wheel-zoom path is independent of the hover/selecting machine:
/// a wheel event mid-drag still zooms. Zoom carries no size floor or
/// ceiling.
#[derive(Debug)]
pub struct InteractionController {
    state: PointerState,
    zoom_factor: f64,
}

impl InteractionController {
    pub fn new(zoom_factor: f64) -> Self {
        Self {
            state: PointerState::Idle,
            zoom_factor,
        }
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    /// Current cursor pixel, if the pointer is over the canvas.
    pub fn cursor(&self) -> Option<f64> {
        match self.state {
            PointerState::Idle => None,
            PointerState::Hover { cursor } => Some(cursor),
            PointerState::Selecting { start, end } => Some(end.unwrap_or(start)),
        }
    }

    /// The in-flight drag selection, once the pointer has moved.
    pub fn selection(&self) -> Option<Selection> {
        match self.state {
            PointerState::Selecting {
                start,
                end: Some(end),
            } => Some(Selection { start, end }),
            _ => None,
        }
    }

    pub fn pointer_move(&mut self, x: f64) {
        self.state = match self.state {
            PointerState::Idle | PointerState::Hover { .. } => PointerState::Hover { cursor: x },
            PointerState::Selecting { start, .. } => PointerState::Selecting {
                start,
                end: Some(x),
            },
        };
    }

    pub fn pointer_down(&mut self) {
        if let PointerState::Hover { cursor } = self.state {
            self.state = PointerState::Selecting {
                start: cursor,
                end: None,
            };
        }
    }

    /// Finishes a drag. A selection that never moved, or moved back to
    /// zero width, is a click and produces no range change. A drag
    /// completed while the mapper is degenerate (unmeasured canvas,
    /// collapsed window) is discarded: mapping its edges would collapse
    /// both to `range.from` and commit a zero-size window.
    pub fn pointer_up(&mut self, mapper: &CoordinateMapper) -> Option<TimeRange> {
        let released = self.state;
        self.state = PointerState::Idle;
        if mapper.is_degenerate() {
            return None;
        }
        match released {
            PointerState::Selecting {
                start,
                end: Some(end),
            } if end != start => {
                let left = start.min(end);
                let right = start.max(end);
                let range = TimeRange::new(mapper.to_instant(left), mapper.to_instant(right));
                debug!(?range, "selection committed");
                Some(range)
            }
            _ => None,
        }
    }

    pub fn pointer_leave(&mut self) {
        self.state = PointerState::Idle;
    }

    /// Anchor-preserving zoom. Negative `delta` zooms in. The window is
    /// rescaled about the instant under the cursor so that instant keeps
    /// its pixel; zooming out additionally caps `to` at `now` so the
    /// window never extends into the future.
    pub fn wheel(
        &self,
        delta: f64,
        mapper: &CoordinateMapper,
        now: Instant,
    ) -> Option<TimeRange> {
        if mapper.is_degenerate() {
            return None;
        }
        let cursor = self.cursor().unwrap_or_else(|| mapper.width() / 2.0);
        let anchor = mapper.to_instant(cursor);
        let range = mapper.range();

        let range = if delta < 0.0 {
            scale_about(range, anchor, 1.0 / self.zoom_factor)
        } else {
            let grown = scale_about(range, anchor, self.zoom_factor);
            TimeRange::new(grown.from, grown.to.min(now))
        };
        debug!(?range, zoom_in = delta < 0.0, "wheel zoom");
        Some(range)
    }
}

/// Rescales a range about a fixed anchor instant. The anchor keeps its
/// relative position inside the window, which is exactly what keeps it
/// under the pointer on screen.
fn scale_about(range: TimeRange, anchor: Instant, factor: f64) -> TimeRange {
    TimeRange::new(
        anchor - (anchor - range.from) * factor,
        anchor + (range.to - anchor) * factor,
    )
}
