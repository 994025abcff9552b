use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch. Fractional values appear as soon
/// as pixel offsets are mapped back to time.
pub type Instant = f64;

/// The visible `[from, to)` window of the timeline.
///
/// Immutable value type: every pan, zoom, selection or follow tick
/// replaces the range wholesale. The type does not reject `size <= 0`;
/// the coordinate mapper treats such a range as degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Instant,
    pub to: Instant,
}

impl TimeRange {
    pub fn new(from: Instant, to: Instant) -> Self {
        Self { from, to }
    }

    /// The window covering the last `window_ms` milliseconds ending at
    /// `now`.
    pub fn relative(window_ms: f64, now: Instant) -> Self {
        Self::new(now - window_ms, now)
    }

    pub fn size(&self) -> f64 {
        self.to - self.from
    }

    pub fn center(&self) -> Instant {
        self.from + self.size() / 2.0
    }

    pub fn contains(&self, instant: Instant) -> bool {
        instant >= self.from && instant < self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn size_and_center() {
        let r = TimeRange::new(1_000.0, 5_000.0);
        assert_relative_eq!(r.size(), 4_000.0);
        assert_relative_eq!(r.center(), 3_000.0);
    }

    #[test]
    fn relative_ends_at_now() {
        let r = TimeRange::relative(60_000.0, 100_000.0);
        assert_eq!(r, TimeRange::new(40_000.0, 100_000.0));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(TimeRange::new(0.0, 1.0), TimeRange::new(0.0, 1.0));
        assert_ne!(TimeRange::new(0.0, 1.0), TimeRange::new(0.0, 2.0));
    }

    #[test]
    fn half_open_membership() {
        let r = TimeRange::new(10.0, 20.0);
        assert!(r.contains(10.0));
        assert!(!r.contains(20.0));
    }
}
