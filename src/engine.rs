use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::buckets::LogBucketAggregator;
use crate::error::ConfigError;
use crate::interaction::{InteractionController, Selection};
use crate::layout::{LayoutEngine, SceneGraph, TextMeasurer};
use crate::mapper::CoordinateMapper;
use crate::range::{Instant, TimeRange};
use crate::records::{DeploymentRecord, InstanceRecord, LogEvent};
use crate::EngineConfig;

/// Injected wall clock, so "follow now" and bucket stamping are
/// deterministic under test.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as f64,
            Err(_) => 0.0,
        }
    }
}

/// Settable clock for tests. Clones share the same underlying instant,
/// so a test can keep a handle while the engine owns a boxed copy.
#[derive(Debug, Clone)]
pub struct FixedClock(Rc<Cell<f64>>);

impl FixedClock {
    pub fn new(now: Instant) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: Instant) {
        self.0.set(now);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.0.set(self.0.get() + delta_ms);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Periodic driver for follow mode, owned by the engine.
///
/// The host implements this over its real timer facility: `start`
/// arranges for [`TimelineEngine::tick`] to be called every
/// `period_ms`, `stop` cancels that arrangement. The engine starts the
/// scheduler on [`TimelineEngine::enable_follow`] and stops it on
/// [`TimelineEngine::disable_follow`] or when interaction takes over
/// the window, so the timer lifecycle is explicit and leak-free.
pub trait Scheduler {
    fn start(&mut self, period_ms: f64);
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Scheduler for tests and headless hosts: the caller decides when a
/// period has elapsed and drives the engine tick by hand.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    period_ms: Option<f64>,
}

impl ManualScheduler {
    pub fn period_ms(&self) -> Option<f64> {
        self.period_ms
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, period_ms: f64) {
        self.period_ms = Some(period_ms);
    }

    fn stop(&mut self) {
        self.period_ms = None;
    }

    fn is_active(&self) -> bool {
        self.period_ms.is_some()
    }
}

type RangeCallback = Box<dyn FnMut(TimeRange)>;
type HoverCallback = Box<dyn FnMut(Option<f64>)>;
type SelectionCallback = Box<dyn FnMut(Option<Selection>)>;

/// Single-threaded facade owning the visible window, the bucket
/// aggregator, the layout pass and the pointer state machine.
///
/// Collaborators push snapshots and events in; the engine synchronously
/// re-evicts, re-lays-out and exposes the resulting [`SceneGraph`].
/// Range changes produced by interaction or follow ticks go out through
/// `on_range_change`; the owner feeds the chosen range back through
/// [`TimelineEngine::set_range`], which deliberately does not re-fire
/// the callback.
pub struct TimelineEngine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    measurer: Box<dyn TextMeasurer>,

    range: TimeRange,
    canvas_width: f64,
    instances: Vec<InstanceRecord>,
    deployments: Vec<DeploymentRecord>,

    aggregator: LogBucketAggregator,
    layout_engine: LayoutEngine,
    controller: InteractionController,
    scene: SceneGraph,

    scheduler: Box<dyn Scheduler>,
    /// Window size in ms while follow mode is on.
    follow_window_ms: Option<f64>,

    on_range_change: Option<RangeCallback>,
    on_hover_change: Option<HoverCallback>,
    on_selection_change: Option<SelectionCallback>,
}

impl TimelineEngine {
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        measurer: Box<dyn TextMeasurer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let aggregator = LogBucketAggregator::new(config.bucket_duration_ms)?;
        let layout_engine = LayoutEngine::new(config.layout.clone())?;
        let controller = InteractionController::new(config.zoom_factor);
        let range = TimeRange::relative(15.0 * 60_000.0, clock.now());
        Ok(Self {
            config,
            clock,
            measurer,
            range,
            canvas_width: 0.0,
            instances: Vec::new(),
            deployments: Vec::new(),
            aggregator,
            layout_engine,
            controller,
            scene: SceneGraph::default(),
            scheduler: Box::new(ManualScheduler::default()),
            follow_window_ms: None,
            on_range_change: None,
            on_hover_change: None,
            on_selection_change: None,
        })
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn scene_graph(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn buckets(&self) -> &LogBucketAggregator {
        &self.aggregator
    }

    pub fn on_range_change(&mut self, f: impl FnMut(TimeRange) + 'static) {
        self.on_range_change = Some(Box::new(f));
    }

    pub fn on_hover_change(&mut self, f: impl FnMut(Option<f64>) + 'static) {
        self.on_hover_change = Some(Box::new(f));
    }

    pub fn on_selection_change(&mut self, f: impl FnMut(Option<Selection>) + 'static) {
        self.on_selection_change = Some(Box::new(f));
    }

    /// Replaces the visible window (the owner's feedback path). Evicts
    /// and re-lays-out; does not fire `on_range_change`.
    pub fn set_range(&mut self, range: TimeRange) {
        self.range = range;
        self.aggregator.evict(&self.range);
        self.relayout();
    }

    pub fn set_canvas_width(&mut self, width: f64) {
        self.canvas_width = width;
        self.relayout();
    }

    /// Full-snapshot replace of the instance list.
    pub fn set_instances(&mut self, instances: Vec<InstanceRecord>) {
        self.instances = instances;
        self.relayout();
    }

    /// Full-snapshot replace of the deployment list.
    pub fn set_deployments(&mut self, deployments: Vec<DeploymentRecord>) {
        self.deployments = deployments;
        self.relayout();
    }

    /// Folds a freshly arrived log batch into the bucket sequence,
    /// stamped with the injected clock. Only the batch size matters.
    pub fn push_log_batch(&mut self, logs: &[LogEvent]) {
        let now = self.clock.now();
        self.aggregator.add_batch(logs.len(), now);
        self.aggregator.evict(&self.range);
        self.relayout();
    }

    // Pointer input -------------------------------------------------

    pub fn pointer_move(&mut self, x: f64) {
        self.controller.pointer_move(x);
        self.notify_pointer();
    }

    pub fn pointer_down(&mut self) {
        self.controller.pointer_down();
        self.notify_pointer();
    }

    pub fn pointer_up(&mut self) {
        let mapper = self.mapper();
        if let Some(range) = self.controller.pointer_up(&mapper) {
            self.apply_interactive_range(range);
        }
        self.notify_pointer();
    }

    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
        self.notify_pointer();
    }

    /// Wheel zoom; negative `delta` zooms in.
    pub fn wheel(&mut self, delta: f64) {
        let mapper = self.mapper();
        let now = self.clock.now();
        if let Some(range) = self.controller.wheel(delta, &mapper, now) {
            self.apply_interactive_range(range);
        }
    }

    // Follow mode ---------------------------------------------------

    /// Installs the timer driver used by follow mode. The previous
    /// scheduler is stopped; if follow is already on, the new one is
    /// started immediately.
    pub fn set_scheduler(&mut self, scheduler: Box<dyn Scheduler>) {
        self.scheduler.stop();
        self.scheduler = scheduler;
        if self.follow_window_ms.is_some() {
            self.scheduler.start(self.config.follow_period_ms);
        }
    }

    /// Keeps the window pinned to "the last `window_ms` ending now" on
    /// every subsequent [`TimelineEngine::tick`], and starts the
    /// [`Scheduler`] so those ticks get driven.
    pub fn enable_follow(&mut self, window_ms: f64) {
        self.follow_window_ms = Some(window_ms);
        self.scheduler.start(self.config.follow_period_ms);
    }

    /// Stops the scheduler and makes any still-draining tick inert.
    /// Deterministic: nothing recomputes after this returns.
    pub fn disable_follow(&mut self) {
        self.follow_window_ms = None;
        self.scheduler.stop();
    }

    pub fn is_following(&self) -> bool {
        self.follow_window_ms.is_some()
    }

    /// One follow-mode refresh. The window never starts before the
    /// earliest known deployment.
    pub fn tick(&mut self) {
        let Some(window_ms) = self.follow_window_ms else {
            return;
        };
        let now = self.clock.now();
        let mut range = TimeRange::relative(window_ms, now);
        let earliest = self
            .deployments
            .iter()
            .map(|d| d.date)
            .fold(f64::INFINITY, f64::min);
        if earliest.is_finite() && range.from < earliest {
            range.from = earliest;
        }
        self.set_range(range);
        self.fire_range_change(range);
    }

    // Internals -----------------------------------------------------

    fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.range, self.canvas_width)
    }

    /// Selection and zoom take over from follow mode.
    fn apply_interactive_range(&mut self, range: TimeRange) {
        if self.follow_window_ms.take().is_some() {
            self.scheduler.stop();
            debug!("follow mode released by interaction");
        }
        self.set_range(range);
        self.fire_range_change(range);
    }

    fn relayout(&mut self) {
        self.scene = self.layout_engine.layout(
            self.range,
            &self.instances,
            &self.deployments,
            self.aggregator.buckets(),
            self.aggregator.duration_ms(),
            self.canvas_width,
            self.measurer.as_ref(),
        );
    }

    fn fire_range_change(&mut self, range: TimeRange) {
        if let Some(mut cb) = self.on_range_change.take() {
            cb(range);
            self.on_range_change = Some(cb);
        }
    }

    fn notify_pointer(&mut self) {
        let cursor = self.controller.cursor();
        if let Some(mut cb) = self.on_hover_change.take() {
            cb(cursor);
            self.on_hover_change = Some(cb);
        }
        let selection = self.controller.selection();
        if let Some(mut cb) = self.on_selection_change.take() {
            cb(selection);
            self.on_selection_change = Some(cb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FixedWidthMeasurer;
    use std::cell::RefCell;

    /// Scheduler double whose clones share one event log, so a test
    /// can hand the engine a boxed copy and keep watching it.
    #[derive(Clone, Default)]
    struct RecordingScheduler {
        events: Rc<RefCell<Vec<String>>>,
        active: Rc<Cell<bool>>,
    }

    impl Scheduler for RecordingScheduler {
        fn start(&mut self, period_ms: f64) {
            self.events.borrow_mut().push(format!("start {period_ms}"));
            self.active.set(true);
        }

        fn stop(&mut self) {
            self.events.borrow_mut().push("stop".to_owned());
            self.active.set(false);
        }

        fn is_active(&self) -> bool {
            self.active.get()
        }
    }

    fn engine_at(now: f64) -> (TimelineEngine, FixedClock) {
        let clock = FixedClock::new(now);
        let engine = TimelineEngine::new(
            EngineConfig::default(),
            Box::new(clock.clone()),
            Box::new(FixedWidthMeasurer::new(7.0, 12.0)),
        )
        .unwrap();
        (engine, clock)
    }

    #[test]
    fn rejects_bad_config() {
        let bad = EngineConfig {
            bucket_duration_ms: -5.0,
            ..EngineConfig::default()
        };
        let clock = FixedClock::new(0.0);
        assert!(TimelineEngine::new(
            bad,
            Box::new(clock),
            Box::new(FixedWidthMeasurer::new(7.0, 12.0)),
        )
        .is_err());
    }

    #[test]
    fn zero_width_canvas_gives_empty_scene_until_resize() {
        let (mut engine, _clock) = engine_at(100_000.0);
        engine.push_log_batch(&[LogEvent::default()]);
        assert_eq!(*engine.scene_graph(), SceneGraph::default());

        engine.set_canvas_width(800.0);
        assert_eq!(engine.scene_graph().ticks.len(), 11);
    }

    #[test]
    fn follow_tick_pins_window_to_now() {
        let (mut engine, clock) = engine_at(100_000.0);
        engine.set_canvas_width(800.0);
        engine.enable_follow(60_000.0);

        clock.set(130_000.0);
        engine.tick();
        assert_eq!(engine.range(), TimeRange::new(70_000.0, 130_000.0));
    }

    #[test]
    fn follow_window_clamped_to_earliest_deployment() {
        let (mut engine, clock) = engine_at(100_000.0);
        engine.set_canvas_width(800.0);
        engine.set_deployments(vec![DeploymentRecord {
            id: "d1".into(),
            date: 95_000.0,
            action: "deploy".into(),
        }]);
        engine.enable_follow(60_000.0);

        clock.set(120_000.0);
        engine.tick();
        assert_eq!(engine.range(), TimeRange::new(95_000.0, 120_000.0));
    }

    #[test]
    fn disabled_follow_ticks_are_inert() {
        let (mut engine, clock) = engine_at(100_000.0);
        engine.set_canvas_width(800.0);
        engine.enable_follow(60_000.0);
        engine.tick();
        let pinned = engine.range();

        engine.disable_follow();
        clock.set(500_000.0);
        engine.tick();
        assert_eq!(engine.range(), pinned);
    }

    #[test]
    fn interaction_releases_follow_mode() {
        let (mut engine, _clock) = engine_at(100_000.0);
        engine.set_canvas_width(800.0);
        engine.enable_follow(60_000.0);
        engine.tick();

        engine.pointer_move(100.0);
        engine.pointer_down();
        engine.pointer_move(300.0);
        engine.pointer_up();
        assert!(!engine.is_following());
    }

    #[test]
    fn follow_starts_and_stops_the_scheduler() {
        let (mut engine, _clock) = engine_at(100_000.0);
        let sched = RecordingScheduler::default();
        engine.set_scheduler(Box::new(sched.clone()));

        engine.enable_follow(60_000.0);
        assert!(sched.is_active());
        engine.disable_follow();
        assert!(!sched.is_active());
        assert_eq!(
            sched.events.borrow().as_slice(),
            &["start 10".to_owned(), "stop".to_owned()]
        );
    }

    #[test]
    fn interaction_stops_the_scheduler() {
        let (mut engine, _clock) = engine_at(100_000.0);
        engine.set_canvas_width(800.0);
        let sched = RecordingScheduler::default();
        engine.set_scheduler(Box::new(sched.clone()));
        engine.enable_follow(60_000.0);

        engine.pointer_move(100.0);
        engine.pointer_down();
        engine.pointer_move(300.0);
        engine.pointer_up();
        assert!(!engine.is_following());
        assert!(!sched.is_active());
    }

    #[test]
    fn replacing_the_scheduler_mid_follow_starts_the_new_one() {
        let (mut engine, _clock) = engine_at(100_000.0);
        engine.enable_follow(60_000.0);

        let sched = RecordingScheduler::default();
        engine.set_scheduler(Box::new(sched.clone()));
        assert!(sched.is_active());
    }

    #[test]
    fn drag_on_unmeasured_canvas_keeps_the_window() {
        let (mut engine, _clock) = engine_at(100_000.0);
        let before = engine.range();

        engine.pointer_move(100.0);
        engine.pointer_down();
        engine.pointer_move(300.0);
        engine.pointer_up();
        assert_eq!(engine.range(), before);
        assert!(engine.range().size() > 0.0);
    }

    #[test]
    fn manual_scheduler_tracks_period() {
        let mut sched = ManualScheduler::default();
        assert!(!sched.is_active());
        sched.start(10.0);
        assert_eq!(sched.period_ms(), Some(10.0));
        sched.stop();
        assert!(!sched.is_active());
    }
}
