//! # Tick Loop
//!
//! Fixed-timestep scheduler with overload protection.
//!
//! The loop never sleeps by itself. It keeps one pending callback (a due
//! timestamp) and the host fires it when the time comes, either by hand or
//! through [`LoopDriver`](crate::driver::LoopDriver).
//!
//! ```text
//!            start()                 warm-up fired
//! Stopped ──────────▶ Starting ─────────────────────▶ Running ◀──▶ Paused
//!    ▲                                                   │
//!    └───────────────────────── stop() ──────────────────┘
//! ```
//!
//! ## One Clock Callback
//!
//! ```text
//! 1. reschedule:  due = now + max(0, timestep - (now - last_due))
//! 2. always()
//! 3. throttle:    ts < last + min_clock_interval  → return
//! 4. paused:      last = ts                       → return
//! 5. delta += ts - last
//! 6. begin(ts, delta)
//! 7. while delta >= timestep { update(timestep); delta -= timestep }
//!    (at most 240 steps, then the overload flag is raised)
//! 8. performance report every `performance_interval_ms`
//! 9. end(perf, overloaded); overloaded = false
//! ```
//!
//! All times are milliseconds as `f64`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default target ticks per second.
pub const DEFAULT_TARGET_TPS: f64 = 20.0;

/// Default maximum callbacks per second.
pub const DEFAULT_MAX_CPS: f64 = 100.0;

/// Default performance report interval (0 = every callback).
pub const DEFAULT_PERFORMANCE_INTERVAL_MS: f64 = 0.0;

/// Default EMA weight of the newest performance sample.
pub const DEFAULT_PERFORMANCE_ALPHA: f64 = 0.9;

/// Simulation steps allowed in one callback before the overload flag trips.
pub const MAX_STEPS_PER_CALLBACK: u32 = 240;

/// Tick loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickLoopConfig {
    /// Target simulation steps per second.
    pub target_tps: f64,
    /// Maximum clock callbacks per second.
    pub max_cps: f64,
    /// Milliseconds between performance reports.
    pub performance_interval_ms: f64,
    /// Weight of the newest sample in the performance EMA.
    pub performance_alpha: f64,
}

impl Default for TickLoopConfig {
    fn default() -> Self {
        Self {
            target_tps: DEFAULT_TARGET_TPS,
            max_cps: DEFAULT_MAX_CPS,
            performance_interval_ms: DEFAULT_PERFORMANCE_INTERVAL_MS,
            performance_alpha: DEFAULT_PERFORMANCE_ALPHA,
        }
    }
}

/// Source of the current time in milliseconds.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `ms`.
    #[must_use]
    pub fn starting_at(ms: f64) -> Self {
        let clock = Self::default();
        clock.set(ms);
        clock
    }

    /// Sets the current time.
    pub fn set(&self, ms: f64) {
        self.bits.store(ms.to_bits(), Ordering::SeqCst);
    }

    /// Moves the current time forward by `ms`.
    pub fn advance(&self, ms: f64) {
        self.set(self.now() + ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Callbacks run by the loop.
///
/// Only `update` is required; it runs once per fixed simulation step.
pub trait TickHandler {
    /// Runs on every callback, paused or throttled included.
    fn always(&mut self) {}

    /// Runs before the steps of an accepted callback.
    fn begin(&mut self, _timestamp: f64, _delta: f64) {}

    /// Runs one simulation step of `timestep` milliseconds.
    fn update(&mut self, timestep: f64);

    /// Runs after the steps with the latest telemetry.
    fn end(&mut self, _performance: &Performance, _overloaded: bool) {}
}

type AlwaysHook = Box<dyn FnMut() + Send>;
type BeginHook = Box<dyn FnMut(f64, f64) + Send>;
type UpdateHook = Box<dyn FnMut(f64) + Send>;
type EndHook = Box<dyn FnMut(&Performance, bool) + Send>;

/// [`TickHandler`] assembled from closures.
pub struct Hooks {
    always: Option<AlwaysHook>,
    begin: Option<BeginHook>,
    update: UpdateHook,
    end: Option<EndHook>,
}

impl Hooks {
    /// Hooks with the given step function and no-op others.
    #[must_use]
    pub fn new(update: impl FnMut(f64) + Send + 'static) -> Self {
        Self {
            always: None,
            begin: None,
            update: Box::new(update),
            end: None,
        }
    }

    /// Sets the always hook.
    #[must_use]
    pub fn on_always(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.always = Some(Box::new(hook));
        self
    }

    /// Sets the begin hook.
    #[must_use]
    pub fn on_begin(mut self, hook: impl FnMut(f64, f64) + Send + 'static) -> Self {
        self.begin = Some(Box::new(hook));
        self
    }

    /// Sets the end hook.
    #[must_use]
    pub fn on_end(mut self, hook: impl FnMut(&Performance, bool) + Send + 'static) -> Self {
        self.end = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("always", &self.always.is_some())
            .field("begin", &self.begin.is_some())
            .field("end", &self.end.is_some())
            .finish_non_exhaustive()
    }
}

impl TickHandler for Hooks {
    fn always(&mut self) {
        if let Some(hook) = self.always.as_mut() {
            hook();
        }
    }

    fn begin(&mut self, timestamp: f64, delta: f64) {
        if let Some(hook) = self.begin.as_mut() {
            hook(timestamp, delta);
        }
    }

    fn update(&mut self, timestep: f64) {
        (self.update)(timestep);
    }

    fn end(&mut self, performance: &Performance, overloaded: bool) {
        if let Some(hook) = self.end.as_mut() {
            hook(performance, overloaded);
        }
    }
}

/// Smoothed loop telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Observed simulation steps per second.
    pub tps: f64,
    /// Wall milliseconds spent in begin + steps per callback.
    pub mspt: f64,
    /// Percentage shortfall from the target TPS (negative when ahead).
    pub deviation: f64,
    /// Time spent simulating as a percentage of one timestep.
    pub load: f64,
    /// Minimum milliseconds between accepted callbacks.
    pub clock_interval: f64,
}

/// Lifecycle state of a [`TickLoop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Not started, or stopped.
    Stopped,
    /// Waiting for the warm-up callback.
    Starting,
    /// Running clock callbacks.
    Running,
}

/// What a pending callback will do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    /// Establishes the time baseline without simulating.
    Warmup,
    /// Regular clock callback.
    Clock,
}

/// The callback a loop is waiting to have fired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingCallback {
    /// What the callback does.
    pub kind: CallbackKind,
    /// Timestamp it is due at, and the timestamp it receives.
    pub due: f64,
    /// Cancellation handle.
    pub handle: u64,
}

/// Result of firing a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Nothing was pending; the loop is stopped.
    Idle,
    /// The warm-up callback set the baseline.
    Warmup,
    /// Too soon after the previous accepted callback.
    Throttled,
    /// Paused; the timestamp was recorded.
    Paused,
    /// Simulation ran.
    Ran {
        /// Steps taken this callback.
        steps: u32,
        /// Whether the step cap was hit.
        overloaded: bool,
        /// Whether telemetry was recomputed.
        reported: bool,
    },
}

/// Computes when the next callback is due.
///
/// The next callback runs no sooner than one timestep after the previous
/// due time, but immediately if the current one already overran.
#[derive(Clone, Copy, Debug, Default)]
struct Pacer {
    last_due: f64,
}

impl Pacer {
    fn next_due(&mut self, now: f64, timestep: f64) -> f64 {
        let timeout = (timestep - (now - self.last_due)).max(0.0);
        self.last_due = now + timeout;
        self.last_due
    }
}

/// Fixed-timestep loop state machine.
#[derive(Debug)]
pub struct TickLoop {
    config: TickLoopConfig,
    timestep: f64,
    min_clock_interval: f64,

    state: LoopState,
    paused: bool,
    overloaded: bool,

    clock_delta: f64,
    last_clock_time: f64,
    last_performance_update: f64,
    steps_since_report: u64,
    total_steps: u64,

    pacer: Pacer,
    pending: Option<PendingCallback>,
    next_handle: u64,

    performance: Performance,
}

impl TickLoop {
    /// Creates a stopped loop. Unusable rates fall back to the defaults.
    #[must_use]
    pub fn new(config: TickLoopConfig) -> Self {
        let mut tick_loop = Self {
            config: TickLoopConfig::default(),
            timestep: 1000.0 / DEFAULT_TARGET_TPS,
            min_clock_interval: 1000.0 / DEFAULT_MAX_CPS,
            state: LoopState::Stopped,
            paused: false,
            overloaded: false,
            clock_delta: 0.0,
            last_clock_time: 0.0,
            last_performance_update: 0.0,
            steps_since_report: 0,
            total_steps: 0,
            pacer: Pacer::default(),
            pending: None,
            next_handle: 0,
            performance: Performance {
                tps: DEFAULT_TARGET_TPS,
                mspt: 0.0,
                deviation: 0.0,
                load: 0.0,
                clock_interval: 1000.0 / DEFAULT_MAX_CPS,
            },
        };
        tick_loop.set_target_tps(config.target_tps);
        tick_loop.set_max_cps(config.max_cps);
        tick_loop.set_performance_interval(config.performance_interval_ms);
        tick_loop.set_performance_alpha(config.performance_alpha);
        tick_loop.performance.tps = tick_loop.config.target_tps;
        tick_loop
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> &TickLoopConfig {
        &self.config
    }

    /// Sets the target TPS and derived timestep. Returns the stored value.
    pub fn set_target_tps(&mut self, tps: f64) -> f64 {
        if tps.is_finite() && tps > 0.0 {
            self.config.target_tps = tps;
            self.timestep = 1000.0 / tps;
        }
        self.config.target_tps
    }

    /// Sets the maximum callback rate. Returns the stored value.
    pub fn set_max_cps(&mut self, cps: f64) -> f64 {
        if cps.is_finite() && cps > 0.0 {
            self.config.max_cps = cps;
            self.min_clock_interval = 1000.0 / cps;
            self.performance.clock_interval = self.min_clock_interval;
        }
        self.config.max_cps
    }

    /// Sets the performance report interval. Returns the stored value.
    pub fn set_performance_interval(&mut self, interval_ms: f64) -> f64 {
        if interval_ms.is_finite() && interval_ms >= 0.0 {
            self.config.performance_interval_ms = interval_ms;
        }
        self.config.performance_interval_ms
    }

    /// Sets the EMA weight, clamped to `[0, 1]`. Returns the stored value.
    pub fn set_performance_alpha(&mut self, alpha: f64) -> f64 {
        if alpha.is_finite() {
            self.config.performance_alpha = alpha.clamp(0.0, 1.0);
        }
        self.config.performance_alpha
    }

    /// Fixed step length in milliseconds.
    #[inline]
    #[must_use]
    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Minimum milliseconds between accepted callbacks.
    #[inline]
    #[must_use]
    pub const fn min_clock_interval(&self) -> f64 {
        self.min_clock_interval
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Whether the warm-up has completed and the loop is not stopped.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Whether simulation is paused.
    #[inline]
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Accumulated, not yet simulated milliseconds.
    #[inline]
    #[must_use]
    pub const fn clock_delta(&self) -> f64 {
        self.clock_delta
    }

    /// Steps simulated since creation.
    #[inline]
    #[must_use]
    pub const fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Latest telemetry.
    #[inline]
    #[must_use]
    pub const fn performance(&self) -> &Performance {
        &self.performance
    }

    /// The callback waiting to be fired.
    #[inline]
    #[must_use]
    pub const fn pending(&self) -> Option<PendingCallback> {
        self.pending
    }

    /// Pauses or resumes. `None` toggles. Returns the new paused state.
    pub fn pause(&mut self, state: Option<bool>) -> bool {
        self.paused = state.unwrap_or(!self.paused);
        debug!(paused = self.paused, "tick loop pause changed");
        self.paused
    }

    /// Discards accumulated time. Returns the discarded milliseconds.
    pub fn reset_clock_delta(&mut self) -> f64 {
        std::mem::take(&mut self.clock_delta)
    }

    /// Starts the loop by scheduling the warm-up callback.
    ///
    /// Returns false if the loop was already started.
    pub fn start(&mut self, clock: &dyn Clock) -> bool {
        if self.state != LoopState::Stopped {
            return false;
        }
        self.state = LoopState::Starting;
        self.pacer.last_due = clock.now();
        self.schedule(CallbackKind::Warmup, clock);
        info!(
            target_tps = self.config.target_tps,
            max_cps = self.config.max_cps,
            "tick loop started"
        );
        true
    }

    /// Cancels the pending callback and stops. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        self.state = LoopState::Stopped;
        self.pending = None;
        info!(total_steps = self.total_steps, "tick loop stopped");
        true
    }

    /// Fires the pending callback at its due timestamp.
    pub fn fire<H>(&mut self, handler: &mut H, clock: &dyn Clock) -> ClockOutcome
    where
        H: TickHandler + ?Sized,
    {
        match self.pending {
            Some(pending) => self.fire_at(pending.due, handler, clock),
            None => ClockOutcome::Idle,
        }
    }

    /// Fires the pending callback with an explicit timestamp.
    pub fn fire_at<H>(&mut self, timestamp: f64, handler: &mut H, clock: &dyn Clock) -> ClockOutcome
    where
        H: TickHandler + ?Sized,
    {
        let Some(pending) = self.pending.take() else {
            return ClockOutcome::Idle;
        };
        match pending.kind {
            CallbackKind::Warmup => self.warm_up(timestamp, clock),
            CallbackKind::Clock => self.run_clock(timestamp, handler, clock),
        }
    }

    fn schedule(&mut self, kind: CallbackKind, clock: &dyn Clock) {
        let due = self.pacer.next_due(clock.now(), self.timestep);
        self.next_handle += 1;
        self.pending = Some(PendingCallback {
            kind,
            due,
            handle: self.next_handle,
        });
    }

    fn warm_up(&mut self, timestamp: f64, clock: &dyn Clock) -> ClockOutcome {
        self.state = LoopState::Running;
        // Time since start is not simulated.
        self.last_clock_time = timestamp;
        self.last_performance_update = timestamp;
        self.steps_since_report = 0;
        self.schedule(CallbackKind::Clock, clock);
        ClockOutcome::Warmup
    }

    fn run_clock<H>(&mut self, timestamp: f64, handler: &mut H, clock: &dyn Clock) -> ClockOutcome
    where
        H: TickHandler + ?Sized,
    {
        self.schedule(CallbackKind::Clock, clock);

        handler.always();

        if timestamp < self.last_clock_time + self.min_clock_interval {
            return ClockOutcome::Throttled;
        }

        if self.paused {
            self.last_clock_time = timestamp;
            return ClockOutcome::Paused;
        }

        let tick_start = clock.now();
        self.clock_delta += timestamp - self.last_clock_time;
        self.last_clock_time = timestamp;

        handler.begin(timestamp, self.clock_delta);

        let mut steps = 0;
        while self.clock_delta >= self.timestep {
            handler.update(self.timestep);
            self.clock_delta -= self.timestep;
            steps += 1;
            if steps >= MAX_STEPS_PER_CALLBACK {
                self.overloaded = true;
                warn!(
                    steps,
                    backlog_ms = self.clock_delta,
                    "tick loop overloaded, deferring remaining time"
                );
                break;
            }
        }
        self.steps_since_report += u64::from(steps);
        self.total_steps += u64::from(steps);

        let tick_end = clock.now();

        let reported = timestamp > self.last_performance_update + self.config.performance_interval_ms;
        if reported {
            self.report(timestamp, tick_end - tick_start);
        }

        let overloaded = self.overloaded;
        handler.end(&self.performance, overloaded);
        self.overloaded = false;

        ClockOutcome::Ran {
            steps,
            overloaded,
            reported,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&mut self, timestamp: f64, spent: f64) {
        let alpha = self.config.performance_alpha;
        let weigh = |old: f64, new: f64| alpha * new + (1.0 - alpha) * old;

        let elapsed = timestamp - self.last_performance_update;
        let perf = &mut self.performance;
        perf.tps = weigh(perf.tps, self.steps_since_report as f64 / (elapsed + 1.0) * 1000.0);
        perf.mspt = weigh(perf.mspt, spent);
        perf.deviation = weigh(perf.deviation, 100.0 - perf.tps / self.config.target_tps * 100.0);
        perf.load = weigh(perf.load, perf.mspt / self.timestep * 100.0);
        perf.clock_interval = self.min_clock_interval;

        self.steps_since_report = 0;
        self.last_performance_update = timestamp;

        debug!(
            tps = perf.tps,
            mspt = perf.mspt,
            deviation = perf.deviation,
            load = perf.load,
            "tick loop performance"
        );
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(TickLoopConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        always: u32,
        begins: Vec<(f64, f64)>,
        steps: u32,
        ends: Vec<bool>,
    }

    impl TickHandler for Recorder {
        fn always(&mut self) {
            self.always += 1;
        }

        fn begin(&mut self, timestamp: f64, delta: f64) {
            self.begins.push((timestamp, delta));
        }

        fn update(&mut self, _timestep: f64) {
            self.steps += 1;
        }

        fn end(&mut self, _performance: &Performance, overloaded: bool) {
            self.ends.push(overloaded);
        }
    }

    /// Started and warmed up with the baseline at `t = 50`.
    fn running_loop(clock: &ManualClock) -> TickLoop {
        let mut tick_loop = TickLoop::default();
        assert!(tick_loop.start(clock));
        let pending = tick_loop.pending().map(|p| (p.kind, p.due));
        assert_eq!(pending, Some((CallbackKind::Warmup, 50.0)));

        clock.set(50.0);
        let mut idle = Recorder::default();
        assert_eq!(tick_loop.fire(&mut idle, clock), ClockOutcome::Warmup);
        assert_eq!(idle.always, 0);
        assert!(tick_loop.is_running());
        tick_loop
    }

    #[test]
    fn test_fixed_timestep_catch_up() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        let outcome = tick_loop.fire_at(310.0, &mut recorder, &clock);

        assert_eq!(
            outcome,
            ClockOutcome::Ran {
                steps: 5,
                overloaded: false,
                reported: true
            }
        );
        assert_eq!(recorder.steps, 5);
        assert!((tick_loop.clock_delta() - 10.0).abs() < 1e-9);
        assert_eq!(recorder.begins, vec![(310.0, 260.0)]);
        assert_eq!(recorder.ends, vec![false]);
    }

    #[test]
    fn test_overload_cap() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        let outcome = tick_loop.fire_at(50.0 + 50.0 * 1000.0, &mut recorder, &clock);

        assert_eq!(
            outcome,
            ClockOutcome::Ran {
                steps: MAX_STEPS_PER_CALLBACK,
                overloaded: true,
                reported: true
            }
        );
        assert_eq!(recorder.steps, 240);
        assert_eq!(recorder.ends, vec![true]);
        assert!((tick_loop.clock_delta() - 50.0 * 760.0).abs() < 1e-6);

        // The flag is cleared after the end hook.
        tick_loop.reset_clock_delta();
        let t = 50.0 + 50.0 * 1000.0 + 50.0;
        tick_loop.fire_at(t, &mut recorder, &clock);
        assert_eq!(recorder.ends, vec![true, false]);
    }

    #[test]
    fn test_reset_clock_delta_returns_backlog() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        tick_loop.fire_at(50.0 + 50.0 * 300.0, &mut recorder, &clock);
        let discarded = tick_loop.reset_clock_delta();
        assert!((discarded - 50.0 * 60.0).abs() < 1e-6);
        assert_eq!(tick_loop.clock_delta(), 0.0);
    }

    #[test]
    fn test_throttle_skips_simulation() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        // min clock interval is 10ms at 100 CPS
        assert_eq!(tick_loop.fire_at(55.0, &mut recorder, &clock), ClockOutcome::Throttled);
        assert_eq!(recorder.always, 1);
        assert!(recorder.begins.is_empty());
        assert_eq!(tick_loop.clock_delta(), 0.0);
    }

    #[test]
    fn test_pause_records_time() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        assert!(tick_loop.pause(None));
        assert_eq!(tick_loop.fire_at(1_050.0, &mut recorder, &clock), ClockOutcome::Paused);
        assert_eq!(recorder.steps, 0);
        assert_eq!(recorder.always, 1);

        // Paused wall time is not simulated after resuming.
        assert!(!tick_loop.pause(Some(false)));
        tick_loop.fire_at(1_100.0, &mut recorder, &clock);
        assert_eq!(recorder.steps, 1);
        assert!(tick_loop.clock_delta().abs() < 1e-9);
    }

    #[test]
    fn test_pause_toggle_and_set() {
        let mut tick_loop = TickLoop::default();
        assert!(tick_loop.pause(None));
        assert!(!tick_loop.pause(None));
        assert!(tick_loop.pause(Some(true)));
        assert!(tick_loop.pause(Some(true)));
        assert!(!tick_loop.pause(Some(false)));
    }

    #[test]
    fn test_pacer_keeps_timestep_spacing() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        // Warm-up at t=50 scheduled the first clock callback at 100.
        assert_eq!(tick_loop.pending().map(|p| p.due), Some(100.0));

        clock.set(100.0);
        tick_loop.fire(&mut recorder, &clock);
        assert_eq!(tick_loop.pending().map(|p| p.due), Some(150.0));

        // A callback that overran schedules the next one immediately.
        clock.set(400.0);
        tick_loop.fire(&mut recorder, &clock);
        assert_eq!(tick_loop.pending().map(|p| p.due), Some(400.0));
    }

    #[test]
    fn test_stop_cancels_pending() {
        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        let mut recorder = Recorder::default();

        assert!(tick_loop.stop());
        assert!(tick_loop.pending().is_none());
        assert_eq!(tick_loop.fire(&mut recorder, &clock), ClockOutcome::Idle);
        assert_eq!(recorder.always, 0);
        assert!(!tick_loop.stop());
        assert_eq!(tick_loop.state(), LoopState::Stopped);

        // A stopped loop can start again.
        assert!(tick_loop.start(&clock));
        assert_eq!(tick_loop.state(), LoopState::Starting);
    }

    #[test]
    fn test_performance_report() {
        let clock = ManualClock::default();
        let mut tick_loop = TickLoop::new(TickLoopConfig {
            performance_alpha: 1.0,
            ..TickLoopConfig::default()
        });
        tick_loop.start(&clock);
        clock.set(0.0);
        let mut recorder = Recorder::default();
        tick_loop.fire_at(0.0, &mut recorder, &clock);

        // 20 steps over 1000ms, reported with alpha = 1
        tick_loop.fire_at(1_000.0, &mut recorder, &clock);
        let perf = *tick_loop.performance();
        assert!((perf.tps - 20.0 / 1_001.0 * 1_000.0).abs() < 1e-9);
        assert!((perf.deviation - (100.0 - perf.tps / 20.0 * 100.0)).abs() < 1e-9);
        assert_eq!(perf.mspt, 0.0);
        assert_eq!(perf.load, 0.0);
        assert_eq!(perf.clock_interval, 10.0);
    }

    #[test]
    fn test_report_interval_gates_updates() {
        let clock = ManualClock::default();
        let mut tick_loop = TickLoop::new(TickLoopConfig {
            performance_interval_ms: 500.0,
            ..TickLoopConfig::default()
        });
        tick_loop.start(&clock);
        let mut recorder = Recorder::default();
        tick_loop.fire_at(0.0, &mut recorder, &clock);

        let first = tick_loop.fire_at(100.0, &mut recorder, &clock);
        assert!(matches!(first, ClockOutcome::Ran { reported: false, .. }));
        let second = tick_loop.fire_at(600.0, &mut recorder, &clock);
        assert!(matches!(second, ClockOutcome::Ran { reported: true, .. }));
    }

    #[test]
    fn test_invalid_rates_ignored() {
        let mut tick_loop = TickLoop::default();
        assert_eq!(tick_loop.set_target_tps(0.0), 20.0);
        assert_eq!(tick_loop.set_max_cps(f64::NAN), 100.0);
        assert_eq!(tick_loop.set_performance_alpha(3.0), 1.0);
        assert_eq!(tick_loop.set_target_tps(50.0), 50.0);
        assert_eq!(tick_loop.timestep(), 20.0);
    }

    #[test]
    fn test_hooks_handler() {
        use std::sync::atomic::AtomicU32;

        let steps = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&steps);
        let mut hooks = Hooks::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        let clock = ManualClock::default();
        let mut tick_loop = running_loop(&clock);
        tick_loop.fire_at(250.0, &mut hooks, &clock);
        assert_eq!(steps.load(Ordering::SeqCst), 4);
    }
}
