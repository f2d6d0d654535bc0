//! # Loop Driver
//!
//! Hosts a [`TickLoop`] and its handler on a dedicated thread.
//!
//! ```text
//! host thread                         driver thread
//! ───────────                         ─────────────
//! LoopHandle ── LoopCommand ──▶ recv_timeout(until next due callback)
//!     ▲                                 │ timeout → fire callback
//!     └──── Performance (Mutex) ◀───────┘ command → apply, recompute wait
//! ```
//!
//! Commands are handled between callbacks, never during one, so `stop()`
//! lets an in-flight callback finish its steps. The handler is owned by the
//! driver thread and handed back by [`LoopHandle::stop`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{DriverError, DriverResult};
use crate::tick_loop::{Clock, ClockOutcome, Performance, TickHandler, TickLoop};

/// Access to the handler, run on the driver thread.
type HandlerFn<H> = Box<dyn FnOnce(&mut H) + Send>;

/// Command to send to the driver thread.
enum LoopCommand<H> {
    /// Pause, resume or toggle.
    Pause(Option<bool>, Sender<bool>),
    /// Discard accumulated time.
    ResetClockDelta(Sender<f64>),
    /// Run a closure against the handler.
    With(HandlerFn<H>),
    /// Stop the loop and exit the thread.
    Stop,
}

/// Spawns loop threads.
#[derive(Debug)]
pub struct LoopDriver;

impl LoopDriver {
    /// Starts `tick_loop` on a new thread, driving `handler` with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Spawn`] if the thread cannot be created.
    pub fn spawn<H, C>(tick_loop: TickLoop, handler: H, clock: C) -> DriverResult<LoopHandle<H>>
    where
        H: TickHandler + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let performance = Arc::new(Mutex::new(*tick_loop.performance()));
        let shared = Arc::clone(&performance);

        let thread = thread::Builder::new()
            .name("tessera-tick".into())
            .spawn(move || run(tick_loop, handler, &clock, &command_rx, &shared))
            .map_err(DriverError::Spawn)?;

        info!("loop driver spawned");
        Ok(LoopHandle {
            command_tx,
            performance,
            thread,
        })
    }
}

fn run<H, C>(
    mut tick_loop: TickLoop,
    mut handler: H,
    clock: &C,
    commands: &Receiver<LoopCommand<H>>,
    performance: &Mutex<Performance>,
) -> H
where
    H: TickHandler,
    C: Clock,
{
    tick_loop.start(clock);

    while let Some(pending) = tick_loop.pending() {
        let wait = (pending.due - clock.now()).max(0.0);
        match commands.recv_timeout(Duration::from_secs_f64(wait / 1000.0)) {
            Err(RecvTimeoutError::Timeout) => {
                let outcome = tick_loop.fire_at(clock.now(), &mut handler, clock);
                if matches!(outcome, ClockOutcome::Ran { reported: true, .. }) {
                    *performance.lock() = *tick_loop.performance();
                }
            }
            Ok(LoopCommand::Pause(state, reply)) => {
                let _ = reply.send(tick_loop.pause(state));
            }
            Ok(LoopCommand::ResetClockDelta(reply)) => {
                let _ = reply.send(tick_loop.reset_clock_delta());
            }
            Ok(LoopCommand::With(f)) => f(&mut handler),
            Ok(LoopCommand::Stop) => break,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("loop handle dropped");
                break;
            }
        }
    }

    tick_loop.stop();
    info!(total_steps = tick_loop.total_steps(), "loop driver exiting");
    handler
}

/// Host-side handle to a running driver thread.
pub struct LoopHandle<H> {
    command_tx: Sender<LoopCommand<H>>,
    performance: Arc<Mutex<Performance>>,
    thread: JoinHandle<H>,
}

impl<H: Send + 'static> LoopHandle<H> {
    fn send(&self, command: LoopCommand<H>) -> DriverResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| DriverError::Disconnected)
    }

    /// Pauses or resumes the loop; `None` toggles. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Disconnected`] if the driver thread is gone.
    pub fn pause(&self, state: Option<bool>) -> DriverResult<bool> {
        let (tx, rx) = bounded(1);
        self.send(LoopCommand::Pause(state, tx))?;
        rx.recv().map_err(|_| DriverError::Disconnected)
    }

    /// Discards accumulated time. Returns the discarded milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Disconnected`] if the driver thread is gone.
    pub fn reset_clock_delta(&self) -> DriverResult<f64> {
        let (tx, rx) = bounded(1);
        self.send(LoopCommand::ResetClockDelta(tx))?;
        rx.recv().map_err(|_| DriverError::Disconnected)
    }

    /// Runs `f` against the handler between callbacks and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Disconnected`] if the driver thread is gone.
    pub fn with<R>(&self, f: impl FnOnce(&mut H) -> R + Send + 'static) -> DriverResult<R>
    where
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.send(LoopCommand::With(Box::new(move |handler: &mut H| {
            let _ = tx.send(f(handler));
        })))?;
        rx.recv().map_err(|_| DriverError::Disconnected)
    }

    /// Telemetry as of the last performance report.
    #[must_use]
    pub fn performance(&self) -> Performance {
        *self.performance.lock()
    }

    /// Whether the driver thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stops the loop, waits for the thread and returns the handler.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Panicked`] if the handler panicked.
    pub fn stop(self) -> DriverResult<H> {
        // The thread may have exited already; joining still reports why.
        let _ = self.command_tx.send(LoopCommand::Stop);
        self.thread.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            DriverError::Panicked(message)
        })
    }
}

impl<H> std::fmt::Debug for LoopHandle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("finished", &self.thread.is_finished())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_loop::{Hooks, SystemClock, TickLoopConfig};
    use std::time::Instant;

    #[derive(Default)]
    struct Counter {
        steps: u32,
    }

    impl TickHandler for Counter {
        fn update(&mut self, _timestep: f64) {
            self.steps += 1;
        }
    }

    fn fast_loop() -> TickLoop {
        TickLoop::new(TickLoopConfig {
            target_tps: 200.0,
            max_cps: 1000.0,
            ..TickLoopConfig::default()
        })
    }

    fn wait_for(handle: &LoopHandle<Counter>, steps: u32) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if handle.with(|counter| counter.steps).unwrap_or(0) >= steps {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_runs_and_returns_handler() {
        let handle = LoopDriver::spawn(fast_loop(), Counter::default(), SystemClock::new()).unwrap();
        assert!(wait_for(&handle, 5));
        let counter = handle.stop().unwrap();
        assert!(counter.steps >= 5);
    }

    #[test]
    fn test_pause_stops_simulation() {
        let handle = LoopDriver::spawn(fast_loop(), Counter::default(), SystemClock::new()).unwrap();
        assert!(wait_for(&handle, 1));
        assert!(handle.pause(Some(true)).unwrap());

        // Let any callback that was already in flight finish.
        thread::sleep(Duration::from_millis(30));
        let before = handle.with(|counter| counter.steps).unwrap();
        thread::sleep(Duration::from_millis(60));
        let after = handle.with(|counter| counter.steps).unwrap();
        assert_eq!(before, after);

        assert!(!handle.pause(None).unwrap());
        let discarded = handle.reset_clock_delta().unwrap();
        assert!(discarded >= 0.0);
        handle.stop().unwrap();
    }

    #[test]
    fn test_handler_panic_reported() {
        let hooks = Hooks::new(|_| panic!("step exploded"));
        let handle = LoopDriver::spawn(fast_loop(), hooks, SystemClock::new()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(handle.pause(None), Err(DriverError::Disconnected)));
        match handle.stop() {
            Err(DriverError::Panicked(message)) => assert!(message.contains("step exploded")),
            other => panic!("expected a panic report, got {other:?}"),
        }
    }
}
