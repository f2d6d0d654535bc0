//! # Events
//!
//! Two publish mechanisms:
//!
//! - [`EventBus`]: every emission goes to one router function, which must
//!   resolve it exactly once through its [`Responder`]. The emitter holds an
//!   [`EmitReceipt`] for the outcome.
//! - [`EventEmitter`]: named listener lists with `on`, `once` and
//!   `remove_listener`.
//!
//! ```text
//! emit(event, data) ──▶ router(event, Emission { data, responder })
//!        │                                          │
//!        ▼                                          ▼
//!   EmitReceipt ◀──────── one-shot channel ─── end(result) / fail()
//! ```
//!
//! An emission whose responder is dropped unresolved stays pending forever.
//! Receipts report that as [`EmitReceipt::is_abandoned`], never as an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tessera_core::EntityId;
use tracing::trace;

/// Data carried by an emission or returned by a router.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventPayload {
    /// No data.
    #[default]
    None,
    /// An entity reference.
    Entity(EntityId),
    /// A point on the tile plane.
    Point([f64; 2]),
    /// A number.
    Number(f64),
    /// Free text.
    Text(String),
}

/// Final state of an emission.
#[derive(Clone, Debug, PartialEq)]
pub enum EmitOutcome {
    /// The router called [`Responder::end`] with a result.
    Ended(EventPayload),
    /// The router called [`Responder::fail`].
    Failed,
}

impl EmitOutcome {
    /// Whether the emission ended successfully.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ended(_))
    }

    /// Result data of a successful emission.
    #[must_use]
    pub fn data(&self) -> Option<&EventPayload> {
        match self {
            Self::Ended(data) => Some(data),
            Self::Failed => None,
        }
    }
}

/// Resolves one emission. Consumed on use, so it resolves at most once.
#[derive(Debug)]
pub struct Responder {
    tx: Sender<EmitOutcome>,
}

impl Responder {
    /// Resolves the emission as failed.
    pub fn fail(self) {
        // The receipt may already be gone; nobody is left to tell.
        let _ = self.tx.send(EmitOutcome::Failed);
    }

    /// Resolves the emission successfully with `result`.
    pub fn end(self, result: EventPayload) {
        let _ = self.tx.send(EmitOutcome::Ended(result));
    }
}

/// An emission as seen by the router.
#[derive(Debug)]
pub struct Emission {
    /// Emitted data.
    pub data: EventPayload,
    /// Resolution handle.
    pub responder: Responder,
}

impl Emission {
    /// Resolves as failed.
    pub fn fail(self) {
        self.responder.fail();
    }

    /// Resolves successfully with `result`.
    pub fn end(self, result: EventPayload) {
        self.responder.end(result);
    }
}

#[derive(Clone, Debug, PartialEq)]
enum ReceiptState {
    Pending,
    Resolved(EmitOutcome),
    Abandoned,
}

/// Emitter-side handle to an emission's outcome.
#[derive(Debug)]
pub struct EmitReceipt {
    rx: Receiver<EmitOutcome>,
    state: ReceiptState,
}

impl EmitReceipt {
    fn settle(&mut self, result: Result<EmitOutcome, bool>) {
        match result {
            Ok(outcome) => self.state = ReceiptState::Resolved(outcome),
            Err(true) => self.state = ReceiptState::Abandoned,
            Err(false) => {}
        }
    }

    /// Outcome, if the router has resolved the emission.
    pub fn try_outcome(&mut self) -> Option<EmitOutcome> {
        if self.state == ReceiptState::Pending {
            let polled = self.rx.try_recv().map_err(|err| err == TryRecvError::Disconnected);
            self.settle(polled);
        }
        self.outcome()
    }

    /// Waits up to `timeout` for the outcome.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<EmitOutcome> {
        if self.state == ReceiptState::Pending {
            let polled = self
                .rx
                .recv_timeout(timeout)
                .map_err(|err| err == RecvTimeoutError::Disconnected);
            self.settle(polled);
        }
        self.outcome()
    }

    /// Whether the responder was dropped without resolving.
    pub fn is_abandoned(&mut self) -> bool {
        self.try_outcome();
        self.state == ReceiptState::Abandoned
    }

    fn outcome(&self) -> Option<EmitOutcome> {
        match &self.state {
            ReceiptState::Resolved(outcome) => Some(outcome.clone()),
            ReceiptState::Pending | ReceiptState::Abandoned => None,
        }
    }
}

type Router = Box<dyn FnMut(&str, Emission) + Send>;

/// Emissions parked for later resolution.
pub type UnresolvedQueue = Arc<Mutex<Vec<(String, Emission)>>>;

/// Router-based event bus.
pub struct EventBus {
    router: Router,
    emitted: u64,
}

impl EventBus {
    /// Bus that hands every emission to `router`.
    #[must_use]
    pub fn new(router: impl FnMut(&str, Emission) + Send + 'static) -> Self {
        Self {
            router: Box::new(router),
            emitted: 0,
        }
    }

    /// Bus that parks every emission in the returned queue.
    #[must_use]
    pub fn parking() -> (Self, UnresolvedQueue) {
        let queue: UnresolvedQueue = Arc::default();
        let parked = Arc::clone(&queue);
        let bus = Self::new(move |event, emission| {
            parked.lock().push((event.to_owned(), emission));
        });
        (bus, queue)
    }

    /// Emits `event` with `data` and returns a receipt for the outcome.
    pub fn emit(&mut self, event: &str, data: EventPayload) -> EmitReceipt {
        let (tx, rx) = bounded(1);
        self.emitted += 1;
        trace!(event, "emit");
        (self.router)(
            event,
            Emission {
                data,
                responder: Responder { tx },
            },
        );
        EmitReceipt {
            rx,
            state: ReceiptState::Pending,
        }
    }

    /// Number of emissions so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

/// Identifies a listener registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener<A> {
    id: ListenerId,
    once: bool,
    callback: Box<dyn FnMut(&A) + Send>,
}

/// Named listener lists invoked in registration order.
pub struct EventEmitter<A> {
    listeners: HashMap<String, Vec<Listener<A>>>,
    next_id: u64,
}

impl<A> EventEmitter<A> {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    fn register(
        &mut self,
        event: String,
        once: bool,
        callback: Box<dyn FnMut(&A) + Send>,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(event).or_default().push(Listener { id, once, callback });
        id
    }

    /// Adds a listener for `event`.
    pub fn on(
        &mut self,
        event: impl Into<String>,
        listener: impl FnMut(&A) + Send + 'static,
    ) -> ListenerId {
        self.register(event.into(), false, Box::new(listener))
    }

    /// Adds a listener removed after its first invocation.
    pub fn once(
        &mut self,
        event: impl Into<String>,
        listener: impl FnMut(&A) + Send + 'static,
    ) -> ListenerId {
        self.register(event.into(), true, Box::new(listener))
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|listener| listener.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Invokes every listener of `event`. Returns how many ran.
    pub fn emit(&mut self, event: &str, args: &A) -> usize {
        let Some(list) = self.listeners.get_mut(event) else {
            return 0;
        };
        let mut invoked = 0;
        list.retain_mut(|listener| {
            (listener.callback)(args);
            invoked += 1;
            !listener.once
        });
        if list.is_empty() {
            self.listeners.remove(event);
        }
        invoked
    }

    /// Number of listeners on `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

    /// Names that have at least one listener.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }
}

impl<A> Default for EventEmitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventEmitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventEmitter").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_router_end_resolves_ok() {
        let mut bus = EventBus::new(|event, emission| {
            assert_eq!(event, "double");
            let result = match &emission.data {
                EventPayload::Number(n) => EventPayload::Number(*n * 2.0),
                _ => EventPayload::None,
            };
            emission.end(result);
        });

        let mut receipt = bus.emit("double", EventPayload::Number(21.0));
        let outcome = receipt.try_outcome();
        assert_eq!(outcome, Some(EmitOutcome::Ended(EventPayload::Number(42.0))));
        assert!(outcome.is_some_and(|o| o.is_ok()));
        // The outcome stays readable.
        assert!(receipt.try_outcome().is_some());
    }

    #[test]
    fn test_router_fail_resolves_not_ok() {
        let mut bus = EventBus::new(|_, emission| emission.fail());
        let mut receipt = bus.emit("anything", EventPayload::None);
        assert_eq!(receipt.try_outcome(), Some(EmitOutcome::Failed));
        assert!(receipt.try_outcome().and_then(|o| o.data().cloned()).is_none());
    }

    #[test]
    fn test_parked_emission_resolves_later() {
        let (mut bus, queue) = EventBus::parking();
        let mut receipt = bus.emit("spawn", EventPayload::Text("ore".into()));
        assert_eq!(receipt.try_outcome(), None);
        assert!(!receipt.is_abandoned());

        let parked: Vec<_> = queue.lock().drain(..).collect();
        assert_eq!(parked.len(), 1);
        for (event, emission) in parked {
            assert_eq!(event, "spawn");
            emission.end(EventPayload::Number(1.0));
        }
        assert_eq!(
            receipt.wait_timeout(Duration::from_millis(10)),
            Some(EmitOutcome::Ended(EventPayload::Number(1.0)))
        );
    }

    #[test]
    fn test_dropped_responder_never_resolves() {
        let mut bus = EventBus::new(|_, emission| drop(emission));
        let mut receipt = bus.emit("lost", EventPayload::None);
        assert_eq!(receipt.wait_timeout(Duration::from_millis(1)), None);
        assert!(receipt.is_abandoned());
        assert_eq!(bus.emitted(), 1);
    }

    #[test]
    fn test_listeners_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = EventEmitter::<u32>::new();
        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            emitter.on("tick", move |n| log.lock().push(format!("{tag}{n}")));
        }
        assert_eq!(emitter.emit("tick", &1), 3);
        assert_eq!(*log.lock(), ["a1", "b1", "c1"]);
        assert_eq!(emitter.emit("other", &1), 0);
    }

    #[test]
    fn test_once_runs_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);
        let mut emitter = EventEmitter::<()>::new();
        emitter.once("boot", move |()| {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(emitter.emit("boot", &()), 1);
        assert_eq!(emitter.emit("boot", &()), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.event_names().count(), 0);
    }

    #[test]
    fn test_remove_listener_drops_empty_names() {
        let mut emitter = EventEmitter::<()>::new();
        let first = emitter.on("hit", |()| {});
        let second = emitter.on("hit", |()| {});
        assert_eq!(emitter.listener_count("hit"), 2);

        assert!(emitter.remove_listener("hit", first));
        assert!(!emitter.remove_listener("hit", first));
        assert_eq!(emitter.listener_count("hit"), 1);

        assert!(emitter.remove_listener("hit", second));
        assert_eq!(emitter.event_names().count(), 0);
        assert!(!emitter.remove_listener("hit", second));
    }
}
