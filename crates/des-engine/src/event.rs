//! Event handlers and the per-event state record.
//!
//! An event is a handle onto a future callback.  The engine owns the whole
//! record — scheduling state, probe lists, and the boxed handler — and
//! hands out [`EventId`]s; entities keep ids, never the record itself.
//! That inversion is what makes disposability safe: destroying a fired
//! event invalidates stale handles instead of dangling them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use des_core::{EventId, Tick};

use crate::probe::ProbeHandle;
use crate::queue::EventKey;
use crate::sim::Simulation;

/// Default event priority.  The lower the number, the higher the priority.
pub const DEFAULT_PRIORITY: i32 = 8;

/// Priority forced by [`Simulation::process`] so the event fires before any
/// other event already pending at the current instant.
pub const IMMEDIATE_PRIORITY: i32 = 0;

// ── EventHandler ──────────────────────────────────────────────────────────────

/// The user hook invoked when an event fires.
///
/// `me` is the fired event's own id, so a handler can re-post itself:
///
/// ```rust,ignore
/// sim.event(|sim: &mut Simulation, me| {
///     let next = sim.time() + 7;
///     sim.post(me, next).ok();
/// })
/// ```
///
/// Handlers run to completion; there are no suspension points.  A handler
/// that needs to wait posts a future event and returns.
///
/// An error aborts the step: the engine restores the event and propagates
/// it to the `sim_step` caller.  Infallible closures get a blanket impl,
/// so plain `FnMut(&mut Simulation, EventId)` works directly; fallible
/// handlers implement the trait themselves.
pub trait EventHandler: 'static {
    fn doit(&mut self, sim: &mut Simulation, me: EventId) -> crate::EngineResult<()>;
}

impl<F> EventHandler for F
where
    F: FnMut(&mut Simulation, EventId) + 'static,
{
    fn doit(&mut self, sim: &mut Simulation, me: EventId) -> crate::EngineResult<()> {
        self(sim, me);
        Ok(())
    }
}

// ── EntityEvent ───────────────────────────────────────────────────────────────

/// Generic adaptor binding an event to an entity method.
///
/// Holds a weak back-reference to the owning entity plus a plain function
/// pointer; firing upgrades the reference and passes the entity handle to
/// the callback, which scopes its own borrows.  If the entity is gone the
/// firing is silently a no-op — the event outlived its owner.
pub struct EntityEvent<T: 'static> {
    target: Weak<RefCell<T>>,
    callback: fn(Rc<RefCell<T>>, &mut Simulation, EventId) -> crate::EngineResult<()>,
}

impl<T: 'static> EntityEvent<T> {
    pub fn new(
        target: &Rc<RefCell<T>>,
        callback: fn(Rc<RefCell<T>>, &mut Simulation, EventId) -> crate::EngineResult<()>,
    ) -> Self {
        EntityEvent {
            target: Rc::downgrade(target),
            callback,
        }
    }
}

impl<T: 'static> EventHandler for EntityEvent<T> {
    fn doit(&mut self, sim: &mut Simulation, me: EventId) -> crate::EngineResult<()> {
        match self.target.upgrade() {
            Some(target) => (self.callback)(target, sim, me),
            None => Ok(()),
        }
    }
}

// ── EventSlot ─────────────────────────────────────────────────────────────────

/// The engine-side record of one event.
pub(crate) struct EventSlot {
    /// Display name for traces and debug output; may be empty.
    pub(crate) label: Rc<str>,

    /// Triggering time; meaningful only while enqueued.
    pub(crate) time: Tick,

    /// The time the event most recently fired.  Frozen at the start of the
    /// firing, so probes read it unchanged even when the handler re-posts.
    pub(crate) last_time: Tick,

    pub(crate) priority: i32,

    /// The constructor priority, re-established by `restore_priority` and
    /// after a forced-immediate firing.
    pub(crate) std_priority: i32,

    /// Set by `process`: the current priority is an override to undo after
    /// the firing.
    pub(crate) forced: bool,

    /// The key this event is queued under, if any.  `Some` ⇔ in queue.
    pub(crate) queued_key: Option<EventKey>,

    /// The engine destroys this slot after firing when set.
    pub(crate) disposable: bool,

    /// Taken out of the slot for the duration of `doit`, which also makes
    /// re-entrant firing of the same event impossible.
    pub(crate) handler: Option<Box<dyn EventHandler>>,

    // Probe lists, notified after the handler in this order.  Non-owning.
    pub(crate) stats: Vec<ProbeHandle>,
    pub(crate) particles: Vec<ProbeHandle>,
    pub(crate) traces: Vec<ProbeHandle>,
}

impl EventSlot {
    pub(crate) fn new(label: Rc<str>, priority: i32, handler: Box<dyn EventHandler>) -> Self {
        EventSlot {
            label,
            time: Tick::ZERO,
            last_time: Tick::ZERO,
            priority,
            std_priority: priority,
            forced: false,
            queued_key: None,
            disposable: false,
            handler: Some(handler),
            stats: Vec::new(),
            particles: Vec::new(),
            traces: Vec::new(),
        }
    }
}
