//! Probes — statistics and trace observers attached to events.
//!
//! A probe is notified once per firing, *after* the handler has returned
//! and *before* the next event fires.  It observes the frozen firing time
//! ([`FiredEvent::last_time`]), not the possibly re-posted `time` — the
//! guarantee that makes periodic-event statistics correct.
//!
//! Attachment is non-owning: events hold weak references, application code
//! owns the probe objects.  A probe dropped mid-run simply stops being
//! notified.

use std::cell::RefCell;
use std::rc::Weak;

use des_core::{EventId, Tick};

/// What a probe sees of a firing.
#[derive(Debug)]
pub struct FiredEvent<'a> {
    pub id: EventId,
    /// The event's display label; may be empty.
    pub label: &'a str,
    /// The time this firing happened.  Frozen before the handler ran.
    pub last_time: Tick,
    /// The priority the event fired at.
    pub priority: i32,
}

/// A statistics or trace observer.
pub trait Probe {
    /// Called once per firing of each event this probe is attached to.
    fn probe(&mut self, ev: &FiredEvent<'_>);
}

/// A probe with a replica lifecycle, driven by the simulation driver.
///
/// `init_runs` is called once per batch, `new_run`/`end_run` bracket every
/// replica, and `end_sim` fires after the last replica of the batch.
pub trait Stat: Probe {
    /// Allocate for `n` replicas.  Called by `initRuns`.
    fn init_runs(&mut self, n: usize);

    /// Reset the per-run accumulator.  Called before each replica.
    fn new_run(&mut self);

    /// Commit the per-run accumulator; `at` is the replica's final time.
    fn end_run(&mut self, at: Tick);

    /// Freeze the cross-replica view.  Called once, after the last replica.
    fn end_sim(&mut self);
}

/// Non-owning handle the engine stores per attachment.
pub(crate) type ProbeHandle = Weak<RefCell<dyn Probe>>;

/// Non-owning handle for globally registered statistics.
pub(crate) type StatHandle = Weak<RefCell<dyn Stat>>;
