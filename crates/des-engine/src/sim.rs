//! `Simulation` — the event engine and top-level driver.
//!
//! One value owns the whole engine state: global time, the event slots and
//! queue, the entity registry, the global statistics registry, and the
//! debug stream.  Embedders thread it through their handlers; tests build
//! as many isolated simulations as they like.
//!
//! # Driver surface
//!
//! [`run`](Simulation::run) is the normal entry point.  The stepping
//! primitives (`init_runs`, `init_single_run`, `sim_step`, `run_to`,
//! `end_single_run`, `clear_event_queue`) are public for debugging and
//! incremental inspection:
//!
//! ```rust,ignore
//! sim.init_runs(1);
//! sim.init_single_run()?;
//! sim.run_to(Tick(100))?;   // run up to tick 100
//! // check object status
//! sim.sim_step()?;          // run one step
//! // check object status
//! ```
//!
//! The random generator is deliberately *not* touched anywhere in the
//! driver: seeds persist across replicas, so a multi-run batch consumes one
//! continuous pseudo-random stream.

use std::cell::RefCell;
use std::rc::Rc;

use des_core::{DebugStream, EntityId, EventId, Tick};
use tracing::{info, warn};

use crate::entity::{Entity, EntityHandle, EntityRegistry};
use crate::error::{EngineError, EngineResult};
use crate::event::{EventHandler, EventSlot, DEFAULT_PRIORITY, IMMEDIATE_PRIORITY};
use crate::probe::{FiredEvent, Probe, Stat, StatHandle};
use crate::queue::{EventKey, EventQueue};

const SIMUL_DBG_LEV: &str = "Simul";

// ── Simulation ────────────────────────────────────────────────────────────────

/// The simulation engine.  See the module docs for the driver surface.
pub struct Simulation {
    time: Tick,

    slots: std::collections::HashMap<EventId, EventSlot>,
    next_event: u64,
    /// FIFO tie-break counter; bumped at every post.
    order_counter: u64,
    queue: EventQueue,

    registry: EntityRegistry,
    stats: Vec<StatHandle>,

    /// Leveled debug output.  Enable levels before running:
    /// `sim.dbg.enable("Simul")`.
    pub dbg: DebugStream,

    num_runs: usize,
    act_runs: usize,
    end: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Simulation {
            time: Tick::ZERO,
            slots: std::collections::HashMap::new(),
            next_event: 0,
            order_counter: 0,
            queue: EventQueue::new(),
            registry: EntityRegistry::default(),
            stats: Vec::new(),
            dbg: DebugStream::new(),
            num_runs: 0,
            act_runs: 0,
            end: false,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> Tick {
        self.time
    }

    /// Replica currently executing (0-based) during [`run`](Self::run).
    pub fn current_run(&self) -> usize {
        self.act_runs
    }

    /// True once a full `run` batch has completed.
    pub fn is_ended(&self) -> bool {
        self.end
    }

    /// Number of pending events.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next event to fire, if any.
    pub fn next_event_time(&self) -> Option<Tick> {
        self.queue.next_time()
    }

    // ── Event creation ────────────────────────────────────────────────────

    /// Start building an event around `handler`.
    ///
    /// ```rust,ignore
    /// let ev = sim.event(handler).label("arrival").priority(4).create();
    /// ```
    pub fn event<H: EventHandler>(&mut self, handler: H) -> EventBuilder<'_> {
        EventBuilder {
            sim: self,
            label: Rc::from(""),
            priority: DEFAULT_PRIORITY,
            handler: Box::new(handler),
        }
    }

    fn create_event(&mut self, label: Rc<str>, priority: i32, handler: Box<dyn EventHandler>) -> EventId {
        let id = EventId(self.next_event);
        self.next_event += 1;
        self.slots.insert(id, EventSlot::new(label, priority, handler));
        id
    }

    /// Destroy an event outright: dequeue it if pending and free its slot.
    /// Stale handles are tolerated.
    pub fn discard_event(&mut self, ev: EventId) {
        self.drop_event(ev);
        self.slots.remove(&ev);
    }

    // ── Event scheduling ──────────────────────────────────────────────────

    /// Enqueue `ev` to fire at `at`.
    ///
    /// Fails with [`EngineError::PostInPast`] if `at` precedes the current
    /// time and [`EngineError::AlreadyQueued`] if the event is pending —
    /// re-posting requires an intervening [`drop_event`](Self::drop_event)
    /// (or happens naturally from inside the event's own handler, which
    /// runs after the engine has already dequeued it).
    pub fn post(&mut self, ev: EventId, at: Tick) -> EngineResult<()> {
        self.enqueue(ev, at, false)
    }

    /// Like [`post`](Self::post), but transfers ownership of the event to
    /// the engine: after the firing the slot is destroyed and `ev` goes
    /// stale.  The handler must not re-post `ev` unless it first re-posts
    /// non-disposably (a plain `post` clears the flag).
    pub fn post_disposable(&mut self, ev: EventId, at: Tick) -> EngineResult<()> {
        self.enqueue(ev, at, true)
    }

    /// Fire `ev` at the current instant, ahead of every event already
    /// pending at this time: the priority is forced to
    /// [`IMMEDIATE_PRIORITY`] for this one firing and restored afterwards.
    pub fn process(&mut self, ev: EventId) -> EngineResult<()> {
        self.force_immediate(ev)?;
        self.enqueue(ev, self.time, false)
    }

    /// [`process`](Self::process) with engine ownership, as in
    /// [`post_disposable`](Self::post_disposable).
    pub fn process_disposable(&mut self, ev: EventId) -> EngineResult<()> {
        self.force_immediate(ev)?;
        self.enqueue(ev, self.time, true)
    }

    fn force_immediate(&mut self, ev: EventId) -> EngineResult<()> {
        let slot = self.slot_mut(ev)?;
        if slot.queued_key.is_some() {
            return Err(EngineError::AlreadyQueued(ev));
        }
        slot.forced = true;
        slot.priority = IMMEDIATE_PRIORITY;
        Ok(())
    }

    fn enqueue(&mut self, ev: EventId, at: Tick, disposable: bool) -> EngineResult<()> {
        let now = self.time;
        let order = self.order_counter + 1;
        let slot = self
            .slots
            .get_mut(&ev)
            .ok_or(EngineError::UnknownEvent(ev))?;

        if at < now {
            return Err(EngineError::PostInPast { at, now });
        }
        if slot.queued_key.is_some() {
            return Err(EngineError::AlreadyQueued(ev));
        }

        self.order_counter = order;
        let key = EventKey {
            time: at,
            priority: slot.priority,
            order,
        };
        slot.time = at;
        slot.queued_key = Some(key);
        slot.disposable = disposable;
        self.queue.insert(key, ev);
        Ok(())
    }

    /// Extract `ev` from the queue if pending.  A no-op when not queued or
    /// stale; never destroys the event.
    pub fn drop_event(&mut self, ev: EventId) {
        if let Some(slot) = self.slots.get_mut(&ev) {
            if let Some(key) = slot.queued_key.take() {
                self.queue.remove(&key);
            }
        }
    }

    // ── Event accessors ───────────────────────────────────────────────────

    /// True while the event's slot exists (i.e. it has not been destroyed
    /// as disposable or discarded).
    pub fn is_live(&self, ev: EventId) -> bool {
        self.slots.contains_key(&ev)
    }

    pub fn is_queued(&self, ev: EventId) -> bool {
        self.slots
            .get(&ev)
            .is_some_and(|s| s.queued_key.is_some())
    }

    /// True while the engine owns the event (set by the `*_disposable`
    /// scheduling calls, cleared by a plain `post`).
    pub fn is_disposable(&self, ev: EventId) -> EngineResult<bool> {
        Ok(self.slot(ev)?.disposable)
    }

    /// The pending triggering time.  Only meaningful while the event is
    /// queued; after a firing, read [`last_time`](Self::last_time) instead.
    pub fn event_time(&self, ev: EventId) -> EngineResult<Tick> {
        Ok(self.slot(ev)?.time)
    }

    /// The time of the most recent firing.  Unlike `event_time` this is
    /// stable across a re-post performed inside the handler — probes and
    /// statistics must use it.
    pub fn last_time(&self, ev: EventId) -> EngineResult<Tick> {
        Ok(self.slot(ev)?.last_time)
    }

    pub fn priority(&self, ev: EventId) -> EngineResult<i32> {
        Ok(self.slot(ev)?.priority)
    }

    /// Change the event's priority.  Refused while queued — the pending key
    /// already encodes the old priority.
    pub fn set_priority(&mut self, ev: EventId, priority: i32) -> EngineResult<()> {
        let slot = self.slot_mut(ev)?;
        if slot.queued_key.is_some() {
            return Err(EngineError::AlreadyQueued(ev));
        }
        slot.priority = priority;
        Ok(())
    }

    /// Re-establish the constructor priority.
    pub fn restore_priority(&mut self, ev: EventId) -> EngineResult<()> {
        let slot = self.slot_mut(ev)?;
        if slot.queued_key.is_some() {
            return Err(EngineError::AlreadyQueued(ev));
        }
        slot.priority = slot.std_priority;
        Ok(())
    }

    // ── Probe attachment ──────────────────────────────────────────────────

    /// Attach a statistics probe to `ev`.  Probes fire after the handler,
    /// in attachment order, stats before particles before traces.
    pub fn add_stat<P: Probe + 'static>(
        &mut self,
        ev: EventId,
        probe: &Rc<RefCell<P>>,
    ) -> EngineResult<()> {
        let weak = Rc::downgrade(&(probe.clone() as Rc<RefCell<dyn Probe>>));
        self.slot_mut(ev)?.stats.push(weak);
        Ok(())
    }

    /// Attach a particle probe to `ev`.
    pub fn add_particle<P: Probe + 'static>(
        &mut self,
        ev: EventId,
        probe: &Rc<RefCell<P>>,
    ) -> EngineResult<()> {
        let weak = Rc::downgrade(&(probe.clone() as Rc<RefCell<dyn Probe>>));
        self.slot_mut(ev)?.particles.push(weak);
        Ok(())
    }

    /// Attach a trace sink to `ev`.
    pub fn add_trace<P: Probe + 'static>(
        &mut self,
        ev: EventId,
        probe: &Rc<RefCell<P>>,
    ) -> EngineResult<()> {
        let weak = Rc::downgrade(&(probe.clone() as Rc<RefCell<dyn Probe>>));
        self.slot_mut(ev)?.traces.push(weak);
        Ok(())
    }

    /// Register a statistic for the replica lifecycle multicast
    /// (`init_runs` / `new_run` / `end_run` / `end_sim`).
    pub fn register_stat<S: Stat + 'static>(&mut self, stat: &Rc<RefCell<S>>) {
        self.stats
            .push(Rc::downgrade(&(stat.clone() as Rc<RefCell<dyn Stat>>)));
    }

    fn slot(&self, ev: EventId) -> EngineResult<&EventSlot> {
        self.slots.get(&ev).ok_or(EngineError::UnknownEvent(ev))
    }

    fn slot_mut(&mut self, ev: EventId) -> EngineResult<&mut EventSlot> {
        self.slots.get_mut(&ev).ok_or(EngineError::UnknownEvent(ev))
    }

    // ── Entities ──────────────────────────────────────────────────────────

    /// Register an entity, allocating its registration number.  A non-empty
    /// name must be unique and becomes the lookup key; an empty name skips
    /// the binding.  The registry holds a weak reference — the caller keeps
    /// ownership, and dropping the `Rc` deregisters.
    pub fn add_entity<E: Entity>(
        &mut self,
        name: &str,
        entity: &Rc<RefCell<E>>,
    ) -> EngineResult<EntityId> {
        let weak = Rc::downgrade(&(entity.clone() as Rc<RefCell<dyn Entity>>));
        let concrete =
            Rc::downgrade(&(entity.clone() as Rc<dyn std::any::Any>));
        self.registry.add(name, weak, concrete)
    }

    /// Look up a live entity by name.
    pub fn find_entity(&self, name: &str) -> EngineResult<EntityHandle> {
        self.registry.find(name)
    }

    /// Look up a live entity by name, recovering its concrete type.
    pub fn find_entity_as<E: Entity>(&self, name: &str) -> EngineResult<Rc<RefCell<E>>> {
        self.registry.find_as(name)
    }

    /// Number of entities ever registered.
    pub fn entities_registered(&self) -> usize {
        self.registry.registered()
    }

    /// Invoke `new_run` on every live entity, in registration order.
    pub fn call_new_run(&mut self) -> EngineResult<()> {
        for (_, name, entity) in self.registry.live() {
            let result = entity.borrow_mut().new_run(self);
            result.map_err(|e| EngineError::Hook {
                hook: "new_run",
                name,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Invoke `end_run` on every live entity, in registration order.
    pub fn call_end_run(&mut self) -> EngineResult<()> {
        for (_, name, entity) in self.registry.live() {
            let result = entity.borrow_mut().end_run(self);
            result.map_err(|e| EngineError::Hook {
                hook: "end_run",
                name,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// One simulation step, or `Ok(None)` when the queue is empty.
    ///
    /// This is the sum-typed primitive the driver loops are built on;
    /// [`sim_step`](Self::sim_step) wraps it for callers that treat an
    /// empty queue as an error.
    pub fn try_step(&mut self) -> EngineResult<Option<Tick>> {
        let (key, id) = match self.queue.pop_first() {
            None => return Ok(None),
            Some(head) => head,
        };

        self.dbg
            .enter(SIMUL_DBG_LEV, &format!("t = [{}] --> sim_step", key.time));
        self.dbg
            .print(&format!("executing event action at time [{}]", key.time));

        // Freeze the firing time and take the handler out of the slot; a
        // re-post inside doit only touches `time`/`order`.
        let mut handler = {
            let slot = self
                .slots
                .get_mut(&id)
                .ok_or(EngineError::UnknownEvent(id))?;
            slot.queued_key = None;
            slot.last_time = key.time;
            slot.handler.take().ok_or(EngineError::UnknownEvent(id))?
        };

        self.time = key.time;
        let outcome = handler.doit(self, id);

        // On a handler error the event is restored first, then the error
        // propagates to the caller (who is expected to clear the queue
        // before continuing).  Probes and disposal are skipped.
        if let Err(e) = outcome {
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.handler = Some(handler);
            }
            self.dbg.exit();
            return Err(e);
        }

        // The handler may have discarded its own event; in that case there
        // is nothing left to observe or dispose.
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.handler = Some(handler);

            let label = slot.label.clone();
            let fired = FiredEvent {
                id,
                label: &label,
                last_time: key.time,
                priority: key.priority,
            };
            let mut stats = std::mem::take(&mut slot.stats);
            let mut particles = std::mem::take(&mut slot.particles);
            let mut traces = std::mem::take(&mut slot.traces);

            for list in [&mut stats, &mut particles, &mut traces] {
                // Notify in insertion order; prune dead probes as we go.
                list.retain(|weak| match weak.upgrade() {
                    Some(probe) => {
                        probe.borrow_mut().probe(&fired);
                        true
                    }
                    None => false,
                });
            }

            let slot = self
                .slots
                .get_mut(&id)
                .ok_or(EngineError::UnknownEvent(id))?;
            slot.stats = stats;
            slot.particles = particles;
            slot.traces = traces;

            if slot.forced {
                slot.priority = slot.std_priority;
                slot.forced = false;
            }
            if slot.disposable && slot.queued_key.is_none() {
                self.slots.remove(&id);
            }
        }

        self.dbg.exit();
        Ok(Some(key.time))
    }

    /// One simulation step.  Fails with [`EngineError::NoMoreEvents`] on an
    /// empty queue; returns the advanced time otherwise.
    pub fn sim_step(&mut self) -> EngineResult<Tick> {
        self.try_step()?.ok_or(EngineError::NoMoreEvents)
    }

    /// Run until the next pending event lies beyond `stop`, then clamp the
    /// clock up to `stop`.  An empty queue is logged and terminates the
    /// loop; it is not an error.
    pub fn run_to(&mut self, stop: Tick) -> EngineResult<Tick> {
        loop {
            match self.queue.next_time() {
                None => {
                    warn!(
                        target: "des",
                        time = %self.time,
                        "no more events in queue"
                    );
                    break;
                }
                Some(next) if next > stop => break,
                Some(_) => {
                    self.try_step()?;
                }
            }
        }
        if self.time < stop {
            self.time = stop;
        }
        Ok(self.time)
    }

    // ── Replica lifecycle ─────────────────────────────────────────────────

    /// Reset the batch: zero the clock and initialize statistics for `n`
    /// replicas.  Deliberately leaves the random generator alone.
    pub fn init_runs(&mut self, n: usize) {
        self.for_each_stat(|s| s.init_runs(n));
        self.time = Tick::ZERO;
        self.end = false;
    }

    /// Start one replica: zero the clock, multicast `new_run` to every
    /// entity, prime per-run statistics.  A hook failure clears the event
    /// queue before propagating.
    pub fn init_single_run(&mut self) -> EngineResult<()> {
        self.time = Tick::ZERO;
        if let Err(e) = self.call_new_run() {
            self.clear_event_queue();
            return Err(e);
        }
        self.for_each_stat(|s| s.new_run());
        Ok(())
    }

    /// Finish one replica: multicast `end_run`, commit per-run statistics,
    /// clear the event queue.
    pub fn end_single_run(&mut self) -> EngineResult<()> {
        if let Err(e) = self.call_end_run() {
            self.clear_event_queue();
            return Err(e);
        }
        let at = self.time;
        self.for_each_stat(|s| s.end_run(at));
        self.clear_event_queue();
        Ok(())
    }

    /// Drop every pending event, destroying the disposable ones, and zero
    /// the clock.  Called at the end of each replica and from
    /// exception-recovery paths.
    pub fn clear_event_queue(&mut self) {
        while let Some((_, id)) = self.queue.pop_first() {
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.queued_key = None;
                if slot.disposable {
                    self.slots.remove(&id);
                }
            }
        }
        self.time = Tick::ZERO;
    }

    fn end_sim(&mut self) {
        self.for_each_stat(|s| s.end_sim());
    }

    fn for_each_stat(&mut self, mut f: impl FnMut(&mut dyn Stat)) {
        self.stats.retain(|weak| match weak.upgrade() {
            Some(stat) => {
                f(&mut *stat.borrow_mut());
                true
            }
            None => false,
        });
    }

    // ── The full driver ───────────────────────────────────────────────────

    /// Run the simulation: `n_runs` replicas of `length` ticks each.
    ///
    /// `n_runs` encodes batch control:
    ///
    /// | `n_runs` | Mode                                                        |
    /// |----------|-------------------------------------------------------------|
    /// | `≥ 3`    | that many replicas, statistics initialized and terminated   |
    /// | `2`      | unsupported by the statistics tables — warns and runs 3     |
    /// | `1`      | one replica, initialized and terminated                     |
    /// | `0`      | last run of a batch: terminate, don't re-initialize         |
    /// | `-1`     | middle run of a batch: neither initialize nor terminate     |
    /// | `< -1`   | first run of a batch: initialize sized for `|n_runs|` replicas, don't terminate |
    pub fn run(&mut self, length: Tick, n_runs: i64) -> EngineResult<()> {
        self.dbg.enter(SIMUL_DBG_LEV, "run");

        let mut initialize = true;
        let mut terminate = true;
        let mut size_hint = None;

        match n_runs {
            n if n < -1 => {
                info!(target: "des", "first run of a batch: initializing statistics");
                terminate = false;
                size_hint = Some((-n) as usize);
                self.num_runs = 1;
            }
            -1 => {
                info!(target: "des", "middle run of a batch");
                initialize = false;
                terminate = false;
                self.num_runs = 1;
            }
            0 => {
                info!(target: "des", "last run of a batch");
                initialize = false;
                self.num_runs = 1;
            }
            1 => {
                self.num_runs = 1;
            }
            n => {
                self.num_runs = n as usize;
            }
        }

        if self.num_runs == 2 {
            warn!(
                target: "des",
                "statistics cannot be initialized with 2 runs; executing 3"
            );
            self.num_runs = 3;
        }

        if initialize {
            let n = size_hint.unwrap_or(self.num_runs);
            self.init_runs(n);
        }

        self.act_runs = 0;
        while self.act_runs < self.num_runs {
            info!(target: "des", run = self.act_runs, "replica start");

            self.init_single_run()?;
            if let Err(e) = self.run_to(length) {
                self.clear_event_queue();
                self.dbg.exit();
                return Err(e);
            }
            self.end_single_run()?;

            self.act_runs += 1;
        }

        self.end = true;
        if terminate {
            self.end_sim();
        }
        self.dbg.exit();
        Ok(())
    }
}

// ── EventBuilder ──────────────────────────────────────────────────────────────

/// Fluent construction of an event; see [`Simulation::event`].
pub struct EventBuilder<'a> {
    sim: &'a mut Simulation,
    label: Rc<str>,
    priority: i32,
    handler: Box<dyn EventHandler>,
}

impl EventBuilder<'_> {
    /// Display name used by traces and debug output.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Rc::from(label);
        self
    }

    /// Tie-break priority at equal firing times; smaller fires first.
    /// Becomes the event's standard priority for `restore_priority`.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Allocate the event and return its handle.
    pub fn create(self) -> EventId {
        self.sim.create_event(self.label, self.priority, self.handler)
    }
}
