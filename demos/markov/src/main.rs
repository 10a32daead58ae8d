//! Two-state continuous-time Markov chain.
//!
//! Each state is an entity owning a jump event; the event fires when the
//! chain leaves that state.  The handler moves the token to the other
//! state and posts that state's jump after an exponentially distributed
//! dwell.  A probe on each jump event measures the dwell time it closes
//! and feeds a per-state `StatMean`, so the simulation estimates the mean
//! holding times over five replicas.
//!
//! Run with `RUST_LOG=debug` to watch the engine's debug stream.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::Result;
use des_core::{EventId, Tick};
use des_engine::{EngineResult, Entity, EntityEvent, FiredEvent, Probe, Simulation};
use des_random::{ExponentialVar, RandomVar};
use des_stats::StatMean;

// ── State ─────────────────────────────────────────────────────────────────────

struct State {
    name: &'static str,
    /// Dwell time distribution for this state.
    dwell: ExponentialVar,
    /// When the chain last entered this state.
    last_arrival: Tick,
    /// Fires when the chain leaves this state.
    jump_evt: EventId,
    /// The state the chain moves to next.
    next: Option<Rc<RefCell<State>>>,
    /// The chain starts here.
    initial: bool,
}

impl State {
    fn new(
        sim: &mut Simulation,
        name: &'static str,
        mean_dwell: f64,
        initial: bool,
    ) -> EngineResult<Rc<RefCell<State>>> {
        let state = Rc::new(RefCell::new(State {
            name,
            dwell: ExponentialVar::new(mean_dwell),
            last_arrival: Tick::ZERO,
            jump_evt: EventId::INVALID,
            next: None,
            initial,
        }));
        sim.add_entity(name, &state)?;

        let jump = sim
            .event(EntityEvent::new(&state, Self::on_jump))
            .label(name)
            .create();
        state.borrow_mut().jump_evt = jump;
        Ok(state)
    }

    /// The chain leaves `from`: enter the successor and schedule its own
    /// departure.
    fn on_jump(
        from: Rc<RefCell<State>>,
        sim: &mut Simulation,
        _me: EventId,
    ) -> EngineResult<()> {
        let Some(to) = from.borrow().next.clone() else {
            return Ok(());
        };
        let mut to = to.borrow_mut();
        to.last_arrival = sim.time();
        let dwell = Tick::from(to.dwell.get()).max(Tick(1));
        sim.post(to.jump_evt, sim.time() + dwell)
    }
}

impl Entity for State {
    fn new_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
        self.last_arrival = Tick::ZERO;
        if self.initial {
            let dwell = Tick::from(self.dwell.get()).max(Tick(1));
            sim.post(self.jump_evt, dwell)?;
        }
        Ok(())
    }

    fn end_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
        sim.drop_event(self.jump_evt);
        Ok(())
    }
}

// ── Dwell probe ───────────────────────────────────────────────────────────────

/// Measures the dwell a jump closes: firing time minus the owning state's
/// last arrival.
struct DwellProbe {
    state: Weak<RefCell<State>>,
    mean: Rc<RefCell<StatMean>>,
}

impl Probe for DwellProbe {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        if let Some(state) = self.state.upgrade() {
            let dwell = ev.last_time - state.borrow().last_arrival;
            self.mean.borrow_mut().record(dwell.0 as f64);
        }
    }
}

/// Probe attachment is non-owning, so the caller must keep both handles
/// alive for the length of the run.
fn attach_dwell_stat(
    sim: &mut Simulation,
    state: &Rc<RefCell<State>>,
) -> EngineResult<(Rc<RefCell<StatMean>>, Rc<RefCell<DwellProbe>>)> {
    let mean = Rc::new(RefCell::new(StatMean::new(state.borrow().name)));
    sim.register_stat(&mean);

    let probe = Rc::new(RefCell::new(DwellProbe {
        state: Rc::downgrade(state),
        mean: mean.clone(),
    }));
    let jump = state.borrow().jump_evt;
    sim.add_stat(jump, &probe)?;
    Ok((mean, probe))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut sim = Simulation::new();

    let a = State::new(&mut sim, "A", 10.0, true)?;
    let b = State::new(&mut sim, "B", 40.0, false)?;
    a.borrow_mut().next = Some(b.clone());
    b.borrow_mut().next = Some(a.clone());

    let (dwell_a, _probe_a) = attach_dwell_stat(&mut sim, &a)?;
    let (dwell_b, _probe_b) = attach_dwell_stat(&mut sim, &b)?;

    sim.run(Tick(100_000), 5)?;

    println!("mean dwell in A: {:8.2} ticks (expected ~10)", mean_of(&dwell_a));
    println!("mean dwell in B: {:8.2} ticks (expected ~40)", mean_of(&dwell_b));
    Ok(())
}

fn mean_of(stat: &Rc<RefCell<StatMean>>) -> f64 {
    stat.borrow().grand_mean().unwrap_or(0.0)
}
