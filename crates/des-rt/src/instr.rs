//! The `Instr` trait and the compute instruction.
//!
//! Per-instruction state machine:
//!
//! ```text
//! Inactive --schedule()--> Running --(end event fires)--> Ending --> Done
//!      ^                      |
//!      +-----deschedule()-----+        (drops the end event)
//! ```
//!
//! `reset` rewinds to `Inactive` at job start and at `new_run`.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use des_core::{EventId, Tick};
use des_engine::{EngineResult, EventHandler, Simulation};
use des_random::{DeltaVar, RandomVar};

use crate::error::{to_engine, RtError, RtResult};
use crate::task::{Task, TaskHandle};

// ── Instr ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InstrState {
    Inactive,
    Running,
    /// The end event fired; the end protocol is executing.
    Ending,
    Done,
}

/// One step of a task's job.
///
/// The `Any` supertrait lets end-event handlers recover their concrete
/// instruction from the task's `dyn Instr` list.
pub trait Instr: Any {
    /// The task starts (or resumes) executing this instruction.
    fn schedule(&mut self, sim: &mut Simulation) -> RtResult<()>;

    /// The task is preempted; progress is kept for the resume.
    fn deschedule(&mut self, sim: &mut Simulation) -> RtResult<()>;

    /// Job-start rewind: drop pending events, clear accumulated progress.
    fn reset(&mut self, sim: &mut Simulation);

    /// Replica teardown: drop everything this instruction has pending.
    fn end_run(&mut self, sim: &mut Simulation);

    fn state(&self) -> InstrState;
}

// ── InstrRef ──────────────────────────────────────────────────────────────────

/// Back reference from an instruction's events to its task and position.
/// Weak by construction: an event outliving its task fires as a no-op.
#[derive(Clone)]
pub struct InstrRef {
    task: Weak<RefCell<Task>>,
    index: usize,
}

impl InstrRef {
    pub(crate) fn new(task: &TaskHandle, index: usize) -> Self {
        InstrRef {
            task: Rc::downgrade(task),
            index,
        }
    }

    pub fn task(&self) -> Option<TaskHandle> {
        self.task.upgrade()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Label prefix shared by an instruction's events: `<task>:<kind><index>`.
pub(crate) fn instr_label(iref: &InstrRef, kind: &str) -> String {
    let task = match iref.task() {
        Some(t) => t.borrow().name().to_owned(),
        None => String::new(),
    };
    format!("{task}:{kind}{}", iref.index())
}

// ── ExecInstr ─────────────────────────────────────────────────────────────────

/// Simulated computation for a pseudo-random duration.
///
/// The cost is drawn once per job, at the first `schedule` after a reset;
/// preemption keeps the residue, so a resumed instruction finishes after
/// exactly the undrawn remainder.
pub struct ExecInstr {
    cost: Box<dyn RandomVar>,
    /// Cost drawn for the current job; `None` until first scheduled.
    current_cost: Option<Tick>,
    /// Time executed before the last preemption.
    executed: Tick,
    /// When the current execution span started.
    started_at: Tick,
    state: InstrState,
    end_evt: EventId,
}

impl ExecInstr {
    /// Append a compute instruction with a pseudo-random cost.
    pub fn insert(task: &TaskHandle, sim: &mut Simulation, cost: Box<dyn RandomVar>) -> usize {
        Task::add_instr(task, sim, |sim, iref| {
            let end_evt = sim
                .event(ExecEndEvt(iref.clone()))
                .label(&instr_label(&iref, "exec"))
                .create();
            Box::new(ExecInstr {
                cost,
                current_cost: None,
                executed: Tick::ZERO,
                started_at: Tick::ZERO,
                state: InstrState::Inactive,
                end_evt,
            })
        })
    }

    /// Append a compute instruction with a fixed cost.
    pub fn insert_fixed(task: &TaskHandle, sim: &mut Simulation, cost: Tick) -> usize {
        Self::insert(task, sim, Box::new(DeltaVar::new(cost.0 as f64)))
    }

    /// The end event, for attaching probes.
    pub fn end_event(&self) -> EventId {
        self.end_evt
    }

    /// Scripted construction: `[cost, task-name]`.
    pub fn create_instance(sim: &mut Simulation, par: &[String]) -> RtResult<usize> {
        if par.len() != 2 {
            return Err(RtError::Parse {
                msg: "wrong number of parameters".to_owned(),
                class: "ExecInstr",
            });
        }
        let cost = Tick::from(des_core::parse::atof(&par[0]));
        let task = Task::find(sim, &par[1])?;
        Ok(Self::insert_fixed(&task, sim, cost))
    }
}

impl Instr for ExecInstr {
    fn schedule(&mut self, sim: &mut Simulation) -> RtResult<()> {
        if self.state != InstrState::Inactive {
            return Err(RtError::BadTransition {
                op: "schedule",
                state: self.state,
            });
        }
        let cost = match self.current_cost {
            Some(c) => c,
            None => {
                let c = Tick::from(self.cost.get());
                self.current_cost = Some(c);
                c
            }
        };
        let now = sim.time();
        let remaining = cost - self.executed;
        sim.post(self.end_evt, now + remaining)?;
        self.started_at = now;
        self.state = InstrState::Running;
        Ok(())
    }

    fn deschedule(&mut self, sim: &mut Simulation) -> RtResult<()> {
        if self.state != InstrState::Running {
            return Ok(());
        }
        sim.drop_event(self.end_evt);
        self.executed += sim.time() - self.started_at;
        self.state = InstrState::Inactive;
        Ok(())
    }

    fn reset(&mut self, sim: &mut Simulation) {
        sim.drop_event(self.end_evt);
        self.current_cost = None;
        self.executed = Tick::ZERO;
        self.state = InstrState::Inactive;
    }

    fn end_run(&mut self, sim: &mut Simulation) {
        self.reset(sim);
    }

    fn state(&self) -> InstrState {
        self.state
    }
}

/// End event of an [`ExecInstr`]: mark it done and advance the task.
struct ExecEndEvt(InstrRef);

impl EventHandler for ExecEndEvt {
    fn doit(&mut self, sim: &mut Simulation, _me: EventId) -> EngineResult<()> {
        let Some(task) = self.0.task() else {
            return Ok(());
        };

        with_instr::<ExecInstr>(&task, self.0.index(), |i| i.state = InstrState::Ending)
            .map_err(to_engine)?;
        Task::on_instr_end(&task, sim).map_err(to_engine)?;
        with_instr::<ExecInstr>(&task, self.0.index(), |i| i.state = InstrState::Done)
            .map_err(to_engine)?;
        Ok(())
    }
}

/// Run `f` on the concrete instruction at `index`, under a scoped borrow.
pub(crate) fn with_instr<I: Instr>(
    task: &TaskHandle,
    index: usize,
    f: impl FnOnce(&mut I),
) -> RtResult<()> {
    let mut t = task.borrow_mut();
    let name = t.name().to_owned();
    let instr = t
        .instrs_mut()
        .get_mut(index)
        .ok_or_else(|| RtError::NoInstruction(name.clone(), index))?;
    let concrete = (&mut **instr as &mut dyn Any)
        .downcast_mut::<I>()
        .ok_or(RtError::NoInstruction(name, index))?;
    f(concrete);
    Ok(())
}
