//! `SchedInstr` — the threshold-lowering instruction.
//!
//! A task raises its preemption threshold around a critical section; this
//! instruction marks the end of that section.  It takes zero simulated
//! time: scheduling it posts its end event at the current tick, and the end
//! protocol runs entirely inside that tick:
//!
//! 1. advance the task to its next instruction;
//! 2. look up the task's kernel and its [`ThresholdControl`] capability —
//!    a missing kernel or capability is a fault;
//! 3. `disable_threshold`, then `dispatch` — the scheduler may reshuffle
//!    task-level events now that preemption is back;
//! 4. fire the companion threshold event at IMMEDIATE priority, so probes
//!    attached to it observe the *post-dispatch* task set within the same
//!    tick.
//!
//! The dispatch-before-signal order is load-bearing; tests pin it.

use std::any::Any;

use des_core::EventId;
use des_engine::{EngineResult, EventHandler, Simulation};

use crate::error::{to_engine, RtError, RtResult};
use crate::instr::{instr_label, with_instr, Instr, InstrRef, InstrState};
use crate::kernel::ThresholdControl;
use crate::task::{Task, TaskHandle};

/// End of a preemption-threshold section.  See the module docs.
pub struct SchedInstr {
    state: InstrState,
    end_evt: EventId,
    thre_evt: EventId,
}

impl SchedInstr {
    /// Append a threshold-lowering instruction to `task`.
    pub fn insert(task: &TaskHandle, sim: &mut Simulation) -> usize {
        Task::add_instr(task, sim, |sim, iref| {
            let end_evt = sim
                .event(SchedEndEvt(iref.clone()))
                .label(&instr_label(&iref, "sched"))
                .create();
            // Signal-only: observers attach to it, the handler has nothing
            // to do.
            let thre_evt = sim
                .event(|_: &mut Simulation, _: EventId| {})
                .label(&instr_label(&iref, "threshold"))
                .create();
            Box::new(SchedInstr {
                state: InstrState::Inactive,
                end_evt,
                thre_evt,
            })
        })
    }

    /// The end event, for attaching probes.
    pub fn end_event(&self) -> EventId {
        self.end_evt
    }

    /// The threshold-lowering signal event, for attaching probes.
    pub fn threshold_event(&self) -> EventId {
        self.thre_evt
    }

    /// Scripted construction: `[task-name]`.
    pub fn create_instance(sim: &mut Simulation, par: &[String]) -> RtResult<usize> {
        if par.len() != 1 {
            return Err(RtError::Parse {
                msg: "wrong number of parameters".to_owned(),
                class: "SchedInstr",
            });
        }
        let task = Task::find(sim, &par[0])?;
        Ok(Self::insert(&task, sim))
    }
}

impl Instr for SchedInstr {
    fn schedule(&mut self, sim: &mut Simulation) -> RtResult<()> {
        if self.state != InstrState::Inactive {
            return Err(RtError::BadTransition {
                op: "schedule",
                state: self.state,
            });
        }
        sim.post(self.end_evt, sim.time())?;
        self.state = InstrState::Running;
        Ok(())
    }

    fn deschedule(&mut self, sim: &mut Simulation) -> RtResult<()> {
        if self.state != InstrState::Running {
            return Ok(());
        }
        sim.drop_event(self.end_evt);
        self.state = InstrState::Inactive;
        Ok(())
    }

    fn reset(&mut self, sim: &mut Simulation) {
        sim.drop_event(self.end_evt);
        self.state = InstrState::Inactive;
    }

    fn end_run(&mut self, sim: &mut Simulation) {
        sim.drop_event(self.end_evt);
        sim.drop_event(self.thre_evt);
        self.state = InstrState::Inactive;
    }

    fn state(&self) -> InstrState {
        self.state
    }
}

/// End event of a [`SchedInstr`]: runs the threshold-lowering protocol.
struct SchedEndEvt(InstrRef);

impl EventHandler for SchedEndEvt {
    fn doit(&mut self, sim: &mut Simulation, _me: EventId) -> EngineResult<()> {
        let Some(task) = self.0.task() else {
            return Ok(());
        };
        self.run(&task, sim).map_err(to_engine)
    }
}

impl SchedEndEvt {
    fn run(&mut self, task: &TaskHandle, sim: &mut Simulation) -> RtResult<()> {
        let thre_evt = {
            let t = task.borrow();
            let name = t.name().to_owned();
            let instr = t
                .instr(self.0.index())
                .ok_or_else(|| RtError::NoInstruction(name.clone(), self.0.index()))?;
            let sched = (instr as &dyn Any)
                .downcast_ref::<SchedInstr>()
                .ok_or(RtError::NoInstruction(name, self.0.index()))?;
            sched.thre_evt
        };
        with_instr::<SchedInstr>(task, self.0.index(), |i| i.state = InstrState::Ending)?;

        // Advance the task first: probes on the threshold event must see
        // the world after the pointer moved and the kernel re-dispatched.
        Task::on_instr_end(task, sim)?;

        let kernel = task
            .borrow()
            .kernel()
            .ok_or_else(|| RtError::NoKernel(task.borrow().name().to_owned()))?;
        {
            let mut k = kernel.borrow_mut();
            let control: &mut dyn ThresholdControl = k.as_threshold().ok_or_else(|| {
                RtError::KernelMismatch(task.borrow().name().to_owned())
            })?;
            control.disable_threshold();
        }
        kernel.borrow_mut().dispatch(sim)?;

        sim.process(thre_evt)?;
        with_instr::<SchedInstr>(task, self.0.index(), |i| i.state = InstrState::Done)?;
        Ok(())
    }
}
