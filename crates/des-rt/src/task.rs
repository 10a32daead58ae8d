//! The `Task` entity — an ordered instruction list driven by events.
//!
//! # Borrow discipline
//!
//! Tasks are shared as `Rc<RefCell<Task>>` and their end-event handlers
//! re-enter through the simulation, so the sequencing operations are
//! associated functions on the *handle*, each scoping its `borrow_mut` so
//! that kernel callbacks (which may look back at the task) never observe an
//! outstanding borrow.  An instruction is only borrowed together with its
//! task, and instructions never call back into their task from `schedule`/
//! `deschedule`.

use std::cell::RefCell;
use std::rc::Rc;

use des_engine::{EngineResult, Entity, Simulation};
use tracing::trace;

use crate::error::{RtError, RtResult};
use crate::instr::{Instr, InstrRef};
use crate::kernel::KernelHandle;

/// Shared handle onto a task.
pub type TaskHandle = Rc<RefCell<Task>>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskState {
    /// No job in progress.
    Idle,
    /// A job is executing its instruction list.
    Executing,
    /// The job ran its last instruction to completion.
    Completed,
}

/// An entity executing an ordered list of instructions under a kernel.
pub struct Task {
    name: String,
    instrs: Vec<Box<dyn Instr>>,
    /// Index of the instruction currently executing.
    cur: usize,
    kernel: Option<KernelHandle>,
    state: TaskState,
}

impl Task {
    /// Create and register a task.  The name is the registry lookup key
    /// used by scripted construction.
    pub fn new(sim: &mut Simulation, name: &str) -> RtResult<TaskHandle> {
        let task = Rc::new(RefCell::new(Task {
            name: name.to_owned(),
            instrs: Vec::new(),
            cur: 0,
            kernel: None,
            state: TaskState::Idle,
        }));
        sim.add_entity(name, &task)?;
        Ok(task)
    }

    /// Resolve a task by registry name.
    pub fn find(sim: &Simulation, name: &str) -> RtResult<TaskHandle> {
        Ok(sim.find_entity_as::<Task>(name)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn set_kernel(&mut self, kernel: KernelHandle) {
        self.kernel = Some(kernel);
    }

    pub fn kernel(&self) -> Option<KernelHandle> {
        self.kernel.clone()
    }

    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    /// Index of the instruction currently executing.
    pub fn current_index(&self) -> usize {
        self.cur
    }

    /// Borrow an instruction for inspection.
    pub fn instr(&self, index: usize) -> Option<&dyn Instr> {
        self.instrs.get(index).map(|b| &**b)
    }

    pub(crate) fn instrs_mut(&mut self) -> &mut Vec<Box<dyn Instr>> {
        &mut self.instrs
    }

    // ── Construction ──────────────────────────────────────────────────────

    /// Append an instruction built by `mk`, which receives the back
    /// reference its end events need.  Returns the instruction's index.
    pub fn add_instr(
        task: &TaskHandle,
        sim: &mut Simulation,
        mk: impl FnOnce(&mut Simulation, InstrRef) -> Box<dyn Instr>,
    ) -> usize {
        let index = task.borrow().instrs.len();
        let iref = InstrRef::new(task, index);
        let instr = mk(sim, iref);
        task.borrow_mut().instrs.push(instr);
        index
    }

    // ── Sequencing ────────────────────────────────────────────────────────

    /// Start a job: rewind to the first instruction, reset every
    /// instruction's progress, and schedule the first one.
    pub fn activate(task: &TaskHandle, sim: &mut Simulation) -> RtResult<()> {
        {
            let mut t = task.borrow_mut();
            trace!(target: "des", task = %t.name, "activate");
            if t.instrs.is_empty() {
                return Err(RtError::NoInstruction(t.name.clone(), 0));
            }
            t.cur = 0;
            t.state = TaskState::Executing;
            for instr in &mut t.instrs {
                instr.reset(sim);
            }
        }
        Self::schedule_current(task, sim)
    }

    /// The kernel scheduled this task: start executing the current
    /// instruction.
    pub fn schedule_current(task: &TaskHandle, sim: &mut Simulation) -> RtResult<()> {
        let mut t = task.borrow_mut();
        let cur = t.cur;
        match t.instrs.get_mut(cur) {
            Some(instr) => instr.schedule(sim),
            None => Err(RtError::NoInstruction(t.name.clone(), cur)),
        }
    }

    /// The kernel preempted this task: stop the current instruction,
    /// keeping its progress for the resume.
    pub fn deschedule_current(task: &TaskHandle, sim: &mut Simulation) -> RtResult<()> {
        let mut t = task.borrow_mut();
        let cur = t.cur;
        match t.instrs.get_mut(cur) {
            Some(instr) => instr.deschedule(sim),
            None => Err(RtError::NoInstruction(t.name.clone(), cur)),
        }
    }

    /// The current instruction finished: advance the instruction pointer.
    /// The next instruction starts immediately; after the last one the task
    /// completes and the kernel (if any) is notified.
    pub fn on_instr_end(task: &TaskHandle, sim: &mut Simulation) -> RtResult<()> {
        let finished = {
            let mut t = task.borrow_mut();
            trace!(target: "des", task = %t.name, instr = t.cur, "instruction end");
            t.cur += 1;
            t.cur >= t.instrs.len()
        };

        if !finished {
            return Self::schedule_current(task, sim);
        }

        task.borrow_mut().state = TaskState::Completed;
        let kernel = task.borrow().kernel.clone();
        if let Some(kernel) = kernel {
            kernel.borrow_mut().on_task_end(sim, task)?;
        }
        Ok(())
    }
}

impl Entity for Task {
    fn new_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
        self.cur = 0;
        self.state = TaskState::Idle;
        for instr in &mut self.instrs {
            instr.reset(sim);
        }
        Ok(())
    }

    fn end_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
        for instr in &mut self.instrs {
            instr.end_run(sim);
        }
        Ok(())
    }
}
