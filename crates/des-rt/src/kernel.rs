//! Kernel seams.
//!
//! The fabric talks to schedulers through [`Kernel`]; policies (fixed
//! priority, EDF, servers, …) are client code.  Optional capabilities are
//! explicit queries instead of downcasts: a kernel either exposes
//! [`ThresholdControl`] or it does not, and an instruction that requires it
//! fails with `KernelMismatch` when it does not.

use std::cell::RefCell;
use std::rc::Rc;

use des_engine::Simulation;

use crate::error::RtResult;
use crate::task::TaskHandle;

/// Shared handle onto a kernel.
pub type KernelHandle = Rc<RefCell<dyn Kernel>>;

/// A CPU scheduler driving tasks.
pub trait Kernel: 'static {
    /// A task became ready and requests execution.
    fn activate(&mut self, sim: &mut Simulation, task: &TaskHandle) -> RtResult<()>;

    /// A task gives the processor up (blocking, preemption).
    fn suspend(&mut self, sim: &mut Simulation, task: &TaskHandle) -> RtResult<()>;

    /// Choose the next task to execute and start it.
    fn dispatch(&mut self, sim: &mut Simulation) -> RtResult<()>;

    /// The running task finished its instruction list.
    fn on_task_end(&mut self, _sim: &mut Simulation, _task: &TaskHandle) -> RtResult<()> {
        Ok(())
    }

    /// Capability query for preemption-threshold support.
    fn as_threshold(&mut self) -> Option<&mut dyn ThresholdControl> {
        None
    }
}

/// Preemption-threshold control, for kernels that support it.
///
/// While a task runs above its nominal priority (the *threshold*),
/// preemption by tasks below the threshold is suppressed; disabling the
/// threshold re-enables preemption and normally forces a re-dispatch.
pub trait ThresholdControl {
    /// Suppress preemption up to priority `threshold`.
    fn raise_threshold(&mut self, threshold: i32);

    /// Drop the active threshold, re-enabling preemption.
    fn disable_threshold(&mut self);
}
