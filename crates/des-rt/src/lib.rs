//! `des-rt` — the task/instruction fabric for real-time scheduling models.
//!
//! A [`Task`] is an entity owning an ordered list of instructions; a
//! [`Kernel`] decides which task executes.  When the kernel schedules a
//! task, the task's current instruction posts an end event for its
//! simulated duration; when that event fires the task advances to the next
//! instruction.  Preemption is `deschedule`: the pending end event is
//! dropped and the residual duration is kept for the resume.
//!
//! Concrete scheduling policies (fixed priority, EDF, …) are client code
//! implementing [`Kernel`]; this crate provides the fabric and two stock
//! instructions:
//!
//! | Module         | Contents                                           |
//! |----------------|----------------------------------------------------|
//! | [`kernel`]     | `Kernel` + `ThresholdControl` capability           |
//! | [`task`]       | `Task` entity, instruction sequencing              |
//! | [`instr`]      | `Instr` trait, `InstrState`, `ExecInstr`           |
//! | [`sched_instr`]| `SchedInstr` — threshold lowering + re-dispatch    |
//! | [`error`]      | `RtError`, `RtResult`                              |

pub mod error;
pub mod instr;
pub mod kernel;
pub mod sched_instr;
pub mod task;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{RtError, RtResult};
pub use instr::{ExecInstr, Instr, InstrRef, InstrState};
pub use kernel::{Kernel, KernelHandle, ThresholdControl};
pub use sched_instr::SchedInstr;
pub use task::{Task, TaskHandle, TaskState};
