use des_engine::EngineError;
use thiserror::Error;

use crate::instr::InstrState;

#[derive(Debug, Error)]
pub enum RtError {
    /// The instruction's task has no kernel attached.
    #[error("task {0:?} has no kernel")]
    NoKernel(String),

    /// The task's kernel does not satisfy the required capability set.
    #[error("kernel of task {0:?} does not support threshold control")]
    KernelMismatch(String),

    #[error("task {0:?} has no instruction at index {1}")]
    NoInstruction(String, usize),

    /// An instruction operation from a state it is not legal in.
    #[error("cannot {op} an instruction in state {state:?}")]
    BadTransition {
        op: &'static str,
        state: InstrState,
    },

    /// Scripted construction failed (bad arity or malformed argument).
    #[error("{class}: {msg}")]
    Parse { msg: String, class: &'static str },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Shorthand result type for `des-rt`.
pub type RtResult<T> = Result<T, RtError>;

/// Event handlers cross back into the engine's error type; the textual
/// form is enough for the driver's abort-and-clear path.
pub(crate) fn to_engine(e: RtError) -> EngineError {
    match e {
        RtError::Engine(inner) => inner,
        other => EngineError::App(other.to_string()),
    }
}
