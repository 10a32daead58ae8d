use des_core::{EventId, Tick};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `post` with a triggering time before the current simulation time.
    #[error("cannot post at {at}: simulation time is already {now}")]
    PostInPast { at: Tick, now: Tick },

    /// `post` on an event already sitting in the queue.
    #[error("{0} is already in the event queue")]
    AlreadyQueued(EventId),

    /// The queue ran dry under `sim_step`.
    #[error("no more events in queue")]
    NoMoreEvents,

    /// Stale or foreign event handle.
    #[error("{0} does not name a live event")]
    UnknownEvent(EventId),

    /// Registry lookup miss.
    #[error("entity {0:?} not found")]
    NotFound(String),

    #[error("entity name {0:?} is already registered")]
    DuplicateName(String),

    /// `find_as` hit an entity of a different concrete type.
    #[error("entity {0:?} has a different concrete type")]
    EntityType(String),

    /// An entity lifecycle hook failed; the replica was aborted.
    #[error("{hook} hook failed for entity {name:?}: {reason}")]
    Hook {
        hook: &'static str,
        name: String,
        reason: String,
    },

    /// Escape hatch for application-defined hook failures.
    #[error("{0}")]
    App(String),
}

/// Shorthand result type for `des-engine`.
pub type EngineResult<T> = Result<T, EngineError>;
