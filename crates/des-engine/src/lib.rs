//! `des-engine` — the discrete-event kernel of `rust_des`.
//!
//! # Execution model
//!
//! ```text
//! loop:
//!   ① Pop      — extract the (time, priority, order)-minimal event.
//!   ② Advance  — global time jumps to the event's time.
//!   ③ Fire     — freeze last_time, run the handler (which may post, drop,
//!                or re-post events, including its own).
//!   ④ Observe  — notify the event's stats, particles, and traces, in
//!                insertion order, with the frozen firing time.
//!   ⑤ Dispose  — destroy the event slot if it was posted disposable and
//!                was not re-posted.
//! ```
//!
//! Everything is single-threaded virtual time: handlers run to completion,
//! and all apparent concurrency is events sharing a tick, ordered by
//! priority and then arrival.
//!
//! The engine is a plain value — [`Simulation`] owns the clock, the queue,
//! the event slots, the entity registry, and the statistics registry, so
//! tests and embedders can run any number of isolated simulations.
//!
//! # What lives here
//!
//! | Module       | Contents                                            |
//! |--------------|-----------------------------------------------------|
//! | [`queue`]    | `EventKey`, `EventQueue`                            |
//! | [`event`]    | handler traits, the `EntityEvent` adaptor, priorities |
//! | [`entity`]   | `Entity` trait + registry                           |
//! | [`probe`]    | `Probe`/`Stat` traits, `FiredEvent`                 |
//! | [`sim`]      | `Simulation` — the engine + driver                  |
//! | [`error`]    | `EngineError`, `EngineResult`                       |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use des_core::Tick;
//! use des_engine::Simulation;
//!
//! let mut sim = Simulation::new();
//! let hello = sim
//!     .event(|sim: &mut Simulation, me| {
//!         let now = sim.time();
//!         sim.post(me, now + 10).ok();   // periodic: re-post self
//!     })
//!     .label("hello")
//!     .create();
//! sim.post(hello, Tick(0))?;
//! sim.run(Tick(100), 1)?;
//! ```

pub mod entity;
pub mod error;
pub mod event;
pub mod probe;
pub mod queue;
pub mod sim;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use entity::Entity;
pub use error::{EngineError, EngineResult};
pub use event::{EntityEvent, EventHandler, DEFAULT_PRIORITY, IMMEDIATE_PRIORITY};
pub use probe::{FiredEvent, Probe, Stat};
pub use queue::{EventKey, EventQueue};
pub use sim::{EventBuilder, Simulation};

pub use des_core::{EntityId, EventId, Tick};
