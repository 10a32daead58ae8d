//! `des-random` — reproducible pseudo-random generation for `rust_des`.
//!
//! # Determinism strategy
//!
//! All randomness flows from [`RandomGen`], a Park-Miller linear
//! congruential generator with a fully specified update rule: the same seed
//! always produces the same sequence, on every platform.  The simulation
//! driver never touches the generator between replicas, so a multi-run
//! simulation consumes one continuous stream — replicas differ *because*
//! the state carries over.
//!
//! Random variables ([`RandomVar`]) draw from a generator handle.  Ones
//! constructed without an explicit handle capture the process-wide default
//! current at construction time; [`change_generator`]/[`restore_generator`]
//! swap that default, mirroring the library's classic seeding workflow.
//!
//! # What lives here
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`gen`]     | `RandomGen`, the default-generator handle machinery   |
//! | [`var`]     | `RandomVar` + the distribution catalog                |
//! | [`factory`] | by-name scripted construction                         |
//! | [`error`]   | `RandError`, `RandResult`                             |

pub mod error;
pub mod factory;
pub mod gen;
pub mod var;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{RandError, RandResult};
pub use gen::{
    change_generator, default_generator, restore_generator, seed_generator, GenHandle, RandNum,
    RandomGen,
};
pub use var::{
    DeltaVar, DetVar, ExponentialVar, NormalVar, ParetoVar, PoissonVar, RandomVar, UniformVar,
};
