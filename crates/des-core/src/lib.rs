//! `des-core` — foundational types for the `rust_des` simulation framework.
//!
//! This crate is a dependency of every other `des-*` crate.  It intentionally
//! has no `des-*` dependencies and minimal external ones (only `tracing` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                          |
//! |-------------|---------------------------------------------------|
//! | [`tick`]    | `Tick` — the integer virtual-time quantity        |
//! | [`ids`]     | `EventId`, `EntityId`                             |
//! | [`parse`]   | permissive C-style numeric parsing                |
//! | [`debug`]   | `DebugStream` — leveled, nested debug output      |
//! | [`error`]   | `CoreError`, `CoreResult`                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                               |
//! |---------|------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.  |

pub mod debug;
pub mod error;
pub mod ids;
pub mod parse;
pub mod tick;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use debug::DebugStream;
pub use error::{CoreError, CoreResult};
pub use ids::{EntityId, EventId};
pub use tick::Tick;
