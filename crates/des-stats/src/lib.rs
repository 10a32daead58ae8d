//! `des-stats` — concrete statistics probes and trace sinks.
//!
//! The engine defines the seams ([`des_engine::Probe`], [`des_engine::Stat`]);
//! this crate provides the stock implementations:
//!
//! | Module    | Contents                                                |
//! |-----------|---------------------------------------------------------|
//! | [`stat`]  | `StatCount`, `StatMean`, `StatMax` — per-replica tables |
//! | [`trace`] | `TextTracer`, `CsvTracer` — firing logs                 |
//! | [`error`] | `StatsError`, `StatsResult`                             |
//!
//! Custom statistics compose instead of subclassing: implement `Probe` on
//! your own type, derive whatever value you need from the
//! [`FiredEvent`](des_engine::FiredEvent), and feed it to an inner
//! [`StatMean`]/[`StatMax`] via `record`.

pub mod error;
pub mod stat;
pub mod trace;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{StatsError, StatsResult};
pub use stat::{StatCount, StatMax, StatMean};
pub use trace::{CsvTracer, TextTracer};
