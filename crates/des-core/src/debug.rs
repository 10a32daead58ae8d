//! `DebugStream` — leveled, nested debug output.
//!
//! # Why this exists
//!
//! Simulation debugging is contextual: a run produces millions of handler
//! firings and only a few subsystems are interesting at a time.  The stream
//! filters by *named level* (one per subsystem — `"Event"`, `"Simul"`,
//! `"Instr"`, …) and tracks an `enter`/`exit` nesting depth so that the
//! output reads as a call tree.
//!
//! Emission goes through [`tracing`] at DEBUG severity, so a release binary
//! with a higher filter pays only the disabled-level check per call site,
//! and embedders choose the subscriber.

use std::collections::HashSet;

use tracing::debug;

/// A leveled debug stream with nesting.
///
/// Levels are opt-in: nothing is printed until [`enable`](Self::enable) is
/// called with a level name.  `enter`/`exit` must be balanced; a frame
/// entered at a disabled level suppresses its `print` calls too.
#[derive(Default)]
pub struct DebugStream {
    enabled: HashSet<String>,
    /// One entry per `enter` frame; `false` marks a suppressed frame.
    frames: Vec<bool>,
}

impl DebugStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a level on.
    pub fn enable(&mut self, level: &str) {
        self.enabled.insert(level.to_owned());
    }

    /// Turn a level off.
    pub fn disable(&mut self, level: &str) {
        self.enabled.remove(level);
    }

    pub fn is_enabled(&self, level: &str) -> bool {
        self.enabled.contains(level)
    }

    /// Enter a frame at `level`, printing `header` if the level is enabled.
    ///
    /// The driver uses headers of the form `t = [<time>] --> <function>`.
    pub fn enter(&mut self, level: &str, header: &str) {
        let on = self.is_enabled(level);
        if on {
            debug!(target: "des", "{:indent$}[{level}] {header}", "", indent = self.depth() * 2);
        }
        self.frames.push(on);
    }

    /// Leave the current frame.  Unbalanced calls are ignored.
    pub fn exit(&mut self) {
        self.frames.pop();
    }

    /// Print a line inside the current frame, if that frame's level was
    /// enabled on entry.
    pub fn print(&self, msg: &str) {
        if self.frames.last().copied().unwrap_or(false) {
            debug!(target: "des", "{:indent$}{msg}", "", indent = self.depth() * 2);
        }
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }
}
