//! Per-replica statistics tables.
//!
//! Each statistic accumulates inside one replica and commits the
//! accumulated value to a replica table at `end_run`.  Cross-replica
//! post-processing (confidence intervals etc.) lives outside the kernel;
//! the tables expose the raw per-replica values and their grand mean.
//!
//! A table needs at least three committed replicas before a cross-replica
//! estimate means anything — that is the constraint behind the driver's
//! "2 runs" warning.

use des_core::Tick;
use des_engine::{FiredEvent, Probe, Stat};

// ── Replica table ─────────────────────────────────────────────────────────────

/// Committed per-replica values, shared by the concrete statistics.
#[derive(Default, Clone, Debug)]
struct Replicas {
    values: Vec<f64>,
}

impl Replicas {
    fn init(&mut self, n: usize) {
        self.values = Vec::with_capacity(n);
    }

    fn commit(&mut self, v: f64) {
        self.values.push(v);
    }

    fn grand_mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}

// ── StatCount ─────────────────────────────────────────────────────────────────

/// Counts event firings per replica.
///
/// Attached directly, every firing adds 1; weighted occurrences go through
/// [`record`](Self::record) from a composed probe.
#[derive(Default)]
pub struct StatCount {
    name: String,
    cur: f64,
    replicas: Replicas,
}

impl StatCount {
    pub fn new(name: &str) -> Self {
        StatCount {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `v` to the current replica's count.
    pub fn record(&mut self, v: f64) {
        self.cur += v;
    }

    /// The running count inside the current replica.
    pub fn current(&self) -> f64 {
        self.cur
    }

    /// Committed per-replica counts.
    pub fn runs(&self) -> &[f64] {
        &self.replicas.values
    }

    /// Mean count across committed replicas.
    pub fn grand_mean(&self) -> Option<f64> {
        self.replicas.grand_mean()
    }
}

impl Probe for StatCount {
    fn probe(&mut self, _ev: &FiredEvent<'_>) {
        self.record(1.0);
    }
}

impl Stat for StatCount {
    fn init_runs(&mut self, n: usize) {
        self.replicas.init(n);
        self.cur = 0.0;
    }

    fn new_run(&mut self) {
        self.cur = 0.0;
    }

    fn end_run(&mut self, _at: Tick) {
        self.replicas.commit(self.cur);
    }

    fn end_sim(&mut self) {}
}

// ── StatMean ──────────────────────────────────────────────────────────────────

/// Per-replica sample mean.
///
/// Attached directly, each firing records the frozen firing time; composed
/// probes call [`record`](Self::record) with their own derived values.  A
/// replica with no samples commits 0.
#[derive(Default)]
pub struct StatMean {
    name: String,
    sum: f64,
    count: u64,
    replicas: Replicas,
}

impl StatMean {
    pub fn new(name: &str) -> Self {
        StatMean {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    /// Mean of the samples recorded inside the current replica.
    pub fn current(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }

    pub fn runs(&self) -> &[f64] {
        &self.replicas.values
    }

    pub fn grand_mean(&self) -> Option<f64> {
        self.replicas.grand_mean()
    }
}

impl Probe for StatMean {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        self.record(ev.last_time.0 as f64);
    }
}

impl Stat for StatMean {
    fn init_runs(&mut self, n: usize) {
        self.replicas.init(n);
        self.sum = 0.0;
        self.count = 0;
    }

    fn new_run(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    fn end_run(&mut self, _at: Tick) {
        self.replicas.commit(self.current().unwrap_or(0.0));
    }

    fn end_sim(&mut self) {}
}

// ── StatMax ───────────────────────────────────────────────────────────────────

/// Per-replica sample maximum.  A replica with no samples commits 0.
#[derive(Default)]
pub struct StatMax {
    name: String,
    cur: Option<f64>,
    replicas: Replicas,
}

impl StatMax {
    pub fn new(name: &str) -> Self {
        StatMax {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&mut self, v: f64) {
        self.cur = Some(match self.cur {
            None => v,
            Some(m) => m.max(v),
        });
    }

    pub fn current(&self) -> Option<f64> {
        self.cur
    }

    pub fn runs(&self) -> &[f64] {
        &self.replicas.values
    }

    pub fn grand_mean(&self) -> Option<f64> {
        self.replicas.grand_mean()
    }
}

impl Probe for StatMax {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        self.record(ev.last_time.0 as f64);
    }
}

impl Stat for StatMax {
    fn init_runs(&mut self, n: usize) {
        self.replicas.init(n);
        self.cur = None;
    }

    fn new_run(&mut self) {
        self.cur = None;
    }

    fn end_run(&mut self, _at: Tick) {
        self.replicas.commit(self.cur.unwrap_or(0.0));
    }

    fn end_sim(&mut self) {}
}
