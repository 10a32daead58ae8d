//! The `RandomVar` trait and the distribution catalog.
//!
//! Each variable owns a [`GenHandle`] (captured from the process default
//! when none is given) and maps raw generator samples onto its
//! distribution.  The algorithms are part of the contract — simulations are
//! compared across implementations by their exact sample sequences — so
//! each `get` documents the transform it applies.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{RandError, RandResult};
use crate::gen::{default_generator, GenHandle};

// ── RandomVar ─────────────────────────────────────────────────────────────────

/// A pseudo-random variable producing `f64` samples.
pub trait RandomVar: std::fmt::Debug {
    /// Draw the next sample.
    fn get(&mut self) -> f64;

    /// Largest value the variable can produce, or
    /// [`RandError::Unbounded`] for distributions with no finite bound.
    fn maximum(&self) -> RandResult<f64>;

    /// Smallest value the variable can produce, or
    /// [`RandError::Unbounded`].
    fn minimum(&self) -> RandResult<f64>;
}

/// One draw mapped onto the open unit interval.
fn unit(gen: &GenHandle) -> f64 {
    let mut g = gen.borrow_mut();
    let s = g.sample();
    s as f64 / g.modulus() as f64
}

// ── DeltaVar ──────────────────────────────────────────────────────────────────

/// A constant, as a degenerate distribution (a Dirac delta).
#[derive(Clone, Debug)]
pub struct DeltaVar {
    value: f64,
}

impl DeltaVar {
    pub fn new(value: f64) -> Self {
        DeltaVar { value }
    }
}

impl RandomVar for DeltaVar {
    fn get(&mut self) -> f64 {
        self.value
    }

    fn maximum(&self) -> RandResult<f64> {
        Ok(self.value)
    }

    fn minimum(&self) -> RandResult<f64> {
        Ok(self.value)
    }
}

// ── UniformVar ────────────────────────────────────────────────────────────────

/// Uniform over `(min, max)`.
#[derive(Debug)]
pub struct UniformVar {
    min: f64,
    max: f64,
    gen: GenHandle,
}

impl UniformVar {
    pub fn new(min: f64, max: f64) -> Self {
        Self::with_generator(min, max, default_generator())
    }

    pub fn with_generator(min: f64, max: f64, gen: GenHandle) -> Self {
        UniformVar { min, max, gen }
    }
}

impl RandomVar for UniformVar {
    /// `sample · (max − min) / M + min`.
    fn get(&mut self) -> f64 {
        unit(&self.gen) * (self.max - self.min) + self.min
    }

    fn maximum(&self) -> RandResult<f64> {
        Ok(self.max)
    }

    fn minimum(&self) -> RandResult<f64> {
        Ok(self.min)
    }
}

// ── ExponentialVar ────────────────────────────────────────────────────────────

/// Exponential with the given mean, by inversion.
#[derive(Debug)]
pub struct ExponentialVar {
    mean: f64,
    gen: GenHandle,
}

impl ExponentialVar {
    pub fn new(mean: f64) -> Self {
        Self::with_generator(mean, default_generator())
    }

    pub fn with_generator(mean: f64, gen: GenHandle) -> Self {
        ExponentialVar { mean, gen }
    }
}

impl RandomVar for ExponentialVar {
    /// `−ln(U) · mean`.
    fn get(&mut self) -> f64 {
        -unit(&self.gen).ln() * self.mean
    }

    fn maximum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "ExponentialVar" })
    }

    fn minimum(&self) -> RandResult<f64> {
        Ok(0.0)
    }
}

// ── ParetoVar ─────────────────────────────────────────────────────────────────

/// Pareto with scale `mu` and shape `k`.
#[derive(Debug)]
pub struct ParetoVar {
    mu: f64,
    order: f64,
    gen: GenHandle,
}

impl ParetoVar {
    pub fn new(mu: f64, k: f64) -> Self {
        Self::with_generator(mu, k, default_generator())
    }

    pub fn with_generator(mu: f64, k: f64, gen: GenHandle) -> Self {
        ParetoVar { mu, order: k, gen }
    }
}

impl RandomVar for ParetoVar {
    /// `mu · U^(−1/k)`.
    fn get(&mut self) -> f64 {
        self.mu * unit(&self.gen).powf(-1.0 / self.order)
    }

    fn maximum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "ParetoVar" })
    }

    fn minimum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "ParetoVar" })
    }
}

// ── NormalVar ─────────────────────────────────────────────────────────────────

/// Normal with mean `mu` and standard deviation `sigma`, by the polar
/// Box-Muller transform.  Each rejection round yields two deviates; the
/// spare is cached and returned by the next `get` without advancing the
/// generator.
#[derive(Debug)]
pub struct NormalVar {
    mu: f64,
    sigma: f64,
    spare: Option<f64>,
    gen: GenHandle,
}

impl NormalVar {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self::with_generator(mu, sigma, default_generator())
    }

    pub fn with_generator(mu: f64, sigma: f64, gen: GenHandle) -> Self {
        NormalVar { mu, sigma, spare: None, gen }
    }
}

impl RandomVar for NormalVar {
    fn get(&mut self) -> f64 {
        if let Some(v) = self.spare.take() {
            return v;
        }

        let (t1, t2, r) = loop {
            let t1 = 2.0 * unit(&self.gen) - 1.0;
            let t2 = 2.0 * unit(&self.gen) - 1.0;
            let r = t1 * t1 + t2 * t2;
            if r < 1.0 {
                break (t1, t2, r);
            }
        };

        let r = (-2.0 * r.ln() / r).sqrt() * self.sigma;
        self.spare = Some(self.mu + t1 * r);
        self.mu + t2 * r
    }

    fn maximum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "NormalVar" })
    }

    fn minimum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "NormalVar" })
    }
}

// ── PoissonVar ────────────────────────────────────────────────────────────────

/// Poisson with mean `lambda`, by direct inversion of the CDF.
#[derive(Debug)]
pub struct PoissonVar {
    lambda: f64,
    gen: GenHandle,
}

impl PoissonVar {
    /// Inversion stops here; a draw landing in the residual tail is clamped
    /// to this value.
    pub const CUTOFF: u64 = 10_000;

    pub fn new(lambda: f64) -> Self {
        Self::with_generator(lambda, default_generator())
    }

    pub fn with_generator(lambda: f64, gen: GenHandle) -> Self {
        PoissonVar { lambda, gen }
    }
}

impl RandomVar for PoissonVar {
    fn get(&mut self) -> f64 {
        let u = unit(&self.gen);
        let mut f = (-self.lambda).exp();
        let mut s = f;

        for i in 1..Self::CUTOFF {
            if u < s {
                return (i - 1) as f64;
            }
            f = f * self.lambda / i as f64;
            s += f;
        }
        Self::CUTOFF as f64
    }

    fn maximum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "PoissonVar" })
    }

    fn minimum(&self) -> RandResult<f64> {
        Err(RandError::Unbounded { class: "PoissonVar" })
    }
}

// ── DetVar ────────────────────────────────────────────────────────────────────

/// Deterministic cyclic replay of a fixed sequence.
///
/// When the last value has been returned, the sequence starts over.  Useful
/// for scripting exact arrival patterns in tests and regression scenarios.
#[derive(Clone, Debug)]
pub struct DetVar {
    values: Vec<f64>,
    count: usize,
}

impl DetVar {
    pub fn new(values: Vec<f64>) -> Self {
        DetVar { values, count: 0 }
    }

    /// Read a whitespace-separated sequence of doubles.
    ///
    /// Errors with [`RandError::MalformedPdf`] on an unparsable token and
    /// [`RandError::ShortFile`] if no values are found.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> RandResult<Self> {
        let mut values = Vec::new();
        for line in BufReader::new(reader).lines() {
            for token in line?.split_whitespace() {
                let v: f64 = token.parse().map_err(|_| RandError::MalformedPdf {
                    path: origin.to_owned(),
                    token: token.to_owned(),
                })?;
                values.push(v);
            }
        }
        if values.is_empty() {
            return Err(RandError::ShortFile(origin.to_owned()));
        }
        Ok(DetVar::new(values))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RandResult<Self> {
        let path: PathBuf = path.as_ref().to_owned();
        let file = std::fs::File::open(&path)?;
        Self::from_reader(file, &path)
    }
}

impl RandomVar for DetVar {
    fn get(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        if self.count >= self.values.len() {
            self.count = 0;
        }
        let v = self.values[self.count];
        self.count += 1;
        v
    }

    fn maximum(&self) -> RandResult<f64> {
        match self.values.split_first() {
            None => Ok(0.0),
            Some((&first, rest)) => Ok(rest.iter().copied().fold(first, f64::max)),
        }
    }

    fn minimum(&self) -> RandResult<f64> {
        match self.values.split_first() {
            None => Ok(0.0),
            Some((&first, rest)) => Ok(rest.iter().copied().fold(first, f64::min)),
        }
    }
}
