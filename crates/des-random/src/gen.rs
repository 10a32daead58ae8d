//! The Park-Miller generator and the process-wide default handle.
//!
//! # Update rule
//!
//! The "minimal standard" linear congruential generator, computed with the
//! Schrage factorization so the intermediate products never overflow the
//! modulus range:
//!
//! ```text
//! x' = (A·(x mod Q) − R·(x div Q)) mod M
//! A = 16807   M = 2147483647   Q = M div A = 127773   R = M mod A = 2836
//! ```
//!
//! State stays in `[1, M-1]`; a seed of 0 would collapse the sequence to
//! zero, so seeds are the caller's responsibility (the library default uses
//! seed 1).
//!
//! The generator also implements [`rand::RngCore`] + [`rand::SeedableRng`],
//! so embedder code can feed the reproducible kernel stream into any `rand`
//! distribution or adaptor.

use std::cell::RefCell;
use std::rc::Rc;

use rand::{RngCore, SeedableRng};

/// The integer type of raw generator output.
pub type RandNum = i64;

const A: RandNum = 16807;
const M: RandNum = 2147483647;
const Q: RandNum = 127773; // M div A
const R: RandNum = 2836; //   M mod A

// ── RandomGen ─────────────────────────────────────────────────────────────────

/// Park-Miller pseudo-random number generator.
#[derive(Clone, Debug)]
pub struct RandomGen {
    seed: RandNum,
    xn: RandNum,
}

impl RandomGen {
    /// Create a generator with `s` as initial seed.
    pub fn new(s: RandNum) -> Self {
        RandomGen { seed: s, xn: s }
    }

    /// Re-initialize with seed `s`, resetting both the stored seed and the
    /// current state.
    pub fn init(&mut self, s: RandNum) {
        self.seed = s;
        self.xn = s;
    }

    /// Extract the next raw number from the sequence.
    pub fn sample(&mut self) -> RandNum {
        let xq = self.xn / Q;
        let xr = self.xn % Q;

        self.xn = A * xr - R * xq;
        if self.xn < 0 {
            self.xn += M;
        }
        self.xn
    }

    /// The seed the generator was last initialized with.
    pub fn seed(&self) -> RandNum {
        self.seed
    }

    /// The current sequence state (the most recent [`sample`](Self::sample)
    /// output).
    pub fn current(&self) -> RandNum {
        self.xn
    }

    /// The modulus `M`, for scaling raw samples.
    pub fn modulus(&self) -> RandNum {
        M
    }
}

// ── rand interop ──────────────────────────────────────────────────────────────

impl RngCore for RandomGen {
    fn next_u32(&mut self) -> u32 {
        // 31 significant bits per draw.
        self.sample() as u32
    }

    fn next_u64(&mut self) -> u64 {
        ((self.sample() as u64) << 32) | self.sample() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RandomGen {
    type Seed = [u8; 8];

    fn from_seed(seed: [u8; 8]) -> Self {
        // Fold the seed material into [1, M-1]; zero is not a valid state.
        let v = i64::from_le_bytes(seed);
        RandomGen::new(v.rem_euclid(M - 1) + 1)
    }
}

// ── Default generator handle ──────────────────────────────────────────────────

/// Shared handle onto a generator.  Random variables hold one of these, so
/// several variables can draw from a single interleaved stream.
pub type GenHandle = Rc<RefCell<RandomGen>>;

thread_local! {
    /// The library default generator, seeded with 1.  `restore_generator`
    /// points the current default back at this object, state included.
    static LIB_DEFAULT: GenHandle = Rc::new(RefCell::new(RandomGen::new(1)));

    /// The generator captured by variables constructed without an explicit
    /// handle.
    static CURRENT: RefCell<GenHandle> = RefCell::new(LIB_DEFAULT.with(Rc::clone));
}

/// The generator new variables capture by default.
pub fn default_generator() -> GenHandle {
    CURRENT.with(|c| c.borrow().clone())
}

/// Swap the default generator, returning the previous one.
///
/// Variables constructed earlier keep the handle they captured.
pub fn change_generator(g: GenHandle) -> GenHandle {
    CURRENT.with(|c| std::mem::replace(&mut *c.borrow_mut(), g))
}

/// Point the default back at the library generator (whose state persists
/// across the swap).
pub fn restore_generator() {
    let lib = LIB_DEFAULT.with(Rc::clone);
    CURRENT.with(|c| *c.borrow_mut() = lib);
}

/// Re-seed the current default generator.
pub fn seed_generator(s: RandNum) {
    CURRENT.with(|c| c.borrow().borrow_mut().init(s));
}
