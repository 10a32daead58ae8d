//! Unit tests for des-random.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    change_generator, default_generator, restore_generator, DeltaVar, DetVar, ExponentialVar,
    NormalVar, PoissonVar, RandError, RandomGen, RandomVar, UniformVar,
};

fn handle(seed: i64) -> crate::GenHandle {
    Rc::new(RefCell::new(RandomGen::new(seed)))
}

// ── RandomGen ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod generator {
    use rand::{Rng, SeedableRng};

    use super::*;

    /// The minimal-standard reference sequence for seed 1.
    #[test]
    fn park_miller_reference_sequence() {
        let mut g = RandomGen::new(1);
        let first_five: Vec<i64> = (0..5).map(|_| g.sample()).collect();
        assert_eq!(
            first_five,
            vec![16807, 282475249, 1622650073, 984943658, 1144108930],
        );
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RandomGen::new(29_741);
        let mut b = RandomGen::new(29_741);
        for _ in 0..1000 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn init_resets_the_stream() {
        let mut g = RandomGen::new(1);
        let first = g.sample();
        for _ in 0..10 {
            g.sample();
        }
        g.init(1);
        assert_eq!(g.seed(), 1);
        assert_eq!(g.sample(), first);
    }

    #[test]
    fn samples_stay_in_range() {
        let mut g = RandomGen::new(7);
        for _ in 0..10_000 {
            let x = g.sample();
            assert!(x > 0 && x < g.modulus());
        }
    }

    #[test]
    fn current_tracks_last_sample() {
        let mut g = RandomGen::new(1);
        let x = g.sample();
        assert_eq!(g.current(), x);
    }

    #[test]
    fn rng_core_integration() {
        // The rand façade must draw from the same deterministic stream.
        let mut g = RandomGen::new(1);
        assert_eq!(rand::RngCore::next_u32(&mut g), 16807);

        let mut g = RandomGen::seed_from_u64(1234);
        let x: f64 = g.gen_range(0.0..1.0);
        assert!((0.0..1.0).contains(&x));
    }
}

// ── Default generator plumbing ────────────────────────────────────────────────

#[cfg(test)]
mod default_gen {
    use super::*;

    #[test]
    fn change_and_restore() {
        let replacement = handle(99);
        let old = change_generator(replacement.clone());

        // A variable constructed now captures the replacement.
        let mut u = UniformVar::new(0.0, 1.0);
        let direct = {
            let mut g = RandomGen::new(99);
            let m = g.modulus();
            g.sample() as f64 / m as f64
        };
        assert_eq!(u.get(), direct);

        restore_generator();
        // Restored default is the library generator, not the replacement.
        assert!(!Rc::ptr_eq(&default_generator(), &replacement));
        drop(old);
    }

    #[test]
    fn seed_generator_reseeds_the_current_default() {
        let _ = change_generator(handle(7));
        crate::seed_generator(1);

        let mut u = UniformVar::new(0.0, 1.0);
        let expected = 16807.0 / 2147483647.0;
        assert!((u.get() - expected).abs() < 1e-15);
        restore_generator();
    }

    #[test]
    fn earlier_variables_keep_their_handle() {
        let first = handle(5);
        let _ = change_generator(first.clone());
        let mut u = UniformVar::new(0.0, 1.0);

        let _ = change_generator(handle(6));
        u.get();
        restore_generator();

        // Only `first` advanced.
        assert_ne!(first.borrow().current(), 5);
    }
}

// ── Distributions ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod distributions {
    use super::*;

    #[test]
    fn delta_is_constant() {
        let mut d = DeltaVar::new(7.5);
        for _ in 0..5 {
            assert_eq!(d.get(), 7.5);
        }
        assert_eq!(d.maximum().unwrap(), 7.5);
        assert_eq!(d.minimum().unwrap(), 7.5);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut u = UniformVar::with_generator(5.0, 9.0, handle(1));
        for _ in 0..10_000 {
            let x = u.get();
            assert!((5.0..9.0).contains(&x));
        }
        assert_eq!(u.maximum().unwrap(), 9.0);
        assert_eq!(u.minimum().unwrap(), 5.0);
    }

    #[test]
    fn exponential_is_positive_with_requested_mean() {
        let mut e = ExponentialVar::with_generator(10.0, handle(1));
        let n = 100_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let x = e.get();
            assert!(x >= 0.0);
            sum += x;
        }
        let mean = sum / n as f64;
        assert!((mean - 10.0).abs() < 0.5, "sample mean {mean} far from 10");
        assert!(matches!(e.maximum(), Err(RandError::Unbounded { .. })));
        assert_eq!(e.minimum().unwrap(), 0.0);
    }

    #[test]
    fn normal_caches_one_spare_sample() {
        // Two variables on identical generators: drawing twice from one must
        // consume exactly as much generator state as drawing twice from the
        // other (the second draw comes from the cached spare).
        let ga = handle(1);
        let gb = handle(1);
        let mut a = NormalVar::with_generator(0.0, 1.0, ga.clone());
        let mut b = NormalVar::with_generator(0.0, 1.0, gb.clone());

        let (a1, a2) = (a.get(), a.get());
        let (b1, b2) = (b.get(), b.get());
        assert_eq!(a1, b1);
        assert_eq!(a2, b2);
        assert_eq!(ga.borrow().current(), gb.borrow().current());
    }

    #[test]
    fn normal_sample_mean_and_spread() {
        let mut v = NormalVar::with_generator(4.0, 2.0, handle(12345));
        let n = 100_000;
        let samples: Vec<f64> = (0..n).map(|_| v.get()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        assert!((mean - 4.0).abs() < 0.05, "sample mean {mean} far from 4");
    }

    #[test]
    fn poisson_yields_small_counts_for_small_lambda() {
        let mut p = PoissonVar::with_generator(2.0, handle(1));
        for _ in 0..10_000 {
            let x = p.get();
            assert!(x >= 0.0 && x <= PoissonVar::CUTOFF as f64);
            assert_eq!(x.fract(), 0.0);
        }
    }

    #[test]
    fn det_replays_cyclically() {
        let mut d = DetVar::new(vec![1.0, 2.0, 3.0]);
        let drawn: Vec<f64> = (0..7).map(|_| d.get()).collect();
        assert_eq!(drawn, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
        assert_eq!(d.maximum().unwrap(), 3.0);
        assert_eq!(d.minimum().unwrap(), 1.0);
    }

    #[test]
    fn det_reads_whitespace_separated_files() {
        use std::io::Cursor;
        use std::path::Path;

        let data = b"1.5 2.5\n10\n\t-3 4e2\n";
        let mut d = DetVar::from_reader(Cursor::new(&data[..]), Path::new("test.pdf")).unwrap();
        assert_eq!(d.get(), 1.5);
        assert_eq!(d.get(), 2.5);
        assert_eq!(d.get(), 10.0);
        assert_eq!(d.get(), -3.0);
        assert_eq!(d.get(), 400.0);
        assert_eq!(d.get(), 1.5);
    }

    #[test]
    fn det_rejects_malformed_and_empty_input() {
        use std::io::Cursor;
        use std::path::Path;

        let bad = DetVar::from_reader(Cursor::new(&b"1.0 zap"[..]), Path::new("bad.pdf"));
        assert!(matches!(bad, Err(RandError::MalformedPdf { .. })));

        let empty = DetVar::from_reader(Cursor::new(&b"  \n"[..]), Path::new("empty.pdf"));
        assert!(matches!(empty, Err(RandError::ShortFile(_))));
    }
}

// ── Factory ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod factory {
    use crate::factory::create;

    use super::*;

    fn pars(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builds_each_distribution() {
        let mut delta = create("delta", &pars(&["7"])).unwrap();
        assert_eq!(delta.get(), 7.0);

        let mut uni = create("uniform", &pars(&["1", "2"])).unwrap();
        let x = uni.get();
        assert!((1.0..2.0).contains(&x));

        assert!(create("exponential", &pars(&["3.5"])).is_ok());
        assert!(create("pareto", &pars(&["1", "2"])).is_ok());
        assert!(create("normal", &pars(&["0", "1"])).is_ok());
        assert!(create("poisson", &pars(&["4"])).is_ok());
    }

    #[test]
    fn wrong_arity_is_a_parse_error() {
        let err = create("delta", &pars(&[])).unwrap_err();
        assert!(matches!(err, RandError::Parse { class: "DeltaVar", .. }));

        let err = create("uniform", &pars(&["1"])).unwrap_err();
        assert!(matches!(err, RandError::Parse { class: "UniformVar", .. }));

        let err = create("normal", &pars(&["0", "1", "2"])).unwrap_err();
        assert!(matches!(err, RandError::Parse { class: "NormalVar", .. }));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = create("zipf", &pars(&["1"])).unwrap_err();
        assert!(matches!(err, RandError::UnknownDistribution(_)));
    }

    #[test]
    fn parameters_parse_permissively() {
        let mut delta = create("delta", &pars(&["7ticks"])).unwrap();
        assert_eq!(delta.get(), 7.0);
    }

    #[test]
    fn det_factory_propagates_io_failure() {
        let err = create("det", &pars(&["/nonexistent/rand.pdf"])).unwrap_err();
        assert!(matches!(err, RandError::Io(_)));
    }
}
