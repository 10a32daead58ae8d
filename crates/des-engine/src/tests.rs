//! Unit tests for des-engine.

use std::cell::RefCell;
use std::rc::Rc;

use des_core::{EventId, Tick};

use crate::{
    EngineError, EngineResult, Entity, EntityEvent, FiredEvent, Probe, Simulation, Stat,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Shared firing log for cross-object ordering assertions.
type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// An event whose handler appends `name` to the log.
fn logging_event(sim: &mut Simulation, log: &Log, name: &'static str) -> EventId {
    let log = log.clone();
    sim.event(move |_sim: &mut Simulation, _me: EventId| {
        log.borrow_mut().push(name.to_owned());
    })
    .label(name)
    .create()
}

/// Probe recording `(label, last_time)` pairs in notification order.
#[derive(Default)]
struct Recorder {
    fired: Vec<(String, Tick)>,
}

impl Probe for Recorder {
    fn probe(&mut self, ev: &FiredEvent<'_>) {
        self.fired.push((ev.label.to_owned(), ev.last_time));
    }
}

fn recorder() -> Rc<RefCell<Recorder>> {
    Rc::new(RefCell::new(Recorder::default()))
}

/// Probe that appends a fixed tag to the shared log.
struct Tag(&'static str, Log);

impl Probe for Tag {
    fn probe(&mut self, _ev: &FiredEvent<'_>) {
        self.1.borrow_mut().push(self.0.to_owned());
    }
}

/// Statistic recording every lifecycle call.
#[derive(Default)]
struct LifecycleStat {
    inited_for: Option<usize>,
    new_runs: usize,
    end_runs: Vec<Tick>,
    end_sims: usize,
    fires: usize,
}

impl Probe for LifecycleStat {
    fn probe(&mut self, _ev: &FiredEvent<'_>) {
        self.fires += 1;
    }
}

impl Stat for LifecycleStat {
    fn init_runs(&mut self, n: usize) {
        self.inited_for = Some(n);
        self.new_runs = 0;
        self.end_runs.clear();
        self.end_sims = 0;
    }

    fn new_run(&mut self) {
        self.new_runs += 1;
    }

    fn end_run(&mut self, at: Tick) {
        self.end_runs.push(at);
    }

    fn end_sim(&mut self) {
        self.end_sims += 1;
    }
}

/// Minimal entity logging its lifecycle hooks.
struct Station {
    name: &'static str,
    log: Log,
    fail_new_run: bool,
}

impl Station {
    fn register(sim: &mut Simulation, name: &'static str, log: &Log) -> Rc<RefCell<Station>> {
        let station = Rc::new(RefCell::new(Station {
            name,
            log: log.clone(),
            fail_new_run: false,
        }));
        sim.add_entity(name, &station).unwrap();
        station
    }
}

impl Entity for Station {
    fn new_run(&mut self, _sim: &mut Simulation) -> EngineResult<()> {
        self.log.borrow_mut().push(format!("{}:new_run", self.name));
        if self.fail_new_run {
            return Err(EngineError::App("station broke".to_owned()));
        }
        Ok(())
    }

    fn end_run(&mut self, _sim: &mut Simulation) -> EngineResult<()> {
        self.log.borrow_mut().push(format!("{}:end_run", self.name));
        Ok(())
    }
}

// ── Queue ordering ────────────────────────────────────────────────────────────

#[cfg(test)]
mod ordering {
    use super::*;

    #[test]
    fn fifo_at_equal_time_and_priority() {
        let mut sim = Simulation::new();
        let log = log();
        let a = logging_event(&mut sim, &log, "A");
        let b = logging_event(&mut sim, &log, "B");
        sim.post(a, Tick(10)).unwrap();
        sim.post(b, Tick(10)).unwrap();

        assert_eq!(sim.sim_step().unwrap(), Tick(10));
        assert_eq!(sim.sim_step().unwrap(), Tick(10));
        assert_eq!(entries(&log), vec!["A", "B"]);
        assert_eq!(sim.queue_len(), 0);
        assert_eq!(sim.time(), Tick(10));
    }

    #[test]
    fn lower_priority_number_fires_first() {
        let mut sim = Simulation::new();
        let log = log();
        let log_a = log.clone();
        let a = sim
            .event(move |_: &mut Simulation, _: EventId| log_a.borrow_mut().push("A".into()))
            .label("A")
            .priority(8)
            .create();
        let log_b = log.clone();
        let b = sim
            .event(move |_: &mut Simulation, _: EventId| log_b.borrow_mut().push("B".into()))
            .label("B")
            .priority(0)
            .create();

        sim.post(a, Tick(10)).unwrap();
        sim.post(b, Tick(10)).unwrap();
        sim.run_to(Tick(10)).unwrap();
        assert_eq!(entries(&log), vec!["B", "A"]);
    }

    #[test]
    fn time_dominates_priority() {
        let mut sim = Simulation::new();
        let log = log();
        let log_a = log.clone();
        let a = sim
            .event(move |_: &mut Simulation, _: EventId| log_a.borrow_mut().push("A".into()))
            .priority(99)
            .create();
        let b = logging_event(&mut sim, &log, "B");

        sim.post(a, Tick(5)).unwrap();
        sim.post(b, Tick(10)).unwrap();
        sim.run_to(Tick(10)).unwrap();
        assert_eq!(entries(&log), vec!["A", "B"]);
    }

    #[test]
    fn time_is_non_decreasing_across_steps() {
        let mut sim = Simulation::new();
        let log = log();
        for (name, t) in [("C", 30), ("A", 10), ("D", 30), ("B", 20)] {
            let ev = logging_event(&mut sim, &log, name);
            sim.post(ev, Tick(t)).unwrap();
        }

        let mut times = Vec::new();
        while let Some(t) = sim.try_step().unwrap() {
            times.push(t);
        }
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
        // Equal-time tie broken by arrival.
        assert_eq!(entries(&log), vec!["A", "B", "C", "D"]);
    }
}

// ── Re-post semantics ─────────────────────────────────────────────────────────

#[cfg(test)]
mod reposting {
    use super::*;

    #[test]
    fn probe_reads_frozen_last_time_after_self_repost() {
        let mut sim = Simulation::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let a = sim
            .event(move |sim: &mut Simulation, me: EventId| {
                *c.borrow_mut() += 1;
                if *c.borrow() == 1 {
                    let later = sim.time() + 10;
                    sim.post(me, later).unwrap();
                }
            })
            .label("A")
            .create();
        let probe = recorder();
        sim.add_stat(a, &probe).unwrap();

        sim.post(a, Tick(10)).unwrap();
        assert_eq!(sim.sim_step().unwrap(), Tick(10));

        // The probe observed the firing time, not the re-posted time.
        assert_eq!(probe.borrow().fired, vec![("A".to_owned(), Tick(10))]);
        // The pending time is the re-posted one.
        assert_eq!(sim.event_time(a).unwrap(), Tick(20));
        assert!(sim.is_queued(a));

        assert_eq!(sim.sim_step().unwrap(), Tick(20));
        assert_eq!(
            probe.borrow().fired,
            vec![("A".to_owned(), Tick(10)), ("A".to_owned(), Tick(20))],
        );
    }

    #[test]
    fn same_tick_repost_fires_again_behind_equal_events() {
        let mut sim = Simulation::new();
        let log = log();
        let log_a = log.clone();
        let fired = Rc::new(RefCell::new(0));
        let f = fired.clone();
        let a = sim
            .event(move |sim: &mut Simulation, me: EventId| {
                log_a.borrow_mut().push("A".into());
                *f.borrow_mut() += 1;
                if *f.borrow() == 1 {
                    // Re-post at the same (time, priority); a fresh order
                    // value makes the key unique.
                    sim.post(me, sim.time()).unwrap();
                }
            })
            .create();
        let b = logging_event(&mut sim, &log, "B");

        sim.post(a, Tick(5)).unwrap();
        sim.post(b, Tick(5)).unwrap();
        sim.run_to(Tick(5)).unwrap();

        // The re-posted A arrives behind B, which was already pending.
        assert_eq!(entries(&log), vec!["A", "B", "A"]);
        assert_eq!(sim.time(), Tick(5));
    }
}

// ── Disposability ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod disposable {
    use super::*;

    #[test]
    fn disposable_event_is_destroyed_after_firing() {
        let mut sim = Simulation::new();
        let log = log();
        let ev = logging_event(&mut sim, &log, "once");
        sim.post_disposable(ev, Tick(3)).unwrap();

        sim.sim_step().unwrap();
        assert_eq!(entries(&log), vec!["once"]);
        assert!(!sim.is_live(ev));
        assert!(!sim.is_queued(ev));
        assert!(matches!(
            sim.last_time(ev),
            Err(EngineError::UnknownEvent(_))
        ));
        // Scheduling a stale handle is refused; dropping it is a no-op.
        assert!(sim.post(ev, Tick(9)).is_err());
        sim.drop_event(ev);
    }

    #[test]
    fn plain_repost_from_handler_clears_disposability() {
        let mut sim = Simulation::new();
        let fired = Rc::new(RefCell::new(0));
        let f = fired.clone();
        let ev = sim
            .event(move |sim: &mut Simulation, me: EventId| {
                *f.borrow_mut() += 1;
                if *f.borrow() == 1 {
                    let later = sim.time() + 1;
                    sim.post(me, later).unwrap();
                }
            })
            .create();

        sim.post_disposable(ev, Tick(0)).unwrap();
        sim.sim_step().unwrap();
        // Re-posted plainly: ownership came back, the slot survives.
        assert!(sim.is_live(ev));
        sim.sim_step().unwrap();
        assert!(sim.is_live(ev));
        assert_eq!(*fired.borrow(), 2);
    }

    #[test]
    fn clear_event_queue_destroys_pending_disposables() {
        let mut sim = Simulation::new();
        let log = log();
        let keep = logging_event(&mut sim, &log, "keep");
        let toss = logging_event(&mut sim, &log, "toss");
        sim.post(keep, Tick(10)).unwrap();
        sim.post_disposable(toss, Tick(10)).unwrap();

        sim.clear_event_queue();
        assert_eq!(sim.queue_len(), 0);
        assert_eq!(sim.time(), Tick::ZERO);
        assert!(sim.is_live(keep));
        assert!(!sim.is_queued(keep));
        assert!(!sim.is_live(toss));
        assert!(entries(&log).is_empty());
    }
}

// ── drop ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod dropping {
    use super::*;

    #[test]
    fn drop_is_idempotent_and_post_after_drop_enqueues_once() {
        let mut sim = Simulation::new();
        let log = log();
        let ev = logging_event(&mut sim, &log, "E");

        sim.drop_event(ev); // not queued: no-op
        sim.post(ev, Tick(4)).unwrap();
        sim.drop_event(ev);
        sim.drop_event(ev); // second drop: no-op
        assert_eq!(sim.queue_len(), 0);

        sim.post(ev, Tick(4)).unwrap();
        assert_eq!(sim.queue_len(), 1);
        sim.run_to(Tick(4)).unwrap();
        assert_eq!(entries(&log), vec!["E"]);
    }

    #[test]
    fn dropped_event_does_not_fire() {
        let mut sim = Simulation::new();
        let log = log();
        let a = logging_event(&mut sim, &log, "A");
        let b = logging_event(&mut sim, &log, "B");
        sim.post(a, Tick(1)).unwrap();
        sim.post(b, Tick(2)).unwrap();
        sim.drop_event(a);

        sim.run_to(Tick(5)).unwrap();
        assert_eq!(entries(&log), vec!["B"]);
    }
}

// ── process ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod processing {
    use super::*;

    #[test]
    fn process_preempts_equal_time_default_priority_events() {
        let mut sim = Simulation::new();
        let log = log();
        let e = logging_event(&mut sim, &log, "E");

        let log_a = log.clone();
        let a = sim
            .event(move |sim: &mut Simulation, _: EventId| {
                log_a.borrow_mut().push("A".into());
                // E jumps ahead of B, which shares the tick at default
                // priority.
                sim.process(e).unwrap();
            })
            .create();
        let b = logging_event(&mut sim, &log, "B");

        sim.post(a, Tick(10)).unwrap();
        sim.post(b, Tick(10)).unwrap();
        sim.run_to(Tick(10)).unwrap();
        assert_eq!(entries(&log), vec!["A", "E", "B"]);
    }

    #[test]
    fn forced_priority_is_restored_after_the_firing() {
        let mut sim = Simulation::new();
        let e = sim
            .event(|_: &mut Simulation, _: EventId| {})
            .priority(5)
            .create();

        sim.process(e).unwrap();
        assert_eq!(sim.priority(e).unwrap(), crate::IMMEDIATE_PRIORITY);
        sim.sim_step().unwrap();
        assert_eq!(sim.priority(e).unwrap(), 5);
    }

    #[test]
    fn process_on_queued_event_is_refused() {
        let mut sim = Simulation::new();
        let e = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        sim.post(e, Tick(3)).unwrap();
        assert!(matches!(
            sim.process(e),
            Err(EngineError::AlreadyQueued(_))
        ));
    }
}

// ── Error paths ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod errors {
    use super::*;

    #[test]
    fn post_in_past_is_refused() {
        let mut sim = Simulation::new();
        let tick = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        sim.post(tick, Tick(10)).unwrap();
        sim.sim_step().unwrap();
        assert_eq!(sim.time(), Tick(10));

        let late = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        assert!(matches!(
            sim.post(late, Tick(5)),
            Err(EngineError::PostInPast { at: Tick(5), now: Tick(10) })
        ));
        // Posting in the present is allowed.
        sim.post(late, Tick(10)).unwrap();
    }

    #[test]
    fn double_post_without_drop_is_refused() {
        let mut sim = Simulation::new();
        let e = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        sim.post(e, Tick(7)).unwrap();
        assert!(matches!(
            sim.post(e, Tick(8)),
            Err(EngineError::AlreadyQueued(_))
        ));
    }

    #[test]
    fn sim_step_on_empty_queue_fails() {
        let mut sim = Simulation::new();
        assert!(matches!(sim.sim_step(), Err(EngineError::NoMoreEvents)));
        // try_step models the same condition as a value.
        assert!(sim.try_step().unwrap().is_none());
    }

    #[test]
    fn handler_errors_surface_from_sim_step() {
        struct Failing;
        impl crate::EventHandler for Failing {
            fn doit(&mut self, _sim: &mut Simulation, _me: EventId) -> EngineResult<()> {
                Err(EngineError::App("handler failed".to_owned()))
            }
        }

        let mut sim = Simulation::new();
        let e = sim.event(Failing).create();
        sim.post(e, Tick(1)).unwrap();
        assert!(matches!(sim.sim_step(), Err(EngineError::App(_))));

        // The event survives the failure; after recovery it can run again.
        sim.clear_event_queue();
        assert!(sim.is_live(e));
        sim.post(e, Tick(1)).unwrap();
    }

    #[test]
    fn priority_changes_refused_while_queued() {
        let mut sim = Simulation::new();
        let e = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        sim.post(e, Tick(1)).unwrap();
        assert!(sim.set_priority(e, 3).is_err());
        assert!(sim.restore_priority(e).is_err());

        sim.drop_event(e);
        sim.set_priority(e, 3).unwrap();
        assert_eq!(sim.priority(e).unwrap(), 3);
        sim.restore_priority(e).unwrap();
        assert_eq!(sim.priority(e).unwrap(), crate::DEFAULT_PRIORITY);
    }
}

// ── Entities ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod entities {
    use super::*;

    #[test]
    fn new_run_multicast_in_registration_order_exactly_once() {
        let mut sim = Simulation::new();
        let log = log();
        let _a = Station::register(&mut sim, "a", &log);
        let _b = Station::register(&mut sim, "b", &log);
        let _c = Station::register(&mut sim, "c", &log);

        sim.init_single_run().unwrap();
        assert_eq!(entries(&log), vec!["a:new_run", "b:new_run", "c:new_run"]);

        sim.end_single_run().unwrap();
        assert_eq!(
            entries(&log),
            vec![
                "a:new_run", "b:new_run", "c:new_run",
                "a:end_run", "b:end_run", "c:end_run",
            ]
        );
    }

    #[test]
    fn find_by_name_and_downcast() {
        let mut sim = Simulation::new();
        let log = log();
        let _a = Station::register(&mut sim, "queue0", &log);

        let found = sim.find_entity("queue0").unwrap();
        let found = found.borrow();
        let station = (&*found as &dyn std::any::Any)
            .downcast_ref::<Station>()
            .expect("concrete type recovered");
        assert_eq!(station.name, "queue0");

        assert!(matches!(
            sim.find_entity("queue1"),
            Err(EngineError::NotFound(_))
        ));

        // Typed lookup recovers the concrete handle; a wrong type is a
        // distinct error from a missing name.
        let typed = sim.find_entity_as::<Station>("queue0").unwrap();
        assert_eq!(typed.borrow().name, "queue0");

        struct Other;
        impl Entity for Other {}
        assert!(matches!(
            sim.find_entity_as::<Other>("queue0"),
            Err(EngineError::EntityType(_))
        ));
    }

    #[test]
    fn names_are_unique_but_empty_names_are_unbound() {
        let mut sim = Simulation::new();
        let log = log();
        let _a = Station::register(&mut sim, "dup", &log);

        let b = Rc::new(RefCell::new(Station {
            name: "dup2",
            log: log.clone(),
            fail_new_run: false,
        }));
        assert!(matches!(
            sim.add_entity("dup", &b),
            Err(EngineError::DuplicateName(_))
        ));

        // Anonymous entities register (and get the multicast) without a
        // lookup binding.
        let anon1 = Rc::new(RefCell::new(Station {
            name: "anon1",
            log: log.clone(),
            fail_new_run: false,
        }));
        let anon2 = Rc::new(RefCell::new(Station {
            name: "anon2",
            log: log.clone(),
            fail_new_run: false,
        }));
        let id1 = sim.add_entity("", &anon1).unwrap();
        let id2 = sim.add_entity("", &anon2).unwrap();
        assert!(id1 < id2);
        assert!(matches!(sim.find_entity(""), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn dropped_entity_is_deregistered() {
        let mut sim = Simulation::new();
        let log = log();
        let a = Station::register(&mut sim, "gone", &log);
        drop(a);

        assert!(matches!(
            sim.find_entity("gone"),
            Err(EngineError::NotFound(_))
        ));
        sim.init_single_run().unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn hook_failure_aborts_the_run_and_clears_the_queue() {
        let mut sim = Simulation::new();
        let log = log();

        // First entity posts its arrival event; the second one fails.
        struct Poster(EventId);
        impl Entity for Poster {
            fn new_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
                sim.post(self.0, Tick(1))
            }
        }
        let arrival = sim.event(|_: &mut Simulation, _: EventId| {}).create();
        let poster = Rc::new(RefCell::new(Poster(arrival)));
        sim.add_entity("poster", &poster).unwrap();

        let broken = Station::register(&mut sim, "broken", &log);
        broken.borrow_mut().fail_new_run = true;

        let err = sim.init_single_run().unwrap_err();
        assert!(matches!(err, EngineError::Hook { hook: "new_run", .. }));
        assert_eq!(sim.queue_len(), 0);
        assert_eq!(sim.time(), Tick::ZERO);
    }

    #[test]
    fn entity_event_binds_a_method_to_an_entity() {
        struct Counter {
            hits: usize,
        }
        impl Entity for Counter {}

        fn on_fire(
            counter: Rc<RefCell<Counter>>,
            _sim: &mut Simulation,
            _me: EventId,
        ) -> EngineResult<()> {
            counter.borrow_mut().hits += 1;
            Ok(())
        }

        let mut sim = Simulation::new();
        let counter = Rc::new(RefCell::new(Counter { hits: 0 }));
        sim.add_entity("counter", &counter).unwrap();

        let ev = sim
            .event(EntityEvent::new(&counter, on_fire))
            .label("hit")
            .create();
        sim.post(ev, Tick(1)).unwrap();
        sim.run_to(Tick(1)).unwrap();
        assert_eq!(counter.borrow().hits, 1);

        // A dead target makes the firing a no-op instead of a fault.
        sim.post(ev, Tick(2)).unwrap();
        drop(counter);
        sim.run_to(Tick(2)).unwrap();
    }
}

// ── Probe fan-out ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod probes {
    use super::*;

    #[test]
    fn probes_fire_after_the_handler_in_category_then_insertion_order() {
        let mut sim = Simulation::new();
        let log = log();
        let ev = logging_event(&mut sim, &log, "handler");

        let trace = Rc::new(RefCell::new(Tag("trace", log.clone())));
        let stat1 = Rc::new(RefCell::new(Tag("stat1", log.clone())));
        let stat2 = Rc::new(RefCell::new(Tag("stat2", log.clone())));
        let particle = Rc::new(RefCell::new(Tag("particle", log.clone())));

        // Attach out of category order; notification is stats, particles,
        // traces, each in insertion order.
        sim.add_trace(ev, &trace).unwrap();
        sim.add_stat(ev, &stat1).unwrap();
        sim.add_particle(ev, &particle).unwrap();
        sim.add_stat(ev, &stat2).unwrap();

        sim.post(ev, Tick(1)).unwrap();
        sim.run_to(Tick(1)).unwrap();
        assert_eq!(
            entries(&log),
            vec!["handler", "stat1", "stat2", "particle", "trace"]
        );
    }

    #[test]
    fn dead_probes_are_skipped() {
        let mut sim = Simulation::new();
        let log = log();
        let ev = logging_event(&mut sim, &log, "E");
        let probe = recorder();
        sim.add_stat(ev, &probe).unwrap();
        drop(probe);

        sim.post(ev, Tick(1)).unwrap();
        sim.run_to(Tick(1)).unwrap();
        assert_eq!(entries(&log), vec!["E"]);
    }

    #[test]
    fn probes_fire_between_events_not_at_the_end() {
        let mut sim = Simulation::new();
        let log = log();
        let a = logging_event(&mut sim, &log, "A");
        let b = logging_event(&mut sim, &log, "B");
        let tag = Rc::new(RefCell::new(Tag("probe-a", log.clone())));
        sim.add_stat(a, &tag).unwrap();

        sim.post(a, Tick(1)).unwrap();
        sim.post(b, Tick(1)).unwrap();
        sim.run_to(Tick(1)).unwrap();
        assert_eq!(entries(&log), vec!["A", "probe-a", "B"]);
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod driver {
    use super::*;

    /// A periodic source: posts itself every `period` starting at 0.
    fn periodic(sim: &mut Simulation, period: i64) -> EventId {
        sim.event(move |sim: &mut Simulation, me: EventId| {
            let next = sim.time() + period;
            sim.post(me, next).unwrap();
        })
        .label("periodic")
        .create()
    }

    /// Entity that posts `ev` at tick 0 on every new run.
    struct Source(EventId);
    impl Entity for Source {
        fn new_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
            sim.post(self.0, Tick::ZERO)
        }
        fn end_run(&mut self, sim: &mut Simulation) -> EngineResult<()> {
            sim.drop_event(self.0);
            Ok(())
        }
    }

    #[test]
    fn run_to_clamps_time_on_empty_queue() {
        let mut sim = Simulation::new();
        assert_eq!(sim.run_to(Tick(50)).unwrap(), Tick(50));
        assert_eq!(sim.time(), Tick(50));
    }

    #[test]
    fn run_to_does_not_fire_beyond_the_horizon() {
        let mut sim = Simulation::new();
        let log = log();
        let near = logging_event(&mut sim, &log, "near");
        let far = logging_event(&mut sim, &log, "far");
        sim.post(near, Tick(5)).unwrap();
        sim.post(far, Tick(200)).unwrap();

        assert_eq!(sim.run_to(Tick(100)).unwrap(), Tick(100));
        assert_eq!(entries(&log), vec!["near"]);
        assert!(sim.is_queued(far));
    }

    #[test]
    fn replicas_fire_the_expected_event_grid() {
        let mut sim = Simulation::new();
        let ev = periodic(&mut sim, 10);
        let source = Rc::new(RefCell::new(Source(ev)));
        sim.add_entity("source", &source).unwrap();

        let stat = Rc::new(RefCell::new(LifecycleStat::default()));
        sim.register_stat(&stat);
        sim.add_stat(ev, &stat).unwrap();

        sim.run(Tick(100), 1).unwrap();

        // Fires at 0, 10, …, 100.
        assert_eq!(stat.borrow().fires, 11);
        assert_eq!(stat.borrow().inited_for, Some(1));
        assert_eq!(stat.borrow().new_runs, 1);
        assert_eq!(stat.borrow().end_runs, vec![Tick(100)]);
        assert_eq!(stat.borrow().end_sims, 1);
        assert!(sim.is_ended());
        // end_single_run cleared the queue and zeroed the clock.
        assert_eq!(sim.queue_len(), 0);
        assert_eq!(sim.time(), Tick::ZERO);
    }

    #[test]
    fn two_runs_are_promoted_to_three() {
        let mut sim = Simulation::new();
        let ev = periodic(&mut sim, 10);
        let source = Rc::new(RefCell::new(Source(ev)));
        sim.add_entity("source", &source).unwrap();

        let stat = Rc::new(RefCell::new(LifecycleStat::default()));
        sim.register_stat(&stat);

        sim.run(Tick(30), 2).unwrap();
        assert_eq!(stat.borrow().inited_for, Some(3));
        assert_eq!(stat.borrow().new_runs, 3);
        assert_eq!(stat.borrow().end_runs.len(), 3);
    }

    #[test]
    fn batch_modes_split_initialize_and_terminate() {
        let mut sim = Simulation::new();
        let ev = periodic(&mut sim, 10);
        let source = Rc::new(RefCell::new(Source(ev)));
        sim.add_entity("source", &source).unwrap();

        let stat = Rc::new(RefCell::new(LifecycleStat::default()));
        sim.register_stat(&stat);

        // First (sized for 3), middle, last.
        sim.run(Tick(10), -3).unwrap();
        assert_eq!(stat.borrow().inited_for, Some(3));
        assert_eq!(stat.borrow().new_runs, 1);
        assert_eq!(stat.borrow().end_sims, 0);

        sim.run(Tick(10), -1).unwrap();
        assert_eq!(stat.borrow().new_runs, 2);
        assert_eq!(stat.borrow().end_sims, 0);

        sim.run(Tick(10), 0).unwrap();
        assert_eq!(stat.borrow().new_runs, 3);
        assert_eq!(stat.borrow().end_sims, 1);
        // No re-initialization happened after the first call.
        assert_eq!(stat.borrow().inited_for, Some(3));
    }

    #[test]
    fn hook_failure_surfaces_from_run() {
        let mut sim = Simulation::new();
        let log = log();
        let broken = Station::register(&mut sim, "broken", &log);
        broken.borrow_mut().fail_new_run = true;

        assert!(matches!(
            sim.run(Tick(10), 1),
            Err(EngineError::Hook { .. })
        ));
        assert_eq!(sim.queue_len(), 0);
    }
}
