use spark_reconcile::{
    batch, configure, create_computation, create_derived, derived, signal, untrack, wrap,
    EngineConfig, Value,
};
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

fn counter() -> (Rc<Cell<u32>>, impl Fn() + Clone) {
    let runs = Rc::new(Cell::new(0));
    let bump = {
        let runs = runs.clone();
        move || runs.set(runs.get() + 1)
    };
    (runs, bump)
}

#[test]
fn writes_reach_only_their_readers() {
    let c1 = signal(0);
    let c2 = signal(0);
    let (x_runs, x_bump) = counter();
    let (y_runs, y_bump) = counter();

    let _x = create_computation({
        let c1 = c1.clone();
        move || {
            c1.get();
            x_bump();
        }
    });
    let _y = create_computation({
        let c2 = c2.clone();
        move || {
            c2.get();
            y_bump();
        }
    });

    c1.set(1);
    assert_eq!((x_runs.get(), y_runs.get()), (2, 1));
    c2.set(1);
    assert_eq!((x_runs.get(), y_runs.get()), (2, 2));
}

#[test]
fn unchanged_derived_does_not_notify() {
    let n = signal(2);
    let even = derived!(n => n.get() % 2 == 0);
    let (runs, bump) = counter();
    let _c = create_computation({
        let even = even.clone();
        move || {
            even.get();
            bump();
        }
    });

    n.set(4);
    assert_eq!(even.recompute_count(), 2);
    assert_eq!(runs.get(), 1);

    n.set(5);
    assert_eq!(runs.get(), 2);
}

#[test]
fn diamond_runs_once_with_consistent_values() {
    let a = signal(1);
    let doubled = derived!(a => a.get() * 2);
    let plus_one = derived!(a => a.get() + 1);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _c = create_computation({
        let (doubled, plus_one, seen) = (doubled.clone(), plus_one.clone(), seen.clone());
        move || seen.borrow_mut().push((doubled.get(), plus_one.get()))
    });

    a.set(5);
    assert_eq!(*seen.borrow(), vec![(2, 2), (10, 6)]);
}

#[test]
fn batch_coalesces_writes() {
    let first = signal("ada".to_string());
    let last = signal("lovelace".to_string());
    let (runs, bump) = counter();
    let _c = create_computation({
        let (first, last) = (first.clone(), last.clone());
        move || {
            let _ = format!("{} {}", first.get(), last.get());
            bump();
        }
    });

    batch(|| {
        first.set("grace".into());
        last.set("hopper".into());
        assert_eq!(runs.get(), 1);
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn branch_switch_drops_stale_dependency() {
    let use_a = signal(true);
    let a = signal(0);
    let b = signal(0);
    let (runs, bump) = counter();
    let c = create_computation({
        let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
        move || {
            if use_a.get() {
                a.get();
            } else {
                b.get();
            }
            bump();
        }
    });

    use_a.set(false);
    assert_eq!(runs.get(), 2);
    assert_eq!(a.subscriber_count(), 0);
    a.set(1);
    assert_eq!(runs.get(), 2);
    b.set(1);
    assert_eq!(runs.get(), 3);
    assert_eq!(c.dependency_count(), 2);
}

#[test]
fn untracked_reads_do_not_subscribe() {
    let tracked = signal(0);
    let ignored = signal(0);
    let (runs, bump) = counter();
    let _c = create_computation({
        let (tracked, ignored) = (tracked.clone(), ignored.clone());
        move || {
            tracked.get();
            untrack(|| ignored.get());
            bump();
        }
    });

    ignored.set(1);
    assert_eq!(runs.get(), 1);
    tracked.set(1);
    assert_eq!(runs.get(), 2);
}

#[test]
fn dropped_computation_stops_reacting() {
    let s = signal(0);
    let (runs, bump) = counter();
    {
        let _c = create_computation({
            let s = s.clone();
            move || {
                s.get();
                bump();
            }
        });
        s.set(1);
    }
    s.set(2);
    assert_eq!(runs.get(), 2);
    assert_eq!(s.subscriber_count(), 0);
}

#[test]
fn write_inside_computation_cascades() {
    let source = signal(1);
    let mirror = signal(0);
    let _copy = create_computation({
        let (source, mirror) = (source.clone(), mirror.clone());
        move || {
            mirror.set(source.get() * 10);
        }
    });
    let seen = Rc::new(Cell::new(0));
    let _watch = create_computation({
        let (mirror, seen) = (mirror.clone(), seen.clone());
        move || seen.set(mirror.get())
    });

    assert_eq!(seen.get(), 10);
    source.set(3);
    assert_eq!(seen.get(), 30);
}

#[test]
fn panicking_body_leaves_engine_usable() {
    let n = signal(0);
    let seen = Rc::new(Cell::new(-1));
    let _c = create_computation({
        let (n, seen) = (n.clone(), seen.clone());
        move || {
            let v = n.get();
            if v == 1 {
                panic!("boom");
            }
            seen.set(v);
        }
    });

    let result = catch_unwind(AssertUnwindSafe(|| n.set(1)));
    assert!(result.is_err());

    n.set(2);
    assert_eq!(seen.get(), 2);
}

#[test]
fn computation_converges_on_its_own_writes() {
    let s = signal(0);
    let seen = Rc::new(Cell::new(-1));
    let c = create_computation({
        let (s, seen) = (s.clone(), seen.clone());
        move || {
            let v = s.get();
            seen.set(v);
            if v < 3 {
                s.set(v + 1);
            }
        }
    });

    assert_eq!(s.get(), 3);
    assert_eq!(seen.get(), 3);
    assert_eq!(c.run_count(), 4);

    // Later writes converge the same way
    s.set(0);
    assert_eq!(seen.get(), 3);
}

#[test]
fn computation_converges_on_its_own_store_writes() {
    let state = wrap(&Value::map([("n", 0)])).unwrap();
    let seen = Rc::new(Cell::new(-1.0));
    let _c = create_computation({
        let (state, seen) = (state.clone(), seen.clone());
        move || {
            let n = state.get("n").ok().and_then(|t| t.as_number()).unwrap_or(0.0);
            seen.set(n);
            if n < 3.0 {
                state.set("n", n + 1.0).unwrap();
            }
        }
    });

    assert_eq!(seen.get(), 3.0);
}

#[test]
fn own_writes_inside_a_flush_wait_for_the_next_pass() {
    let trigger = signal(0);
    let s = signal(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let _c = create_computation({
        let (trigger, s, seen) = (trigger.clone(), s.clone(), seen.clone());
        move || {
            let t = trigger.get();
            let v = s.get();
            seen.borrow_mut().push(v);
            if v < t {
                s.set(v + 1);
            }
        }
    });

    trigger.set(2);
    assert_eq!(*seen.borrow(), vec![0, 0, 1, 2]);
}

#[test]
fn self_triggering_computation_hits_depth_guard() {
    let previous = configure(EngineConfig::default().with_max_flush_iterations(20));
    let s = signal(0);

    let result = catch_unwind(AssertUnwindSafe(|| {
        create_computation({
            let s = s.clone();
            move || {
                let v = s.get();
                s.set(v + 1);
            }
        })
    }));
    configure(previous);

    let err = result.err().expect("cycle should panic");
    let message = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    assert!(message.contains("Maximum update depth exceeded"));

    // Fresh graph still works afterwards
    let t = signal(1);
    let doubled = create_derived({
        let t = t.clone();
        move || t.get() * 2
    });
    t.set(4);
    assert_eq!(doubled.get(), 8);
}
