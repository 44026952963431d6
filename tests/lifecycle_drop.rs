use spark_reconcile::{
    create_computation, create_derived, mount, signal, wrap, Rendered, TargetNode, Value,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn computation_drop_unsubscribes() {
    let source = signal(0);
    let runs = Rc::new(Cell::new(0));

    {
        let _c = create_computation({
            let (source, runs) = (source.clone(), runs.clone());
            move || {
                source.get();
                runs.set(runs.get() + 1);
            }
        });
        source.set(1);
        assert_eq!(runs.get(), 2);
        assert_eq!(source.subscriber_count(), 1);
    }

    source.set(2);
    assert_eq!(runs.get(), 2, "dropped computation should stop running");
    assert_eq!(source.subscriber_count(), 0);
}

#[test]
fn cloned_handle_keeps_computation_alive() {
    let source = signal(0);
    let runs = Rc::new(Cell::new(0));
    let keep = {
        let c = create_computation({
            let (source, runs) = (source.clone(), runs.clone());
            move || {
                source.get();
                runs.set(runs.get() + 1);
            }
        });
        c.clone()
    };

    source.set(1);
    assert_eq!(runs.get(), 2);
    keep.dispose();
    source.set(2);
    assert_eq!(runs.get(), 2);
}

#[test]
fn dropped_view_stops_rendering() {
    let n = signal(0);
    let renders = Rc::new(Cell::new(0));
    let root = {
        let view = mount({
            let (n, renders) = (n.clone(), renders.clone());
            move || {
                renders.set(renders.get() + 1);
                Rendered::from(TargetNode::text(n.get().to_string()))
            }
        })
        .unwrap();
        view.root().clone()
    };

    n.set(1);
    assert_eq!(renders.get(), 1);
    assert_eq!(root.text().as_deref(), Some("0"));
}

#[test]
fn dropped_store_releases_its_keys() {
    let before = spark_reconcile::reactivity::graph::trigger_count();
    {
        let value = Value::map([("a", 1), ("b", 2)]);
        let state = wrap(&value).unwrap();
        let sum = create_derived({
            let state = state.clone();
            move || {
                let read = |k: &str| state.get(k).ok().and_then(|t| t.as_number()).unwrap_or(0.0);
                read("a") + read("b")
            }
        });
        assert_eq!(sum.get(), 3.0);
        assert!(spark_reconcile::reactivity::graph::trigger_count() > before);
    }
    assert_eq!(spark_reconcile::reactivity::graph::trigger_count(), before);
}
