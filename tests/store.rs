use spark_reconcile::{create_computation, create_derived, wrap, Error, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn wrapping_is_memoized_per_value() {
    let value = Value::map([("name", "ada")]);
    let a = wrap(&value).unwrap();
    let b = wrap(&value).unwrap();
    assert!(a.ptr_eq(&b));

    let other = Value::map([("name", "ada")]);
    assert!(!wrap(&other).unwrap().ptr_eq(&a));
}

#[test]
fn primitives_cannot_be_wrapped() {
    assert_eq!(wrap(&Value::from(3)).unwrap_err(), Error::NotCompound);
}

#[test]
fn field_reads_are_precise() {
    let user = wrap(&Value::map([("name", Value::from("ada")), ("age", Value::from(36))])).unwrap();
    let name_runs = Rc::new(Cell::new(0));
    let age_runs = Rc::new(Cell::new(0));

    let _name = create_computation({
        let (user, runs) = (user.clone(), name_runs.clone());
        move || {
            user.get("name").unwrap();
            runs.set(runs.get() + 1);
        }
    });
    let _age = create_computation({
        let (user, runs) = (user.clone(), age_runs.clone());
        move || {
            user.get("age").unwrap();
            runs.set(runs.get() + 1);
        }
    });

    user.set("age", 37).unwrap();
    assert_eq!((name_runs.get(), age_runs.get()), (1, 2));
    user.set("name", "grace").unwrap();
    assert_eq!((name_runs.get(), age_runs.get()), (2, 2));
}

#[test]
fn nested_values_come_back_wrapped() {
    let inner = Value::map([("x", 1)]);
    let outer = wrap(&Value::map([("point", inner.clone())])).unwrap();

    let point = outer.get("point").unwrap();
    let point = point.as_reactive().unwrap();
    assert!(point.ptr_eq(&wrap(&inner).unwrap()));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let _c = create_computation({
        let (outer, seen) = (outer.clone(), seen.clone());
        move || {
            let x = outer
                .get("point")
                .ok()
                .and_then(|p| p.as_reactive().cloned())
                .and_then(|p| p.get("x").ok())
                .and_then(|x| x.as_number());
            seen.borrow_mut().push(x);
        }
    });

    point.set("x", 2).unwrap();
    assert_eq!(*seen.borrow(), vec![Some(1.0), Some(2.0)]);
}

#[test]
fn length_readers_see_push_and_remove() {
    let list = wrap(&Value::list(["a", "b", "c"])).unwrap();
    let len = create_derived({
        let list = list.clone();
        move || list.len()
    });

    list.push("d").unwrap();
    assert_eq!(len.get(), 4);

    let removed = list.remove(0).unwrap();
    assert_eq!(removed, Some(Value::from("a")));
    assert_eq!(len.get(), 3);
    assert_eq!(list.get(0).unwrap().as_str(), Some("b"));
}

#[test]
fn removal_notifies_shifted_indices() {
    let list = wrap(&Value::list([1, 2, 3])).unwrap();
    let last = create_derived({
        let list = list.clone();
        move || list.get(2).ok().and_then(|t| t.as_number())
    });
    assert_eq!(last.get(), Some(3.0));

    list.remove(0).unwrap();
    assert_eq!(last.get(), None);
}

#[test]
fn unchanged_write_is_silent() {
    let state = wrap(&Value::map([("n", 1)])).unwrap();
    let runs = Rc::new(Cell::new(0));
    let _c = create_computation({
        let (state, runs) = (state.clone(), runs.clone());
        move || {
            state.get("n").unwrap();
            runs.set(runs.get() + 1);
        }
    });

    assert!(!state.set("n", 1).unwrap());
    assert!(state.set("n", 2).unwrap());
    assert_eq!(runs.get(), 2);
}

#[test]
fn key_kind_mismatch_is_an_error() {
    let list = wrap(&Value::list([1])).unwrap();
    assert!(matches!(list.get("x"), Err(Error::KeyKind { kind: "list", .. })));
    let map = wrap(&Value::map([("a", 1)])).unwrap();
    assert!(matches!(map.push(2), Err(Error::KeyKind { kind: "map", .. })));
}
