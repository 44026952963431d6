// ============================================================================
// spark-reconcile - Equality Functions
// Comparisons that decide whether a write counts as a change
// ============================================================================

use std::rc::Rc;

/// Plain `PartialEq`. The default for [`signal`](crate::signal) and
/// [`create_derived`](crate::create_derived).
///
/// ```
/// use spark_reconcile::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&"a", &"b"));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Not-equal for f64 where NaN is equal to NaN, so writing NaN over NaN is
/// not a change.
pub fn safe_not_equal_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return !b.is_nan();
    }
    a != b
}

/// Equality for f64 where NaN is equal to NaN.
///
/// ```
/// use spark_reconcile::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(!safe_equals_f64(&f64::NAN, &1.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    !safe_not_equal_f64(a, b)
}

/// Identity of shared data: two handles are equal only if they point at the
/// same allocation.
pub fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Every write counts as a change.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// No write counts as a change.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}
