// ============================================================================
// spark-reconcile - Signal Primitive
// The observable cell: a value that notifies its readers when it changes
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::context::with_context;
use crate::core::types::{AnySource, EqualsFn, SourceInner};
use crate::reactivity::tracking::{notify_write, track_read};

/// A writable observable cell holding a `T`.
///
/// Reading it inside a computation subscribes that computation; writing a
/// value the equality function calls different re-runs every subscriber
/// before `set` returns (unless a batch is open).
///
/// ```
/// use spark_reconcile::signal;
///
/// let count = signal(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Current value, tracked.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.as_any_source());
        self.inner.get()
    }

    /// Borrow the current value, tracked.
    ///
    /// ```
    /// use spark_reconcile::signal;
    ///
    /// let items = signal(vec![1, 2, 3]);
    /// assert_eq!(items.with(|v| v.iter().sum::<i32>()), 6);
    /// ```
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.as_any_source());
        self.inner.with(f)
    }

    /// Current value without subscribing the ambient computation.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Store `value`. Returns true and notifies if it differed from the old one.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            self.notify();
        }
        changed
    }

    /// Mutate in place. In-place changes cannot be compared, so subscribers
    /// are always notified.
    ///
    /// ```
    /// use spark_reconcile::signal;
    ///
    /// let count = signal(0);
    /// count.update(|n| *n += 1);
    /// assert_eq!(count.get(), 1);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        if self.inner.update(f) {
            self.notify();
        }
    }

    fn notify(&self) {
        with_context(|ctx| {
            let wv = ctx.increment_write_version();
            self.inner.set_write_version(wv);
        });
        notify_write(self.as_any_source());
    }

    /// Number of computations currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.inner.cleanup_dead_reactions();
        self.inner.reaction_count()
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|value| f.debug_struct("Signal").field("value", value).finish())
    }
}

/// Create an observable cell.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create an observable cell with a custom notion of "changed".
///
/// ```
/// use spark_reconcile::signal_with_equals;
///
/// let always = signal_with_equals(0, |_, _| false);
/// assert!(always.set(0));
/// ```
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}
