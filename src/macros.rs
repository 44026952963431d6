// ============================================================================
// spark-reconcile - Ergonomic Macros
// ============================================================================

/// Clone the listed variables into a move closure.
///
/// ```rust
/// use spark_reconcile::{cloned, create_derived, signal};
///
/// let a = signal(1);
/// let b = signal(2);
/// let sum = create_derived(cloned!(a, b => move || a.get() + b.get()));
/// assert_eq!(sum.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a derived value, capturing clones of the listed handles.
///
/// ```rust
/// use spark_reconcile::{derived, signal};
///
/// let a = signal(1);
/// let b = signal(2);
/// let sum = derived!(a, b => a.get() + b.get());
/// a.set(10);
/// assert_eq!(sum.get(), 12);
/// ```
#[macro_export]
macro_rules! derived {
    ($($deps:ident),+ => $body:expr) => {
        $crate::create_derived($crate::cloned!($($deps),+ => move || $body))
    };
    ($body:expr) => {
        $crate::create_derived(move || $body)
    };
}

/// Create a computation, capturing clones of the listed handles.
///
/// ```rust
/// use spark_reconcile::{computation, signal};
///
/// let name = signal(String::from("ada"));
/// let _c = computation!(name => {
///     let _ = name.get();
/// });
/// ```
#[macro_export]
macro_rules! computation {
    ($($deps:ident),+ => $body:expr) => {
        $crate::create_computation($crate::cloned!($($deps),+ => move || { $body; }))
    };
    ($body:expr) => {
        $crate::create_computation(move || { $body; })
    };
}
