// ============================================================================
// spark-reconcile - Errors
// ============================================================================

use thiserror::Error;

/// Errors returned by the tree, binding and store APIs.
///
/// A panicking computation body is not represented here: it unwinds to
/// whichever write or initial run triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `reconcile`/`mount` was handed no target tree
    #[error("reconcile requires a target tree")]
    MissingTarget,

    /// An element-only operation was invoked on a text node
    #[error("`{op}` requires an element node, found a text node")]
    NotAnElement { op: &'static str },

    /// A text-only operation was invoked on an element node
    #[error("`{op}` requires a text node, found an element")]
    NotText { op: &'static str },

    /// Positional child access past the end
    #[error("child index {index} out of range for {len} children")]
    ChildIndex { index: usize, len: usize },

    /// `wrap` was called on a primitive value
    #[error("only compound values (maps and lists) can be wrapped")]
    NotCompound,

    /// A field key was used on a list, or an index on a map
    #[error("key `{key}` does not apply to a {kind}")]
    KeyKind { key: String, kind: &'static str },

    /// A list write more than one slot past the end
    #[error("list index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(
            Error::NotAnElement { op: "set_attribute" }.to_string(),
            "`set_attribute` requires an element node, found a text node"
        );
        assert_eq!(
            Error::ChildIndex { index: 3, len: 2 }.to_string(),
            "child index 3 out of range for 2 children"
        );
    }
}
