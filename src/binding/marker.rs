// ============================================================================
// spark-reconcile - Marker Tokens
// Placeholder attribute values standing in for callbacks until rebind
// ============================================================================

use std::borrow::Borrow;
use std::cell::Cell;
use std::fmt;

use crate::config::with_config;

thread_local! {
    static NEXT_MARKER: Cell<u64> = const { Cell::new(0) };
}

/// A unique string embedded verbatim as an attribute value in rendered
/// output, later resolved to a callback by [`rebind`](crate::rebind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerToken(String);

impl MarkerToken {
    /// Mint a token that has never been handed out on this thread.
    pub fn next() -> Self {
        let n = NEXT_MARKER.with(|c| {
            let n = c.get();
            c.set(n + 1);
            n
        });
        with_config(|cfg| MarkerToken(format!("{}{n}", cfg.marker_prefix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an attribute value looks like a marker. It may still be
    /// unknown to a given registry.
    pub fn is_marker(value: &str) -> bool {
        with_config(|cfg| value.starts_with(cfg.marker_prefix.as_str()))
    }
}

impl fmt::Display for MarkerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MarkerToken> for String {
    fn from(token: MarkerToken) -> Self {
        token.0
    }
}

impl Borrow<str> for MarkerToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MarkerToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, EngineConfig};

    #[test]
    fn tokens_are_unique_and_prefixed() {
        let a = MarkerToken::next();
        let b = MarkerToken::next();
        assert_ne!(a, b);
        assert!(MarkerToken::is_marker(a.as_str()));
        assert!(!MarkerToken::is_marker("plain"));
    }

    #[test]
    fn prefix_follows_config() {
        let previous = configure(EngineConfig::default().with_marker_prefix("@m"));
        let token = MarkerToken::next();
        assert!(token.as_str().starts_with("@m"));
        configure(previous);
    }
}
