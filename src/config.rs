// ============================================================================
// spark-reconcile - Engine Configuration
// Thread-local knobs for the flush loop, reconciler and binding pass
// ============================================================================

use std::cell::RefCell;

/// Settings read by the flush loop, the reconciler and `rebind`.
///
/// Lives in a thread-local next to the reactive context. Replace it with
/// [`configure`] before building any trees; changing it mid-render is allowed
/// but only affects passes that start afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Passes the flush loop may make before it assumes a dependency cycle
    pub max_flush_iterations: u32,

    /// Tags whose live value can drift from the declared attribute
    pub editable_tags: Vec<String>,

    /// Attribute mirrored onto the live value of editable elements
    pub value_attribute: String,

    /// Stripped from an attribute name to get the event name (`onclick` -> `click`)
    pub event_prefix: String,

    /// Prefix of generated marker tokens
    pub marker_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_flush_iterations: 1000,
            editable_tags: vec!["input".into(), "textarea".into(), "select".into()],
            value_attribute: "value".into(),
            event_prefix: "on".into(),
            marker_prefix: "__spark_marker_".into(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_flush_iterations(mut self, max: u32) -> Self {
        self.max_flush_iterations = max;
        self
    }

    pub fn with_editable_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editable_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value_attribute(mut self, name: impl Into<String>) -> Self {
        self.value_attribute = name.into();
        self
    }

    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    pub fn with_marker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.marker_prefix = prefix.into();
        self
    }

    /// True if `tag` gets the live-value special case
    pub fn is_editable(&self, tag: &str) -> bool {
        self.editable_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Event name for an attribute carrying a marker token
    pub fn event_name<'a>(&self, attribute: &'a str) -> &'a str {
        match attribute.strip_prefix(self.event_prefix.as_str()) {
            Some(rest) if !rest.is_empty() => rest,
            _ => attribute,
        }
    }
}

thread_local! {
    static CONFIG: RefCell<EngineConfig> = RefCell::new(EngineConfig::default());
}

/// Replace the configuration for this thread, returning the previous one.
pub fn configure(config: EngineConfig) -> EngineConfig {
    CONFIG.with(|c| c.replace(config))
}

/// Snapshot of the current configuration.
pub fn config() -> EngineConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Read the configuration without cloning it.
pub fn with_config<R>(f: impl FnOnce(&EngineConfig) -> R) -> R {
    CONFIG.with(|c| f(&c.borrow()))
}
