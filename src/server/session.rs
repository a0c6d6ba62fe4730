//! Per-connection session state
//!
//! Owned exclusively by one protocol engine instance; never shared across
//! connections. Reset on construction and whenever a `RESET` command is
//! handled, destroyed when the connection closes.

use std::collections::HashMap;

/// Mutable state of one connection
#[derive(Debug, Default)]
pub struct Session {
    /// Options negotiated via `OPTION`; a `None` value records an option
    /// that was set without a value
    options: HashMap<String, Option<String>>,

    /// Set by handlers to end the read loop after the current request
    stop: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear negotiated options and the stop flag
    pub fn reset(&mut self) {
        self.options.clear();
        self.stop = false;
    }

    /// Whether a handler asked the engine to stop
    pub fn stop_requested(&self) -> bool {
        self.stop
    }

    /// Ask the engine to stop after the current request completes
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    /// Store an option value (or the explicit absence marker)
    pub fn set_option(&mut self, name: impl Into<String>, value: Option<String>) {
        self.options.insert(name.into(), value);
    }

    /// Look up a stored option: `None` if never set, `Some(None)` if set
    /// without a value
    pub fn option(&self, name: &str) -> Option<&Option<String>> {
        self.options.get(name)
    }

    /// All stored options
    pub fn options(&self) -> &HashMap<String, Option<String>> {
        &self.options
    }
}
