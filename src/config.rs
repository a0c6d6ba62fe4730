//! Configuration for Assuan servers
//!
//! Centralized configuration with sensible defaults. One `ServerConfig` is
//! shared by every connection a socket server spawns; per-connection state
//! lives in [`crate::server::Session`].

/// Configuration for an Assuan server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name, used for logging only
    pub name: String,

    // -------------------------------------------------------------------------
    // Option Negotiation
    // -------------------------------------------------------------------------
    /// Allow-list of option names accepted by the `OPTION` command
    pub valid_options: Vec<String>,

    /// Strict mode: an `OPTION` naming an unknown option is a fault.
    /// In lenient mode it is logged and silently skipped (not stored).
    pub strict_options: bool,

    // -------------------------------------------------------------------------
    // Session Behavior
    // -------------------------------------------------------------------------
    /// Single-request mode: `BYE` stops the engine after its response
    pub single_request: bool,

    /// Honor `QUIT` by stopping the engine (the reserved-command fault is
    /// still emitted afterwards)
    pub listen_to_quit: bool,

    // -------------------------------------------------------------------------
    // Socket Server
    // -------------------------------------------------------------------------
    /// Max concurrent connections; further connections are dropped at the
    /// transport level without any protocol exchange
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "assuan".to_string(),
            valid_options: Vec::new(),
            strict_options: true,
            single_request: false,
            listen_to_quit: false,
            max_connections: 10,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Whether `name` is on the option allow-list
    pub fn is_valid_option(&self, name: &str) -> bool {
        self.valid_options.iter().any(|o| o == name)
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the server name (used for logging)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Add one option name to the allow-list
    pub fn valid_option(mut self, name: impl Into<String>) -> Self {
        self.config.valid_options.push(name.into());
        self
    }

    /// Replace the option allow-list
    pub fn valid_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.valid_options = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set strict option handling (fault on unknown option names)
    pub fn strict_options(mut self, strict: bool) -> Self {
        self.config.strict_options = strict;
        self
    }

    /// Set single-request mode
    pub fn single_request(mut self, single: bool) -> Self {
        self.config.single_request = single;
        self
    }

    /// Honor the QUIT command
    pub fn listen_to_quit(mut self, listen: bool) -> Self {
        self.config.listen_to_quit = listen;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
