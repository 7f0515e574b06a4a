//! Server configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

const PORT_VAR: &str = "MAILSINK_PORT";
const SOCKET_TIMEOUT_VAR: &str = "MAILSINK_SOCKET_TIMEOUT_MS";
const MAX_THREADS_VAR: &str = "MAILSINK_MAX_THREADS";
const NUM_THREADS_VAR: &str = "MAILSINK_NUM_THREADS";

/// Sizing and timeout policy for a server instance.
///
/// Built from defaults, optionally overlaid by environment variables, then
/// handed to the server by value. Port 0 binds an ephemeral port.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    port: u16,
    socket_timeout: Duration,
    max_threads: usize,
    num_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 25,
            socket_timeout: Duration::from_millis(5000),
            max_threads: 10,
            num_threads: 1,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from defaults overlaid by environment variables.
    ///
    /// Recognized keys: `MAILSINK_PORT`, `MAILSINK_SOCKET_TIMEOUT_MS`,
    /// `MAILSINK_MAX_THREADS`, `MAILSINK_NUM_THREADS`. Unparseable values are
    /// logged and ignored.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            match key.as_str() {
                PORT_VAR => {
                    if let Some(port) = parse_var(&key, &value) {
                        config.port = port;
                    }
                }
                SOCKET_TIMEOUT_VAR => {
                    if let Some(millis) = parse_var::<u64>(&key, &value) {
                        config.socket_timeout = Duration::from_millis(millis);
                    }
                }
                MAX_THREADS_VAR => {
                    if let Some(max) = parse_var(&key, &value) {
                        config.max_threads = max;
                    }
                }
                NUM_THREADS_VAR => {
                    if let Some(num) = parse_var(&key, &value) {
                        config.num_threads = num;
                    }
                }
                _ => {}
            }
        }
        config
    }

    /// Set the listening port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the accept timeout applied to the listening socket
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Set the worker pool ceiling
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the requested worker count for threaded mode
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Change the requested worker count in place
    pub fn set_num_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Clamp a requested worker count to `1..=max_threads`
    pub fn clamp_threads(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_threads.max(1))
    }

    /// The worker count a threaded server will actually use
    pub fn effective_threads(&self) -> usize {
        self.clamp_threads(self.num_threads)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring unparseable {key}={value}");
            None
        }
    }
}
