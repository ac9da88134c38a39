/// Environment variable holding the log filter (`EnvFilter` syntax).
pub const LOG_ENV: &str = "WSH_LOG";

/// Runtime settings for a shell session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Printed before each line in interactive mode.
    pub prompt: String,
    /// Initial capacity of the command history.
    pub history_capacity: usize,
    /// Upper bound on the number of shell-local variables.
    pub max_local_vars: usize,
    /// Filter directive for the tracing subscriber, e.g. `wsh=debug`.
    pub log_filter: String,
}

impl Config {
    /// Default settings with the log filter taken from `WSH_LOG` when present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "wsh> ".to_string(),
            history_capacity: 5,
            max_local_vars: 1024,
            log_filter: "warn".to_string(),
        }
    }
}
