use crate::config::Config;
use crate::history::History;
use crate::vars::LocalVars;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable state of a shell session, owned by the interpreter loop and lent
/// to every command it runs.
///
/// The environment contains:
/// - `vars`: exported variables, handed to every spawned program as its environment.
/// - `current_dir`: the working directory last set by `cd`.
/// - `locals`: shell-local variables, never exported.
/// - `history`: executed command lines.
/// - `should_exit`: set by `exit`; the loop stops once it sees it.
/// - `replay`: a history line queued by `history <n>` for re-dispatch.
///
/// Fields are public so that tests can build an environment piece by piece.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Exported variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Shell-local variables created with `local`.
    pub locals: LocalVars,
    /// Log of executed command lines.
    pub history: History,
    /// When set to true, indicates that the interpreter loop should exit.
    pub should_exit: bool,
    /// Line queued for re-execution by the `history <n>` built-in.
    pub replay: Option<String>,
}

impl Environment {
    /// Capture the current process environment and working directory.
    ///
    /// Variables whose name or value is not valid UTF-8 are left out.
    pub fn new(config: &Config) -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(key, val)| Some((key.into_string().ok()?, val.into_string().ok()?)))
            .collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            locals: LocalVars::new(config.max_local_vars),
            history: History::new(config.history_capacity),
            should_exit: false,
            replay: None,
        }
    }

    /// An environment with no exported variables, for isolated use.
    pub fn empty(config: &Config) -> Self {
        Self {
            vars: HashMap::new(),
            ..Self::new(config)
        }
    }

    /// Get the value of an exported variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an exported variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn remove_var(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// Resolve `$name`: exported variables take precedence over locals.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.get_var(name).or_else(|| self.locals.get(name))
    }

    pub fn take_replay(&mut self) -> Option<String> {
        self.replay.take()
    }
}
