use crate::builtin;
use crate::command::{CommandFactory, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::parser;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal shell that runs built-ins in-process and everything else as
/// child processes, including multi-stage pipelines.
///
/// The interpreter owns the session [`Environment`] (exported and local
/// variables, history) and a list of [`CommandFactory`] objects that are
/// queried in order to create commands from parsed argument vectors.
///
/// Example
/// ```no_run
/// use wsh::{Config, Interpreter};
/// let mut sh = Interpreter::new(Config::default());
/// let mut out = Vec::new();
/// sh.execute_line("local GREETING=hello\n", &mut out);
/// sh.execute_line("vars\n", &mut out);
/// assert_eq!(out, b"GREETING=hello\n");
/// ```
pub struct Interpreter {
    config: Config,
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with the built-ins and the external command launcher.
    pub fn new(config: Config) -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        let commands: Vec<Box<dyn CommandFactory>> = vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Export>::default()),
            Box::new(Factory::<Local>::default()),
            Box::new(Factory::<Vars>::default()),
            Box::new(Factory::<History>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ];
        Self::with_env(config.clone(), Environment::new(&config), commands)
    }

    /// Create an interpreter over a prepared environment and custom factories.
    pub fn with_env(config: Config, env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            config,
            env,
            commands,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run one command line as typed by the user.
    ///
    /// Pipelines and external commands are recorded in the history after they
    /// finish; built-ins and blank lines are not. Errors are reported on `stdout`
    /// and never abort the session.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> ExitCode {
        match self.dispatch(line, stdout, true) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                let _ = writeln!(stdout, "{:#}", e);
                1
            }
        }
    }

    fn dispatch(&mut self, line: &str, stdout: &mut dyn Write, record: bool) -> Result<ExitCode> {
        if parser::is_pipeline(line) {
            tracing::debug!(line = line.trim_end(), "dispatching pipeline");
            let result = Pipeline::parse(line).run(stdout, &self.env);
            if record {
                self.env.history.record(line);
            }
            return result;
        }

        let argv = parser::parse_command(line, &self.env);
        let Some(name) = argv.first() else {
            return Ok(0);
        };

        if builtin::is_builtin(name) {
            tracing::debug!(?argv, "dispatching builtin");
            let code = self.run(&argv, stdout)?;
            // `history <n>` re-runs the entry as if freshly typed, without
            // recording it again.
            if let Some(replay) = self.env.take_replay() {
                return self.dispatch(&replay, stdout, false);
            }
            return Ok(code);
        }

        tracing::debug!(?argv, "dispatching external command");
        let result = self.run(&argv, stdout);
        if record {
            self.env.history.record(line);
        }
        result
    }

    /// Run a single parsed command through the first factory that accepts it.
    pub fn run(&mut self, argv: &[String], stdout: &mut dyn Write) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, argv) {
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", argv.first().map_or("", String::as_str)))
    }

    /// Interactive Read-Eval-Print Loop, until end of input or `exit`.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        while !self.should_exit() {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&with_newline(line), &mut stdout);
                    stdout.flush()?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err).context("failed to read input"),
            }
        }

        Ok(())
    }

    /// Run newline-separated commands from `reader` without prompting.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD; the line still runs.
    pub fn run_script(&mut self, mut reader: impl BufRead) -> Result<()> {
        let mut stdout = std::io::stdout();
        let mut buf = Vec::new();

        while !self.should_exit() {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).context("failed to read script")? == 0 {
                break;
            }
            let mut line = String::from_utf8_lossy(&buf).into_owned();
            if !line.ends_with('\n') {
                line.push('\n');
            }
            self.execute_line(&line, &mut stdout);
            stdout.flush()?;
        }

        Ok(())
    }

    /// Open a batch file and run it.
    pub fn run_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).context("Error: cannot open file")?;
        tracing::debug!(path = %path.display(), "running batch file");
        self.run_script(BufReader::new(file))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn with_newline(mut line: String) -> String {
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn shell() -> Interpreter {
        Interpreter::new(Config::default())
    }

    fn run_lines(sh: &mut Interpreter, lines: &[&str]) -> String {
        let mut out = Vec::new();
        for line in lines {
            sh.execute_line(line, &mut out);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_blank_line_is_noop() {
        let mut sh = shell();
        let mut out = Vec::new();
        assert_eq!(sh.execute_line("   \t\n", &mut out), 0);
        assert!(out.is_empty());
        assert!(sh.env().history.is_empty());
    }

    #[test]
    fn test_builtins_are_not_recorded() {
        let mut sh = shell();
        run_lines(&mut sh, &["local A=1\n", "vars\n", "history\n"]);
        assert!(sh.env().history.is_empty());
    }

    #[test]
    fn test_external_and_pipeline_are_recorded() {
        let mut sh = shell();
        run_lines(&mut sh, &["true\n", "true | true\n"]);

        let shown: Vec<_> = sh.env().history.show().map(|(_, l)| l.to_string()).collect();
        assert_eq!(shown, vec!["true\n", "true | true\n"]);
    }

    #[test]
    fn test_missing_program_is_still_recorded() {
        let mut sh = shell();
        let code = sh.execute_line("wsh_no_such_program_42\n", &mut std::io::sink());
        assert_eq!(code, 1);
        assert_eq!(sh.env().history.get(1).unwrap(), "wsh_no_such_program_42\n");
    }

    #[test]
    fn test_history_keeps_five_most_recent() {
        let mut sh = shell();
        for i in 1..=7 {
            sh.execute_line(&format!("true {}\n", i), &mut std::io::sink());
        }
        let out = run_lines(&mut sh, &["history\n"]);
        assert_eq!(out, "1) true 3\n2) true 4\n3) true 5\n4) true 6\n5) true 7\n");
    }

    #[test]
    fn test_history_replay_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        let mut sh = shell();
        sh.execute_line(&format!("touch {}\n", marker.display()), &mut std::io::sink());
        fs::remove_file(&marker).unwrap();

        let out = run_lines(&mut sh, &["history 1\n"]);
        assert_eq!(out, "");
        assert!(marker.exists());
        assert_eq!(sh.env().history.len(), 1);
    }

    #[test]
    fn test_history_replay_of_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out_file = dir.path().join("out");

        let mut sh = shell();
        let line = format!("echo again | dd of={} status=none\n", out_file.display());
        sh.execute_line(&line, &mut std::io::sink());
        fs::remove_file(&out_file).unwrap();

        sh.execute_line("history 1\n", &mut std::io::sink());
        assert_eq!(fs::read_to_string(&out_file).unwrap(), "again\n");
        assert_eq!(sh.env().history.len(), 1);
    }

    #[test]
    fn test_invalid_history_index_reported() {
        let mut sh = shell();
        assert_eq!(run_lines(&mut sh, &["history 4\n"]), "Invalid history index\n");
    }

    #[test]
    fn test_history_set_zero_disables_recording() {
        let mut sh = shell();
        run_lines(&mut sh, &["true\n", "history set 0\n", "true\n"]);
        assert!(sh.env().history.is_empty());

        run_lines(&mut sh, &["history set 2\n", "true a\n", "true b\n", "true c\n"]);
        assert_eq!(run_lines(&mut sh, &["history\n"]), "1) true b\n2) true c\n");
    }

    #[test]
    fn test_local_then_vars() {
        let mut sh = shell();
        assert_eq!(run_lines(&mut sh, &["local X=1\n", "vars\n"]), "X=1\n");
        assert_eq!(run_lines(&mut sh, &["local X=\n", "vars\n"]), "");
    }

    #[test]
    fn test_exported_variable_reaches_child() {
        let dir = tempfile::tempdir().unwrap();
        let out_file = dir.path().join("env");

        let mut sh = shell();
        sh.execute_line("export WSH_TEST_EXPORTED=visible\n", &mut std::io::sink());
        sh.execute_line("local WSH_TEST_LOCAL=hidden\n", &mut std::io::sink());
        let line = format!("env | dd of={} status=none\n", out_file.display());
        sh.execute_line(&line, &mut std::io::sink());

        let env_dump = fs::read_to_string(&out_file).unwrap();
        assert!(env_dump.contains("WSH_TEST_EXPORTED=visible"));
        assert!(!env_dump.contains("WSH_TEST_LOCAL"));
    }

    #[test]
    fn test_exit_stops_script() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("exit\ntouch {}\n", marker.display());

        let mut sh = shell();
        sh.run_script(script.as_bytes()).unwrap();

        assert!(sh.should_exit());
        assert!(!marker.exists());
    }

    #[test]
    fn test_script_without_trailing_newline() {
        let mut sh = shell();
        sh.run_script("true\ntrue last".as_bytes()).unwrap();
        assert_eq!(sh.env().history.get(1).unwrap(), "true last\n");
    }

    #[test]
    fn test_script_with_invalid_utf8_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let mut script = b"true caf\xe9\n".to_vec();
        script.extend_from_slice(format!("touch {}\n", marker.display()).as_bytes());

        let mut sh = shell();
        sh.run_script(script.as_slice()).unwrap();

        assert!(marker.exists());
        assert_eq!(sh.env().history.get(2).unwrap(), "true caf\u{fffd}\n");
    }

    #[test]
    fn test_run_file_missing() {
        let mut sh = shell();
        let err = sh.run_file(Path::new("/nonexistent/wsh/script")).unwrap_err();
        assert_eq!(err.to_string(), "Error: cannot open file");
    }
}
