use crate::command::ExitCode;
use crate::env::Environment;
use crate::external::{die, exec_or_die, spawn, wait_for};
use crate::parser;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::unistd::{close, dup2, pipe};
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd};

const STDIN_FD: i32 = 0;
const STDOUT_FD: i32 = 1;

/// A chain of commands connected by pipes, each stage still unparsed.
///
/// Stage `i` reads from stage `i - 1` and writes to stage `i + 1`; every stage
/// is parsed (with variable substitution) inside its own child process.
pub struct Pipeline<'a> {
    stages: Vec<&'a str>,
}

impl<'a> Pipeline<'a> {
    pub fn parse(line: &'a str) -> Self {
        Self {
            stages: parser::parse_pipeline_stages(line),
        }
    }

    pub fn stages(&self) -> &[&'a str] {
        &self.stages
    }

    /// Run every stage and wait for all of them.
    ///
    /// Returns the exit code of the last stage that was started. If a pipe cannot
    /// be created nothing is spawned; if a fork fails, the stages already running
    /// are still reaped.
    pub fn run(&self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        if self.stages.is_empty() {
            return Ok(0);
        }

        let pipes = (1..self.stages.len())
            .map(|_| pipe())
            .collect::<Result<Vec<_>, _>>()
            .context("Error: pipe() fails")?;

        stdout.flush()?;

        let mut children = Vec::with_capacity(self.stages.len());
        let mut fork_error = None;
        for (i, stage) in self.stages.iter().enumerate() {
            let spawned = spawn(|| {
                if let Err(e) = connect_stage(i, &pipes) {
                    return die(&format!("Error: dup2() fails: {}", e.desc()));
                }
                let argv = parser::parse_command(stage, env);
                exec_or_die(&argv, env)
            });
            match spawned {
                Ok(pid) => {
                    tracing::debug!(%pid, stage = i, command = stage.trim(), "spawned pipeline stage");
                    children.push(pid);
                }
                Err(e) => {
                    tracing::warn!(stage = i, error = %e, "fork failed, abandoning remaining stages");
                    fork_error = Some(e);
                    break;
                }
            }
        }

        // Readers only see EOF once every write end outside their writer is gone.
        drop(pipes);

        let mut code = 0;
        for pid in children {
            code = wait_for(pid)?;
        }

        match fork_error {
            Some(e) => Err(e).context("Error: fork() fails"),
            None => Ok(code),
        }
    }
}

/// Wire the standard streams of stage `index`, then close every pipe descriptor.
///
/// Runs in the child between fork and exec.
fn connect_stage(index: usize, pipes: &[(OwnedFd, OwnedFd)]) -> Result<(), Errno> {
    if index > 0 {
        dup2(pipes[index - 1].0.as_raw_fd(), STDIN_FD)?;
    }
    if index < pipes.len() {
        dup2(pipes[index].1.as_raw_fd(), STDOUT_FD)?;
    }
    for (read, write) in pipes {
        let _ = close(read.as_raw_fd());
        let _ = close(write.as_raw_fd());
    }
    Ok(())
}
