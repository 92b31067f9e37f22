//! Process execution
//!
//! Commands are rendered to a single line and run through the configured shell
//! so that environment prefixes, quoting and pipes behave exactly as echoed.
//! The runner never changes the process working directory: it keeps its own
//! directory stack and passes the top entry to every spawned process.

use crate::command::ShellCommand;
use crate::error::{BootstrapError, Result};
use crate::output::echo;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use termcolor::Color;

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub succeeded: bool,
}

impl ExecutionResult {
    /// Result of a no-op command.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            succeeded: true,
        }
    }

    /// Stdout followed by stderr, trimmed.
    #[must_use]
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (_, true) => stdout.to_string(),
            _ => format!("{stdout}\n{stderr}"),
        }
    }

    fn into_result(self, command: &ShellCommand) -> Result<Self> {
        if self.succeeded {
            return Ok(self);
        }
        Err(BootstrapError::CommandFailed {
            command: command.render(),
            code: self.exit_code,
            output: self.combined(),
        })
    }
}

/// Runs shell commands inside a stack of working directories.
#[derive(Debug, Clone)]
pub struct Runner {
    shell: String,
    dirs: Vec<PathBuf>,
    echo: bool,
}

impl Runner {
    pub fn new(shell: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            dirs: vec![root.into()],
            echo: true,
        }
    }

    /// Disable the before/after echo.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Directory commands currently run in.
    #[must_use]
    pub fn current_dir(&self) -> &Path {
        self.dirs.last().map_or_else(|| Path::new("."), PathBuf::as_path)
    }

    /// Number of directories entered above the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.dirs.len().saturating_sub(1)
    }

    /// Run subsequent commands in `dir` until the returned scope is dropped.
    ///
    /// Relative paths resolve against the current directory. Scopes nest.
    pub fn enter(&mut self, dir: impl AsRef<Path>) -> DirScope<'_> {
        let next = self.current_dir().join(dir);
        self.dirs.push(next);
        DirScope { runner: self }
    }

    /// Run a command and return its result whatever the exit status.
    pub async fn execute(&self, command: &ShellCommand) -> Result<ExecutionResult> {
        if command.is_noop() {
            return Ok(ExecutionResult::empty());
        }

        let line = command.render();
        let dir = self.current_dir();

        if self.echo {
            let process_dir = std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|e| format!("<unavailable: {e}>"));
            echo(
                &format!(
                    "Executing Command: {line}\n\
                     Current Directory: {process_dir}\n\
                     Specified Executable Path: {}",
                    dir.display()
                ),
                Color::Yellow,
            );
        }

        let is_dir = tokio::fs::metadata(dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(BootstrapError::InvalidConfig(format!(
                "Working directory does not exist: {}",
                dir.display()
            )));
        }

        let output = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(&line)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    BootstrapError::MissingDependency(format!("shell '{}' not found", self.shell))
                }
                _ => BootstrapError::Io(e),
            })?;

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            succeeded: output.status.success(),
        };

        if self.echo {
            let color = if result.succeeded { Color::Green } else { Color::Red };
            echo(&result.combined(), color);
        }

        Ok(result)
    }

    /// Run a command; a non-zero exit or signal becomes `CommandFailed`.
    pub async fn run(&self, command: &ShellCommand) -> Result<ExecutionResult> {
        self.execute(command).await?.into_result(command)
    }

    /// Run commands in order, stopping at the first failure.
    pub async fn run_all(&self, commands: &[ShellCommand]) -> Result<Vec<ExecutionResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.run(command).await?);
        }
        Ok(results)
    }
}

/// A directory entered with [`Runner::enter`]; leaving it on drop restores
/// the previous directory on every exit path.
pub struct DirScope<'a> {
    runner: &'a mut Runner,
}

impl Deref for DirScope<'_> {
    type Target = Runner;

    fn deref(&self) -> &Runner {
        self.runner
    }
}

impl DerefMut for DirScope<'_> {
    fn deref_mut(&mut self) -> &mut Runner {
        self.runner
    }
}

impl Drop for DirScope<'_> {
    fn drop(&mut self) {
        self.runner.dirs.pop();
    }
}
