//! External command collaborators.
//!
//! The builder never spawns processes directly. Fix-up commands go through a
//! [`ShellRunner`] and archive creation through a [`Packager`], so tests can
//! substitute fakes and the CLI can point at a different packaging program.

use std::path::Path;
use std::process::{Command, Output};

use thiserror::Error;

/// Number of stderr lines kept in a [`CommandError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

/// Errors raised by external commands.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully.
    #[error("`{command}` exited with {}{}", exit_label(.code.as_ref()), stderr_suffix(.stderr))]
    Failed {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trailing lines of the process's stderr.
        stderr: String,
    },
}

fn exit_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs platform fix-up commands through a shell.
pub trait ShellRunner: Send + Sync {
    /// Run `command` with `cwd` as the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be started or the command exits
    /// non-zero.
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError>;
}

/// Turns an unpacked directory into a distributable archive.
pub trait Packager: Send + Sync {
    /// Pack `source_dir`, writing the archive into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the packaging program cannot be started or fails.
    fn pack(&self, source_dir: &Path, output_dir: &Path) -> Result<CommandOutput, CommandError>;
}

/// Runs commands with the host shell (`sh -c`, or `cmd /C` on Windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError> {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("/bin/sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.current_dir(cwd);

        tracing::debug!(%command, cwd = %cwd.display(), "running shell command");
        run_captured(&mut cmd, command)
    }
}

/// Packs directories with `pio pkg pack`.
#[derive(Debug, Clone)]
pub struct PioPackager {
    program: String,
}

impl PioPackager {
    /// Use `program` (normally `pio`) as the `PlatformIO` executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The configured executable.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for PioPackager {
    fn default() -> Self {
        Self::new("pio")
    }
}

impl Packager for PioPackager {
    fn pack(&self, source_dir: &Path, output_dir: &Path) -> Result<CommandOutput, CommandError> {
        let shown = format!("{} pkg pack \"{}\"", self.program, source_dir.display());

        let mut cmd = Command::new(&self.program);
        cmd.arg("pkg")
            .arg("pack")
            .arg(source_dir)
            .current_dir(output_dir);

        tracing::debug!(command = %shown, cwd = %output_dir.display(), "packing");
        run_captured(&mut cmd, &shown)
    }
}

/// Run `cmd` to completion, capturing its output and mapping failure.
fn run_captured(cmd: &mut Command, shown: &str) -> Result<CommandOutput, CommandError> {
    let Output {
        status,
        stdout,
        stderr,
    } = cmd.output().map_err(|source| CommandError::Spawn {
        command: shown.to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        return Err(CommandError::Failed {
            command: shown.to_string(),
            code: status.code(),
            stderr: last_lines(&stderr, STDERR_TAIL_LINES),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Keep only the last `n` lines of `text`.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
