//! External tool invocation.
//!
//! The geometry conversion (`ogr2ogr`) and store normalization (`sqlite3`) steps are
//! black boxes: paths in, exit status and captured output back. Everything goes
//! through [`CommandRunner`] so builds can be exercised without the tools installed.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::error::BuildError;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub stdin: Option<Vec<u8>>,
    pub current_dir: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Command line for log messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a successful run
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner {
    /// Run to completion. A non-zero exit is an error carrying the tool's message.
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, BuildError>;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutput, BuildError> {
        info!("Running {}", command.display());

        let launch_error = |source| BuildError::Launch {
            program: command.program.clone(),
            source,
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(launch_error)?;

        // Feed stdin from a separate thread so a chatty child cannot block on a full pipe
        let writer = match (child.stdin.take(), &command.stdin) {
            (Some(mut pipe), Some(input)) => {
                let input = input.clone();
                Some(std::thread::spawn(move || pipe.write_all(&input)))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(launch_error)?;

        if let Some(handle) = writer {
            if let Ok(Err(e)) = handle.join() {
                warn!("Failed writing input to {}: {}", command.program, e);
            }
        }

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !captured.stdout.trim().is_empty() {
            debug!("{} stdout: {}", command.program, captured.stdout.trim());
        }

        if !output.status.success() {
            let message = if captured.stderr.trim().is_empty() {
                captured.stdout.trim().to_string()
            } else {
                captured.stderr.trim().to_string()
            };
            return Err(BuildError::ExternalProcess {
                program: command.program.clone(),
                status: output.status.to_string(),
                message,
            });
        }

        if !captured.stderr.trim().is_empty() {
            warn!("{}: {}", command.program, captured.stderr.trim());
        }

        Ok(captured)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = ExternalCommand::new("sqlite3")
            .arg("-bail")
            .args(["a.sqlite"])
            .stdin("SELECT 1;")
            .current_dir("/tmp");
        assert_eq!(cmd.display(), "sqlite3 -bail a.sqlite");
        assert_eq!(cmd.stdin.as_deref(), Some(&b"SELECT 1;"[..]));
        assert_eq!(cmd.current_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let cmd = ExternalCommand::new("furlong-no-such-tool-here");
        let err = SystemRunner.run(&cmd).unwrap_err();
        assert!(matches!(err, BuildError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_and_output_captured() {
        let cmd = ExternalCommand::new("sh")
            .args(["-c", "cat"])
            .stdin("hello gazetteer");
        let output = SystemRunner.run(&cmd).unwrap();
        assert_eq!(output.stdout, "hello gazetteer");
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_surfaces_message() {
        let cmd = ExternalCommand::new("sh").args(["-c", "echo 'no such table' >&2; exit 3"]);
        match SystemRunner.run(&cmd).unwrap_err() {
            BuildError::ExternalProcess { program, message, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(message, "no such table");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
