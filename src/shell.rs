//! External command execution
//!
//! Every tool cartwheel drives (carthage, swift, zip, lipo, xcodebuild)
//! goes through [`ShellRunner`], so tests can substitute a recorder.

use crate::error::{CartwheelError, CartwheelResult};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Max number of output lines to include in command error messages.
const ERROR_TAIL_LINES: usize = 50;

/// Level at which a command's output lines are logged while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Silent,
    Debug,
    Info,
}

/// A command to run: program, arguments, working directory, environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub output: OutputLevel,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            output: OutputLevel::Debug,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn output(mut self, level: OutputLevel) -> Self {
        self.output = level;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a successful command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// stdout and stderr lines, interleaved in arrival order
    pub lines: Vec<String>,
}

impl CommandOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Runs external commands, blocking the calling step until they exit
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Run the command; a non-zero exit is [`CartwheelError::CommandExit`]
    async fn run(&self, spec: &CommandSpec) -> CartwheelResult<CommandOutput>;
}

/// Runs commands as child processes of cartwheel
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

#[async_trait]
impl ShellRunner for SystemShell {
    async fn run(&self, spec: &CommandSpec) -> CartwheelResult<CommandOutput> {
        debug!("Executing: {}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An interrupted run drops this future; take the child down with it
            .kill_on_drop(true);
        if let Some(ref dir) = spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| CartwheelError::command_failed(spec.to_string(), e))?;

        let level = spec.output;
        let lines = stream_child_output(&mut child, &|line: &str| match level {
            OutputLevel::Silent => {}
            OutputLevel::Debug => debug!("  {}", line),
            OutputLevel::Info => info!("  {}", line),
        })
        .await;

        let status = child
            .wait()
            .await
            .map_err(|e| CartwheelError::command_failed(spec.to_string(), e))?;

        if status.success() {
            Ok(CommandOutput { lines })
        } else {
            Err(CartwheelError::CommandExit {
                command: spec.to_string(),
                code: status.code().unwrap_or(-1),
                output: output_tail(&lines),
            })
        }
    }
}

/// Stream stdout+stderr from a child process, calling `on_line` for each line.
///
/// Returns all collected lines for error reporting.
async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_line: &(dyn Fn(&str) + Send + Sync),
) -> Vec<String> {
    let mut all_output = Vec::new();
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return all_output;
    };

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_reader.next_line(), if !stdout_done => match line {
                Ok(Some(line)) => {
                    on_line(&line);
                    all_output.push(line);
                }
                _ => stdout_done = true,
            },
            line = stderr_reader.next_line(), if !stderr_done => match line {
                Ok(Some(line)) => {
                    on_line(&line);
                    all_output.push(line);
                }
                _ => stderr_done = true,
            },
        }
    }

    all_output
}

/// Last `ERROR_TAIL_LINES` lines of output, enough to act on a failure
fn output_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
