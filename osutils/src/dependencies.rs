use std::{
    ffi::{OsStr, OsString},
    io,
    os::unix::{fs::PermissionsExt, process::ExitStatusExt},
    path::PathBuf,
    process::Output,
    thread,
    time::{Duration, Instant},
};

use log::trace;
use once_cell::sync::OnceCell;
use strum_macros::IntoStaticStr;

use poolprobe_api::constants::OPENSEACHEST_HOME_RELATIVE_PATH;

/// How often a running child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Timeout applied to every command that does not set its own.
static DEFAULT_TIMEOUT: OnceCell<Duration> = OnceCell::new();

/// Sets the process-wide command timeout. Only the first call has an effect;
/// returns whether this call set it.
pub fn set_default_timeout(timeout: Duration) -> bool {
    DEFAULT_TIMEOUT.set(timeout).is_ok()
}

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("Failed to find dependency '{dependency}': {source}")]
    NotFound {
        dependency: Dependency,
        #[source]
        source: which::Error,
    },

    #[error("Failed to execute dependency '{dependency}': {inner}")]
    CouldNotExecute {
        dependency: Dependency,
        #[source]
        inner: io::Error,
    },

    #[error("Dependency '{dependency}' did not finish within {timeout:?}\nCmdline: {rendered_command}")]
    TimedOut {
        dependency: Dependency,
        rendered_command: String,
        timeout: Duration,
    },

    #[error("Dependency '{dependency}' finished unsuccessfully: {explanation}\nCmdline: {rendered_command}\n{output}")]
    ExecutionFailed {
        dependency: Dependency,
        rendered_command: String,
        code: Option<i32>,
        signal: Option<i32>,
        stdout: String,
        stderr: String,
        explanation: String,
        output: String,
    },
}

/// External tools queried while building an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Dependency {
    Blkid,
    Lsblk,
    #[strum(serialize = "openSeaChest_SMART")]
    OpenSeaChestSmart,
    Smartctl,
    Zpool,
    // Test dependencies
    #[cfg(test)]
    DoesNotExist,
    #[cfg(test)]
    Echo,
    #[cfg(test)]
    False,
    #[cfg(test)]
    Sleep,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// Keeps `path` only when it is an executable file, so that a stray
/// non-executable copy does not hide the one on $PATH.
fn executable(path: PathBuf) -> Option<PathBuf> {
    let metadata = path.metadata().ok()?;
    (metadata.is_file() && metadata.permissions().mode() & 0o111 != 0).then_some(path)
}

impl Dependency {
    /// Gets the path for a dependency that usually lives outside of $PATH.
    fn path_override(&self) -> Option<PathBuf> {
        match self {
            Self::OpenSeaChestSmart => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(OPENSEACHEST_HOME_RELATIVE_PATH))
                .and_then(executable),
            _ => None,
        }
    }

    /// Gets the name of the dependency
    ///
    /// For example, Dependency::Smartctl => "smartctl"
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Gets the path of the dependency
    pub fn path(&self) -> Result<PathBuf, Box<DependencyError>> {
        which::which(match self.path_override() {
            Some(path) => path,
            None => self.name().into(),
        })
        .map_err(|source| {
            Box::new(DependencyError::NotFound {
                dependency: *self,
                source,
            })
        })
    }

    /// Creates a new Command for this dependency.
    pub fn cmd(&self) -> Command {
        Command {
            dependency: *self,
            program: None,
            args: vec![],
            timeout: None,
        }
    }

    /// Creates a new Command for this dependency installed at an explicit
    /// location.
    pub fn cmd_at(&self, program: impl Into<PathBuf>) -> Command {
        Command {
            program: Some(program.into()),
            ..self.cmd()
        }
    }
}

pub struct Command {
    dependency: Dependency,
    program: Option<PathBuf>,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl Command {
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn with_arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.arg(arg);
        self
    }

    /// Overrides the process-wide timeout for this command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn output_and_check(&self) -> Result<String, Box<DependencyError>> {
        self.output()?.check_output()
    }

    fn render_command(&self) -> String {
        if self.args.is_empty() {
            self.dependency.to_string()
        } else {
            format!(
                "{} {}",
                self.dependency,
                self.args
                    .iter()
                    .map(|arg| arg.to_string_lossy())
                    .map(|arg| if arg.contains(' ') {
                        format!("'{arg}'")
                    } else {
                        arg.into()
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }

    fn effective_timeout(&self) -> Option<Duration> {
        self.timeout
            .or_else(|| DEFAULT_TIMEOUT.get().copied())
            .filter(|timeout| !timeout.is_zero())
    }

    pub fn output(&self) -> Result<CommandOutput, Box<DependencyError>> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => self.dependency.path()?,
        };
        let rendered_command = self.render_command();
        trace!("Executing '{rendered_command}'");

        let expression = duct::cmd(program, &self.args)
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        let could_not_execute = |inner| {
            Box::new(DependencyError::CouldNotExecute {
                dependency: self.dependency,
                inner,
            })
        };

        let output = match self.effective_timeout() {
            None => expression.run().map_err(could_not_execute)?,
            Some(timeout) => {
                let handle = expression.start().map_err(could_not_execute)?;
                let deadline = Instant::now() + timeout;
                while handle.try_wait().map_err(could_not_execute)?.is_none() {
                    if Instant::now() >= deadline {
                        // The child may have exited in between; nothing to do then.
                        let _ = handle.kill();
                        return Err(Box::new(DependencyError::TimedOut {
                            dependency: self.dependency,
                            rendered_command,
                            timeout,
                        }));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                handle.into_output().map_err(could_not_execute)?
            }
        };

        let output = CommandOutput {
            rendered_command: rendered_command.clone(),
            dependency: self.dependency,
            inner: output,
        };
        trace!(
            "Executed '{rendered_command}': {}. Report:\n{}",
            output.explain_exit(),
            output.output_report(),
        );
        Ok(output)
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    rendered_command: String,
    dependency: Dependency,
    inner: Output,
}

impl CommandOutput {
    /// Checks if the process exited successfully
    pub fn success(&self) -> bool {
        self.inner.status.success()
    }

    /// Gets the exit code of the process, if it exited normally
    pub fn code(&self) -> Option<i32> {
        self.inner.status.code()
    }

    fn signal(&self) -> Option<i32> {
        self.inner.status.signal()
    }

    pub fn error_output(&self) -> String {
        String::from_utf8_lossy(&self.inner.stderr).into()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.inner.stdout).into()
    }

    /// Gets all available output, useful for reporting or debugging
    pub fn output_report(&self) -> String {
        let stdout = self.output();
        let stderr = self.error_output();

        let mut res = String::with_capacity(stdout.len() + stderr.len() + 20);

        if !stdout.is_empty() {
            res += &format!("stdout:\n{stdout}\n");
        }

        if !stderr.is_empty() {
            if !res.is_empty() {
                res += "\n";
            }
            res += &format!("stderr:\n{stderr}\n");
        }

        res
    }

    /// Checks if the process exited successfully, otherwise produces an error
    pub fn check(&self) -> Result<(), Box<DependencyError>> {
        if self.success() {
            return Ok(());
        }

        Err(Box::new(DependencyError::ExecutionFailed {
            dependency: self.dependency,
            rendered_command: self.rendered_command.clone(),
            code: self.code(),
            signal: self.signal(),
            stdout: self.output(),
            stderr: self.error_output(),
            explanation: self.explain_exit(),
            output: match self.output_report() {
                s if !s.is_empty() => s,
                _ => "(no output collected)".into(),
            },
        }))
    }

    /// Checks if the process exited successfully and returns stdout
    pub fn check_output(&self) -> Result<String, Box<DependencyError>> {
        self.check()?;
        Ok(self.output())
    }

    fn explain_exit(&self) -> String {
        if let Some(code) = self.code() {
            format!("exited with status: {code}")
        } else if let Some(signal) = self.signal() {
            format!("terminated by signal: {signal}")
        } else {
            "exited with unknown status".into()
        }
    }
}
