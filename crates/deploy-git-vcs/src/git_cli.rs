//! [`Vcs`] implementation that shells out to the system `git` binary.
//!
//! stdout and stderr are read line by line while the child runs, so a slow
//! clone or push shows up in the log as it happens rather than after exit.
//! Both streams are also collected into the returned [`ProcessOutput`].

use std::ffi::OsString;
use std::io::{self, BufRead as _, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, instrument};

use crate::error::VcsError;
use crate::runner::{ProcessOutput, Vcs};

/// Runs `git` (or a substitute program) as a child process.
#[derive(Clone, Debug)]
pub struct GitCli {
    program: OsString,
    env: Vec<(OsString, OsString)>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// A runner for the `git` found on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// A runner for an explicit executable.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            env: Vec::new(),
        }
    }

    /// Set an extra environment variable on every invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Vcs for GitCli {
    #[instrument(skip(self, cwd), fields(cwd = %cwd.display()))]
    fn run(&self, args: &[&str], cwd: &Path) -> Result<ProcessOutput, VcsError> {
        let program = self.program_name();
        let label = match args.first() {
            Some(sub) => format!("{program} {sub}"),
            None => program.clone(),
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        debug!(command = %format!("{program} {}", args.join(" ")), "spawning");

        let mut child = cmd.spawn().map_err(|source| VcsError::Spawn {
            program: program.clone(),
            cwd: cwd.to_path_buf(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr) = std::thread::scope(|s| {
            let err_reader = s.spawn(|| pump(stderr, &label));
            let out = pump(stdout, &label);
            (out, joined(err_reader.join()))
        });

        let wait_err = |source| VcsError::Wait {
            program: program.clone(),
            source,
        };
        let stdout = stdout.map_err(wait_err)?;
        let stderr = stderr.map_err(wait_err)?;
        let status = child.wait().map_err(wait_err)?;

        debug!(exit_code = ?status.code(), "{label} exited");

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Flatten a reader thread's result. A panicked reader becomes an I/O error
/// so the caller never mistakes it for an empty stream.
fn joined(result: std::thread::Result<io::Result<String>>) -> io::Result<String> {
    result.unwrap_or_else(|_| Err(io::Error::other("output reader thread panicked")))
}

/// Drain one child stream, logging each non-empty line and returning all of it.
fn pump<R: Read>(stream: Option<R>, label: &str) -> io::Result<String> {
    let Some(stream) = stream else {
        return Ok(String::new());
    };
    let mut reader = BufReader::new(stream);
    let mut collected = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            debug!("{label}: {trimmed}");
        }
        collected.push_str(&line);
    }
    Ok(collected)
}
