use crate::error::ProbeError;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

static PACKAGE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap());

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Asks an interpreter where a package is installed.
pub trait InterpreterProbe {
    fn package_dir(&self, interpreter: &str, package: &str) -> Result<PathBuf, ProbeError>;
}

pub fn validate_package_name(package: &str) -> Result<(), ProbeError> {
    if PACKAGE_NAME_RE.is_match(package) {
        Ok(())
    } else {
        Err(ProbeError::InvalidPackage(package.to_string()))
    }
}

pub fn query_expression(package: &str) -> String {
    let top_level = package.split('.').next().unwrap_or(package);
    if top_level == package {
        format!(
            "import os, {p}; print(os.path.dirname({p}.__file__))",
            p = package
        )
    } else {
        format!(
            "import os, {t}, {p}; print(os.path.dirname({p}.__file__))",
            t = top_level,
            p = package
        )
    }
}

/// Runs `<interpreter> -c <expression>` with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    pub timeout: Duration,
}

impl ProcessProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn drain<R>(stream: Option<R>) -> Option<JoinHandle<std::io::Result<String>>>
    where
        R: Read + Send + 'static,
    {
        stream.map(|mut s| {
            thread::spawn(move || {
                let mut buf = String::new();
                s.read_to_string(&mut buf)?;
                Ok(buf)
            })
        })
    }

    fn join(handle: Option<JoinHandle<std::io::Result<String>>>) -> std::io::Result<String> {
        match handle {
            Some(h) => h.join().unwrap_or_else(|_| Ok(String::new())),
            None => Ok(String::new()),
        }
    }

    fn wait(&self, child: &mut Child, interpreter: &str) -> Result<ExitStatus, ProbeError> {
        let io_err = |source| ProbeError::Io {
            interpreter: interpreter.to_string(),
            source,
        };
        // No deadline when the timeout is too large to represent.
        let deadline = Instant::now().checked_add(self.timeout);

        loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                return Ok(status);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                // The child may exit between the check and the kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout {
                    interpreter: interpreter.to_string(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl InterpreterProbe for ProcessProbe {
    fn package_dir(&self, interpreter: &str, package: &str) -> Result<PathBuf, ProbeError> {
        validate_package_name(package)?;

        let mut command = Command::new(interpreter);
        command
            .arg("-c")
            .arg(query_expression(package))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        trace!("Executing {:?}", command);

        let mut child = command.spawn().map_err(|source| ProbeError::Spawn {
            interpreter: interpreter.to_string(),
            source,
        })?;

        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());
        let status = self.wait(&mut child, interpreter)?;

        let io_err = |source| ProbeError::Io {
            interpreter: interpreter.to_string(),
            source,
        };
        let stdout = Self::join(stdout).map_err(io_err)?;
        let stderr = Self::join(stderr).map_err(io_err)?;

        if !status.success() {
            return Err(ProbeError::Exit {
                interpreter: interpreter.to_string(),
                status: status.to_string(),
                stderr: stderr.trim().lines().last().unwrap_or_default().to_string(),
            });
        }

        let location = stdout.trim();
        if location.is_empty() {
            return Err(ProbeError::EmptyOutput {
                interpreter: interpreter.to_string(),
            });
        }

        debug!("'{}' reports {} at {}", interpreter, package, location);
        Ok(PathBuf::from(location))
    }
}
