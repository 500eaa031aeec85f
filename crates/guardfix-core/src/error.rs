use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rule '{rule}' still rewrites its own output; refusing to write {path:?}")]
    NotIdempotent { path: PathBuf, rule: String },

    #[error("content read back from {path:?} does not match what was written")]
    Verify { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("'{0}' is not a valid Python package name")]
    InvalidPackage(String),

    #[error("could not start '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },

    #[error("'{interpreter}' exited with {status}: {stderr}")]
    Exit {
        interpreter: String,
        status: String,
        stderr: String,
    },

    #[error("'{interpreter}' printed no package location")]
    EmptyOutput { interpreter: String },

    #[error("'{interpreter}' did not finish within {timeout:?}")]
    Timeout {
        interpreter: String,
        timeout: Duration,
    },

    #[error("i/o error while talking to '{interpreter}': {source}")]
    Io {
        interpreter: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{name}' has an invalid pattern: {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{0}' needs either a replacement or a guard")]
    MissingRewriter(String),

    #[error("rule '{0}' sets both a replacement and a guard")]
    AmbiguousRewriter(String),

    #[error("rule '{0}' has an empty guard")]
    EmptyGuard(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("could not locate an installation of {package}")]
    NoTargetsLocated { package: String },

    #[error(transparent)]
    Rules(#[from] RuleError),
}
