// File: src/error.rs
//
// Harness Error Taxonomy
//
// Every failure surfaced by the harness maps to one of these variants.
// Apart from the bounded retry inside the convergence waiter, none of them
// is recovered locally: they abort the running scenario after teardown.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// A node process could not be started at all.
    #[error("failed to launch process '{}': {}", path.display(), source)]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The control endpoint refused or dropped the connection.
    #[error("control endpoint {endpoint} unreachable: {reason}")]
    Connection { endpoint: String, reason: String },
    /// A privileged control operation was issued before a successful login.
    #[error("control operation '{0}' requires a successful login")]
    Auth(&'static str),
    /// A convergence deadline elapsed before the predicate held.
    #[error("timed out waiting for {what} after {elapsed:?}")]
    Timeout { what: String, elapsed: Duration },
    /// The node answered, but with something the harness cannot interpret.
    #[error("protocol error from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
