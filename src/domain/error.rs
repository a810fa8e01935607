//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`. All error types implement
//! `thiserror::Error` and convert to `anyhow::Error` via the `?` operator, so
//! callers further up can recover the kind with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

// ── Session errors ────────────────────────────────────────────────────────────

/// Errors that abort a tunnel session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A local file operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key generation or key encoding failed.
    #[error("key generation failed: {0}")]
    Crypto(String),

    /// A remote provider call failed or returned an unexpected shape.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The local forwarding process could not be started.
    #[error("failed to launch tunnel: {0}")]
    TunnelLaunch(String),

    /// A readiness wait exceeded its bound.
    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    /// The provider token is not set.
    #[error("DO_API_TOKEN is not set. Export a DigitalOcean API token and try again.")]
    MissingToken,

    /// The configuration file holds a value that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a timeout error from a human label and the bound that was exceeded.
    #[must_use]
    pub fn timeout(what: impl Into<String>, bound: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            secs: bound.as_secs(),
        }
    }
}

// ── Provider errors ───────────────────────────────────────────────────────────

/// Errors raised by the remote resource client.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request {operation} failed: {message}")]
    Request { operation: String, message: String },

    #[error("provider returned HTTP {status} for {operation}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("unexpected provider response for {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    #[error("{kind} '{name}' not found after creation")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' is listed with id {listed} but creation returned {acknowledged}")]
    IdMismatch {
        kind: &'static str,
        name: String,
        acknowledged: String,
        listed: String,
    },
}

impl ProviderError {
    /// Returns `true` if the provider reported that the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
