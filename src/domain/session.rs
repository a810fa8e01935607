//! Session data model: owned resources and the lifecycle state machine.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.

use std::fmt;
use std::path::PathBuf;

/// Transient keypair owned by the session.
///
/// The private key never leaves the local machine; only the public half is
/// uploaded. `remote_id` is set once the provider has confirmed the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub name: String,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    pub remote_id: Option<String>,
    /// `SHA256:…` fingerprint of the public key, for display.
    pub fingerprint: String,
}

impl KeyMaterial {
    /// Paths for a keypair called `name` stored in `dir`.
    #[must_use]
    pub fn at(dir: &std::path::Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            public_key_path: dir.join(format!("{name}.pub")),
            private_key_path: dir.join(format!("{name}.pem")),
            remote_id: None,
            fingerprint: String::new(),
        }
    }
}

/// A droplet that reported itself active with a reachable address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    pub name: String,
    pub remote_id: String,
    pub address: String,
}

/// Lifecycle states, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Init,
    KeyGenerated,
    KeyUploaded,
    InstanceCreating,
    InstanceReady,
    TunnelActive,
    TearingDown,
    Done,
}

impl SessionState {
    /// The state that follows `self`, or `None` from `Done`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        use SessionState::{
            Done, Init, InstanceCreating, InstanceReady, KeyGenerated, KeyUploaded, TearingDown,
            TunnelActive,
        };
        match self {
            Init => Some(KeyGenerated),
            KeyGenerated => Some(KeyUploaded),
            KeyUploaded => Some(InstanceCreating),
            InstanceCreating => Some(InstanceReady),
            InstanceReady => Some(TunnelActive),
            TunnelActive => Some(TearingDown),
            TearingDown => Some(Done),
            Done => None,
        }
    }

    /// Whether `to` is a legal transition from `self`.
    ///
    /// Forward progress is one step at a time; any state before teardown may
    /// jump straight to `TearingDown` on failure or interrupt.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to) || (to == Self::TearingDown && self < Self::TearingDown)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::KeyGenerated => "key generated",
            Self::KeyUploaded => "key uploaded",
            Self::InstanceCreating => "droplet creating",
            Self::InstanceReady => "droplet ready",
            Self::TunnelActive => "tunnel active",
            Self::TearingDown => "tearing down",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Everything decided before the first resource is acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub key_name: String,
    pub instance_name: String,
    pub local_port: u16,
    pub region: String,
    pub image: String,
    pub size: String,
    pub ssh_user: String,
}

/// How a session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The user ended the session (enter pressed or stdin closed).
    Completed,
    /// A termination signal arrived.
    Interrupted,
    /// An acquisition step failed.
    Failed,
}
