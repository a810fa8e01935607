//! Domain layer: pure types, naming, selection rules and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod names;
pub mod provider;
pub mod session;
pub mod ssh;

pub use config::{ReadinessPolicy, TunnelConfig, validate_config};
pub use error::{ProviderError, SessionError};
pub use provider::{
    CredentialRequest, InstanceRequest, InstanceStatus, RemoteCredential, RemoteInstance,
};
pub use session::{EndReason, InstanceHandle, KeyMaterial, SessionPlan, SessionState};
