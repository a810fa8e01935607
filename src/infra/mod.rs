//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP calls to the provider,
//! key files, process execution, known_hosts cleanup, signals and stdin.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod digitalocean;
pub mod keys;
pub mod network;
pub mod session_end;
pub mod trust_store;
pub mod tunnel;
