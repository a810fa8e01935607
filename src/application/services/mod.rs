//! Application services: use-case orchestration.
//!
//! Each service module implements one part of a session by composing domain
//! logic with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra` or `crate::output`.

pub mod credential;
pub mod instance;
pub mod session;
pub mod teardown;
pub mod tunnel;
pub mod wait;
