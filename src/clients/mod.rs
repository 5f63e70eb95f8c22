//! Upstream Service Clients
//!
//! One reqwest-backed client per external service. Each client owns its
//! base URL and credentials and implements the matching trait from
//! `crate::types`. Errors are never retried here; every failure is a
//! single error back to the caller.

pub mod avatars;
pub mod operator;
pub mod orchestrator;

pub use avatars::AvatarsHttpClient;
pub use operator::OperatorHttpClient;
pub use orchestrator::OrchestratorHttpClient;
