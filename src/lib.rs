//! Avatar Fleet Operations Service
//!
//! A typed API gateway for a fleet of automated social-media avatar
//! profiles, fronting three external services: the avatars/proxy
//! inventory, the per-avatar operator, and the mission orchestrator.

pub mod types;
pub mod config;
pub mod settings;
pub mod clients;
pub mod api;
pub mod aggregate;
pub mod web1;
pub mod polling;
pub mod server;
