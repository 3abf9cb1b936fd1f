//! Search remediator daemon
//!
//! Wires the remediation controller to its configuration and exposes the
//! alarm inbox, admin endpoints and health/metrics over HTTP.

pub mod api;
pub mod config;
