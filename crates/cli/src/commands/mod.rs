//! Subcommand implementations

pub mod alarms;
pub mod alerts;
pub mod clusters;
pub mod cooldowns;
