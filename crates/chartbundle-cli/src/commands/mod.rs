//! CLI commands

pub mod add_timestamp;
pub mod bundle;
pub mod unbundle;
