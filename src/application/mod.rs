//! Command handlers sitting between the CLI surface and the purge core.

pub mod commands;
pub mod error;
