//! Edge and proxy cache purge dispatch.
//!
//! The [`purge`] module holds the dispatch core; [`application`] wires it to
//! the command-line surface defined in [`config`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod purge;
