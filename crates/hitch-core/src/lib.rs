//! Core data types for the hitch runtime dependency manager.
//!
//! Defines the coordinate/dependency model shared by the resolver, the
//! Maven client, and the relocation/injection crates, plus the facade's
//! configuration and log sink contract. Free of async code and network I/O.

pub mod config;
pub mod coordinate;
pub mod dependency;
pub mod log;
