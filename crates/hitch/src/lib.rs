//! Runtime dependency manager for plugin hosts.
//!
//! Resolves Maven coordinates (with full transitive dependency resolution,
//! nearest-wins conflict handling, scope filtering, and BOM import merging),
//! downloads and checksum-verifies the resulting artifacts, optionally
//! relocates their package namespace to avoid colliding with the host's own
//! classes, and injects them onto a shared or isolated classpath.
//!
//! [`Manager`] is the single entry point; everything else re-exported here
//! is what a caller needs to build its arguments.

pub mod manager;

pub use hitch_core::config::Config;
pub use hitch_core::coordinate::Coordinate;
pub use hitch_core::dependency::{Dependency, Exclusion, Scope};
pub use hitch_core::log::{LogLevel, LogSink, TracingLogSink};
pub use hitch_inject::{ClassPathSink, IsolatedClassPathSink, SharedClassPathSink};
pub use hitch_maven::repository::MavenRepository;
pub use hitch_relocate::RelocationRule;
pub use manager::{LoadedArtifact, Manager};
