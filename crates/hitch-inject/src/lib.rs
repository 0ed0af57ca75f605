//! Classpath injection: the `ClassPathSink` contract and the shared/isolated
//! implementations the orchestrator composes resolved artifacts into.

pub mod sink;

pub use sink::{ClassPathSink, IsolatedClassPathSink, SharedClassPathSink};
