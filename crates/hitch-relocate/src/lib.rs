//! Archive relocation: rewrites package prefixes inside JAR entries so a
//! bundled copy of a library can coexist with the host's own copy.

pub mod classfile;
pub mod engine;
pub mod rule;
pub mod text;

pub use engine::{relocate, relocate_bytes};
pub use rule::RelocationRule;
