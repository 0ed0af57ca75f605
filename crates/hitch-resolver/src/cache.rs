//! Process-local resolution cache.
//!
//! Deduplicates POM and metadata lookups, and tracks the bookkeeping a single
//! `resolve` call needs: resolved versions and depths per `group:artifact`,
//! already-processed coordinates, and the dependency-management map
//! accumulated from BOM imports encountered along the way. Cleared at the
//! start of every top-level resolve; never persisted to disk.

use std::collections::{HashMap, HashSet};

use hitch_maven::metadata::MavenMetadata;
use hitch_maven::pom::Pom;

#[derive(Debug, Default)]
pub struct ResolutionCache {
    poms: HashMap<String, Pom>,
    metadata: HashMap<String, MavenMetadata>,
    resolved_versions: HashMap<String, String>,
    processed: HashSet<String>,
    depth: HashMap<String, usize>,
    management: HashMap<String, String>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a parsed POM by `group:artifact:version`.
    pub fn pom(&self, coordinate_key: &str) -> Option<&Pom> {
        self.poms.get(coordinate_key)
    }

    pub fn insert_pom(&mut self, coordinate_key: String, pom: Pom) {
        self.poms.insert(coordinate_key, pom);
    }

    /// Look up cached metadata by `group:artifact`.
    pub fn metadata(&self, module_key: &str) -> Option<&MavenMetadata> {
        self.metadata.get(module_key)
    }

    pub fn insert_metadata(&mut self, module_key: String, metadata: MavenMetadata) {
        self.metadata.insert(module_key, metadata);
    }

    /// Version already resolved for `group:artifact` earlier in this resolve.
    pub fn resolved_version(&self, module_key: &str) -> Option<&str> {
        self.resolved_versions.get(module_key).map(String::as_str)
    }

    pub fn record_resolved_version(&mut self, module_key: String, version: String) {
        self.resolved_versions.insert(module_key, version);
    }

    pub fn is_processed(&self, coordinate_key: &str) -> bool {
        self.processed.contains(coordinate_key)
    }

    pub fn mark_processed(&mut self, coordinate_key: String) {
        self.processed.insert(coordinate_key);
    }

    pub fn depth_of(&self, module_key: &str) -> Option<usize> {
        self.depth.get(module_key).copied()
    }

    pub fn record_depth(&mut self, module_key: String, depth: usize) {
        self.depth.insert(module_key, depth);
    }

    /// Pinned version from the accumulated global dependency-management map
    /// (BOM imports merged in during this resolve).
    pub fn managed_version(&self, module_key: &str) -> Option<&str> {
        self.management.get(module_key).map(String::as_str)
    }

    /// Merge pinned versions in; existing entries win so earlier BOM imports
    /// take precedence over later ones, matching Maven's import ordering.
    pub fn merge_management(&mut self, entries: impl IntoIterator<Item = (String, String)>) {
        for (key, version) in entries {
            self.management.entry(key).or_insert(version);
        }
    }
}
