//! Relocation rule declarations.

/// A package rewrite rule: `from` and `to` are slash-separated package
/// prefixes (`com/example`, not `com.example`). Applied to class internal
/// names, descriptors, manifest values, and service-file names/contents in
/// both slash and dot form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRule {
    pub from: String,
    pub to: String,
}

impl RelocationRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether applying this rule can possibly change anything.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    pub fn from_dot(&self) -> String {
        self.from.replace('/', ".")
    }

    pub fn to_dot(&self) -> String {
        self.to.replace('/', ".")
    }
}

/// True if every rule is a no-op, meaning relocation can be skipped entirely.
pub fn rules_are_noop(rules: &[RelocationRule]) -> bool {
    rules.is_empty() || rules.iter().all(RelocationRule::is_noop)
}
