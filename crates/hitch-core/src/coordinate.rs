use std::fmt;

/// The identity of an artifact: `groupId:artifactId:version[:classifier][@type]`.
///
/// `version` is optional at parse time — a dependency declared without one is
/// resolved later from dependency management or repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub type_: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            classifier: None,
            type_: default_type(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = type_.into();
        self
    }

    /// `groupId:artifactId` without version or classifier, used as the key
    /// for conflict resolution and dependency-management lookups.
    pub fn module_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Parse `groupId:artifactId[:version][:classifier][@type]`.
    ///
    /// A version is required for two or more colon-separated segments beyond
    /// `groupId:artifactId`; the `@type` suffix is always optional and
    /// defaults to `jar`.
    pub fn parse(s: &str) -> Option<Self> {
        let (body, type_) = match s.split_once('@') {
            Some((body, t)) => (body, t.to_string()),
            None => (s, default_type()),
        };
        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            [group_id, artifact_id] => Some(Self {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: None,
                classifier: None,
                type_,
            }),
            [group_id, artifact_id, version] => Some(Self {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: Some(version.to_string()),
                classifier: None,
                type_,
            }),
            [group_id, artifact_id, version, classifier] => Some(Self {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: Some(version.to_string()),
                classifier: Some(classifier.to_string()),
                type_,
            }),
            _ => None,
        }
    }
}

fn default_type() -> String {
    "jar".to_string()
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        if self.type_ != "jar" {
            write!(f, "@{}", self.type_)?;
        }
        Ok(())
    }
}
