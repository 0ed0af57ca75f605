use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all hitch operations.
///
/// Variants correspond to the error kinds the dependency engine surfaces to
/// its caller: a coordinate's version could not be resolved, a POM or
/// metadata document was malformed, a repository was unreachable, an
/// artifact was absent everywhere it was looked for, a checksum did not
/// match, the host classloader refused an addition, or a coordinate /
/// relocation rule was malformed to begin with.
#[derive(Debug, Error, Diagnostic)]
pub enum HitchError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No version selector could be resolved for a dependency.
    #[error("unresolved version for {coordinate}")]
    #[diagnostic(help(
        "the dependency has no explicit version and no dependency-management entry, \
         accumulated BOM import, or maven-metadata.xml could supply one"
    ))]
    UnresolvedVersion { coordinate: String },

    /// A POM document was malformed or semantically invalid.
    #[error("invalid POM at {source_url}: {message}")]
    PomError { source_url: String, message: String },

    /// A maven-metadata.xml document was malformed or semantically invalid.
    #[error("invalid metadata at {source_url}: {message}")]
    MetadataError { source_url: String, message: String },

    /// A network or filesystem repository fetch failed after retries.
    #[error("transport error fetching {url}: {message}")]
    TransportError { url: String, message: String },

    /// An artifact was absent in every configured repository.
    #[error("{coordinate} not found in any configured repository")]
    NotFound { coordinate: String },

    /// A downloaded artifact's checksum did not match its sidecar file.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumError {
        url: String,
        expected: String,
        actual: String,
    },

    /// The host classloader refused to accept an artifact.
    #[error("host classloader rejected {path}: {message}")]
    InjectionError { path: String, message: String },

    /// A coordinate or relocation rule was malformed.
    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    /// Resolution failed for a required dependency; carries the failing
    /// coordinate and the chain of ancestors that pulled it in, so the
    /// caller can see why it was reachable at all.
    #[error("failed to resolve {coordinate} (via {})", ancestors.join(" -> "))]
    ResolutionFailed {
        coordinate: String,
        ancestors: Vec<String>,
        #[source]
        cause: Box<HitchError>,
    },
}

/// Convenience alias for `miette::Result<T>`.
pub type HitchResult<T> = miette::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = HitchError::from(io_err);
        assert!(err.to_string().contains("I/O error"), "got: {err}");
    }

    #[test]
    fn unresolved_version_display() {
        let err = HitchError::UnresolvedVersion {
            coordinate: "com.example:lib".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved version for com.example:lib");
    }

    #[test]
    fn checksum_error_display() {
        let err = HitchError::ChecksumError {
            url: "https://repo/x.jar".to_string(),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert!(err.to_string().contains("expected abc, got def"));
    }

    #[test]
    fn resolution_failed_chain() {
        let err = HitchError::ResolutionFailed {
            coordinate: "org.bad:lib".to_string(),
            ancestors: vec!["root".to_string(), "org.mid:lib".to_string()],
            cause: Box::new(HitchError::NotFound {
                coordinate: "org.bad:lib".to_string(),
            }),
        };
        assert!(err.to_string().contains("root -> org.mid:lib"));
    }
}
