use hitch_util::errors::HitchError;

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
fn pom_error_display() {
    let err = HitchError::PomError {
        source_url: "https://repo/x.pom".to_string(),
        message: "missing groupId".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "invalid POM at https://repo/x.pom: missing groupId"
    );
}

#[test]
fn not_found_display() {
    let err = HitchError::NotFound {
        coordinate: "org.missing:lib:1.0".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "org.missing:lib:1.0 not found in any configured repository"
    );
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
fn io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let hitch_err: HitchError = io_err.into();
    assert!(matches!(hitch_err, HitchError::Io(_)));
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
