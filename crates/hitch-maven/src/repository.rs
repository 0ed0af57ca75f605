//! Maven repository abstraction: URL layout and authentication config.

/// Maven Central base URL, the default repository mirror.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Whether a repository is fetched over HTTP(S) or read straight off disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Remote,
    Local,
}

/// A configured Maven repository with optional credentials.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub kind: RepositoryKind,
}

impl MavenRepository {
    /// Construct a remote HTTP(S) repository handle, with optional credentials.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into().trim_end_matches('/').to_string(),
            username,
            password,
            kind: RepositoryKind::Remote,
        }
    }

    /// Construct a local filesystem repository rooted at `path` (a plain
    /// directory path or a `file://` URL). No network access is ever
    /// attempted for artifacts served from it.
    pub fn local(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: path.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
            kind: RepositoryKind::Local,
        }
    }

    /// Construct the default Maven Central repository.
    pub fn maven_central() -> Self {
        Self::new("maven-central", MAVEN_CENTRAL_URL, None, None)
    }

    /// Whether this repository reads from the local filesystem rather than
    /// over the network.
    pub fn is_local(&self) -> bool {
        self.kind == RepositoryKind::Local
    }

    /// Strip a `file://` scheme off this repository's constructed path,
    /// yielding a filesystem path suitable for `std::fs`. No-op for
    /// repositories already given as a plain directory path.
    pub fn local_fs_path(url: &str) -> &std::path::Path {
        std::path::Path::new(url.strip_prefix("file://").unwrap_or(url))
    }

    /// Standard Maven layout path for a given coordinate.
    ///
    /// `org.jetbrains.kotlinx:kotlinx-coroutines-core:1.8.0` becomes
    /// `org/jetbrains/kotlinx/kotlinx-coroutines-core/1.8.0`
    pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
        format!("{}/{}/{}", group.replace('.', "/"), artifact, version)
    }

    /// Full URL to a specific file within the Maven repository.
    pub fn file_url(&self, group: &str, artifact: &str, version: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url,
            Self::coordinate_path(group, artifact, version),
            filename
        )
    }

    /// URL to the POM file for a given coordinate.
    pub fn pom_url(&self, group: &str, artifact: &str, version: &str) -> String {
        self.pom_url_with_base(group, artifact, version, None)
    }

    /// URL to the POM file, substituting a pre-resolved SNAPSHOT timestamp
    /// base (see `metadata::resolve_snapshot_base`) for the literal
    /// `-SNAPSHOT` filename when one is given.
    pub fn pom_url_with_base(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        snapshot_base: Option<&str>,
    ) -> String {
        let filename = match snapshot_base {
            Some(base) => format!("{base}.pom"),
            None => format!("{artifact}-{version}.pom"),
        };
        self.file_url(group, artifact, version, &filename)
    }

    /// URL to the JAR file for a given coordinate.
    pub fn jar_url(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        classifier: Option<&str>,
    ) -> String {
        self.jar_url_with_base(group, artifact, version, classifier, None)
    }

    /// URL to the JAR file, substituting a pre-resolved SNAPSHOT timestamp
    /// base for the literal `-SNAPSHOT` filename when one is given.
    pub fn jar_url_with_base(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        classifier: Option<&str>,
        snapshot_base: Option<&str>,
    ) -> String {
        let filename = match (snapshot_base, classifier) {
            (Some(base), Some(c)) => format!("{base}-{c}.jar"),
            (Some(base), None) => format!("{base}.jar"),
            (None, Some(c)) => format!("{artifact}-{version}-{c}.jar"),
            (None, None) => format!("{artifact}-{version}.jar"),
        };
        self.file_url(group, artifact, version, &filename)
    }

    /// URL to the `maven-metadata.xml` at the artifact level (version listing).
    pub fn metadata_url(&self, group: &str, artifact: &str) -> String {
        format!(
            "{}/{}/{}/maven-metadata.xml",
            self.url,
            group.replace('.', "/"),
            artifact
        )
    }

    /// URL to the `maven-metadata.xml` at the version level (SNAPSHOT resolution).
    pub fn snapshot_metadata_url(&self, group: &str, artifact: &str, version: &str) -> String {
        format!(
            "{}/{}/maven-metadata.xml",
            self.url,
            Self::coordinate_path(group, artifact, version)
        )
    }

    /// Whether this repository has authentication configured.
    pub fn has_auth(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_path_replaces_dots() {
        let path = MavenRepository::coordinate_path(
            "org.jetbrains.kotlinx",
            "kotlinx-coroutines-core",
            "1.8.0",
        );
        assert_eq!(path, "org/jetbrains/kotlinx/kotlinx-coroutines-core/1.8.0");
    }

    #[test]
    fn pom_url_format() {
        let repo = MavenRepository::maven_central();
        let url = repo.pom_url("org.jetbrains.kotlinx", "kotlinx-coroutines-core", "1.8.0");
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/org/jetbrains/kotlinx/kotlinx-coroutines-core/1.8.0/kotlinx-coroutines-core-1.8.0.pom"
        );
    }

    #[test]
    fn jar_url_with_classifier() {
        let repo = MavenRepository::maven_central();
        let url = repo.jar_url("com.example", "my-lib", "1.0", Some("sources"));
        assert!(url.ends_with("my-lib-1.0-sources.jar"));
    }

    #[test]
    fn jar_url_without_classifier() {
        let repo = MavenRepository::maven_central();
        let url = repo.jar_url("com.example", "my-lib", "1.0", None);
        assert!(url.ends_with("my-lib-1.0.jar"));
    }

    #[test]
    fn metadata_url_format() {
        let repo = MavenRepository::maven_central();
        let url = repo.metadata_url("org.jetbrains.kotlinx", "kotlinx-coroutines-core");
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/org/jetbrains/kotlinx/kotlinx-coroutines-core/maven-metadata.xml"
        );
    }

    #[test]
    fn new_trims_trailing_slash() {
        let repo = MavenRepository::new("test", "https://repo.example.com/maven/", None, None);
        assert_eq!(repo.url, "https://repo.example.com/maven");
        assert!(!repo.has_auth());
    }

    #[test]
    fn new_with_auth() {
        let repo = MavenRepository::new(
            "nexus",
            "https://nexus.co/maven",
            Some("user".to_string()),
            Some("pass".to_string()),
        );
        assert!(repo.has_auth());
        assert_eq!(repo.username.as_deref(), Some("user"));
    }

    #[test]
    fn local_repository_has_no_auth_and_is_local() {
        let repo = MavenRepository::local("on-disk", "/var/m2-local");
        assert!(repo.is_local());
        assert!(!repo.has_auth());
        assert_eq!(repo.url, "/var/m2-local");
    }

    #[test]
    fn remote_repository_is_not_local() {
        assert!(!MavenRepository::maven_central().is_local());
    }

    #[test]
    fn jar_url_with_base_uses_timestamp_filename() {
        let repo = MavenRepository::maven_central();
        let url = repo.jar_url_with_base(
            "com.example",
            "my-lib",
            "1.0-SNAPSHOT",
            None,
            Some("my-lib-1.0-20240615.143022-42"),
        );
        assert!(url.ends_with("my-lib-1.0-20240615.143022-42.jar"));
    }

    #[test]
    fn local_fs_path_strips_file_scheme() {
        assert_eq!(
            MavenRepository::local_fs_path("file:///home/user/m2/x.jar"),
            std::path::Path::new("/home/user/m2/x.jar")
        );
        assert_eq!(
            MavenRepository::local_fs_path("/home/user/m2/x.jar"),
            std::path::Path::new("/home/user/m2/x.jar")
        );
    }
}
