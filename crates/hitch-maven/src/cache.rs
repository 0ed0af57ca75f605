//! Content-addressed local artifact cache mirroring the Maven repository layout.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use crate::pom::{self, Pom};
use crate::repository::MavenRepository;

/// On-disk artifact cache rooted at `<dataDir>/<libsDir>/`, laid out exactly
/// like a Maven repository: `<root>/<group-as-path>/<artifact>/<version>/…`.
///
/// Concurrent downloads of the same coordinate are coalesced with an
/// in-process single-flight lock keyed by `(group:artifact:version, file)`;
/// cross-process races are resolved by the atomic-rename write path, where
/// the loser simply finds the file already present.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
    locks: Arc<std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl LocalCache {
    /// Create a cache rooted at `root` (typically `<dataDir>/<libsDir>`).
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// The root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path within the cache for a given Maven coordinate.
    pub fn artifact_dir(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.root
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
    }

    /// Path to a specific file in the cache.
    fn artifact_path(&self, group: &str, artifact: &str, version: &str, filename: &str) -> PathBuf {
        self.artifact_dir(group, artifact, version).join(filename)
    }

    /// Acquire the single-flight lock for `(coordinate, file)`, coalescing
    /// concurrent fetches of the same artifact within this process.
    async fn single_flight(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Check if a JAR is cached, its `.sha1` sidecar (if present) matches,
    /// and return its path.
    pub fn get_jar(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        classifier: Option<&str>,
    ) -> Option<PathBuf> {
        let filename = jar_filename(artifact, version, classifier);
        let path = self.artifact_path(group, artifact, version, &filename);
        if !path.is_file() {
            return None;
        }
        if !self.sidecar_matches(&path) {
            return None;
        }
        Some(path)
    }

    /// Check if a POM is cached and parse it.
    pub fn get_pom(&self, group: &str, artifact: &str, version: &str) -> Option<Pom> {
        let filename = format!("{artifact}-{version}.pom");
        let path = self.artifact_path(group, artifact, version, &filename);
        if !path.is_file() {
            return None;
        }
        let content = fs::read_to_string(&path).ok()?;
        pom::parse_pom(&content).ok()
    }

    fn sidecar_matches(&self, path: &Path) -> bool {
        let sidecar = sha1_sidecar_path(path);
        let Ok(expected) = fs::read_to_string(&sidecar) else {
            // No sidecar recorded: trust the file (e.g. hand-placed fixtures).
            return true;
        };
        let Ok(data) = fs::read(path) else {
            return false;
        };
        crate::checksum::hex_sha1(&data).eq_ignore_ascii_case(expected.trim())
    }

    /// Store artifact data in the cache via atomic rename, writing a `.sha1`
    /// sidecar alongside it.
    pub fn put(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        filename: &str,
        data: &[u8],
    ) -> hitch_util::errors::HitchResult<PathBuf> {
        let dir = self.artifact_dir(group, artifact, version);
        let path = dir.join(filename);
        hitch_util::fs::atomic_write(&path, data)?;
        let sha1 = crate::checksum::hex_sha1(data);
        fs::write(sha1_sidecar_path(&path), sha1)?;
        Ok(path)
    }

    /// Store a POM file in the cache.
    pub fn put_pom(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        pom_xml: &str,
    ) -> hitch_util::errors::HitchResult<PathBuf> {
        let filename = format!("{artifact}-{version}.pom");
        self.put(group, artifact, version, &filename, pom_xml.as_bytes())
    }

    /// Store a JAR file in the cache.
    pub fn put_jar(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        classifier: Option<&str>,
        data: &[u8],
    ) -> hitch_util::errors::HitchResult<PathBuf> {
        let filename = jar_filename(artifact, version, classifier);
        self.put(group, artifact, version, &filename, data)
    }

    /// Check whether the JAR for this coordinate exists in cache.
    pub fn has_artifact(&self, group: &str, artifact: &str, version: &str) -> bool {
        self.get_jar(group, artifact, version, None).is_some()
    }

    /// Fetch a POM, using the cache when available and coalescing concurrent
    /// fetches of the same coordinate.
    pub async fn fetch_pom(
        &self,
        client: &reqwest::Client,
        repo: &MavenRepository,
        group: &str,
        artifact: &str,
        version: &str,
    ) -> hitch_util::errors::HitchResult<Option<Pom>> {
        if let Some(pom) = self.get_pom(group, artifact, version) {
            return Ok(Some(pom));
        }

        let lock_key = format!("{group}:{artifact}:{version}:pom");
        let _guard = self.single_flight(&lock_key).await;

        // Re-check: another task may have populated the cache while we waited.
        if let Some(pom) = self.get_pom(group, artifact, version) {
            return Ok(Some(pom));
        }

        let snapshot_base =
            crate::metadata::resolve_snapshot_base(client, repo, group, artifact, version).await?;
        let url = repo.pom_url_with_base(group, artifact, version, snapshot_base.as_deref());
        let xml = crate::download::download_text(client, repo, &url).await?;
        match xml {
            Some(content) => {
                self.put_pom(group, artifact, version, &content)?;
                let pom = pom::parse_pom(&content)?;
                Ok(Some(pom))
            }
            None => Ok(None),
        }
    }

    /// Remove cached artifacts not present in the resolved set.
    ///
    /// `keep` contains `(group, artifact, version)` tuples of artifacts
    /// that should be retained. Everything else gets deleted.
    /// Returns the number of version directories removed.
    pub fn prune(&self, keep: &std::collections::HashSet<(String, String, String)>) -> u32 {
        let mut removed = 0u32;
        if !self.root.is_dir() {
            return removed;
        }
        collect_version_dirs(&self.root, &self.root, keep, &mut removed);
        removed
    }

    /// Total size of the cache directory in bytes.
    pub fn size(&self) -> u64 {
        dir_size(&self.root)
    }
}

fn jar_filename(artifact: &str, version: &str, classifier: Option<&str>) -> String {
    match classifier {
        Some(c) => format!("{artifact}-{version}-{c}.jar"),
        None => format!("{artifact}-{version}.jar"),
    }
}

fn sha1_sidecar_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".sha1");
    os.into()
}

/// Walk the cache tree to find version directories (leaf dirs containing files)
/// and remove those not in the `keep` set.
///
/// Cache layout: `<root>/<group-path>/<artifact>/<version>/`
/// We reconstruct the coordinate by tracking depth from root.
fn collect_version_dirs(
    root: &Path,
    current: &Path,
    keep: &std::collections::HashSet<(String, String, String)>,
    removed: &mut u32,
) {
    let Ok(entries) = fs::read_dir(current) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let has_files = fs::read_dir(&path)
            .map(|rd| rd.flatten().any(|e| e.path().is_file()))
            .unwrap_or(false);

        if has_files {
            if let Some(coord) = reconstruct_coordinate(root, &path) {
                if !keep.contains(&coord) {
                    let _ = fs::remove_dir_all(&path);
                    *removed += 1;
                }
            }
        } else {
            collect_version_dirs(root, &path, keep, removed);
            if fs::read_dir(&path)
                .map(|mut rd| rd.next().is_none())
                .unwrap_or(true)
            {
                let _ = fs::remove_dir(&path);
            }
        }
    }
}

/// Reconstruct `(group, artifact, version)` from a cache path.
///
/// Path: `<root>/org/jetbrains/kotlin/kotlin-stdlib/2.3.0`
/// Result: `("org.jetbrains.kotlin", "kotlin-stdlib", "2.3.0")`
fn reconstruct_coordinate(root: &Path, version_dir: &Path) -> Option<(String, String, String)> {
    let rel = version_dir.strip_prefix(root).ok()?;
    let components: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if components.len() < 3 {
        return None;
    }
    let version = components.last()?.clone();
    let artifact = components[components.len() - 2].clone();
    let group = components[..components.len() - 2].join(".");
    Some((group, artifact, version))
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(m) = entry.metadata() {
                if m.is_dir() {
                    total += dir_size(&entry.path());
                } else {
                    total += m.len();
                }
            }
        }
    }
    total
}
