//! Orchestrator: composes resolution, download, relocation, and injection
//! into the public entry points hosts call.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use hitch_core::config::Config;
use hitch_core::coordinate::Coordinate;
use hitch_core::dependency::Dependency;
use hitch_core::log::{LogLevel, LogSink, TracingLogSink};
use hitch_inject::{ClassPathSink, IsolatedClassPathSink, SharedClassPathSink};
use hitch_maven::cache::LocalCache;
use hitch_maven::checksum;
use hitch_maven::download;
use hitch_maven::repository::MavenRepository;
use hitch_relocate::RelocationRule;
use hitch_resolver::resolver::{self, ResolvedArtifact};
use hitch_util::errors::{HitchError, HitchResult};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A resolved, downloaded, and (if requested) relocated artifact ready for
/// the host's class loader.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub coordinate: Coordinate,
    pub local_path: PathBuf,
    pub origin_repository: String,
    pub sha1: String,
}

/// The runtime dependency manager. One instance per plugin host; repository
/// list and in-memory caches are shared across every load call it serves.
pub struct Manager {
    config: Config,
    cache: LocalCache,
    client: Client,
    repos: Mutex<Vec<MavenRepository>>,
    log: Arc<dyn LogSink>,
    shared_sink: Arc<SharedClassPathSink>,
    closed: AtomicBool,
}

impl Manager {
    /// Build a manager rooted at `data_dir` (its `libs_dir` subdirectory
    /// becomes the artifact cache). `inject` is the host callback that puts
    /// a resolved JAR onto its shared class loader.
    pub fn new(
        data_dir: PathBuf,
        config: Config,
        inject: impl Fn(&std::path::Path) -> HitchResult<()> + Send + Sync + 'static,
    ) -> HitchResult<Self> {
        let client = download::build_client(config.request_timeout_ms)?;
        let cache = LocalCache::new(data_dir.join(&config.libs_dir));
        Ok(Self {
            config,
            cache,
            client,
            repos: Mutex::new(Vec::new()),
            log: Arc::new(TracingLogSink),
            shared_sink: Arc::new(SharedClassPathSink::new(inject)),
            closed: AtomicBool::new(false),
        })
    }

    /// Override the log sink, e.g. to route through a host's own logger.
    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Register a repository. Copy-on-write: in-flight resolves keep using
    /// the repository list they captured at entry.
    pub fn add_repository(&self, repo: MavenRepository) {
        let mut repos = self.repos.lock().expect("repository list lock poisoned");
        let mut next = repos.clone();
        next.push(repo);
        *repos = next;
    }

    /// Append Maven Central if it is not already configured.
    pub fn add_default_repository_mirror(&self) {
        let already_present = self
            .repos
            .lock()
            .expect("repository list lock poisoned")
            .iter()
            .any(|r| r.url == hitch_maven::repository::MAVEN_CENTRAL_URL);
        if !already_present {
            self.add_repository(MavenRepository::maven_central());
        }
    }

    /// Resolve, download, and inject a single coordinate's full dependency
    /// tree onto the shared classpath, returning the artifact requested.
    pub async fn load_dependency(&self, coordinate: Coordinate) -> HitchResult<LoadedArtifact> {
        let key = coordinate.module_key();
        let dep = Dependency::new(coordinate);
        let loaded = self.load_dependencies(vec![dep], None).await?;
        loaded
            .into_iter()
            .find(|a| a.coordinate.module_key() == key)
            .ok_or_else(|| HitchError::NotFound { coordinate: key }.into())
    }

    /// Resolve, download, optionally relocate, and inject a set of root
    /// dependencies (and their full transitive closures) onto the shared
    /// classpath.
    pub async fn load_dependencies(
        &self,
        deps: Vec<Dependency>,
        relocations: Option<Vec<RelocationRule>>,
    ) -> HitchResult<Vec<LoadedArtifact>> {
        self.ensure_open()?;
        let sink = self.shared_sink.clone();
        self.run_pipeline(deps, relocations, sink).await
    }

    /// Same as [`Manager::load_dependencies`] but injecting into a
    /// caller-supplied isolated sink instead of the host's shared one.
    pub async fn load_dependencies_isolated(
        &self,
        sink: Arc<IsolatedClassPathSink>,
        deps: Vec<Dependency>,
        relocations: Option<Vec<RelocationRule>>,
    ) -> HitchResult<Vec<LoadedArtifact>> {
        self.ensure_open()?;
        self.run_pipeline(deps, relocations, sink).await
    }

    /// Release resources and reject further loads. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.repos.lock().expect("repository list lock poisoned").clear();
        self.log.log(LogLevel::Info, "manager closed");
    }

    fn ensure_open(&self) -> HitchResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HitchError::ConfigurationError {
                message: "manager is closed".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        deps: Vec<Dependency>,
        relocations: Option<Vec<RelocationRule>>,
        sink: Arc<dyn ClassPathSink>,
    ) -> HitchResult<Vec<LoadedArtifact>> {
        let repos = self.repos.lock().expect("repository list lock poisoned").clone();
        let result = resolver::resolve(&deps, &repos, &self.cache, &self.client, self.config.offline)
            .await?;

        if !result.conflicts.is_empty() {
            self.log.log(LogLevel::Warn, &result.conflicts.to_string());
        }

        let active_rules = relocations.filter(|rules| !hitch_relocate::rule::rules_are_noop(rules));

        // Bounded worker pool: artifact downloads are independent once
        // resolution has produced the full list, so fan them out up to
        // `worker_count` at a time rather than one at a time.
        let worker_count = self.config.worker_count.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(worker_count));
        let mut join_set = JoinSet::new();
        for (index, artifact) in result.artifacts.iter().cloned().enumerate() {
            let sem = semaphore.clone();
            let client = self.client.clone();
            let cache = self.cache.clone();
            let config = self.config.clone();
            let log = self.log.clone();
            let repos = repos.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let fetched = fetch_artifact(&client, &cache, &config, &log, &repos, &artifact).await;
                (index, fetched)
            });
        }

        let mut fetched: Vec<Option<LoadedArtifact>> = (0..result.artifacts.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, res) = joined.expect("artifact fetch task panicked");
            fetched[index] = Some(res?);
        }

        let mut loaded = Vec::with_capacity(fetched.len());
        for jar in fetched.into_iter().flatten() {
            let mut jar = jar;
            if let Some(rules) = &active_rules {
                jar.local_path = self.relocate_artifact(&jar, rules)?;
            }
            sink.add(&jar.local_path)?;
            loaded.push(jar);
        }

        let keep = result
            .artifacts
            .iter()
            .map(|a| {
                (
                    a.coordinate.group_id.clone(),
                    a.coordinate.artifact_id.clone(),
                    a.coordinate.version.clone().unwrap_or_default(),
                )
            })
            .collect();
        self.cache.prune(&keep);

        Ok(loaded)
    }

    fn relocate_artifact(
        &self,
        jar: &LoadedArtifact,
        rules: &[RelocationRule],
    ) -> HitchResult<PathBuf> {
        let data = std::fs::read(&jar.local_path)?;
        let relocated = hitch_relocate::relocate_bytes(&data, rules)?;
        let version = jar.coordinate.version.as_deref().unwrap_or("0");
        let filename = format!(
            "{}-{}-relocated.jar",
            jar.coordinate.artifact_id, version
        );
        let dir = self.cache.artifact_dir(
            &jar.coordinate.group_id,
            &jar.coordinate.artifact_id,
            version,
        );
        let path = dir.join(filename);
        hitch_util::fs::atomic_write(&path, &relocated)?;
        Ok(path)
    }
}

/// Fetch (from cache or, failing that, the first repository that serves it
/// successfully) a single resolved artifact. A free function, not a
/// `Manager` method, so it can be spawned onto the worker pool without
/// borrowing `&self`.
async fn fetch_artifact(
    client: &Client,
    cache: &LocalCache,
    config: &Config,
    log: &Arc<dyn LogSink>,
    repos: &[MavenRepository],
    artifact: &ResolvedArtifact,
) -> HitchResult<LoadedArtifact> {
    let group = artifact.coordinate.group_id.as_str();
    let art = artifact.coordinate.artifact_id.as_str();
    let version = artifact
        .coordinate
        .version
        .as_deref()
        .ok_or_else(|| HitchError::UnresolvedVersion {
            coordinate: artifact.coordinate.to_string(),
        })?;
    let classifier = artifact.coordinate.classifier.as_deref();

    if let Some(path) = cache.get_jar(group, art, version, classifier) {
        let data = std::fs::read(&path)?;
        return Ok(LoadedArtifact {
            coordinate: artifact.coordinate.clone(),
            local_path: path,
            origin_repository: "cache".to_string(),
            sha1: checksum::hex_sha1(&data),
        });
    }

    if config.offline {
        return Err(HitchError::NotFound {
            coordinate: artifact.coordinate.to_string(),
        }
        .into());
    }

    for repo in repos {
        let snapshot_base =
            match hitch_maven::metadata::resolve_snapshot_base(client, repo, group, art, version).await {
                Ok(base) => base,
                Err(err) => {
                    log.log(
                        LogLevel::Warn,
                        &format!(
                            "snapshot metadata lookup for {} on {} failed, trying next repository: {err}",
                            artifact.coordinate, repo.name
                        ),
                    );
                    continue;
                }
            };
        let url = repo.jar_url_with_base(group, art, version, classifier, snapshot_base.as_deref());
        let label = format!("{art}:{version}");
        let data = match download::download_artifact(client, repo, &url, &label, config.retries).await {
            Ok(Some(data)) => data,
            Ok(None) => continue,
            Err(err) => {
                log.log(
                    LogLevel::Warn,
                    &format!(
                        "download of {} from {} failed, trying next repository: {err}",
                        artifact.coordinate, repo.name
                    ),
                );
                continue;
            }
        };
        if let Err(err) = checksum::verify(client, repo, &url, &data).await {
            log.log(
                LogLevel::Warn,
                &format!(
                    "checksum mismatch for {} from {}, trying next repository: {err}",
                    artifact.coordinate, repo.name
                ),
            );
            continue;
        }
        let path = cache.put_jar(group, art, version, classifier, &data)?;
        log.log(LogLevel::Info, &format!("downloaded {} from {}", artifact.coordinate, repo.name));
        return Ok(LoadedArtifact {
            coordinate: artifact.coordinate.clone(),
            local_path: path,
            origin_repository: repo.name.clone(),
            sha1: checksum::hex_sha1(&data),
        });
    }

    Err(HitchError::NotFound {
        coordinate: artifact.coordinate.to_string(),
    }
    .into())
}
