//! Core dependency resolution algorithm: nearest-wins BFS, scope propagation,
//! exclusions, optional dependency handling, and BOM imports.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use hitch_core::coordinate::Coordinate;
use hitch_core::dependency::{Dependency, Exclusion, Scope};
use hitch_maven::cache::LocalCache;
use hitch_maven::metadata::{self, MavenMetadata};
use hitch_maven::pom::Pom;
use hitch_maven::repository::MavenRepository;
use hitch_util::errors::{HitchError, HitchResult};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::ResolutionCache;
use crate::conflict::{ConflictReport, VersionConflict};
use crate::graph::{DepEdge, DependencyGraph, ResolvedNode};

/// Parallelism for POM prefetching within a single BFS level. Distinct from
/// the facade's configurable download worker pool (`Config::worker_count`),
/// which governs the separate artifact download pipeline.
const MAX_CONCURRENT_POM_FETCHES: usize = 8;

/// The output of dependency resolution.
pub struct ResolutionResult {
    pub graph: DependencyGraph,
    pub conflicts: ConflictReport,
    /// Resolved coordinates ordered leaves-first (reverse depth-first
    /// post-order), ready for the download pipeline.
    pub artifacts: Vec<ResolvedArtifact>,
}

/// A single resolved artifact, not yet downloaded.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub dependencies: Vec<Coordinate>,
}

/// Entry in the BFS queue.
struct QueueEntry {
    coordinate: Coordinate,
    scope: Scope,
    optional: bool,
    depth: usize,
    parent_key: Option<String>,
    ancestors: Vec<String>,
    exclusions: Vec<Exclusion>,
}

/// Resolve a caller-supplied list of root dependencies.
///
/// Uses BFS with Maven's "nearest wins" strategy. Each root may carry any
/// scope; transitive nodes are filtered to `compile`/`runtime` only.
pub async fn resolve(
    roots: &[Dependency],
    repos: &[MavenRepository],
    cache: &LocalCache,
    client: &Client,
    offline: bool,
) -> HitchResult<ResolutionResult> {
    let mut graph = DependencyGraph::new();
    let mut conflicts = ConflictReport::new();
    let mut session = ResolutionCache::new();

    let mut queue: VecDeque<QueueEntry> = VecDeque::new();
    for dep in roots {
        queue.push_back(QueueEntry {
            coordinate: dep.coordinate.clone(),
            scope: dep.scope,
            optional: dep.optional,
            depth: 0,
            parent_key: None,
            ancestors: Vec::new(),
            exclusions: dep.exclusions.clone(),
        });
    }

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_POM_FETCHES));
    let mut sequence = 0usize;
    let mut insertion_order: HashMap<String, usize> = HashMap::new();

    while !queue.is_empty() {
        let current_depth = queue.front().map(|e| e.depth).unwrap_or(0);
        let mut level: Vec<QueueEntry> = Vec::new();
        while queue.front().is_some_and(|e| e.depth == current_depth) {
            level.push(queue.pop_front().unwrap());
        }

        // Version resolution happens before prefetch so the coordinates to
        // fetch POMs for are fully known.
        let mut resolved_level: Vec<QueueEntry> = Vec::with_capacity(level.len());
        for mut entry in level {
            if entry.coordinate.version.is_none() {
                match resolve_version(&entry.coordinate, &mut session, repos, client, offline).await {
                    Ok(v) => entry.coordinate.version = Some(v),
                    Err(err) => {
                        if entry.optional {
                            tracing::warn!(
                                coordinate = %entry.coordinate,
                                "optional dependency version unresolved, skipping"
                            );
                            continue;
                        }
                        return Err(resolution_failed(&entry.coordinate, &entry.ancestors, err));
                    }
                }
            }
            resolved_level.push(entry);
        }

        // Prefetch POMs for this level in parallel, deduplicated by coordinate.
        let mut to_fetch: HashMap<String, Coordinate> = HashMap::new();
        for entry in &resolved_level {
            let key = pom_key(&entry.coordinate);
            if session.pom(&key).is_none() {
                to_fetch.insert(key, entry.coordinate.clone());
            }
        }

        if !to_fetch.is_empty() {
            let mut join_set = JoinSet::new();
            for (key, coord) in to_fetch {
                let client = client.clone();
                let repos = repos.to_vec();
                let cache = cache.clone();
                let sem = semaphore.clone();
                join_set.spawn(async move {
                    let _permit = sem.acquire().await;
                    let result = fetch_pom_from_repos(&client, &repos, &cache, &coord, offline).await;
                    (key, result)
                });
            }
            while let Some(result) = join_set.join_next().await {
                if let Ok((key, Ok(Some(pom)))) = result {
                    session.insert_pom(key, pom);
                }
            }
        }

        // Process entries at this depth level.
        for entry in resolved_level {
            let QueueEntry {
                coordinate,
                scope,
                optional,
                depth,
                parent_key,
                ancestors,
                exclusions,
            } = entry;

            let module_key = coordinate.module_key();
            let version = coordinate.version.clone().expect("version resolved above");

            // Scope filter: only compile/runtime survive past the roots.
            if depth > 0 && !scope.is_transitive() {
                continue;
            }
            // Per the fixed design note: optional deps are included at
            // depth 0 but never expanded past it.
            if depth > 0 && optional {
                continue;
            }

            // Conflict resolution: nearest wins.
            if let Some(existing_depth) = session.depth_of(&module_key) {
                if existing_depth <= depth {
                    let existing_version = session
                        .resolved_version(&module_key)
                        .unwrap_or_default()
                        .to_string();
                    if existing_version != version {
                        conflicts.add(VersionConflict {
                            group: coordinate.group_id.clone(),
                            artifact: coordinate.artifact_id.clone(),
                            requested: version.clone(),
                            resolved: existing_version,
                            reason: format!(
                                "nearest wins (depth {existing_depth} vs {depth})"
                            ),
                        });
                    }
                    continue;
                }
            }

            let coordinate_key = format!("{module_key}:{version}");
            if session.is_processed(&coordinate_key) {
                continue;
            }

            session.record_depth(module_key.clone(), depth);
            session.record_resolved_version(module_key.clone(), version.clone());
            session.mark_processed(coordinate_key);
            sequence += 1;
            insertion_order.insert(module_key.clone(), sequence);

            let node = graph.add_node(ResolvedNode {
                group: coordinate.group_id.clone(),
                artifact: coordinate.artifact_id.clone(),
                version: version.clone(),
                scope,
            });

            match &parent_key {
                Some(pk) => {
                    if let Some(parent_idx) = graph.find(pk) {
                        graph.add_edge(parent_idx, node, DepEdge { scope, optional });
                    }
                }
                None => graph.add_top_level(node),
            }

            let pom = session.pom(&pom_key(&coordinate)).cloned();
            let Some(mut pom) = pom else { continue };

            if let Err(err) = resolve_parent_chain(&mut pom, cache, repos, client, offline).await {
                tracing::warn!(coordinate = %coordinate, error = %err, "parent POM resolution failed");
            }
            pom.resolve_properties();

            if let Err(err) =
                merge_bom_imports(&mut pom, cache, repos, client, &mut session, offline).await
            {
                tracing::warn!(coordinate = %coordinate, error = %err, "BOM import merge failed");
            }

            for dep in &pom.dependencies {
                let dep_scope = dep
                    .scope
                    .as_deref()
                    .and_then(Scope::parse)
                    .unwrap_or(Scope::Compile);
                if !dep_scope.is_transitive() {
                    continue;
                }
                if exclusions
                    .iter()
                    .any(|e| e.matches(&dep.group_id, &dep.artifact_id))
                {
                    continue;
                }

                let mut dep_coord = Coordinate::new(dep.group_id.clone(), dep.artifact_id.clone());
                dep_coord = match &dep.version {
                    Some(v) => dep_coord.with_version(v.clone()),
                    None => match pom.managed_version(&dep.group_id, &dep.artifact_id) {
                        Some(v) => dep_coord.with_version(v.to_string()),
                        None => dep_coord,
                    },
                };

                let mut child_exclusions = exclusions.clone();
                for excl in &dep.exclusions {
                    child_exclusions.push(Exclusion::new(
                        excl.group_id.clone(),
                        excl.artifact_id.clone().unwrap_or_else(|| "*".to_string()),
                    ));
                }

                let mut child_ancestors = ancestors.clone();
                child_ancestors.push(module_key.clone());

                queue.push_back(QueueEntry {
                    coordinate: dep_coord,
                    scope: propagate_scope(scope, dep_scope),
                    optional: dep.optional,
                    depth: depth + 1,
                    parent_key: Some(module_key.clone()),
                    ancestors: child_ancestors,
                    exclusions: child_exclusions,
                });
            }
        }
    }

    let artifacts = build_artifact_list(&graph, &insertion_order);

    Ok(ResolutionResult {
        graph,
        conflicts,
        artifacts,
    })
}

/// Resolve a missing version via local dependency-management, the
/// accumulated global management map, the resolved-version cache, then
/// `maven-metadata.xml`'s "best version" (`release` > `latest` > last listed).
async fn resolve_version(
    coordinate: &Coordinate,
    session: &mut ResolutionCache,
    repos: &[MavenRepository],
    client: &Client,
    offline: bool,
) -> HitchResult<String> {
    if let Some(v) = &coordinate.version {
        return Ok(v.clone());
    }

    let module_key = coordinate.module_key();
    if let Some(v) = session.managed_version(&module_key) {
        return Ok(v.to_string());
    }
    if let Some(v) = session.resolved_version(&module_key) {
        return Ok(v.to_string());
    }

    let metadata = match session.metadata(&module_key) {
        Some(meta) => Some(meta.clone()),
        None if offline => None,
        None => {
            let fetched = fetch_metadata_from_repos(client, repos, coordinate).await?;
            if let Some(ref meta) = fetched {
                session.insert_metadata(module_key.clone(), meta.clone());
            }
            fetched
        }
    };

    if let Some(meta) = metadata {
        if let Some(v) = best_version(&meta) {
            return Ok(v);
        }
    }

    Err(HitchError::UnresolvedVersion {
        coordinate: coordinate.to_string(),
    }
    .into())
}

fn best_version(meta: &MavenMetadata) -> Option<String> {
    meta.release
        .clone()
        .or_else(|| meta.latest.clone())
        .or_else(|| meta.versions.last().cloned())
}

async fn fetch_metadata_from_repos(
    client: &Client,
    repos: &[MavenRepository],
    coordinate: &Coordinate,
) -> HitchResult<Option<MavenMetadata>> {
    let mut last_err: Option<miette::Report> = None;
    for repo in repos {
        let url = repo.metadata_url(&coordinate.group_id, &coordinate.artifact_id);
        match hitch_maven::download::download_text(client, repo, &url).await {
            Ok(Some(xml)) => return Ok(Some(metadata::parse_metadata(&xml)?)),
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(repo = %repo.name, error = %err, "metadata fetch failed, trying next repository");
                last_err = Some(err);
                continue;
            }
        }
    }
    match last_err {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

/// Fetch a POM from the first repository that has it. In offline mode, only
/// the local cache is consulted and no repository is contacted.
async fn fetch_pom_from_repos(
    client: &Client,
    repos: &[MavenRepository],
    cache: &LocalCache,
    coordinate: &Coordinate,
    offline: bool,
) -> HitchResult<Option<Pom>> {
    let version = coordinate
        .version
        .as_deref()
        .expect("version resolved before POM fetch");
    if offline {
        return Ok(cache.get_pom(&coordinate.group_id, &coordinate.artifact_id, version));
    }
    let mut last_err: Option<miette::Report> = None;
    for repo in repos {
        match cache
            .fetch_pom(
                client,
                repo,
                &coordinate.group_id,
                &coordinate.artifact_id,
                version,
            )
            .await
        {
            Ok(Some(pom)) => return Ok(Some(pom)),
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(repo = %repo.name, error = %err, "POM fetch failed, trying next repository");
                last_err = Some(err);
                continue;
            }
        }
    }
    match last_err {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

/// Walk `pom`'s `<parent>` chain, fetching and merging each ancestor's
/// properties, dependency management, and repositories via `apply_parent`.
/// Closest parent first, so a grandparent's entries never shadow a parent's.
/// A visited set guards against a malformed POM declaring itself its own
/// ancestor.
async fn resolve_parent_chain(
    pom: &mut Pom,
    cache: &LocalCache,
    repos: &[MavenRepository],
    client: &Client,
    offline: bool,
) -> HitchResult<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = pom.parent.clone();

    while let Some(parent_ref) = current {
        let key = format!(
            "{}:{}:{}",
            parent_ref.group_id, parent_ref.artifact_id, parent_ref.version
        );
        if !visited.insert(key) {
            break;
        }

        let coord = Coordinate::new(parent_ref.group_id.clone(), parent_ref.artifact_id.clone())
            .with_version(parent_ref.version.clone());
        let parent_pom = fetch_pom_from_repos(client, repos, cache, &coord, offline).await?;
        let Some(parent_pom) = parent_pom else { break };

        pom.apply_parent(&parent_pom);
        current = parent_pom.parent.clone();
    }

    Ok(())
}

/// Resolve and merge every BOM import reachable from `pom`'s own
/// dependency-management into it, then fold the result into the
/// session-wide management map. Existing entries win throughout, so earlier
/// imports take precedence and cycles self-limit via the visited set.
async fn merge_bom_imports(
    pom: &mut Pom,
    cache: &LocalCache,
    repos: &[MavenRepository],
    client: &Client,
    session: &mut ResolutionCache,
    offline: bool,
) -> HitchResult<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, String, String)> = pom
        .bom_imports()
        .iter()
        .filter_map(|d| {
            d.version
                .clone()
                .map(|v| (d.group_id.clone(), d.artifact_id.clone(), v))
        })
        .collect();

    while let Some((group, artifact, version)) = queue.pop_front() {
        let key = format!("{group}:{artifact}:{version}");
        if !visited.insert(key) {
            continue;
        }

        let coord = Coordinate::new(group.clone(), artifact.clone()).with_version(version.clone());
        let bom_pom = fetch_pom_from_repos(client, repos, cache, &coord, offline).await?;
        let Some(bom_pom) = bom_pom else { continue };

        for dm in &bom_pom.dependency_management {
            let dominated = pom
                .dependency_management
                .iter()
                .any(|d| d.group_id == dm.group_id && d.artifact_id == dm.artifact_id);
            if !dominated {
                pom.dependency_management.push(dm.clone());
            }
        }
        for nested in bom_pom.bom_imports() {
            if let Some(v) = &nested.version {
                queue.push_back((nested.group_id.clone(), nested.artifact_id.clone(), v.clone()));
            }
        }
    }

    session.merge_management(pom.dependency_management.iter().filter_map(|d| {
        d.version
            .clone()
            .map(|v| (format!("{}:{}", d.group_id, d.artifact_id), v))
    }));

    Ok(())
}

/// Maven scope propagation: `test` is absorbing, `runtime` demotes `compile`.
fn propagate_scope(parent_scope: Scope, dep_scope: Scope) -> Scope {
    if parent_scope == Scope::Test || dep_scope == Scope::Test {
        return Scope::Test;
    }
    if parent_scope == Scope::Runtime || dep_scope == Scope::Runtime {
        return Scope::Runtime;
    }
    Scope::Compile
}

/// Emit resolved artifacts in reverse depth-first post-order: deepest nodes
/// first, ties broken by insertion order, so leaves precede the roots that
/// depend on them.
fn build_artifact_list(
    graph: &DependencyGraph,
    insertion_order: &HashMap<String, usize>,
) -> Vec<ResolvedArtifact> {
    let mut entries: Vec<(&ResolvedNode, usize)> = graph
        .all_nodes()
        .into_iter()
        .map(|node| {
            let seq = insertion_order.get(&node.key()).copied().unwrap_or(0);
            (node, seq)
        })
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    entries
        .into_iter()
        .map(|(node, _)| {
            let node_idx = graph.find(&node.key());
            let dependencies = node_idx
                .map(|idx| {
                    graph
                        .dependencies_of(idx)
                        .iter()
                        .map(|(child_idx, _)| {
                            let child = graph.node(*child_idx);
                            Coordinate::new(child.group.clone(), child.artifact.clone())
                                .with_version(child.version.clone())
                        })
                        .collect()
                })
                .unwrap_or_default();

            ResolvedArtifact {
                coordinate: Coordinate::new(node.group.clone(), node.artifact.clone())
                    .with_version(node.version.clone()),
                scope: node.scope,
                dependencies,
            }
        })
        .collect()
}

fn pom_key(coordinate: &Coordinate) -> String {
    format!(
        "{}:{}",
        coordinate.module_key(),
        coordinate.version.as_deref().unwrap_or("")
    )
}

fn resolution_failed(
    coordinate: &Coordinate,
    ancestors: &[String],
    cause: miette::Report,
) -> miette::Report {
    let cause = match cause.downcast::<HitchError>() {
        Ok(e) => e,
        Err(report) => HitchError::ConfigurationError {
            message: report.to_string(),
        },
    };
    HitchError::ResolutionFailed {
        coordinate: coordinate.to_string(),
        ancestors: ancestors.to_vec(),
        cause: Box::new(cause),
    }
    .into()
}
