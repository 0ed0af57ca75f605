//! Classpath sink contract and the two stock implementations.
//!
//! The actual mechanism by which a path gets onto a JVM-hosted class loader
//! (privileged reflection, a platform API, a process-level allow-list) is
//! host-specific and opaque to this crate. Both sinks here own only the
//! idempotency and thread-safety contract from spec §4.8/§8; the host
//! supplies the injection step itself as a callback, the same adapter-
//! boundary shape `hitch_core::log::LogSink` uses for the logging contract.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hitch_util::errors::HitchResult;

/// A sink that resolved artifacts are injected into. `add` must be safe to
/// call concurrently and idempotent: adding the same path twice never
/// duplicates it on the underlying loader and never errors.
pub trait ClassPathSink: Send + Sync {
    fn add(&self, path: &Path) -> HitchResult<()>;

    /// Paths already added to this sink.
    fn added_paths(&self) -> Vec<PathBuf>;
}

type InjectFn = Box<dyn Fn(&Path) -> HitchResult<()> + Send + Sync>;

/// Inserts artifacts into the host's existing class loader. Classes added
/// here are visible to the whole host application.
pub struct SharedClassPathSink {
    added: Mutex<HashSet<PathBuf>>,
    inject: InjectFn,
}

impl SharedClassPathSink {
    pub fn new(inject: impl Fn(&Path) -> HitchResult<()> + Send + Sync + 'static) -> Self {
        Self {
            added: Mutex::new(HashSet::new()),
            inject: Box::new(inject),
        }
    }

    /// A sink with no host-side injection step, useful in tests and for
    /// hosts that only want the dedup bookkeeping.
    pub fn noop() -> Self {
        Self::new(|_| Ok(()))
    }
}

impl ClassPathSink for SharedClassPathSink {
    fn add(&self, path: &Path) -> HitchResult<()> {
        let mut added = self.added.lock().expect("classpath sink lock poisoned");
        if !added.insert(path.to_path_buf()) {
            tracing::debug!(path = %path.display(), "already on shared classpath, skipping");
            return Ok(());
        }
        tracing::info!(path = %path.display(), "adding to shared classpath");
        (self.inject)(path)
    }

    fn added_paths(&self) -> Vec<PathBuf> {
        self.added
            .lock()
            .expect("classpath sink lock poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

/// Creates a class-loading scope with no parent delegation to the host's
/// application classes. Classes loaded here are invisible to the host and
/// to other isolated sinks unless the host explicitly crosses the boundary.
pub struct IsolatedClassPathSink {
    added: Mutex<HashSet<PathBuf>>,
    inject: InjectFn,
}

impl IsolatedClassPathSink {
    pub fn new(inject: impl Fn(&Path) -> HitchResult<()> + Send + Sync + 'static) -> Self {
        Self {
            added: Mutex::new(HashSet::new()),
            inject: Box::new(inject),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_| Ok(()))
    }
}

impl ClassPathSink for IsolatedClassPathSink {
    fn add(&self, path: &Path) -> HitchResult<()> {
        let mut added = self.added.lock().expect("classpath sink lock poisoned");
        if !added.insert(path.to_path_buf()) {
            tracing::debug!(path = %path.display(), "already on isolated classpath, skipping");
            return Ok(());
        }
        tracing::info!(path = %path.display(), "adding to isolated classpath");
        (self.inject)(path)
    }

    fn added_paths(&self) -> Vec<PathBuf> {
        self.added
            .lock()
            .expect("classpath sink lock poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn shared_sink_add_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let sink = SharedClassPathSink::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let path = PathBuf::from("/libs/a-1.0.jar");
        sink.add(&path).unwrap();
        sink.add(&path).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.added_paths(), vec![path]);
    }

    #[test]
    fn isolated_sink_add_is_idempotent() {
        let sink = IsolatedClassPathSink::noop();
        let path = PathBuf::from("/libs/b-1.0.jar");
        sink.add(&path).unwrap();
        sink.add(&path).unwrap();
        assert_eq!(sink.added_paths().len(), 1);
    }

    #[test]
    fn isolated_and_shared_sinks_do_not_share_state() {
        let shared = SharedClassPathSink::noop();
        let isolated = IsolatedClassPathSink::noop();
        let path = PathBuf::from("/libs/c-1.0.jar");

        shared.add(&path).unwrap();
        assert!(isolated.added_paths().is_empty());
    }

    #[test]
    fn concurrent_adds_do_not_duplicate() {
        use std::thread;

        let sink = Arc::new(SharedClassPathSink::noop());
        let path = PathBuf::from("/libs/d-1.0.jar");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                let path = path.clone();
                thread::spawn(move || sink.add(&path).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sink.added_paths().len(), 1);
    }
}
