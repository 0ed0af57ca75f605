use serde::{Deserialize, Serialize};

/// Facade configuration: where cached artifacts live, offline mode, and the
/// download pipeline's concurrency and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subdirectory name under the data directory for cached artifacts.
    pub libs_dir: String,
    /// If true, fail rather than reach remote repositories.
    pub offline: bool,
    /// Parallelism for downloads.
    pub worker_count: u32,
    /// Per-HTTP-request timeout, in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum per-request retry attempts.
    pub retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            libs_dir: default_libs_dir(),
            offline: false,
            worker_count: default_worker_count(),
            request_timeout_ms: 30_000,
            retries: 3,
        }
    }
}

fn default_libs_dir() -> String {
    "libs".to_string()
}

fn default_worker_count() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32 * 4)
        .unwrap_or(4)
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field left unset.
    pub fn load(path: &std::path::Path) -> hitch_util::errors::HitchResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            hitch_util::errors::HitchError::ConfigurationError {
                message: format!("failed to parse config at {}: {e}", path.display()),
            }
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_libs_dir_is_libs() {
        assert_eq!(Config::default().libs_dir, "libs");
    }

    #[test]
    fn default_offline_is_false() {
        assert!(!Config::default().offline);
    }

    #[test]
    fn default_retries_is_three() {
        assert_eq!(Config::default().retries, 3);
    }

    #[test]
    fn default_worker_count_nonzero() {
        assert!(Config::default().worker_count > 0);
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("offline = true").unwrap();
        assert!(config.offline);
        assert_eq!(config.libs_dir, "libs");
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load(std::path::Path::new("/nonexistent/hitch.toml")).unwrap();
        assert_eq!(config.libs_dir, "libs");
    }

    #[test]
    fn load_parses_file_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hitch.toml");
        std::fs::write(&path, "libs_dir = \"deps\"\nretries = 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.libs_dir, "deps");
        assert_eq!(config.retries, 5);
    }
}
