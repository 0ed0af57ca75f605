//! Artifact downloading from Maven repositories.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use crate::auth;
use crate::repository::MavenRepository;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Build a shared reqwest client for Maven downloads, with the given
/// per-request timeout.
pub fn build_client(timeout_ms: u64) -> hitch_util::errors::HitchResult<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(concat!("hitch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            hitch_util::errors::HitchError::TransportError {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            }
            .into()
        })
}

/// Download raw bytes from a URL, with authentication and bounded
/// exponential-backoff retries on transient failures.
///
/// Returns `Ok(None)` for 404/410 (terminal, not retried). 5xx responses and
/// connect/timeout errors are retried up to `max_retries` times.
pub async fn download_bytes(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    max_retries: u32,
) -> hitch_util::errors::HitchResult<Option<Vec<u8>>> {
    if repo.is_local() {
        return read_local(url);
    }

    let mut last_err = String::new();

    for attempt in 0..max_retries {
        if attempt > 0 {
            tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
        }

        let mut req = client.get(url);
        req = auth::apply_auth(req, repo);

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE
                {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(hitch_util::errors::HitchError::TransportError {
                        url: url.to_string(),
                        message: format!("HTTP {status}"),
                    }
                    .into());
                }

                let bytes = resp.bytes().await.map_err(|e| {
                    hitch_util::errors::HitchError::TransportError {
                        url: url.to_string(),
                        message: format!("failed to read response body: {e}"),
                    }
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(hitch_util::errors::HitchError::TransportError {
                    url: url.to_string(),
                    message: format!("request failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(hitch_util::errors::HitchError::TransportError {
        url: url.to_string(),
        message: format!("exhausted {max_retries} retries: {last_err}"),
    }
    .into())
}

/// Download an artifact (JAR, POM, etc.) with a progress bar for large
/// payloads, applying the same retry policy as `download_bytes`.
pub async fn download_artifact(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    label: &str,
    max_retries: u32,
) -> hitch_util::errors::HitchResult<Option<Vec<u8>>> {
    if repo.is_local() {
        return read_local(url);
    }

    let mut req = client.get(url);
    req = auth::apply_auth(req, repo);

    let resp = req.send().await.map_err(|e| {
        hitch_util::errors::HitchError::TransportError {
            url: url.to_string(),
            message: format!("request failed: {e}"),
        }
    })?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND || resp.status() == reqwest::StatusCode::GONE
    {
        return Ok(None);
    }
    if !resp.status().is_success() {
        // Delegate to the retrying path for anything retryable (5xx); a
        // non-retryable client error falls straight through as an error.
        if resp.status().is_server_error() {
            return download_bytes(client, repo, url, max_retries).await;
        }
        return Err(hitch_util::errors::HitchError::TransportError {
            url: url.to_string(),
            message: format!("HTTP {}", resp.status()),
        }
        .into());
    }

    let total = resp.content_length().unwrap_or(0);
    let pb = if total > 100_000 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_message(label.to_string());
        Some(pb)
    } else {
        None
    };

    let bytes = resp.bytes().await.map_err(|e| {
        hitch_util::errors::HitchError::TransportError {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        }
    })?;

    if let Some(pb) = pb {
        pb.set_position(bytes.len() as u64);
        pb.finish_and_clear();
    }

    Ok(Some(bytes.to_vec()))
}

/// Read an artifact straight off disk for a local repository. A missing file
/// is terminal-but-not-fatal (`Ok(None)`), mirroring 404/410 on the remote
/// path; any other I/O failure (permissions, a path that is a directory) is
/// a `TransportError`.
fn read_local(url: &str) -> hitch_util::errors::HitchResult<Option<Vec<u8>>> {
    let path = MavenRepository::local_fs_path(url);
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(hitch_util::errors::HitchError::TransportError {
            url: url.to_string(),
            message: format!("failed to read local repository file: {e}"),
        }
        .into()),
    }
}

/// Download a text file (POM, metadata, checksum sidecar).
pub async fn download_text(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
) -> hitch_util::errors::HitchResult<Option<String>> {
    match download_bytes(client, repo, url, 3).await? {
        Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
        None => Ok(None),
    }
}
