//! Artifact checksum verification (SHA-1, falling back to MD5).

use md5::Md5;
use reqwest::Client;
use sha1::{Digest, Sha1};

use crate::download;
use crate::repository::MavenRepository;

/// Verify the checksum of downloaded data against sidecar files from the repo.
///
/// Tries SHA-1 first, falls back to MD5. If neither sidecar is available the
/// artifact is accepted unchecked, at debug level.
pub async fn verify(
    client: &Client,
    repo: &MavenRepository,
    file_url: &str,
    data: &[u8],
) -> hitch_util::errors::HitchResult<()> {
    let sha1_url = format!("{file_url}.sha1");
    if let Some(expected) = download::download_text(client, repo, &sha1_url).await? {
        let expected = extract_hash(&expected);
        let actual = hex_sha1(data);
        return check(&actual, &expected, file_url);
    }

    let md5_url = format!("{file_url}.md5");
    if let Some(expected) = download::download_text(client, repo, &md5_url).await? {
        let expected = extract_hash(&expected);
        let actual = hex_md5(data);
        return check(&actual, &expected, file_url);
    }

    tracing::debug!("no checksum sidecar for {file_url}, accepting unchecked");
    Ok(())
}

fn check(actual: &str, expected: &str, url: &str) -> hitch_util::errors::HitchResult<()> {
    if actual.eq_ignore_ascii_case(expected.trim()) {
        tracing::debug!("checksum ok for {url}");
        Ok(())
    } else {
        Err(hitch_util::errors::HitchError::ChecksumError {
            url: url.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into())
    }
}

/// Extract the hex hash from a checksum file.
///
/// Maven checksum files may contain just the hash, or `hash  filename`.
fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

/// Hex-encoded SHA-1 digest of `data`, exposed for callers that need to
/// report an artifact's checksum alongside its resolved location.
pub fn hex_sha1(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn hex_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_hash_simple() {
        assert_eq!(extract_hash("abc123\n"), "abc123");
    }

    #[test]
    fn extract_hash_with_filename() {
        assert_eq!(extract_hash("abc123  my-lib-1.0.jar\n"), "abc123");
    }

    #[test]
    fn sha1_computation() {
        let hash = hex_sha1(b"hello world");
        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }

    #[test]
    fn md5_computation() {
        let hash = hex_md5(b"hello world");
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn check_accepts_case_insensitive_match() {
        assert!(check("ABC123", "abc123", "https://repo/x.jar").is_ok());
    }

    #[test]
    fn check_rejects_mismatch() {
        let err = check("abc123", "def456", "https://repo/x.jar").unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
