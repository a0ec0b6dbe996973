//! Local caching of remote reference documents
//!
//! Each reference URL maps to a stable, filesystem-safe file name inside the
//! reference directory. Existing non-empty copies are reused; missing ones are
//! downloaded with exponential backoff.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CorpusConfig;
use crate::error::{CorpusError, Result};

lazy_static! {
    static ref FILE_WITH_EXT_RE: Regex = Regex::new(r"(?i)([^/]+\.(pdf|docx))").unwrap();
    static ref UNSAFE_CHARS_RE: Regex = Regex::new(r"[^A-Za-z0-9._+-]").unwrap();
}

const FALLBACK_NAME: &str = "adgm_ref";

/// Path component of a URL, without scheme, host, query or fragment
fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = match without_scheme.find('/') {
        Some(pos) => &without_scheme[pos..],
        None => "",
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Derive the local file name for a reference URL.
///
/// Prefers the first `*.pdf` / `*.docx` segment of the path (many asset links
/// end with an opaque id), otherwise the last path segment. When no extension
/// is visible the URL text is checked for a hint.
pub fn local_file_name(url: &str) -> String {
    let path = url_path(url);

    let mut base = match FILE_WITH_EXT_RE.captures(path) {
        Some(caps) => caps[1].to_string(),
        None => path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .to_string(),
    };

    let lower_base = base.to_lowercase();
    if !lower_base.ends_with(".pdf") && !lower_base.ends_with(".docx") {
        let lower_url = url.to_lowercase();
        if lower_url.contains(".pdf") {
            base.push_str(".pdf");
        } else if lower_url.contains(".docx") {
            base.push_str(".docx");
        }
    }

    UNSAFE_CHARS_RE.replace_all(&base, "_").into_owned()
}

fn is_usable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Make sure every configured reference has a local, non-empty copy.
///
/// Returns the local paths in configuration order. The first reference that
/// cannot be fetched after all retries aborts with [`CorpusError::Fetch`];
/// copies already on disk stay in place for the next run.
pub async fn ensure_local_copies(config: &CorpusConfig) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(&config.reference_dir).await?;

    let client = build_client(config.fetch_timeout)?;
    let mut paths = Vec::with_capacity(config.reference_urls.len());

    for url in &config.reference_urls {
        let dest = config.reference_dir.join(local_file_name(url));

        if is_usable(&dest) {
            tracing::info!("Using cached reference: {}", dest.display());
        } else {
            tracing::info!("Downloading reference: {} -> {}", url, dest.display());
            fetch_with_retry(&client, url, &dest, config.fetch_attempts, config.fetch_backoff).await?;
        }

        paths.push(dest);
    }

    Ok(paths)
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("review-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CorpusError::Config(format!("HTTP client: {}", e)))
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    attempts: u32,
    backoff: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match fetch_once(client, url, dest).await {
            Ok(bytes) => {
                tracing::debug!(url, bytes, attempt, "Reference downloaded");
                return Ok(());
            }
            Err(message) => {
                tracing::warn!(url, attempt, attempts, error = %message, "Reference download failed");
                last_error = message;
            }
        }

        if attempt < attempts {
            tokio::time::sleep(retry_delay(backoff, attempt)).await;
        }
    }

    Err(CorpusError::Fetch {
        url: url.to_string(),
        attempts,
        message: last_error,
    })
}

/// Wait after failed `attempt` (1-based): `backoff`, then doubled each time.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

/// One download attempt. Writes through a temporary sibling so a failed
/// transfer never leaves a truncated file that would look cached.
async fn fetch_once(client: &reqwest::Client, url: &str, dest: &Path) -> std::result::Result<usize, String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.to_string())?;
    let body = response.bytes().await.map_err(|e| e.to_string())?;
    if body.is_empty() {
        return Err("empty response body".to_string());
    }

    let partial = dest.with_extension("part");
    tokio::fs::write(&partial, &body).await.map_err(|e| e.to_string())?;
    tokio::fs::rename(&partial, dest).await.map_err(|e| e.to_string())?;
    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_from_plain_pdf_url() {
        assert_eq!(
            local_file_name("https://www.adgm.com/documents/office-of-data-protection/templates/adgm-dpr-2021-appropriate-policy-document.pdf"),
            "adgm-dpr-2021-appropriate-policy-document.pdf"
        );
    }

    #[test]
    fn test_name_from_asset_url_with_trailing_id() {
        assert_eq!(
            local_file_name("https://assets.adgm.com/download/assets/ADGM+Standard+Employment+Contract+Template+-+ER+2024+(Feb+2025).docx/ee14b252edbe11efa63b12b3a30e5e3a"),
            "ADGM+Standard+Employment+Contract+Template+-+ER+2024+_Feb+2025_.docx"
        );
    }

    #[test]
    fn test_name_ignores_query_string() {
        assert_eq!(
            local_file_name("https://assets.adgm.com/download/assets/Templates_SHReso_AmendmentArticles-v1-20220107.docx/97120d7c5af911efae4b1e183375c0b2?forcedownload=1"),
            "Templates_SHReso_AmendmentArticles-v1-20220107.docx"
        );
    }

    #[test]
    fn test_name_infers_extension_from_url_text() {
        assert_eq!(
            local_file_name("https://example.com/files/guidance?format=.pdf"),
            "guidance.pdf"
        );
        assert_eq!(local_file_name("https://example.com/"), "adgm_ref");
    }

    #[test]
    fn test_names_are_filesystem_safe() {
        for url in crate::config::REFERENCE_URLS {
            let name = local_file_name(url);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "._+-".contains(c)));
            assert!(name.ends_with(".pdf") || name.ends_with(".docx"), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_cached_copies_are_reused_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://unreachable.invalid/docs/checklist.pdf".to_string();
        let config = CorpusConfig::offline(dir.path()).with_reference_urls(vec![url]);
        std::fs::create_dir_all(&config.reference_dir).unwrap();
        std::fs::write(config.reference_dir.join("checklist.pdf"), b"%PDF-1.4").unwrap();

        let paths = ensure_local_copies(&config).await.unwrap();
        assert_eq!(paths, vec![config.reference_dir.join("checklist.pdf")]);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let backoff = Duration::from_millis(500);
        let delays: Vec<Duration> = (1..=4).map(|attempt| retry_delay(backoff, attempt)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
        // Shift is capped so late attempts cannot overflow
        assert_eq!(retry_delay(backoff, 40), backoff * (1 << 16));
    }

    #[tokio::test]
    async fn test_retries_wait_between_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let config = CorpusConfig::offline(dir.path())
            .with_reference_urls(vec!["http://127.0.0.1:9/slow.pdf".to_string()])
            .with_fetch_policy(3, Duration::from_millis(40));
        std::fs::create_dir_all(&config.reference_dir).unwrap();

        let started = std::time::Instant::now();
        assert!(ensure_local_copies(&config).await.is_err());
        // 40ms after the first failure, 80ms after the second
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_exhausted_retries_name_the_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://127.0.0.1:9/missing.pdf".to_string();
        let config = CorpusConfig::offline(dir.path())
            .with_reference_urls(vec![url.clone()])
            .with_fetch_policy(2, Duration::from_millis(1));
        // An empty file is not a usable cache entry
        std::fs::create_dir_all(&config.reference_dir).unwrap();
        std::fs::write(config.reference_dir.join("missing.pdf"), b"").unwrap();

        match ensure_local_copies(&config).await {
            Err(CorpusError::Fetch { url: failed, attempts, .. }) => {
                assert_eq!(failed, url);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
