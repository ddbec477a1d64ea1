//! Loads raw bytes from a local path or over HTTP.

use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::debug;

/// Returns `true` when `source` should be fetched over HTTP.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads `source` from disk, or downloads it when it is an `http(s)` URL.
#[tracing::instrument]
pub async fn load_bytes(source: &str) -> Result<Vec<u8>> {
    if is_remote(source) {
        fetch_bytes(source).await
    } else {
        Ok(tokio::fs::read(source).await?)
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Request returned status {}: {}", status, body));
    }

    let bytes = response.bytes().await?.to_vec();
    debug!(bytes = bytes.len(), "Remote source downloaded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://gmao.example/expected.json"));
        assert!(is_remote("http://localhost/expected.json"));
        assert!(!is_remote("config/audit.json"));
        assert!(!is_remote("httpdocs/audit.json"));
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = load_bytes("/nonexistent/gmao_completeness/audit.json").await;
        assert!(result.is_err());
    }
}
