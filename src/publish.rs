//! Uploads a written report to S3.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Gzip-compresses `bytes` with the default level.
pub fn gzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Object key for one report file: `<prefix>/date=<YYYY-MM-DD>/<file>[.gz]`.
pub fn object_key(prefix: &str, date: NaiveDate, file_name: &str, gzip: bool) -> String {
    let prefix = prefix.trim_matches('/');
    let suffix = if gzip { ".gz" } else { "" };
    if prefix.is_empty() {
        format!("date={}/{}{}", date.format("%Y-%m-%d"), file_name, suffix)
    } else {
        format!(
            "{}/date={}/{}{}",
            prefix,
            date.format("%Y-%m-%d"),
            file_name,
            suffix
        )
    }
}

fn content_type(file_name: &str) -> &'static str {
    if file_name.ends_with(".json") {
        "application/json"
    } else {
        "text/csv; charset=utf-8"
    }
}

/// Uploads every file in `paths`, optionally gzip-compressed.
#[tracing::instrument(skip(client, paths))]
pub async fn publish_report(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    date: NaiveDate,
    paths: &[PathBuf],
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;

    for path in paths {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("invalid report path '{}'", path.display()))?;

        let contents = tokio::fs::read(path).await?;
        let body = if gzip { gzip_bytes(&contents)? } else { contents };
        let key = object_key(prefix, date, file_name, gzip);

        let mut request = client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type(file_name));
        if gzip {
            request = request.content_encoding("gzip");
        }
        request
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for '{key}'"))?;

        upload_count += 1;
    }

    info!(upload_count, "S3 upload complete");
    Ok(upload_count)
}
