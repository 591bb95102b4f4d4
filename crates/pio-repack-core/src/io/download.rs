//! Streaming HTTP downloads.
//!
//! Artifacts are fetched with a single GET and written to disk chunk by
//! chunk, verbatim. There is no retry, resume or integrity check.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::types::PlatformKey;

/// Errors raised while downloading an artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The destination file could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the HTTP client used for all downloads of a run.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_client() -> Result<Client, DownloadError> {
    Ok(Client::builder().user_agent(crate::USER_AGENT).build()?)
}

/// Download `url` into `dest`, returning the number of bytes written.
///
/// The body is streamed straight to disk. A non-success status or a
/// failure mid-stream is an error and leaves no file behind.
///
/// # Errors
///
/// Returns [`DownloadError::Http`] on transport errors or bad status, and
/// [`DownloadError::Io`] if writing fails.
pub async fn download_to_file<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    platform: &PlatformKey,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length();
    reporter.downloading(platform, 0, total_size);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    let streamed: Result<(), DownloadError> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            reporter.downloading(platform, downloaded, total_size);
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = streamed {
        drop(file);
        if let Err(rm) = tokio::fs::remove_file(dest).await {
            tracing::warn!(
                dest = %dest.display(),
                error = %rm,
                "failed to remove partial download"
            );
        }
        return Err(e);
    }

    tracing::debug!(%url, dest = %dest.display(), bytes = downloaded, "download complete");

    Ok(downloaded)
}
