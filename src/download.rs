//! Downloads remote archives into the local cache directory.
//!
//! A cached file is trusted as-is: its presence is the only signal that a
//! download can be skipped.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::error::DownloadError;

/// Fetches a URL into a destination file.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), DownloadError>;
}

/// HTTP fetcher streaming the body to disk with a progress bar.
pub struct HttpFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(show_progress: bool) -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
            show_progress,
        }
    }

    fn progress_bar(&self, message: String) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        crate::cli::create_spinner(message)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        let transport = |source| DownloadError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let progress_bar = self.progress_bar(format!("Downloading {}", url));
        if let Some(total_size) = response.content_length().filter(|&n| n > 0) {
            progress_bar.set_length(total_size);
            progress_bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
                )
                .unwrap()
                .progress_chars("=> "),
            );
        }

        // Written beside the destination and renamed once complete, so an
        // interrupted transfer never looks like a cached file.
        let partial = partial_path(destination);
        let write_error = |source| DownloadError::Write {
            path: partial.clone(),
            source,
        };

        let mut file = File::create(&partial).map_err(write_error)?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = fs::remove_file(&partial);
                    return Err(transport(e));
                }
            };
            file.write_all(&chunk).map_err(write_error)?;
            downloaded += chunk.len() as u64;
            progress_bar.set_position(downloaded);
        }
        file.sync_all().map_err(write_error)?;
        drop(file);

        fs::rename(&partial, destination).map_err(|source| DownloadError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
        progress_bar.finish_with_message(format!("Downloaded {}", destination.display()));
        debug!(url, bytes = downloaded, "Download complete");

        Ok(())
    }
}

/// Ensures `url` is cached at `destination`, fetching it only when absent.
/// Returns whether a download happened.
pub async fn ensure_cached<F: Fetch>(
    fetcher: &F,
    url: &str,
    destination: &Path,
) -> Result<bool, DownloadError> {
    if destination.exists() {
        debug!(path = %destination.display(), "Using cached archive");
        return Ok(false);
    }

    info!(url, path = %destination.display(), "Downloading archive");
    fetcher.fetch(url, destination).await?;

    Ok(true)
}

/// Local cache path for a remote resource: its base name under `data_dir`.
pub fn cache_path(data_dir: &Path, url: &str) -> PathBuf {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    data_dir.join(file_name)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

// -- Tests -------------------------------------------------------------------
