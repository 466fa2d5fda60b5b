// src/item/url.rs

//! Read-only items backed by remote URLs

use super::{DeleteOutcome, Item, ItemHandle, OpenMode};
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::io::{self, Write};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;
use ::url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A resource reachable over HTTP(S)
///
/// Opening the item downloads it into a temporary file that lives exactly as
/// long as the returned handle. Writes and deletes are refused.
#[derive(Debug, Clone)]
pub struct UrlItem {
    url: Url,
    name: String,
    client: Client,
}

impl UrlItem {
    /// Create an item for `url`
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidPath(format!("{url}: {e}")))?;
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: parsed.to_string(),
            url: parsed,
            client,
        })
    }

    /// The parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn materialize(&self) -> Result<NamedTempFile> {
        let mut response = self
            .client
            .get(self.url.clone())
            .send()
            .map_err(|e| Error::DownloadError(format!("{}: {e}", self.url)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let mut temp = NamedTempFile::new()?;
        let downloaded = io::copy(&mut response, temp.as_file_mut())
            .map_err(|e| Error::DownloadError(format!("{}: {e}", self.url)))?;
        temp.flush()?;

        debug!("Materialised {} ({} bytes)", self.url, downloaded);
        Ok(temp)
    }
}

impl Item for UrlItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        match self.client.head(self.url.clone()).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", self.url, e);
                false
            }
        }
    }

    fn open(&self, mode: OpenMode) -> Result<ItemHandle> {
        if mode != OpenMode::Read {
            return Err(Error::ReadOnly(self.name.clone()));
        }
        let temp = self.materialize()?;
        ItemHandle::materialized(self.name.clone(), temp)
    }

    fn delete(&self, _final_delete: bool) -> DeleteOutcome {
        DeleteOutcome::Failed {
            name: self.name.clone(),
            reason: "URL items are read-only".to_string(),
        }
    }
}
