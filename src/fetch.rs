//! Downloading documents and tables by URL

use crate::config::FetchSettings;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Downloaded bytes with the content type reported by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of remote documents
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Fetch the full body at `url`
    async fn fetch(&self, url: &Url) -> Result<Blob>;
}

/// Fetcher for `http`, `https` and `file` URLs
pub struct HttpBlobFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpBlobFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }

    fn too_large(&self, url: &Url) -> ServiceError {
        ServiceError::download(
            None,
            format!("{} exceeds the {} byte limit", url, self.max_bytes),
        )
    }

    async fn fetch_http(&self, url: &Url) -> Result<Blob> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ServiceError::download(None, format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "download failed");
            return Err(ServiceError::download(
                Some(status.as_u16()),
                format!("{} returned {}", url, status),
            ));
        }

        if response
            .content_length()
            .map_or(false, |len| len > self.max_bytes as u64)
        {
            return Err(self.too_large(url));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ServiceError::download(Some(status.as_u16()), format!("{}: {}", url, e)))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(%url, bytes = bytes.len(), "downloaded");
        Ok(Blob {
            bytes,
            content_type,
        })
    }

    async fn fetch_file(&self, url: &Url) -> Result<Blob> {
        let path = url
            .to_file_path()
            .map_err(|_| ServiceError::download(None, format!("{} is not a local path", url)))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ServiceError::download(None, format!("{}: {}", path.display(), e)))?;
        if metadata.len() > self.max_bytes as u64 {
            return Err(self.too_large(url));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ServiceError::download(None, format!("{}: {}", path.display(), e)))?;
        let content_type = content_type_for_extension(&path).map(str::to_string);
        Ok(Blob {
            bytes,
            content_type,
        })
    }
}

fn content_type_for_extension(path: &std::path::Path) -> Option<&'static str> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "csv" => Some("text/csv"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &Url) -> Result<Blob> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => self.fetch_file(url).await,
            other => Err(ServiceError::download(
                None,
                format!("Unsupported URL scheme '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fetcher(max_bytes: usize) -> HttpBlobFetcher {
        HttpBlobFetcher::new(&FetchSettings {
            timeout_secs: 5,
            max_bytes,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "date,value\n2024-01-01,1\n").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let blob = fetcher(1024).fetch(&url).await.unwrap();
        assert_eq!(blob.bytes, b"date,value\n2024-01-01,1\n");
        assert_eq!(blob.content_type.as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn test_oversize_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 64]).unwrap();
        let url = Url::from_file_path(file.path()).unwrap();

        let result = fetcher(16).fetch(&url).await;
        assert!(matches!(result, Err(ServiceError::Download { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let url = Url::parse("ftp://example.com/data.csv").unwrap();
        let result = fetcher(16).fetch(&url).await;
        assert!(matches!(result, Err(ServiceError::Download { status: None, .. })));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let url = Url::parse("file:///nonexistent/finsight/table.csv").unwrap();
        assert!(fetcher(16).fetch(&url).await.is_err());
    }
}
