//! Whole-document reads from a local directory or an HTTP(S) blob endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::Document;
use crate::error::{ProviderError, ProviderResult};

/// Source of MOU text.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Read the named document as UTF-8 text.
    async fn read_text(&self, name: &str) -> ProviderResult<String>;

    /// Read the named document and wrap it as a [`Document`].
    async fn load(&self, name: &str) -> ProviderResult<Document> {
        let text = self.read_text(name).await?;
        let document = Document::new(name, text);
        crate::log_event!(
            "ingest",
            "loaded",
            "{} ({} words)",
            name,
            document.word_count()
        );
        Ok(document)
    }
}

/// Reads documents from the filesystem, relative to a root directory.
///
/// Absolute names bypass the root.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn read_text(&self, name: &str) -> ProviderResult<String> {
        let path = self.resolve(name);
        tracing::debug!(target: "ingest", "reading {}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

/// Reads documents with a GET against `{base_url}/{name}{query}`.
///
/// `query` carries access tokens such as a SAS signature (`?sv=...`).
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: Client,
    base_url: String,
    query: String,
    timeout: Duration,
}

impl HttpDocumentSource {
    pub fn new(base_url: &str, query: Option<&str>, timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            query: query.unwrap_or_default().to_string(),
            timeout,
        })
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}{}", self.base_url, name.trim_start_matches('/'), self.query)
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn read_text(&self, name: &str) -> ProviderResult<String> {
        let url = self.url_for(name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("blob store", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                service: "blob store",
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest("blob store", self.timeout, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_source_reads_relative_to_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mou.txt"), "Purpose of this MOU").unwrap();

        let source = FsDocumentSource::new(dir.path());
        let doc = source.load("mou.txt").await.unwrap();

        assert_eq!(doc.text(), "Purpose of this MOU");
        assert_eq!(doc.word_count(), 4);
        assert_eq!(doc.source(), "mou.txt");
    }

    #[tokio::test]
    async fn test_fs_source_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = FsDocumentSource::new(dir.path());

        let err = source.read_text("absent.txt").await.unwrap_err();
        assert!(matches!(err, ProviderError::Io(_)));
    }

    #[test]
    fn test_http_source_url_building() {
        let source = HttpDocumentSource::new(
            "https://store.example.net/mous/",
            Some("?sv=2024&sig=abc"),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            source.url_for("/proper_mou_document.txt"),
            "https://store.example.net/mous/proper_mou_document.txt?sv=2024&sig=abc"
        );
    }
}
