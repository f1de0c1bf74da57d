//! Leaf visitors reading manifests from files, streams and URLs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::client::http_fetch::{read_http_with_retries, HttpGet};
use crate::domain::resource::info_mapper::InfoMapper;
use crate::domain::resource::visitor::VisitorFn;
use crate::errors::ResourceError;

/// Label used for objects read from standard input.
pub const STDIN_SOURCE: &str = "STDIN";

pub type ManifestReader = Box<dyn AsyncRead + Send + Unpin>;

/// Decodes every document in `data` and relays each one, or its decode
/// failure, to `f`.
async fn visit_manifest_bytes(
    mapper: &InfoMapper,
    data: &[u8],
    source: &str,
    f: &mut dyn VisitorFn,
) -> Result<(), ResourceError> {
    let documents = mapper.decoder.split_documents(data, source)?;
    debug!("Read {} document(s) from {}", documents.len(), source);
    for document in documents {
        let item = mapper.info_for_data(document, source).await;
        f.call(item).await?;
    }
    Ok(())
}

/// A manifest file on disk, read anew on every visit.
pub struct FileSource {
    path: PathBuf,
    mapper: Arc<InfoMapper>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, mapper: Arc<InfoMapper>) -> Self {
        Self {
            path: path.into(),
            mapper,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn visit(&self, f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
        let display = self.path.display().to_string();
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ResourceError::io(&display, e))?;
        visit_manifest_bytes(&self.mapper, &data, &display, f).await
    }
}

/// A byte stream that can be read once. Later visits yield nothing.
pub struct StreamSource {
    reader: Mutex<Option<ManifestReader>>,
    source: String,
    mapper: Arc<InfoMapper>,
}

impl StreamSource {
    pub fn new(reader: ManifestReader, source: &str, mapper: Arc<InfoMapper>) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            source: source.to_string(),
            mapper,
        }
    }

    pub fn stdin(mapper: Arc<InfoMapper>) -> Self {
        Self::new(Box::new(tokio::io::stdin()), STDIN_SOURCE, mapper)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub async fn is_consumed(&self) -> bool {
        self.reader.lock().await.is_none()
    }

    pub(crate) async fn visit(&self, f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
        let Some(mut reader) = self.reader.lock().await.take() else {
            debug!("{} was already consumed; nothing to visit", self.source);
            return Ok(());
        };

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| ResourceError::io(&self.source, e))?;
        visit_manifest_bytes(&self.mapper, &data, &self.source, f).await
    }
}

/// A manifest served over HTTP(S). The body is fetched on the first visit
/// only.
pub struct UrlSource {
    url: String,
    attempts: i32,
    retry_delay: Duration,
    getter: Arc<dyn HttpGet>,
    consumed: AtomicBool,
    mapper: Arc<InfoMapper>,
}

impl UrlSource {
    pub fn new(
        url: &str,
        attempts: i32,
        retry_delay: Duration,
        getter: Arc<dyn HttpGet>,
        mapper: Arc<InfoMapper>,
    ) -> Self {
        Self {
            url: url.to_string(),
            attempts,
            retry_delay,
            getter,
            consumed: AtomicBool::new(false),
            mapper,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn visit(&self, f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
        if self.consumed.swap(true, Ordering::SeqCst) {
            debug!("{} was already read; nothing to visit", self.url);
            return Ok(());
        }

        let body = read_http_with_retries(self.getter.as_ref(), self.retry_delay, &self.url, self.attempts).await?;
        visit_manifest_bytes(&self.mapper, &body, &self.url, f).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::http_fetch::HttpResponse;
    use crate::domain::resource::info::Info;
    use crate::test_support::fake_mapper;
    use async_trait::async_trait;
    use http::StatusCode;
    use std::io::Write;

    const PODS: &str = "\
apiVersion: v1
kind: Pod
metadata: {name: a, namespace: x}
---
apiVersion: v1
kind: Pod
metadata: {name: b, namespace: x}
";

    fn recorder(seen: &mut Vec<Result<String, String>>) -> impl FnMut(Result<Info, ResourceError>) -> Result<(), ResourceError> + Send + '_ {
        move |item| {
            seen.push(item.map(|i| i.name).map_err(|e| e.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn file_documents_are_visited_in_order() {
        let (mapper, _) = fake_mapper();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PODS.as_bytes()).unwrap();
        let source = FileSource::new(file.path(), Arc::new(mapper));

        let mut seen = Vec::new();
        source.visit(&mut recorder(&mut seen)).await.unwrap();
        assert_eq!(seen, vec![Ok("a".to_string()), Ok("b".to_string())]);
    }

    #[tokio::test]
    async fn missing_file_fails_the_visit() {
        let (mapper, _) = fake_mapper();
        let source = FileSource::new("/definitely/not/here.yaml", Arc::new(mapper));
        let mut seen = Vec::new();
        let err = source.visit(&mut recorder(&mut seen)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Io { .. }));
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn decode_failures_are_relayed_per_document() {
        let (mapper, _) = fake_mapper();
        let input = "apiVersion: v1\nkind: Pod\nmetadata: {name: a}\n---\napiVersion: v1\nmetadata: {name: nokind}\n";
        let source = StreamSource::new(Box::new(input.as_bytes()), "input", Arc::new(mapper));

        let mut seen = Vec::new();
        source.visit(&mut recorder(&mut seen)).await.unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_ok());
        assert!(seen[1].as_ref().unwrap_err().contains("'kind' is missing"));
    }

    #[tokio::test]
    async fn stream_is_read_once() {
        let (mapper, _) = fake_mapper();
        let source = StreamSource::new(Box::new(PODS.as_bytes()), "input", Arc::new(mapper));

        let mut first = Vec::new();
        source.visit(&mut recorder(&mut first)).await.unwrap();
        assert!(source.is_consumed().await);

        let mut second = Vec::new();
        source.visit(&mut recorder(&mut second)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }

    struct Serving(&'static str);

    #[async_trait]
    impl HttpGet for Serving {
        async fn get(&self, _url: &str) -> Result<HttpResponse, ResourceError> {
            Ok(HttpResponse {
                status: StatusCode::OK,
                body: self.0.as_bytes().to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn url_body_is_fetched_once() {
        let (mapper, _) = fake_mapper();
        let source = UrlSource::new(
            "https://example.com/pods.yaml",
            3,
            Duration::from_millis(1),
            Arc::new(Serving(PODS)),
            Arc::new(mapper),
        );

        let mut first = Vec::new();
        source.visit(&mut recorder(&mut first)).await.unwrap();
        let mut second = Vec::new();
        source.visit(&mut recorder(&mut second)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }
}
