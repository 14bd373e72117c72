//! # Converter Service Module
//!
//! Superficie esterna della pipeline: le quattro operazioni richieste dai
//! client (anteprima, invio, elenco, download).
//!
//! ## Operazioni:
//! - `resolve()`: anteprima dei metadati senza creare task
//! - `submit()`: accoda un task e ritorna subito il record pending
//! - `list_tasks()`: storico recente, dal più vecchio al più recente
//! - `fetch_output()`: apre `<out_dir>/<filename>` come `audio/mpeg`

use crate::error::ConvertError;
use crate::file_manager::FileManager;
use crate::resolver::VideoResolver;
use crate::slug::slug_or_fallback;
use crate::store::TaskStore;
use crate::task::{Task, TaskHandle, TaskRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Metadata shown before a conversion is submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoPreview {
    pub url: String,
    pub slug: String,
    pub thumbnail: String,
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// An opened output file, ready to be streamed to a client
#[derive(Debug)]
pub struct OutputFile {
    pub name: String,
    pub path: PathBuf,
    pub file: tokio::fs::File,
    pub len: u64,
    pub content_type: &'static str,
    /// `attachment; filename=<name>` when a download was requested
    pub content_disposition: Option<String>,
}

pub struct ConverterService {
    store: Arc<TaskStore>,
    resolver: Arc<dyn VideoResolver>,
    out_dir: PathBuf,
}

impl ConverterService {
    pub fn new(store: Arc<TaskStore>, resolver: Arc<dyn VideoResolver>, out_dir: PathBuf) -> Self {
        Self {
            store,
            resolver,
            out_dir,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub async fn resolve(&self, url: &str) -> Result<VideoPreview, ConvertError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConvertError::Validation("No video url provided".to_string()));
        }

        let video = self.resolver.resolve(url).await?;
        Ok(VideoPreview {
            url: url.to_string(),
            slug: slug_or_fallback(video.title(), url),
            thumbnail: video.thumbnail().to_string(),
            title: video.title().to_string(),
            artist: video.artist().to_string(),
            album: video.album().to_string(),
        })
    }

    /// Queue a conversion; the returned handle reflects later progress
    pub fn submit(&self, request: TaskRequest) -> Result<TaskHandle, ConvertError> {
        self.store.submit(request)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.store.list()
    }

    pub async fn fetch_output(&self, filename: &str, download: bool) -> Result<OutputFile, ConvertError> {
        let name = FileManager::check_file_name(filename)?;
        if !FileManager::is_audio_output(Path::new(name)) {
            return Err(ConvertError::Validation(format!("Not an audio file: {}", name)));
        }
        let path = self.out_dir.join(name);

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ConvertError::NotFound(name.to_string()));
        }

        debug!("Serving {} ({} bytes)", path.display(), metadata.len());
        Ok(OutputFile {
            name: name.to_string(),
            path,
            file,
            len: metadata.len(),
            content_type: AUDIO_CONTENT_TYPE,
            content_disposition: download.then(|| format!("attachment; filename={}", name)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::ResolvedVideo;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio_test::{assert_err, assert_ok};

    struct StaticResolver;

    #[async_trait]
    impl VideoResolver for StaticResolver {
        async fn resolve(&self, url: &str) -> Result<ResolvedVideo, ConvertError> {
            if url.starts_with("ftp://") {
                return Err(ConvertError::Resolve(format!("Unsupported URL: {}", url)));
            }
            ResolvedVideo::from_info_json(
                url,
                serde_json::json!({"title": "Hello, World!", "uploader": "Uploader"}),
            )
        }
    }

    fn service(dir: &TempDir) -> ConverterService {
        ConverterService::new(
            Arc::new(TaskStore::default()),
            Arc::new(StaticResolver),
            dir.path().to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_resolve_preview() {
        let dir = TempDir::new().unwrap();
        let preview = assert_ok!(service(&dir).resolve(" https://youtu.be/x ").await);
        assert_eq!(preview.url, "https://youtu.be/x");
        assert_eq!(preview.slug, "hello-world");
        assert_eq!(preview.artist, "Uploader");
        assert_eq!(preview.album, "");
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        assert_eq!(assert_err!(svc.resolve("").await).kind(), ErrorKind::Validation);
        assert_eq!(assert_err!(svc.resolve("ftp://x").await).kind(), ErrorKind::Resolve);
        assert!(svc.list_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_submit_and_list() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let handle = assert_ok!(svc.submit(TaskRequest::new("https://youtu.be/a")));
        assert!(handle.is_pending());
        assert_err!(svc.submit(TaskRequest::new("")));

        let tasks = svc.list_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, handle.id());
    }

    #[tokio::test]
    async fn test_fetch_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("song.mp3"), b"ID3data").unwrap();
        let svc = service(&dir);

        let mut out = assert_ok!(svc.fetch_output("song.mp3", false).await);
        assert_eq!(out.content_type, "audio/mpeg");
        assert_eq!(out.content_disposition, None);
        assert_eq!(out.len, 7);
        let mut body = Vec::new();
        out.file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"ID3data");

        let out = assert_ok!(svc.fetch_output("song.mp3", true).await);
        assert_eq!(out.content_disposition.as_deref(), Some("attachment; filename=song.mp3"));
    }

    #[tokio::test]
    async fn test_fetch_output_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("folder.mp3")).unwrap();
        let svc = service(&dir);

        assert_eq!(assert_err!(svc.fetch_output("", false).await).kind(), ErrorKind::Validation);
        assert_eq!(assert_err!(svc.fetch_output("../secret.mp3", true).await).kind(), ErrorKind::Validation);
        assert_eq!(assert_err!(svc.fetch_output("missing.mp3", false).await).kind(), ErrorKind::NotFound);
        assert_eq!(assert_err!(svc.fetch_output("folder.mp3", false).await).kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_output_serves_only_audio() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("song.mp4"), b"media").unwrap();
        let svc = service(&dir);

        assert_eq!(assert_err!(svc.fetch_output("config.json", false).await).kind(), ErrorKind::Validation);
        assert_eq!(assert_err!(svc.fetch_output("song.mp4", true).await).kind(), ErrorKind::Validation);
        assert_eq!(assert_err!(svc.fetch_output("noextension", false).await).kind(), ErrorKind::Validation);
    }
}
