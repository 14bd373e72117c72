//! # Media Fetcher Module
//!
//! Scarica in parallelo lo stream media e la copertina di un video risolto.
//!
//! ## Responsabilità:
//! - Avvia DUE fetch concorrenti: media (`<tmp>/<slug>.mp4`) e copertina (`<tmp>/<slug>.jpg`)
//! - Attende prima il media: se fallisce, l'intera operazione fallisce (`ConvertError::Fetch`)
//! - Solo dopo attende la copertina: qualunque errore degrada a "nessuna copertina"
//! - Normalizza la copertina tramite `ImageProcessor`
//!
//! ## Policy di degrado:
//! L'output audio non deve MAI essere bloccato dall'assenza della copertina.
//! Errori di rete, URL mancante o decodifica fallita vengono solo loggati.

use crate::error::ConvertError;
use crate::file_manager::{media_path, thumbnail_path};
use crate::image_processor::ImageProcessor;
use crate::resolver::ResolvedVideo;
use crate::utils::last_stderr_line;
use crate::args;
use async_trait::async_trait;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Local artifacts produced by a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub media: PathBuf,
    /// `None` when the cover could not be obtained
    pub thumbnail: Option<PathBuf>,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the media stream and, best-effort, the cover at `thumbnail_url`
    async fn fetch(
        &self,
        video: &ResolvedVideo,
        thumbnail_url: &str,
        slug: &str,
        tmp_dir: &Path,
    ) -> Result<FetchedMedia, ConvertError>;
}

/// Run the media and thumbnail fetches concurrently.
///
/// The media result is checked first; its failure aborts the thumbnail
/// fetch and fails the whole operation. A thumbnail failure only drops the
/// cover.
pub async fn join_fetches<M, T>(media: M, thumbnail: T) -> Result<FetchedMedia, ConvertError>
where
    M: Future<Output = Result<PathBuf, ConvertError>> + Send + 'static,
    T: Future<Output = Result<PathBuf, ConvertError>> + Send + 'static,
{
    let media_task = tokio::spawn(media);
    let thumbnail_task = tokio::spawn(thumbnail);

    let media = match media_task.await {
        Ok(Ok(path)) => path,
        Ok(Err(err)) => {
            thumbnail_task.abort();
            return Err(match err {
                ConvertError::Fetch(_) => err,
                other => ConvertError::Fetch(other.to_string()),
            });
        }
        Err(join_err) => {
            thumbnail_task.abort();
            return Err(ConvertError::Fetch(format!("Media download task failed: {}", join_err)));
        }
    };

    let thumbnail = match thumbnail_task.await {
        Ok(Ok(path)) => Some(path),
        Ok(Err(err)) => {
            warn!("Continuing without cover: {}", err);
            None
        }
        Err(join_err) => {
            warn!("Continuing without cover: thumbnail task failed: {}", join_err);
            None
        }
    };

    Ok(FetchedMedia { media, thumbnail })
}

/// Fetcher downloading media with `yt-dlp` and covers over HTTP
pub struct YtDlpFetcher {
    program: PathBuf,
    client: reqwest::Client,
    images: ImageProcessor,
}

impl YtDlpFetcher {
    pub fn new(program: PathBuf, images: ImageProcessor) -> Self {
        Self {
            program,
            client: reqwest::Client::new(),
            images,
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        video: &ResolvedVideo,
        thumbnail_url: &str,
        slug: &str,
        tmp_dir: &Path,
    ) -> Result<FetchedMedia, ConvertError> {
        let media = download_media(
            self.program.clone(),
            video.url.clone(),
            video.raw.clone(),
            media_path(tmp_dir, slug),
        );
        let thumbnail = download_thumbnail(
            self.client.clone(),
            self.images,
            thumbnail_url.to_string(),
            thumbnail_path(tmp_dir, slug),
        );

        join_fetches(media, thumbnail).await
    }
}

/// Stream the best format to `dst`, replaying the already resolved info document
async fn download_media(
    program: PathBuf,
    url: String,
    info: serde_json::Value,
    dst: PathBuf,
) -> Result<PathBuf, ConvertError> {
    info!("⬇️  Downloading media to {}", dst.display());
    let mut info_file = tempfile::Builder::new()
        .prefix("yt2mp3-info-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| ConvertError::Fetch(format!("Failed to create info file: {}", e)))?;
    let info_bytes = serde_json::to_vec(&info).map_err(|e| ConvertError::Fetch(e.to_string()))?;
    info_file
        .write_all(&info_bytes)
        .and_then(|_| info_file.flush())
        .map_err(|e| ConvertError::Fetch(format!("Failed to write info file: {}", e)))?;

    let load_arg = if info.is_null() { None } else { Some(info_file.path().to_path_buf()) };
    let mut cmd = Command::new(&program);
    match &load_arg {
        Some(path) => cmd.args(args!["--load-info-json", path.display()]),
        None => cmd.arg(&url),
    };
    cmd.args(args!["--no-warnings", "--no-progress", "-f", "best", "-o", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ConvertError::Fetch(format!("Failed to execute {}: {}", program.display(), e)))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ConvertError::Fetch("Failed to capture yt-dlp output".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| ConvertError::Fetch("Failed to capture yt-dlp stderr".to_string()))?;

    let mut file = tokio::fs::File::create(&dst)
        .await
        .map_err(|e| ConvertError::Fetch(format!("Failed to create {}: {}", dst.display(), e)))?;

    let mut stderr_buf = Vec::new();
    let (copied, _) = tokio::join!(
        tokio::io::copy(&mut stdout, &mut file),
        stderr.read_to_end(&mut stderr_buf)
    );
    let status = child
        .wait()
        .await
        .map_err(|e| ConvertError::Fetch(format!("Failed to wait for yt-dlp: {}", e)))?;

    if !status.success() {
        return Err(ConvertError::Fetch(last_stderr_line(&stderr_buf, "yt-dlp download failed")));
    }
    let bytes = copied.map_err(|e| ConvertError::Fetch(format!("Failed to write {}: {}", dst.display(), e)))?;
    if bytes == 0 {
        return Err(ConvertError::Fetch("yt-dlp produced no data".to_string()));
    }

    debug!("Downloaded {} bytes to {}", bytes, dst.display());
    Ok(dst)
}

/// Download the cover and normalize it into `dst`
async fn download_thumbnail(
    client: reqwest::Client,
    images: ImageProcessor,
    url: String,
    dst: PathBuf,
) -> Result<PathBuf, ConvertError> {
    if url.trim().is_empty() {
        return Err(ConvertError::Thumbnail("no thumbnail found".to_string()));
    }
    info!("🖼️  Downloading thumbnail...");

    let bytes = client
        .get(&url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|e| ConvertError::Thumbnail(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| ConvertError::Thumbnail(e.to_string()))?;

    images.normalize_file(bytes.to_vec(), &dst).await
}
