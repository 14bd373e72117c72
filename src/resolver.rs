//! # Video Resolver Module
//!
//! Trasforma un URL in metadati canonici e in un handle scaricabile.
//!
//! ## Responsabilità:
//! - Interroga `yt-dlp -J` per ottenere il documento info del video
//! - Estrae titolo, artista (con fallback sul canale), album e thumbnail
//! - Conserva il documento grezzo così il download non ripete la risoluzione
//!
//! La risoluzione è una query pura: nessun file viene scritto su disco.

use crate::error::ConvertError;
use crate::utils::last_stderr_line;
use crate::args;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Subset of the yt-dlp info document the pipeline cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub channel: Option<String>,
    pub uploader: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub thumbnail: Option<String>,
    pub webpage_url: Option<String>,
    pub duration: Option<f64>,
}

/// A resolved video: metadata plus the handle used to stream its media
#[derive(Debug, Clone)]
pub struct ResolvedVideo {
    pub url: String,
    pub info: VideoInfo,
    /// Raw info document, replayed to the downloader
    pub raw: serde_json::Value,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ResolvedVideo {
    pub fn from_info_json(url: &str, raw: serde_json::Value) -> Result<Self, ConvertError> {
        let info: VideoInfo = serde_json::from_value(raw.clone())
            .map_err(|e| ConvertError::Resolve(format!("Failed to parse yt-dlp response: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            info,
            raw,
        })
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    /// Artist tag, falling back to the channel and then the uploader
    pub fn artist(&self) -> &str {
        non_empty(&self.info.artist)
            .or_else(|| non_empty(&self.info.channel))
            .or_else(|| non_empty(&self.info.uploader))
            .unwrap_or_default()
    }

    pub fn album(&self) -> &str {
        non_empty(&self.info.album).unwrap_or_default()
    }

    pub fn thumbnail(&self) -> &str {
        non_empty(&self.info.thumbnail).unwrap_or_default()
    }
}

#[async_trait]
pub trait VideoResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedVideo, ConvertError>;
}

/// Resolver backed by the `yt-dlp` command line tool
pub struct YtDlpResolver {
    program: PathBuf,
}

impl YtDlpResolver {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

fn check_url(url: &str) -> Result<&str, ConvertError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConvertError::Validation("No video url provided".to_string()));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) || url.contains(char::is_whitespace) {
        return Err(ConvertError::Resolve(format!("Unsupported URL: {}", url)));
    }
    Ok(url)
}

#[async_trait]
impl VideoResolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedVideo, ConvertError> {
        let url = check_url(url)?;
        debug!("🔎 Resolving {}", url);

        let output = Command::new(&self.program)
            .args(args!["-J", "--no-playlist", "--no-warnings", url])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConvertError::Resolve(format!("Failed to execute {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(ConvertError::Resolve(last_stderr_line(&output.stderr, "yt-dlp failed")));
        }

        let raw: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ConvertError::Resolve(format!("Failed to parse yt-dlp response: {}", e)))?;
        let video = ResolvedVideo::from_info_json(url, raw)?;

        info!("Resolved \"{}\" by {}", video.title(), video.artist());
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "channel": "Rick Astley",
            "uploader": "RickAstleyVEVO",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.webp",
            "duration": 212.0,
            "formats": [{"format_id": "18"}]
        })
    }

    #[test]
    fn test_parse_info_document() {
        let video = ResolvedVideo::from_info_json("https://youtu.be/dQw4w9WgXcQ", sample()).unwrap();
        assert_eq!(video.title(), "Never Gonna Give You Up");
        assert_eq!(video.artist(), "Rick Astley");
        assert_eq!(video.album(), "");
        assert!(video.thumbnail().ends_with(".webp"));
        assert_eq!(video.raw["formats"][0]["format_id"], "18");
    }

    #[test]
    fn test_artist_prefers_artist_field() {
        let mut raw = sample();
        raw["artist"] = json!("Rick Astley (Official)");
        raw["album"] = json!("Whenever You Need Somebody");
        let video = ResolvedVideo::from_info_json("u", raw).unwrap();
        assert_eq!(video.artist(), "Rick Astley (Official)");
        assert_eq!(video.album(), "Whenever You Need Somebody");
    }

    #[test]
    fn test_artist_falls_back_to_uploader() {
        let raw = json!({"title": "t", "channel": "  ", "uploader": "someone"});
        let video = ResolvedVideo::from_info_json("u", raw).unwrap();
        assert_eq!(video.artist(), "someone");
    }

    #[test]
    fn test_check_url() {
        assert!(matches!(check_url(""), Err(ConvertError::Validation(_))));
        assert!(matches!(check_url("ftp://x"), Err(ConvertError::Resolve(_))));
        assert!(matches!(check_url("https://a b"), Err(ConvertError::Resolve(_))));
        assert_eq!(check_url(" https://youtu.be/x ").unwrap(), "https://youtu.be/x");
    }

    #[tokio::test]
    async fn test_missing_binary_is_resolve_error() {
        let resolver = YtDlpResolver::new(PathBuf::from("/nonexistent/yt-dlp"));
        let err = resolver.resolve("https://youtu.be/x").await.unwrap_err();
        assert!(matches!(err, ConvertError::Resolve(_)));
    }
}
