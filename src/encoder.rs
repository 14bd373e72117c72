//! # Audio Encoder Module
//!
//! Produce il file MP3 finale con tag ID3 e copertina incorporata.
//!
//! ## Pipeline ffmpeg:
//! - Input 0: media scaricato (solo traccia audio, `-map 0:a`)
//! - Input 1 (opzionale): copertina JPEG come stream `attached_pic`
//! - Tag: `title`, `artist`, `album` in ID3v2.3 + ID3v1
//! - Output sovrascritto se già esistente (`-y`)
//!
//! ## Errori:
//! Ogni fallimento (sorgente mancante, codec, exit code != 0) è
//! `ConvertError::Encode` ed è fatale per il task.

use crate::error::ConvertError;
use crate::utils::last_stderr_line;
use crate::args;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Tag values written into the audio file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// Everything needed to produce one audio file
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub media: PathBuf,
    pub cover: Option<PathBuf>,
    pub tags: AudioTags,
    pub output: PathBuf,
}

#[async_trait]
pub trait AudioEncoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, ConvertError>;
}

/// Encoder backed by the `ffmpeg` command line tool
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

/// ffmpeg arguments for `job`
pub fn build_args(job: &EncodeJob) -> Vec<String> {
    let mut args = args!["-hide_banner", "-loglevel", "error", "-y", "-i", job.media.display()];

    if let Some(cover) = &job.cover {
        args.extend(args!["-i", cover.display()]);
    }

    args.extend(args!["-map", "0:a"]);
    if job.cover.is_some() {
        args.extend(args![
            "-map", "1:v",
            "-c:v", "copy",
            "-disposition:v", "attached_pic",
            "-metadata:s:v", "title=Album cover",
            "-metadata:s:v", "comment=Cover (front)",
        ]);
    }

    args.extend(args![
        "-f", "mp3",
        "-id3v2_version", 3,
        "-write_id3v1", 1,
        "-metadata", format!("title={}", job.tags.title),
        "-metadata", format!("artist={}", job.tags.artist),
        "-metadata", format!("album={}", job.tags.album),
        job.output.display(),
    ]);

    args
}

#[async_trait]
impl AudioEncoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, ConvertError> {
        if !job.media.is_file() {
            return Err(ConvertError::Encode(format!(
                "Source media not found: {}",
                job.media.display()
            )));
        }

        info!("🎵 Converting {} -> {}", file_name(&job.media), job.output.display());
        let start_time = std::time::Instant::now();

        let output = Command::new(&self.program)
            .args(build_args(job))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConvertError::Encode(format!("Failed to execute {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(ConvertError::Encode(last_stderr_line(&output.stderr, "ffmpeg failed")));
        }

        debug!("Encoding completed in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(job.output.clone())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}
