//! # File Management Module
//!
//! Questo modulo gestisce la disposizione dei file su disco.
//!
//! ## Responsabilità:
//! - Convenzioni di naming degli artefatti: `<tmp>/<slug>.mp4`, `<tmp>/<slug>.jpg`, `<out>/<slug>.mp3`
//! - Creazione delle directory di lavoro
//! - Elenco degli MP3 completati nella directory di output
//! - Pulizia opzionale degli artefatti temporanei
//! - Validazione dei nomi file richiesti dall'esterno
//!
//! ## Utilità:
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)

use crate::error::ConvertError;
use anyhow::Result;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

pub const MEDIA_EXTENSION: &str = "mp4";
pub const THUMBNAIL_EXTENSION: &str = "jpg";
pub const OUTPUT_EXTENSION: &str = "mp3";

/// `<tmp>/<slug>.mp4`
pub fn media_path(tmp_dir: &Path, slug: &str) -> PathBuf {
    tmp_dir.join(format!("{}.{}", slug, MEDIA_EXTENSION))
}

/// `<tmp>/<slug>.jpg`
pub fn thumbnail_path(tmp_dir: &Path, slug: &str) -> PathBuf {
    tmp_dir.join(format!("{}.{}", slug, THUMBNAIL_EXTENSION))
}

/// `<out>/<slug>.mp3`
pub fn output_path(out_dir: &Path, slug: &str) -> PathBuf {
    out_dir.join(format!("{}.{}", slug, OUTPUT_EXTENSION))
}

/// A finished audio file found in the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: u64,
}

/// Manages artifact layout and output discovery
pub struct FileManager;

impl FileManager {
    /// Create `dir` and its parents if missing
    pub async fn ensure_dir(dir: &Path) -> Result<(), ConvertError> {
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    /// Get information about a file (size and modification time)
    pub async fn get_file_info(path: &Path) -> Result<(u64, u64)> {
        let metadata = fs::metadata(path).await?;
        let size = metadata.len();
        let modified = metadata
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        Ok((size, modified))
    }

    /// List the MP3 files directly inside `out_dir`, sorted by name
    pub fn list_outputs(out_dir: &Path) -> Result<Vec<OutputEntry>> {
        let mut outputs = Vec::new();
        if !out_dir.is_dir() {
            return Ok(outputs);
        }

        for entry in WalkDir::new(out_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::is_audio_output(path) {
                continue;
            }
            let metadata = entry.metadata()?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or_default();
            outputs.push(OutputEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_path_buf(),
                size: metadata.len(),
                modified,
            });
        }

        outputs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(outputs)
    }

    /// Check if a file is a finished audio output
    pub fn is_audio_output(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(OUTPUT_EXTENSION))
            .unwrap_or(false)
    }

    /// Reject names that could escape the output directory
    pub fn check_file_name(name: &str) -> Result<&str, ConvertError> {
        if name.trim().is_empty() {
            return Err(ConvertError::Validation("No filename provided".to_string()));
        }

        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ConvertError::Validation(format!("Invalid filename: {}", name)));
        }
        Ok(name)
    }

    /// Remove the temporary media and cover of `slug`, ignoring missing files
    pub async fn remove_artifacts(tmp_dir: &Path, slug: &str) {
        for path in [media_path(tmp_dir, slug), thumbnail_path(tmp_dir, slug)] {
            match fs::remove_file(&path).await {
                Ok(()) => debug!("🧹 Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!("Could not remove {}: {}", path.display(), e),
            }
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_paths() {
        let tmp = Path::new("/tmp/work");
        assert_eq!(media_path(tmp, "song"), PathBuf::from("/tmp/work/song.mp4"));
        assert_eq!(thumbnail_path(tmp, "song"), PathBuf::from("/tmp/work/song.jpg"));
        assert_eq!(output_path(Path::new("/music"), "song"), PathBuf::from("/music/song.mp3"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(1536), "1.50 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_check_file_name() {
        assert!(FileManager::check_file_name("song.mp3").is_ok());
        for bad in ["", "  ", "../etc/passwd", "a/b.mp3", "..", "a\\b.mp3", "/abs.mp3"] {
            assert!(
                matches!(FileManager::check_file_name(bad), Err(ConvertError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_list_outputs_only_top_level_mp3() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"12345").unwrap();
        std::fs::write(dir.path().join("a.MP3"), b"1").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"video").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.mp3"), b"x").unwrap();

        let outputs = FileManager::list_outputs(dir.path()).unwrap();
        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["a.MP3", "b.mp3"]);
        assert_eq!(outputs[1].size, 5);

        assert!(FileManager::list_outputs(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_artifacts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(media_path(dir.path(), "song"), b"m").unwrap();

        FileManager::remove_artifacts(dir.path(), "song").await;
        assert!(!media_path(dir.path(), "song").exists());
        assert!(!thumbnail_path(dir.path(), "song").exists());
    }

    #[tokio::test]
    async fn test_ensure_dir_and_file_info() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        FileManager::ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());

        let file = nested.join("x.mp3");
        std::fs::write(&file, b"abc").unwrap();
        let (size, _) = FileManager::get_file_info(&file).await.unwrap();
        assert_eq!(size, 3);
    }
}
