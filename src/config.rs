//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri della pipeline
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Applica override da variabili d'ambiente (`OUT_DIR`, `TMP_DIR`, ...)
//!
//! ## Parametri di configurazione:
//! - `out_dir`: Directory dei file MP3 completati (default: temp di sistema)
//! - `tmp_dir`: Directory di lavoro per video e copertine (default: temp di sistema)
//! - `history_capacity`: Numero di task recenti mantenuti (default: 20)
//! - `thumbnail_size`: Lato della copertina quadrata (default: 512)
//! - `jpeg_quality`: Qualità JPEG della copertina (1-100, default: 75)
//! - `ytdlp_path` / `ffmpeg_path`: Override dei tool esterni
//! - `cleanup_temp`: Rimuove gli artefatti temporanei a fine task (default: false)
//!
//! ## Esempio:
//! ```ignore
//! let mut config = Config::from_file(&path).await?;
//! config.apply_env();
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the conversion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding finished `<slug>.mp3` files
    pub out_dir: PathBuf,
    /// Directory holding transient `<slug>.mp4` / `<slug>.jpg` artifacts
    pub tmp_dir: PathBuf,
    /// Number of most recent tasks kept in history
    pub history_capacity: usize,
    /// Edge length of the square cover image
    pub thumbnail_size: u32,
    /// JPEG quality of the cover image (1-100)
    pub jpeg_quality: u8,
    /// Explicit path to the yt-dlp binary
    pub ytdlp_path: Option<PathBuf>,
    /// Explicit path to the ffmpeg binary
    pub ffmpeg_path: Option<PathBuf>,
    /// Remove temp artifacts once a task is finished
    pub cleanup_temp: bool,
}

impl Default for Config {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            out_dir: tmp.clone(),
            tmp_dir: tmp,
            history_capacity: 20,
            thumbnail_size: 512,
            jpeg_quality: 75,
            ytdlp_path: None,
            ffmpeg_path: None,
            cleanup_temp: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.history_capacity == 0 {
            return Err(anyhow::anyhow!("History capacity must be greater than 0"));
        }

        if self.thumbnail_size == 0 {
            return Err(anyhow::anyhow!("Thumbnail size must be greater than 0"));
        }

        for dir in [&self.out_dir, &self.tmp_dir] {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow::anyhow!("Path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("OUT_DIR") {
            self.out_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("TMP_DIR") {
            self.tmp_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty("YTDLP_PATH") {
            self.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty("FFMPEG_PATH") {
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
    }

    /// Default location of the config file (`~/.config/yt2mp3/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("yt2mp3").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when absent
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
