//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni usati dalla
//! pipeline (`yt-dlp` per risolvere/scaricare, `ffmpeg` per codificare).
//!
//! ## Strategia di risoluzione (priorità decrescente):
//! 1. Path esplicito in `Config` (`ytdlp_path`, `ffmpeg_path`)
//! 2. Primo eseguibile trovato nel `PATH` di sistema
//! 3. Nome nudo del comando (l'errore emerge al momento dello spawn)

use crate::config::Config;
use crate::error::ConvertError;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const YTDLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";

/// Resolved locations of the external tools
#[derive(Debug, Clone)]
pub struct Tools {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Tools {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ytdlp: resolve_tool(YTDLP, config.ytdlp_path.as_deref()),
            ffmpeg: resolve_tool(FFMPEG, config.ffmpeg_path.as_deref()),
        }
    }

    /// Check that every tool can actually be executed
    pub async fn check_dependencies(&self) -> Result<(), ConvertError> {
        for (name, path) in [(YTDLP, &self.ytdlp), (FFMPEG, &self.ffmpeg)] {
            if !is_command_available(path).await {
                return Err(ConvertError::MissingDependency(format!(
                    "{} is required ({})",
                    name,
                    install_hint(name)
                )));
            }
        }
        Ok(())
    }
}

/// Platform-specific executable name
pub fn command_name(base_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", base_name)
    } else {
        base_name.to_string()
    }
}

/// Resolve a tool from an explicit override or the system PATH
pub fn resolve_tool(base_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        if path.exists() {
            debug!("Using configured tool: {} -> {:?}", base_name, path);
        } else {
            warn!("Configured path for {} does not exist: {:?}", base_name, path);
        }
        return path.to_path_buf();
    }

    match find_in_system_path(base_name) {
        Some(path) => {
            debug!("Using system tool: {} -> {:?}", base_name, path);
            path
        }
        None => {
            warn!("Tool not found in PATH: {}", base_name);
            PathBuf::from(command_name(base_name))
        }
    }
}

fn find_in_system_path(base_name: &str) -> Option<PathBuf> {
    let tool_with_ext = command_name(base_name);
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(&tool_with_ext))
        .find(|path| path.is_file())
}

/// Check if a command can be spawned (`<tool> --version` exits successfully)
pub async fn is_command_available(program: &Path) -> bool {
    let result = tokio::process::Command::new(program)
        .arg(if program.ends_with(command_name(FFMPEG)) { "-version" } else { "--version" })
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;

    matches!(result, Ok(status) if status.success())
}

/// Installation instructions shown when a tool is missing
pub fn install_hint(tool_name: &str) -> &'static str {
    match tool_name {
        YTDLP => "install with: pip install yt-dlp  # or download from https://github.com/yt-dlp/yt-dlp/releases",
        FFMPEG => "install with: sudo apt-get install ffmpeg",
        _ => "see the tool's documentation",
    }
}
