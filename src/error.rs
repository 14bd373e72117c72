//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore della pipeline di conversione.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare tutti gli errori possibili
//! - Espone `ErrorKind` così i chiamanti distinguono i casi senza leggere i messaggi
//! - Integra con `thiserror` per messaggi descrittivi e conversioni automatiche
//!
//! ## Categorie di errori:
//! - `Validation`: Input mancante o malformato al confine della richiesta
//! - `Resolve`: URL non supportato o fallimento di yt-dlp (fatale per il task)
//! - `Fetch`: Download dello stream media fallito (fatale)
//! - `Thumbnail`: Download/decodifica/resize della copertina (NON fatale)
//! - `Encode`: Transcodifica o mux con ffmpeg fallito (fatale)
//! - `NotFound`: File di output inesistente
//! - `MissingDependency`: Tool esterno mancante (yt-dlp, ffmpeg)
//! - `Io`: Errori di I/O generici
//!
//! ## Esempio:
//! ```ignore
//! if url.trim().is_empty() {
//!     return Err(ConvertError::Validation("No video url provided".to_string()));
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Errors produced by the conversion pipeline and its request surface
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("{0}")]
    Validation(String),

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for ConvertError {
    fn from(err: image::ImageError) -> Self {
        ConvertError::Thumbnail(err.to_string())
    }
}

/// Coarse classification of a [`ConvertError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Resolve,
    Fetch,
    Thumbnail,
    Encode,
    NotFound,
    MissingDependency,
    Io,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Validation(_) => ErrorKind::Validation,
            ConvertError::Resolve(_) => ErrorKind::Resolve,
            ConvertError::Fetch(_) => ErrorKind::Fetch,
            ConvertError::Thumbnail(_) => ErrorKind::Thumbnail,
            ConvertError::Encode(_) => ErrorKind::Encode,
            ConvertError::NotFound(_) => ErrorKind::NotFound,
            ConvertError::MissingDependency(_) => ErrorKind::MissingDependency,
            ConvertError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the error aborts the task it occurred in
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConvertError::Thumbnail(_))
    }
}

/// Error as recorded on a finished task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ConvertError> for TaskError {
    fn from(err: &ConvertError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
