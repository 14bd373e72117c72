//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (una riga per evento)
//! per l'integrazione con altri processi.
//!
//! ## Tipi di messaggi:
//! - `preview`: Metadati risolti di un video
//! - `submitted`: Task accodato
//! - `task_complete`: Task arrivato in stato terminale (successo o errore)
//! - `complete`: Fine del batch con statistiche finali
//! - `outputs`: Elenco dei file MP3 disponibili
//! - `saved`: File di output copiato in locale
//! - `tools`: Disponibilità dei tool esterni
//! - `error`: Errore generale

use crate::error::TaskError;
use crate::file_manager::OutputEntry;
use crate::progress::ConversionStats;
use crate::service::VideoPreview;
use crate::task::{Task, TaskId};
use serde::Serialize;
use std::path::PathBuf;

/// Availability of one external tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: PathBuf,
    pub available: bool,
}

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Preview {
        #[serde(flatten)]
        preview: VideoPreview,
    },

    Submitted {
        id: TaskId,
        url: String,
        slug: String,
    },

    TaskComplete {
        id: TaskId,
        url: String,
        slug: String,
        result: Option<PathBuf>,
        error: Option<TaskError>,
    },

    Complete {
        tasks: usize,
        succeeded: usize,
        failed: usize,
        duration_seconds: f64,
    },

    Outputs {
        files: Vec<OutputEntry>,
    },

    Saved {
        name: String,
        path: PathBuf,
        size: u64,
        content_type: String,
        content_disposition: Option<String>,
    },

    Tools {
        tools: Vec<ToolStatus>,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn submitted(task: &Task) -> Self {
        Self::Submitted {
            id: task.id,
            url: task.url.clone(),
            slug: task.slug.clone(),
        }
    }

    pub fn task_complete(task: &Task) -> Self {
        Self::TaskComplete {
            id: task.id,
            url: task.url.clone(),
            slug: task.slug.clone(),
            result: task.result.clone(),
            error: task.error.clone(),
        }
    }

    pub fn complete(stats: &ConversionStats, duration_seconds: f64) -> Self {
        Self::Complete {
            tasks: stats.tasks,
            succeeded: stats.succeeded,
            failed: stats.failed,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
