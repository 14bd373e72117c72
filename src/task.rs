//! # Task Model Module
//!
//! Definisce il record di un task di conversione e il suo handle condiviso.
//!
//! ## Strutture dati:
//! - `TaskRequest`: Richiesta di conversione (url obbligatorio, resto opzionale)
//! - `Task`: Snapshot del record (stato pending, risultato o errore)
//! - `TaskHandle`: Riferimento condiviso allo stesso record tra coda, storico e chiamante
//! - `TrackMetadata`: Metadati effettivi usati dalla pipeline (slug, titolo, artista, album)
//!
//! ## Ciclo di vita:
//! 1. `TaskStore::submit` crea il record con `is_pending = true`
//! 2. Lo scheduler lo estrae dalla coda ed esegue la pipeline
//! 3. `TaskStore::finish` scrive UNA volta il risultato o l'errore
//!
//! Il record è mutabile solo tramite `TaskStore`; i lettori ottengono copie.

use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type TaskId = u64;

/// A conversion request as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRequest {
    pub url: String,
    pub slug: String,
    pub thumbnail: String,
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl TaskRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Point-in-time copy of a task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub slug: String,
    pub thumbnail: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub is_pending: bool,
    pub result: Option<PathBuf>,
    pub error: Option<TaskError>,
    pub submitted_at: u64,
}

impl Task {
    pub(crate) fn pending(id: TaskId, request: TaskRequest, submitted_at: u64) -> Self {
        Self {
            id,
            url: request.url,
            slug: request.slug,
            thumbnail: request.thumbnail,
            title: request.title,
            artist: request.artist,
            album: request.album,
            is_pending: true,
            result: None,
            error: None,
            submitted_at,
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.is_pending && self.result.is_some()
    }

    pub fn failed(&self) -> bool {
        !self.is_pending && self.error.is_some()
    }

    /// Output file name (`<slug>.mp3`) of a successful task
    pub fn output_file_name(&self) -> Option<String> {
        self.result
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Effective metadata of a task once its video has been resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub slug: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub thumbnail: String,
}

/// Shared handle to a task record.
///
/// Queue, history and the submitting caller all hold clones of the same
/// handle; the record lives as long as the longest holder.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    record: Arc<Mutex<Task>>,
}

impl TaskHandle {
    pub(crate) fn new(task: Task) -> Self {
        Self {
            id: task.id,
            record: Arc::new(Mutex::new(task)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Copy of the record's current field values
    pub fn snapshot(&self) -> Task {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_pending
    }

    /// Whether both handles refer to the same record
    pub fn same_record(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Task> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
