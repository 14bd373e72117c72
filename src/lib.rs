//! # yt2mp3 Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore della pipeline e classificazione per kind
//! - `task` / `store`: Record dei task, coda FIFO e storico limitato
//! - `scheduler`: Worker sequenziale e pipeline resolve → fetch → encode
//! - `resolver`: Risoluzione dei metadati video (yt-dlp)
//! - `fetcher`: Download concorrente di media e copertina
//! - `image_processor`: Normalizzazione copertine (crop 512×512, JPEG)
//! - `encoder`: Codifica MP3 con tag ID3 e copertina (ffmpeg)
//! - `service`: Operazioni esposte ai client (resolve, submit, list, fetch)
//! - `file_manager`: Layout degli artefatti e listing degli output
//! - `platform`: Risoluzione dei tool esterni
//! - `progress` / `json_output`: Feedback della CLI
//!
//! ## Utilizzo:
//! ```ignore
//! use std::sync::Arc;
//! use yt2mp3::{Config, ConverterService, Pipeline, Scheduler, TaskRequest, TaskStore, Tools};
//!
//! let config = Config::default();
//! let pipeline = Arc::new(Pipeline::with_tools(&config, &Tools::from_config(&config)));
//! let store = Arc::new(TaskStore::new(config.history_capacity));
//! let scheduler = Scheduler::start(Arc::clone(&store), Arc::clone(&pipeline));
//! let service = ConverterService::new(store, pipeline.resolver(), config.out_dir.clone());
//! service.submit(TaskRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))?;
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod platform;
pub mod progress;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod slug;
pub mod store;
pub mod task;
pub mod utils;

pub use config::Config;
pub use error::{ConvertError, ErrorKind, TaskError};
pub use platform::Tools;
pub use scheduler::{Pipeline, Scheduler, SchedulerState};
pub use service::{ConverterService, OutputFile, VideoPreview};
pub use store::TaskStore;
pub use task::{Task, TaskHandle, TaskId, TaskRequest};
