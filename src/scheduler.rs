//! # Scheduler Module
//!
//! Worker sequenziale che trasforma i task in coda in file MP3.
//!
//! ## Responsabilità:
//! - Estrae UN task alla volta dalla coda FIFO del `TaskStore`
//! - Esegue la pipeline: resolve → fetch (media + copertina) → encode
//! - Scrive l'esito finale tramite `TaskStore::finish`
//! - Attende nuovi task tramite notifica, senza polling attivo
//!
//! ## Stati:
//! `Idle` → `Running` → `Idle`, `Stopped` è terminale. Lo stato corrente è
//! pubblicato su un canale `watch`.
//!
//! ## Stop:
//! Lo stop arriva su un canale `broadcast`. Il task in esecuzione termina
//! normalmente, poi il worker esce senza estrarre altri task.

use crate::config::Config;
use crate::encoder::{AudioEncoder, AudioTags, EncodeJob, FfmpegEncoder};
use crate::error::ConvertError;
use crate::fetcher::{MediaFetcher, YtDlpFetcher};
use crate::file_manager::{output_path, FileManager};
use crate::image_processor::ImageProcessor;
use crate::platform::Tools;
use crate::resolver::{ResolvedVideo, VideoResolver, YtDlpResolver};
use crate::slug::slug_or_fallback;
use crate::store::TaskStore;
use crate::task::{Task, TaskHandle, TrackMetadata};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Observable state of the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Effective metadata for a task: values given at submission win over
/// resolved ones.
pub fn effective_metadata(task: &Task, video: &ResolvedVideo) -> TrackMetadata {
    let pick = |submitted: &str, resolved: &str| {
        if submitted.trim().is_empty() {
            resolved.to_string()
        } else {
            submitted.to_string()
        }
    };

    let title = pick(&task.title, video.title());
    let slug = if task.slug.is_empty() {
        slug_or_fallback(&title, &task.url)
    } else {
        task.slug.clone()
    };

    TrackMetadata {
        slug,
        artist: pick(&task.artist, video.artist()),
        album: pick(&task.album, video.album()),
        thumbnail: pick(&task.thumbnail, video.thumbnail()),
        title,
    }
}

/// The per-task conversion pipeline and its collaborators
pub struct Pipeline {
    resolver: Arc<dyn VideoResolver>,
    fetcher: Arc<dyn MediaFetcher>,
    encoder: Arc<dyn AudioEncoder>,
    out_dir: PathBuf,
    tmp_dir: PathBuf,
    cleanup_temp: bool,
}

impl Pipeline {
    pub fn new(
        resolver: Arc<dyn VideoResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        encoder: Arc<dyn AudioEncoder>,
        config: &Config,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            encoder,
            out_dir: config.out_dir.clone(),
            tmp_dir: config.tmp_dir.clone(),
            cleanup_temp: config.cleanup_temp,
        }
    }

    /// Pipeline backed by yt-dlp and ffmpeg
    pub fn with_tools(config: &Config, tools: &Tools) -> Self {
        Self::new(
            Arc::new(YtDlpResolver::new(tools.ytdlp.clone())),
            Arc::new(YtDlpFetcher::new(tools.ytdlp.clone(), ImageProcessor::from_config(config))),
            Arc::new(FfmpegEncoder::new(tools.ffmpeg.clone())),
            config,
        )
    }

    pub fn resolver(&self) -> Arc<dyn VideoResolver> {
        Arc::clone(&self.resolver)
    }

    /// Run one task to its terminal state
    pub async fn run(&self, store: &TaskStore, task: &TaskHandle) {
        let request = task.snapshot();
        info!("🚀 Processing task {} ({})", request.id, request.url);
        let start_time = std::time::Instant::now();

        let (metadata, outcome) = self.execute(&request).await;
        store.finish(task, metadata.as_ref(), &outcome);

        match &outcome {
            Ok(path) => info!(
                "✅ Task {} completed in {:.1}s: {}",
                request.id,
                start_time.elapsed().as_secs_f64(),
                path.display()
            ),
            Err(err) => error!("❌ Task {} failed: {}", request.id, err),
        }

        if self.cleanup_temp {
            if let Some(meta) = &metadata {
                FileManager::remove_artifacts(&self.tmp_dir, &meta.slug).await;
            }
        }
    }

    async fn execute(&self, request: &Task) -> (Option<TrackMetadata>, Result<PathBuf, ConvertError>) {
        let video = match self.resolver.resolve(&request.url).await {
            Ok(video) => video,
            Err(err) => return (None, Err(err)),
        };

        let meta = effective_metadata(request, &video);
        let outcome = self.convert(&video, &meta).await;
        (Some(meta), outcome)
    }

    async fn convert(&self, video: &ResolvedVideo, meta: &TrackMetadata) -> Result<PathBuf, ConvertError> {
        FileManager::ensure_dir(&self.tmp_dir).await?;
        FileManager::ensure_dir(&self.out_dir).await?;

        let fetched = self
            .fetcher
            .fetch(video, &meta.thumbnail, &meta.slug, &self.tmp_dir)
            .await?;
        if fetched.thumbnail.is_none() {
            debug!("No cover for {}", meta.slug);
        }

        let job = EncodeJob {
            media: fetched.media,
            cover: fetched.thumbnail,
            tags: AudioTags {
                title: meta.title.clone(),
                artist: meta.artist.clone(),
                album: meta.album.clone(),
            },
            output: output_path(&self.out_dir, &meta.slug),
        };
        self.encoder.encode(&job).await
    }
}

/// Handle to the background worker
pub struct Scheduler {
    stop_sender: broadcast::Sender<()>,
    state: watch::Receiver<SchedulerState>,
    worker: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the worker draining `store`
    pub fn start(store: Arc<TaskStore>, pipeline: Arc<Pipeline>) -> Self {
        let (stop_sender, stop_receiver) = broadcast::channel(1);
        let (state_sender, state) = watch::channel(SchedulerState::Idle);

        let worker = tokio::spawn(work(store, pipeline, stop_receiver, state_sender));
        info!("👷 Scheduler started");

        Self {
            stop_sender,
            state,
            worker,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver following every state change
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Stop dequeuing and wait for the worker to exit
    pub async fn stop(self) {
        let _ = self.stop_sender.send(());
        if let Err(e) = self.worker.await {
            warn!("Scheduler worker ended abnormally: {}", e);
        }
        info!("🛑 Scheduler stopped");
    }
}

fn should_stop(receiver: &mut broadcast::Receiver<()>) -> bool {
    match receiver.try_recv() {
        Ok(_) => true,
        Err(broadcast::error::TryRecvError::Empty) => false,
        // signal was sent but we missed it
        Err(broadcast::error::TryRecvError::Lagged(_)) => true,
        Err(broadcast::error::TryRecvError::Closed) => true,
    }
}

async fn work(
    store: Arc<TaskStore>,
    pipeline: Arc<Pipeline>,
    mut stop_receiver: broadcast::Receiver<()>,
    state: watch::Sender<SchedulerState>,
) {
    loop {
        if should_stop(&mut stop_receiver) {
            break;
        }

        match store.dequeue() {
            Some(task) => {
                state.send_replace(SchedulerState::Running);
                pipeline.run(&store, &task).await;
                state.send_replace(SchedulerState::Idle);
            }
            None => {
                tokio::select! {
                    _ = store.wait() => {}
                    _ = stop_receiver.recv() => break,
                }
            }
        }
    }

    state.send_replace(SchedulerState::Stopped);
}
