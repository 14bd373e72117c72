//! # Task Store Module
//!
//! Unica fonte di verità dello stato dei task.
//!
//! ## Responsabilità:
//! - Mantiene la coda FIFO (illimitata) dei task in attesa
//! - Mantiene lo storico limitato (default 20) dei task più recenti
//! - Serializza append/eviction e append/dequeue sotto un unico lock
//! - Scrive l'esito finale di un task (`finish`) sotto lo stesso lock
//! - Sveglia il worker tramite `Notify` invece di polling attivo
//!
//! ## Ordine di lock:
//! Sempre prima il lock dello store, poi quello del record. I lettori di un
//! singolo handle prendono solo il lock del record.

use crate::error::{ConvertError, TaskError};
use crate::slug::{slug_or_fallback, slugify};
use crate::task::{Task, TaskHandle, TaskId, TaskRequest, TrackMetadata};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::Notify;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Default)]
struct StoreInner {
    queue: VecDeque<TaskHandle>,
    history: VecDeque<TaskHandle>,
}

/// Owns the pending queue and the bounded history of tasks
pub struct TaskStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
    next_id: AtomicU64,
    notify: Notify,
}

impl TaskStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a pending task and append it to both queue and history
    pub fn submit(&self, mut request: TaskRequest) -> Result<TaskHandle, ConvertError> {
        request.url = request.url.trim().to_string();
        if request.url.is_empty() {
            return Err(ConvertError::Validation("No video url provided".to_string()));
        }
        // caller slugs name files on disk: keep them to a single safe component
        request.slug = slugify(&request.slug);
        if request.slug.is_empty() && !request.title.is_empty() {
            request.slug = slugify(&request.title);
        }

        let submitted_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let handle = {
            let mut inner = self.lock();
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let handle = TaskHandle::new(Task::pending(id, request, submitted_at));
            inner.queue.push_back(handle.clone());
            inner.history.push_back(handle.clone());
            while inner.history.len() > self.capacity {
                if let Some(evicted) = inner.history.pop_front() {
                    debug!("Evicted task {} from history", evicted.id());
                }
            }
            handle
        };

        info!("📥 Queued task {}", handle.id());
        self.notify.notify_one();
        Ok(handle)
    }

    /// Snapshot of the history, oldest first
    pub fn list(&self) -> Vec<Task> {
        let inner = self.lock();
        inner.history.iter().map(TaskHandle::snapshot).collect()
    }

    /// Look up a task still present in history
    pub fn get(&self, id: TaskId) -> Option<Task> {
        let inner = self.lock();
        inner.history.iter().find(|h| h.id() == id).map(TaskHandle::snapshot)
    }

    /// Remove and return the head of the queue
    pub fn dequeue(&self) -> Option<TaskHandle> {
        self.lock().queue.pop_front()
    }

    /// Number of tasks waiting in the queue
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Suspend until a submission signals new work.
    ///
    /// A signal sent while nobody waits is kept, so a submit racing with an
    /// empty `dequeue` is never lost.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Record the terminal outcome of a task.
    ///
    /// `metadata` carries the effective values once the video was resolved;
    /// it is `None` when resolution itself failed.
    pub fn finish(
        &self,
        task: &TaskHandle,
        metadata: Option<&TrackMetadata>,
        outcome: &Result<PathBuf, ConvertError>,
    ) {
        let _inner = self.lock();
        let mut record = task.lock();

        match metadata {
            Some(meta) => {
                record.slug = meta.slug.clone();
                record.title = meta.title.clone();
                record.artist = meta.artist.clone();
                record.album = meta.album.clone();
                record.thumbnail = meta.thumbnail.clone();
            }
            None if record.slug.is_empty() => {
                record.slug = slug_or_fallback(&record.title, &record.url);
            }
            None => {}
        }

        match outcome {
            Ok(path) => {
                record.result = Some(path.clone());
                record.error = None;
            }
            Err(err) => {
                record.result = None;
                record.error = Some(TaskError::from(err));
            }
        }
        record.is_pending = false;
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(n: usize) -> TaskRequest {
        TaskRequest {
            url: format!("https://youtu.be/{}", n),
            title: format!("Song {}", n),
            ..Default::default()
        }
    }

    #[test]
    fn test_submit_returns_pending_task() {
        let store = TaskStore::default();
        let task = store.submit(request(1)).unwrap().snapshot();
        assert!(task.is_pending);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
        assert_eq!(task.slug, "song-1");
        assert_eq!(store.pending(), 1);
    }

    #[test]
    fn test_submit_rejects_empty_url() {
        let store = TaskStore::default();
        let err = store.submit(TaskRequest::new("   ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.list().is_empty());
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn test_submitted_slug_is_sanitized() {
        let store = TaskStore::default();
        let submit = |slug: &str, title: &str| {
            store
                .submit(TaskRequest {
                    url: "https://youtu.be/x".into(),
                    slug: slug.into(),
                    title: title.into(),
                    ..Default::default()
                })
                .unwrap()
                .snapshot()
                .slug
        };

        assert_eq!(submit("../x", ""), "x");
        assert_eq!(submit("a/b", ""), "a-b");
        assert_eq!(submit("..\\..\\evil", ""), "evil");
        assert_eq!(submit("   ", ""), "");
        assert_eq!(submit("   ", "My Song"), "my-song");
        assert_eq!(submit("../..", "Title"), "title");
        assert_eq!(submit("already-clean-1", ""), "already-clean-1");
    }

    #[test]
    fn test_history_keeps_last_twenty() {
        let store = TaskStore::default();
        for n in 1..=21 {
            store.submit(request(n)).unwrap();
        }

        let history = store.list();
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().unwrap().url, "https://youtu.be/2");
        assert_eq!(history.last().unwrap().url, "https://youtu.be/21");
        assert!(history.iter().all(|t| t.url != "https://youtu.be/1"));

        // eviction from history does not drop the queue entry
        assert_eq!(store.pending(), 21);
        assert_eq!(store.dequeue().unwrap().snapshot().url, "https://youtu.be/1");
    }

    #[test]
    fn test_dequeue_is_fifo_and_shares_records() {
        let store = TaskStore::default();
        let first = store.submit(request(1)).unwrap();
        store.submit(request(2)).unwrap();

        let head = store.dequeue().unwrap();
        assert!(head.same_record(&first));
        assert_eq!(store.dequeue().unwrap().snapshot().url, "https://youtu.be/2");
        assert!(store.dequeue().is_none());
    }

    #[test]
    fn test_finish_is_visible_through_list_and_handle() {
        let store = TaskStore::default();
        let handle = store.submit(request(1)).unwrap();
        let worker_handle = store.dequeue().unwrap();

        let meta = TrackMetadata {
            slug: "song-1".into(),
            title: "Song 1".into(),
            artist: "Channel".into(),
            album: String::new(),
            thumbnail: String::new(),
        };
        store.finish(&worker_handle, Some(&meta), &Ok(PathBuf::from("/out/song-1.mp3")));

        let listed = store.list().remove(0);
        assert!(!listed.is_pending);
        assert_eq!(listed.result, Some(PathBuf::from("/out/song-1.mp3")));
        assert_eq!(listed.artist, "Channel");
        assert_eq!(handle.snapshot(), listed);
        assert_eq!(store.get(handle.id()), Some(listed));
    }

    #[test]
    fn test_finish_with_error_clears_result() {
        let store = TaskStore::default();
        let handle = store.submit(request(1)).unwrap();
        store.finish(&handle, None, &Err(ConvertError::Resolve("Unsupported URL".into())));

        let task = handle.snapshot();
        assert!(!task.is_pending);
        assert!(task.result.is_none());
        assert_eq!(task.error.unwrap().kind, ErrorKind::Resolve);
        assert_eq!(task.slug, "song-1");
    }

    #[test]
    fn test_resolve_failure_without_title_gets_fallback_slug() {
        let store = TaskStore::default();
        let handle = store.submit(TaskRequest::new("https://unsupported.example/v")).unwrap();
        store.finish(&handle, None, &Err(ConvertError::Resolve("Unsupported URL".into())));

        let task = handle.snapshot();
        assert_eq!(task.slug, slug_or_fallback("", "https://unsupported.example/v"));
        assert!(task.slug.starts_with("video-"));
    }

    #[tokio::test]
    async fn test_wait_does_not_lose_early_signal() {
        let store = TaskStore::default();
        store.submit(request(1)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), store.wait())
            .await
            .expect("stored permit should wake the waiter");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submit_and_drain() {
        let store = Arc::new(TaskStore::new(1000));
        let submitters = 8;
        let per_submitter = 50;

        let drain_store = Arc::clone(&store);
        let drainer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while seen.len() < submitters * per_submitter {
                match drain_store.dequeue() {
                    Some(handle) => seen.push(handle.id()),
                    None => tokio::task::yield_now().await,
                }
            }
            seen
        });

        let mut joins = Vec::new();
        for s in 0..submitters {
            let store = Arc::clone(&store);
            joins.push(tokio::spawn(async move {
                for n in 0..per_submitter {
                    store.submit(request(s * 1000 + n)).unwrap();
                }
            }));
        }
        for join in joins {
            join.await.unwrap();
        }

        let drained = drainer.await.unwrap();
        let history = store.list();

        let history_ids: HashSet<_> = history.iter().map(|t| t.id).collect();
        assert_eq!(history.len(), submitters * per_submitter);
        assert_eq!(history_ids.len(), history.len());

        let history_order: Vec<_> = history.iter().map(|t| t.id).collect();
        assert!(history_order.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(drained, history_order);
    }
}
