use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;

use crate::{
    failure,
    management::ledger::{LedgerKind, Ledgers},
    success,
    types::{CollectionRef, CollectionType, PlaylistEntry, Progress},
    warning,
};

/// Counters of one finished collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSummary {
    pub label: String,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct TrackerState {
    active: bool,
    collection: Option<CollectionRef>,
    from_batch: bool,
    name: String,
    in_flight: Vec<(String, String)>,
    claimed_paths: HashSet<PathBuf>,
    finished: usize,
    total: usize,
    succeeded: usize,
    warned: usize,
    failed: usize,
    ledgers: Option<Ledgers>,
    playlist: Option<HashMap<String, PlaylistEntry>>,
    started_at: Option<Instant>,
}

impl TrackerState {
    fn label(&self) -> String {
        let kind = self
            .collection
            .as_ref()
            .map(|c| c.kind.as_str())
            .unwrap_or_default();
        if self.name.is_empty() {
            kind.to_string()
        } else {
            format!("{kind} \"{}\"", self.name)
        }
    }

    fn progress(&self) -> Progress {
        Progress {
            label: self.label(),
            finished: self.finished,
            total: self.total,
            in_flight: self.in_flight.iter().map(|(_, m)| m.clone()).collect(),
        }
    }

    fn remove(&mut self, id: &str) {
        self.in_flight.retain(|(key, _)| key != id);
    }
}

/// Shared record of one collection download.
///
/// Every pipeline instance reports through the same tracker. All mutations go
/// through one mutex, so the path claim check-and-set is atomic.
pub struct DownloadTracker {
    state: Mutex<TrackerState>,
    site_url: String,
    ledger_dir: PathBuf,
    progress: ProgressBar,
}

impl DownloadTracker {
    pub fn new(site_url: impl Into<String>, ledger_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            site_url: site_url.into(),
            ledger_dir: ledger_dir.into(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Renders progress through a live spinner instead of discarding it.
    pub fn with_spinner(mut self) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        self.progress = pb;
        self
    }

    pub fn track_url(&self, id: &str) -> String {
        CollectionRef::new(CollectionType::Track, id).canonical_url(&self.site_url)
    }

    pub async fn start_collection(
        &self,
        collection: CollectionRef,
        from_batch: bool,
    ) -> io::Result<()> {
        let ledgers = Ledgers::open(&self.ledger_dir).await?;

        let mut state = self.state.lock().await;
        *state = TrackerState {
            active: true,
            collection: Some(collection),
            from_batch,
            ledgers: Some(ledgers),
            started_at: Some(Instant::now()),
            ..TrackerState::default()
        };
        self.render(&state);
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn set_label(&self, name: &str) {
        let mut state = self.state.lock().await;
        state.name = name.to_string();
        self.render(&state);
    }

    pub async fn set_total(&self, total: usize) {
        let mut state = self.state.lock().await;
        state.total = total;
        self.render(&state);
    }

    pub async fn add(&self, id: &str, message: &str) {
        let mut state = self.state.lock().await;
        match state.in_flight.iter_mut().find(|(key, _)| key == id) {
            Some(entry) => entry.1 = message.to_string(),
            None => state.in_flight.push((id.to_string(), message.to_string())),
        }
        self.render(&state);
    }

    pub async fn update(&self, id: &str, message: &str) {
        self.add(id, message).await;
    }

    pub async fn remove(&self, id: &str) {
        let mut state = self.state.lock().await;
        state.remove(id);
        self.render(&state);
    }

    pub async fn success(&self, id: &str, message: &str) {
        let mut state = self.state.lock().await;
        self.progress.suspend(|| success!("{message}"));

        state.succeeded += 1;
        self.settle(&mut state, id);
    }

    pub async fn warn(&self, id: &str, message: &str) {
        let mut state = self.state.lock().await;
        self.progress.suspend(|| warning!("{message}"));

        self.append(&mut state, LedgerKind::Warned, id).await;
        state.warned += 1;
        self.settle(&mut state, id);
    }

    pub async fn fail(&self, id: &str, message: &str) {
        let mut state = self.state.lock().await;
        self.progress.suspend(|| failure!("{message}"));

        self.append(&mut state, LedgerKind::Failed, id).await;
        state.failed += 1;
        self.settle(&mut state, id);
    }

    /// Claims `path` for the caller unless it exists on disk or another
    /// pipeline already holds it.
    pub async fn try_claim_path(&self, path: &Path) -> bool {
        let mut state = self.state.lock().await;
        if state.claimed_paths.contains(path) || async_fs::metadata(path).await.is_ok() {
            return false;
        }
        state.claimed_paths.insert(path.to_path_buf())
    }

    pub async fn release_path(&self, path: &Path) {
        self.state.lock().await.claimed_paths.remove(path);
    }

    pub async fn is_path_claimed(&self, path: &Path) -> bool {
        self.state.lock().await.claimed_paths.contains(path)
    }

    /// Starts collecting manifest entries for the current collection.
    pub async fn enable_playlist(&self) {
        self.state.lock().await.playlist = Some(HashMap::new());
    }

    /// Records the manifest entry of collection item `id`. Ignored unless the
    /// current collection is a playlist.
    pub async fn record_playlist_entry(&self, id: &str, entry: PlaylistEntry) {
        if let Some(entries) = self.state.lock().await.playlist.as_mut() {
            entries.insert(id.to_string(), entry);
        }
    }

    pub async fn take_playlist_entries(&self) -> Option<HashMap<String, PlaylistEntry>> {
        self.state.lock().await.playlist.take()
    }

    pub async fn progress(&self) -> Progress {
        self.state.lock().await.progress()
    }

    /// Closes the ledgers, records the collection URL and resets the tracker.
    ///
    /// Returns `None` when no collection is active, so a second call is a no-op.
    pub async fn finish_collection(
        &self,
        emit_notice: bool,
    ) -> io::Result<Option<CollectionSummary>> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Ok(None);
        }

        let label = state.label();
        if let Some(collection) = state.collection.clone() {
            let batch_track = state.from_batch && collection.kind == CollectionType::Track;
            if !collection.is_placeholder() && !batch_track {
                let url = collection.canonical_url(&self.site_url);
                if let Some(ledgers) = state.ledgers.as_mut() {
                    ledgers.append(LedgerKind::Succeeded, &url).await?;
                }
            }
        }

        if let Some(mut ledgers) = state.ledgers.take() {
            ledgers.close().await?;
        }

        let summary = CollectionSummary {
            label: label.clone(),
            succeeded: state.succeeded,
            warned: state.warned,
            failed: state.failed,
            elapsed: state.started_at.map(|t| t.elapsed()).unwrap_or_default(),
        };

        *state = TrackerState::default();
        self.progress.set_message(String::new());
        if emit_notice {
            self.progress
                .suspend(|| success!("Finished downloading {label}"));
        }

        Ok(Some(summary))
    }

    /// Closes the ledgers of an interrupted collection without marking it done.
    pub async fn close_ledgers(&self) -> io::Result<()> {
        let mut state = self.state.lock().await;
        let ledgers = state.ledgers.take();
        *state = TrackerState::default();
        self.progress.set_message(String::new());

        match ledgers {
            Some(mut ledgers) => ledgers.close().await,
            None => Ok(()),
        }
    }

    /// Removes the spinner from the terminal.
    pub fn clear_progress(&self) {
        self.progress.finish_and_clear();
    }

    async fn append(&self, state: &mut TrackerState, kind: LedgerKind, id: &str) {
        let url = self.track_url(id);
        if let Some(ledgers) = state.ledgers.as_mut()
            && let Err(err) = ledgers.append(kind, &url).await
        {
            log::error!("cannot record {url}: {err}");
        }
    }

    fn settle(&self, state: &mut TrackerState, id: &str) {
        state.finished += 1;
        if state.total > 0 && state.finished > state.total {
            log::warn!(
                "finished count {} exceeds total {}",
                state.finished,
                state.total
            );
        }
        state.remove(id);
        self.render(state);
    }

    fn render(&self, state: &TrackerState) {
        if state.active {
            self.progress.set_message(state.progress().to_string());
        }
    }
}
