use crate::error::Result;
use crate::indexer::CodebaseIndexer;
use crate::indexer::FileChange;
use crate::indexer::UpdateOutcome;
use log::debug;
use log::error;
use log::info;
use log::warn;
use notify::Config as NotifyConfig;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use notify::event::ModifyKind;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Forwards file-system events under the indexer's roots to
/// [`CodebaseIndexer::update`], debounced per path.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Starts watching every existing root of `indexer`.
    pub fn spawn(indexer: CodebaseIndexer) -> Result<Self> {
        let debounce = indexer.config().watch_debounce();
        let roots = indexer.watch_roots();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in changes_for_event(&event) {
                        let _ = tx.send(change);
                    }
                }
                Err(err) => warn!("watcher error: {err}"),
            },
            NotifyConfig::default(),
        )?;
        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            info!("Watching {}", root.display());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_updates(indexer, rx, shutdown_rx, debounce));

        Ok(Self {
            _watcher: watcher,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Stops watching and waits for the update task to finish. Pending,
    /// not-yet-debounced changes are dropped.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            error!("watcher task failed: {err}");
        }
    }
}

/// Maps one notify event to index changes.
///
/// A directory that appears or is renamed into place becomes `Created`, so
/// its whole tree gets indexed. Content and metadata changes on a directory
/// carry nothing to index and are skipped. A path that is gone becomes
/// `Deleted` whether it was a file or a directory.
pub fn changes_for_event(event: &Event) -> Vec<FileChange> {
    event
        .paths
        .iter()
        .filter_map(|path| {
            let path = path.clone();
            match event.kind {
                EventKind::Create(_) => Some(FileChange::Created(path)),
                EventKind::Modify(ModifyKind::Name(_)) => {
                    if path.exists() {
                        Some(FileChange::Created(path))
                    } else {
                        Some(FileChange::Deleted(path))
                    }
                }
                EventKind::Modify(_) if path.is_dir() => None,
                EventKind::Modify(_) => Some(FileChange::Changed(path)),
                EventKind::Remove(_) => Some(FileChange::Deleted(path)),
                _ => None,
            }
        })
        .collect()
}

async fn run_updates(
    indexer: CodebaseIndexer,
    mut rx: mpsc::UnboundedReceiver<FileChange>,
    mut shutdown: oneshot::Receiver<()>,
    debounce: Duration,
) {
    let mut pending = Debouncer::new(debounce);

    loop {
        let deadline = pending.next_deadline();
        tokio::select! {
            _ = &mut shutdown => break,
            change = rx.recv() => match change {
                Some(change) => pending.push(change, Instant::now()),
                None => break,
            },
            _ = sleep_until(deadline), if deadline.is_some() => {
                for change in pending.take_due(Instant::now()) {
                    apply(&indexer, change).await;
                }
            }
        }
    }
    debug!("watcher task stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

async fn apply(indexer: &CodebaseIndexer, change: FileChange) {
    let path = change.path().to_path_buf();
    match indexer.update(change).await {
        Ok(UpdateOutcome::Ignored) | Ok(UpdateOutcome::Unchanged) => {}
        Ok(outcome) => debug!("{}: {outcome:?}", path.display()),
        Err(err) => warn!("Failed to update {}: {err}", path.display()),
    }
}

/// Coalesces changes per path; the latest change wins and restarts the
/// quiet period.
struct Debouncer {
    delay: Duration,
    pending: HashMap<PathBuf, (FileChange, Instant)>,
}

impl Debouncer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    fn push(&mut self, change: FileChange, now: Instant) {
        let path = change.path().to_path_buf();
        self.pending.insert(path, (change, now + self.delay));
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, due)| *due).min()
    }

    fn take_due(&mut self, now: Instant) -> Vec<FileChange> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| *at <= now)
            .map(|(path, _)| path.clone())
            .collect();
        let mut changes: Vec<FileChange> = due
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|(change, _)| change))
            .collect();
        changes.sort_by(|a, b| a.path().cmp(b.path()));
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;
    use notify::event::DataChange;
    use notify::event::MetadataKind;
    use notify::event::RemoveKind;
    use notify::event::RenameMode;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_event_mapping() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let existing = temp_dir.path().join("kept.rs");
        std::fs::write(&existing, "fn a() {}").expect("Failed to write");
        let gone = temp_dir.path().join("gone.rs");

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(existing.clone());
        assert_eq!(
            changes_for_event(&create),
            vec![FileChange::Created(existing.clone())]
        );

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(existing.clone());
        assert_eq!(
            changes_for_event(&modify),
            vec![FileChange::Changed(existing.clone())]
        );

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(gone.clone())
            .add_path(existing.clone());
        assert_eq!(
            changes_for_event(&rename),
            vec![
                FileChange::Deleted(gone.clone()),
                FileChange::Created(existing)
            ]
        );

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(gone.clone());
        assert_eq!(changes_for_event(&remove), vec![FileChange::Deleted(gone)]);

        let dir_touched = Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime,
        )))
        .add_path(temp_dir.path().to_path_buf());
        assert!(changes_for_event(&dir_touched).is_empty());
    }

    #[test]
    fn test_directory_moves_map_to_tree_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let moved_in = temp_dir.path().join("vendored");
        std::fs::create_dir_all(&moved_in).expect("Failed to create dir");
        let moved_out = temp_dir.path().join("pkg");

        let created = Event::new(EventKind::Create(CreateKind::Folder)).add_path(moved_in.clone());
        assert_eq!(
            changes_for_event(&created),
            vec![FileChange::Created(moved_in.clone())]
        );

        let renamed_in = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(moved_in.clone());
        assert_eq!(
            changes_for_event(&renamed_in),
            vec![FileChange::Created(moved_in)]
        );

        let renamed_out = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(moved_out.clone());
        assert_eq!(
            changes_for_event(&renamed_out),
            vec![FileChange::Deleted(moved_out.clone())]
        );

        let removed =
            Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(moved_out.clone());
        assert_eq!(changes_for_event(&removed), vec![FileChange::Deleted(moved_out)]);
    }

    #[test]
    fn test_debouncer_coalesces_per_path() {
        let start = Instant::now();
        let delay = Duration::from_millis(300);
        let mut debouncer = Debouncer::new(delay);
        let a = PathBuf::from("/p/a.rs");
        let b = PathBuf::from("/p/b.rs");

        debouncer.push(FileChange::Created(a.clone()), start);
        debouncer.push(FileChange::Changed(b.clone()), start + Duration::from_millis(100));
        debouncer.push(FileChange::Changed(a.clone()), start + Duration::from_millis(200));

        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(400)));
        assert!(debouncer.take_due(start + Duration::from_millis(399)).is_empty());
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(400)),
            vec![FileChange::Changed(b)]
        );
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(500)),
            vec![FileChange::Changed(a)]
        );
        assert_eq!(debouncer.next_deadline(), None);
    }
}
