//! Definitions file watching for hot reload.
//!
//! Uses notify for cross-platform file system events. The session polls
//! [`DefinitionsWatcher::take_change_ready`] between keystrokes, so a reload
//! never lands in the middle of an expansion.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Watches the definitions file and reports debounced changes.
pub struct DefinitionsWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl DefinitionsWatcher {
    /// Watch `path`, waiting `debounce` after the last change before reporting it.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or the directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths arrive canonical; compare against the canonical target.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // Editors often save by rename, so watch the directory rather than the file.
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Returns true once a debounced change to the definitions file is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let mut saw_change = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => saw_change = true,
                Ok(_) => {}
                Err(err) => warn!("definitions watcher error: {err}"),
            }
        }

        if saw_change {
            debug!(path = %self.target_path.display(), "definitions file changed");
            self.pending_since = Some(Instant::now());
        }

        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if pending_since.elapsed() >= self.debounce {
            self.pending_since = None;
            return true;
        }
        false
    }

    fn is_relevant(&self, event: &Event) -> bool {
        // Reloading reads the file; reads must not schedule another reload.
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        // Some backends only report the directory.
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
