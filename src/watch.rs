//! Watch loop behind `refgen serve`.

use crate::error::{FieldPath, Result, SchemaError};
use crate::settings::Settings;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// Quiet period that ends a burst of file events.
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Decides which changed paths warrant a rebuild.
///
/// Changes under the site root are our own output. Paths matching a
/// `watch.ignore` pattern (relative to the source root) are skipped too.
#[derive(Debug)]
pub struct ChangeFilter {
    source_root: PathBuf,
    site_root: PathBuf,
    ignore: Vec<glob::Pattern>,
}

impl ChangeFilter {
    pub fn new(settings: &Settings) -> Result<Self> {
        let at = FieldPath::root().key("watch").key("ignore");
        let ignore = settings
            .watch_ignore
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                glob::Pattern::new(pattern).map_err(|e| {
                    SchemaError::new(&at.index(i), format!("invalid glob pattern: {}", e))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ChangeFilter {
            source_root: absolute(&settings.source_root),
            site_root: absolute(&settings.site_root),
            ignore,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.source_root.join(path)
        };
        if path.starts_with(&self.site_root) {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.source_root) else {
            return true;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        !self.ignore.iter().any(|p| p.matches(&relative))
    }

    fn event_is_relevant(&self, event: &Event) -> bool {
        !matches!(event.kind, EventKind::Access(_))
            && event.paths.iter().any(|p| self.is_relevant(p))
    }

    fn accepts(&self, res: notify::Result<Event>) -> bool {
        match res {
            Ok(event) => {
                let relevant = self.event_is_relevant(&event);
                if relevant {
                    tracing::debug!(paths = ?event.paths, "source changed");
                }
                relevant
            }
            Err(e) => {
                tracing::warn!("watch error: {}", e);
                false
            }
        }
    }
}

/// Watch the source root and call `rebuild` after every relevant burst of
/// changes. A failing rebuild is logged and watching goes on.
///
/// Returns when the watcher shuts down.
pub fn watch<E, F>(settings: &Settings, rebuild: F) -> Result<()>
where
    E: fmt::Display,
    F: FnMut() -> std::result::Result<(), E>,
{
    let filter = ChangeFilter::new(settings)?;
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(filter.source_root(), RecursiveMode::Recursive)?;
    tracing::info!(root = %filter.source_root().display(), "watching for changes");

    run(&filter, &rx, rebuild);
    Ok(())
}

/// The rebuild loop over a stream of watcher events. Returns once every
/// sender is gone.
///
/// Events that arrive while `rebuild` runs, or until the tree is quiet again
/// afterwards, are the build's own writes (site builder output, generated
/// pages) and are discarded.
pub fn run<E, F>(filter: &ChangeFilter, rx: &Receiver<notify::Result<Event>>, mut rebuild: F)
where
    E: fmt::Display,
    F: FnMut() -> std::result::Result<(), E>,
{
    loop {
        let Ok(first) = rx.recv() else {
            return;
        };
        let mut dirty = filter.accepts(first);

        // Coalesce until the tree has been quiet for DEBOUNCE.
        loop {
            match rx.recv_timeout(DEBOUNCE) {
                Ok(next) => dirty |= filter.accepts(next),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        if !dirty {
            continue;
        }
        tracing::info!("change detected, rebuilding");
        if let Err(e) = rebuild() {
            tracing::warn!("rebuild failed: {:#}", e);
        }

        let mut skipped = 0usize;
        loop {
            match rx.recv_timeout(DEBOUNCE) {
                Ok(_) => skipped += 1,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        if skipped > 0 {
            tracing::debug!(events = skipped, "ignored changes made by the rebuild");
        }
    }
}

/// Canonical form when the path exists, otherwise made absolute lexically.
fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
