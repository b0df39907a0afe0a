//! # Script Watching
//!
//! Without a watcher, a compiled script stays cached until the process exits, so
//! edits only show up after a restart. [`watch_scripts`] watches the document root
//! recursively and drops the cache entry of every file that is created, modified
//! or removed; the next request for it recompiles.
//!
//! Cache keys are derived from the paths the service resolves under its root, and
//! `notify` reports absolute paths, so watch the same (canonical) root the service
//! uses. [`AppService::root`](crate::server::AppService::root) returns it.
//!
//! Keep the returned watcher alive; dropping it stops watching.

use crate::script::ScriptCache;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Start watching `root` and invalidate changed scripts in `cache`.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created or `root` cannot be watched.
pub fn watch_scripts<P: AsRef<Path>>(root: P, cache: Arc<ScriptCache>) -> notify::Result<RecommendedWatcher> {
    let root = root.as_ref().to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => invalidate_changed(&cache, &event),
            Err(e) => error!(error = %e, "Script watcher error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "Watching scripts for changes");
    Ok(watcher)
}

/// Drop the cache entries touched by one filesystem event.
pub fn invalidate_changed(cache: &ScriptCache, event: &Event) {
    if !matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) {
        return;
    }
    for path in &event.paths {
        if cache.invalidate(path.as_path()) {
            debug!(path = %path.display(), kind = ?event.kind, "Changed script invalidated");
        }
    }
}
