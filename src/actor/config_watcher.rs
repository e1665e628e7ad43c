//! Reloads the user script when it changes on disk.
//!
//! Editors often replace a file instead of writing it in place, so the
//! parent directory is watched and events are filtered by file name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, info, warn};

use super::controller::{Event, Sender};

const DEBOUNCE: Duration = Duration::from_millis(300);

pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ConfigWatcher {
    pub fn spawn(script: &Path, events: Sender) -> notify::Result<Self> {
        let dir = match script.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let script = script.to_path_buf();

        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            match result {
                Ok(changes) => {
                    if changes.iter().any(|change| is_script(&change.path, &script)) {
                        debug!(path = %script.display(), "Change detected");
                        events.send(Event::ScriptChanged);
                    }
                }
                Err(err) => warn!(?err, "Watcher error"),
            }
        })?;
        debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), "Watching for script changes");

        Ok(ConfigWatcher { _debouncer: debouncer })
    }
}

fn is_script(changed: &Path, script: &Path) -> bool {
    changed == script || (changed.file_name().is_some() && changed.file_name() == script.file_name())
}
