//! Hot reload of the runtime knobs (quotas, feature flags).
//!
//! Every change to the config file is re-read through [`load_config`], so a
//! reloaded config passes the same env overlay and validation as the startup
//! one. An invalid edit is logged and dropped; the running snapshot stays.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::PlatformConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<PlatformConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver the server applies updates from.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<PlatformConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, ConfigError> {
        let path = self.path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &self.path) => {
                    self.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }

    /// Re-read the file and publish it. Returns whether an update was sent.
    pub fn reload(&self) -> bool {
        match load_config(&self.path) {
            Ok(next) => {
                tracing::info!(
                    path = ?self.path,
                    free_tier = next.rate_limit.free_tier,
                    signup = next.features.signup,
                    billing = next.features.billing,
                    "Config file changed"
                );
                self.update_tx.send(next).is_ok()
            }
            Err(e) => {
                tracing::error!(error = %e, "Config reload rejected, keeping current configuration");
                false
            }
        }
    }
}

fn touches(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && (event.paths.is_empty() || event.paths.iter().any(|p| p.file_name() == path.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind, ModifyKind};
    use std::fs;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("platform-watch-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_reload_publishes_valid_config() {
        let path = temp_path();
        fs::write(&path, "[rate_limit]\nfree_tier = 7\n").unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path);

        assert!(watcher.reload());
        assert_eq!(updates.try_recv().unwrap().rate_limit.free_tier, 7);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_edit_keeps_current() {
        let path = temp_path();
        fs::write(&path, "[rate_limit]\nwindow_secs = 0\n").unwrap();
        let (watcher, mut updates) = ConfigWatcher::new(&path);

        assert!(!watcher.reload());
        assert!(updates.try_recv().is_err());

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_only_own_file_events_count() {
        let path = PathBuf::from("/etc/platform/config.toml");
        let own = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
        let other = Event::new(EventKind::Create(CreateKind::File)).add_path("/etc/platform/other.swp".into());
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path(path.clone());

        assert!(touches(&own, &path));
        assert!(!touches(&other, &path));
        assert!(!touches(&access, &path));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let (watcher, _updates) = ConfigWatcher::new(&temp_path());
        assert!(matches!(watcher.run(), Err(ConfigError::Watch(_))));
    }
}
