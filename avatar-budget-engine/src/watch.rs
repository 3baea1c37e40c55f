//! Polling watch loop for the selection bridge

use crate::config::WatchConfig;
use crate::engine::Engine;
use crate::selection::SelectionOutcome;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a single [`BridgeWatcher::tick`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The enabled flag is cleared
    Disabled,
    /// The bridge file is absent or unchanged
    Unchanged,
    /// The file changed but could not be read
    Unreadable,
    /// A new document was loaded and not applied
    Loaded { avatar: String },
    /// A new document was loaded and its selection applied
    Applied {
        avatar: String,
        selection: SelectionOutcome,
        deleted: Option<usize>,
    },
}

/// Polls the engine's bridge file at a fixed interval.
///
/// The loop runs until the shared enabled flag is cleared, which any thread
/// holding [`BridgeWatcher::enabled_flag`] may do.
#[derive(Debug, Clone)]
pub struct BridgeWatcher {
    config: WatchConfig,
    enabled: Arc<AtomicBool>,
}

impl Default for BridgeWatcher {
    fn default() -> Self {
        Self::new(WatchConfig::default())
    }
}

impl BridgeWatcher {
    /// A watcher that starts enabled
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn enabled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Check the bridge file once and react to a new document
    pub fn tick(&self, engine: &mut Engine) -> TickOutcome {
        if !self.is_enabled() {
            return TickOutcome::Disabled;
        }
        if !engine.bridge_has_changed() {
            return TickOutcome::Unchanged;
        }
        let Some(doc) = engine.load_bridge(true) else {
            return TickOutcome::Unreadable;
        };
        let avatar = doc.avatar_label().to_string();
        info!("new bridge data detected: {avatar}");

        if !self.config.auto_apply {
            return TickOutcome::Loaded { avatar };
        }
        match engine.apply_bridge_selection() {
            Ok(selection) => {
                let deleted = self.config.auto_delete.then(|| engine.delete_marked());
                TickOutcome::Applied {
                    avatar,
                    selection,
                    deleted,
                }
            }
            Err(err) => {
                warn!("could not apply bridge selection: {err}");
                TickOutcome::Loaded { avatar }
            }
        }
    }

    /// Tick and sleep until disabled, returning how many new documents
    /// were handled
    pub fn run(&self, engine: &mut Engine) -> usize {
        info!(
            "watching {} every {:?}",
            engine.bridge_path().display(),
            self.config.interval
        );
        let mut handled = 0;
        loop {
            match self.tick(engine) {
                TickOutcome::Disabled => break,
                TickOutcome::Unchanged | TickOutcome::Unreadable => {}
                TickOutcome::Loaded { .. } | TickOutcome::Applied { .. } => handled += 1,
            }
            std::thread::sleep(self.config.interval);
        }
        debug!("bridge watch stopped after {handled} updates");
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_budget_core::Scene;
    use avatar_budget_io::ExchangeDocument;
    use std::time::Duration;
    use tempfile::TempDir;

    fn watched_engine(dir: &TempDir) -> Engine {
        let mut scene = Scene::new();
        scene.add_empty("Body");
        scene.add_empty("Hat");
        Engine::with_bridge_path(scene, dir.path().join("bridge.json"))
    }

    fn write_doc(engine: &Engine) {
        ExchangeDocument {
            avatar_name: "Fox".to_string(),
            keep_objects: vec!["Body".to_string()],
            remove_objects: vec!["Hat".to_string()],
            ..ExchangeDocument::default()
        }
        .write_to(engine.bridge_path())
        .unwrap();
    }

    #[test]
    fn test_tick_applies_new_document_once() {
        let dir = TempDir::new().unwrap();
        let mut engine = watched_engine(&dir);
        let watcher = BridgeWatcher::default();

        assert_eq!(watcher.tick(&mut engine), TickOutcome::Unchanged);

        write_doc(&engine);
        let outcome = watcher.tick(&mut engine);
        assert_eq!(
            outcome,
            TickOutcome::Applied {
                avatar: "Fox".to_string(),
                selection: SelectionOutcome {
                    kept: 1,
                    marked_for_removal: 1
                },
                deleted: None,
            }
        );
        assert_eq!(watcher.tick(&mut engine), TickOutcome::Unchanged);
        assert_eq!(engine.scene().object_count(), 2);
    }

    #[test]
    fn test_tick_auto_delete() {
        let dir = TempDir::new().unwrap();
        let mut engine = watched_engine(&dir);
        let watcher = BridgeWatcher::new(WatchConfig {
            auto_delete: true,
            ..WatchConfig::default()
        });

        write_doc(&engine);
        match watcher.tick(&mut engine) {
            TickOutcome::Applied { deleted, .. } => assert_eq!(deleted, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(engine.scene().find_object("Hat").is_none());
    }

    #[test]
    fn test_tick_without_auto_apply() {
        let dir = TempDir::new().unwrap();
        let mut engine = watched_engine(&dir);
        let watcher = BridgeWatcher::new(WatchConfig {
            auto_apply: false,
            ..WatchConfig::default()
        });

        write_doc(&engine);
        assert_eq!(
            watcher.tick(&mut engine),
            TickOutcome::Loaded {
                avatar: "Fox".to_string()
            }
        );
        let hat = engine.scene().find_object("Hat").unwrap();
        assert!(!engine.scene().object(hat).unwrap().hidden);
    }

    #[test]
    fn test_disabled_watcher_does_nothing() {
        let dir = TempDir::new().unwrap();
        let mut engine = watched_engine(&dir);
        write_doc(&engine);

        let watcher = BridgeWatcher::new(WatchConfig {
            interval: Duration::from_millis(1),
            ..WatchConfig::default()
        });
        watcher.enabled_flag().store(false, Ordering::SeqCst);
        assert_eq!(watcher.tick(&mut engine), TickOutcome::Disabled);
        assert_eq!(watcher.run(&mut engine), 0);
    }

    #[test]
    fn test_run_stops_when_flag_cleared() {
        let dir = TempDir::new().unwrap();
        let mut engine = watched_engine(&dir);
        write_doc(&engine);

        let watcher = BridgeWatcher::new(WatchConfig {
            interval: Duration::from_millis(5),
            ..WatchConfig::default()
        });
        let flag = watcher.enabled_flag();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(false, Ordering::SeqCst);
        });

        assert_eq!(watcher.run(&mut engine), 1);
        stopper.join().unwrap();
    }
}
