//! Controller context
//!
//! Everything the controller process shares between its surfaces lives here
//! and is passed by reference. The profile store sits behind one mutex: each
//! store operation (and the save that follows it) runs as a single critical
//! section, so concurrent editors never observe a half-applied change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::catalog::PatternCatalog;
use crate::config::ProfileStore;
use crate::error::StoreResult;
use crate::persistence::StoreLayout;
use crate::run_state::{FileWord, RunStateWriter};

pub struct ControllerContext {
    store: Mutex<ProfileStore>,
    layout: StoreLayout,
    catalog: PatternCatalog,
    run_state: RunStateWriter,
}

impl ControllerContext {
    fn new(
        layout: StoreLayout,
        store: ProfileStore,
        catalog: PatternCatalog,
        run_state: RunStateWriter,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            layout,
            catalog,
            run_state,
        }
    }

    /// Load the persisted store and take the writer side of the file-backed
    /// run-state word
    pub fn open(layout: StoreLayout, catalog: PatternCatalog) -> StoreResult<Self> {
        let store = layout.load()?;
        let unresolved = store.unresolved_patterns(store.active_name(), &catalog)?;
        for (slot, pattern) in &unresolved {
            warn!(profile = %store.active_name(), slot, pattern = %pattern, "Pattern not found in catalog");
        }
        let run_state = RunStateWriter::new(Arc::new(FileWord::new(layout.run_state_path())));
        info!(path = %layout.root().display(), active = %store.active_name(), "Controller context ready");
        Ok(Self::new(layout, store, catalog, run_state))
    }

    /// Run a read-only query against the store
    pub fn read<T>(&self, query: impl FnOnce(&ProfileStore) -> T) -> T {
        query(&self.lock())
    }

    /// Run one store operation and persist the result
    ///
    /// The lock is held across the save so the files on disk follow the same
    /// order as the in-memory edits. A failed save leaves the in-memory
    /// change in place and reports the persistence error.
    pub fn update<T>(&self, op: impl FnOnce(&mut ProfileStore) -> StoreResult<T>) -> StoreResult<T> {
        let mut store = self.lock();
        let result = op(&mut store)?;
        self.layout.save(&store)?;
        Ok(result)
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn run_state(&self) -> &RunStateWriter {
        &self.run_state
    }

    fn lock(&self) -> MutexGuard<'_, ProfileStore> {
        // Store operations are all-or-nothing, so a panicked holder cannot
        // have left a half-applied edit behind.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::field::FieldKey;
    use crate::error::StoreError;
    use crate::run_state::RunState;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_update_persists() {
        let dir = tempdir().unwrap();
        let ctx = ControllerContext::open(StoreLayout::new(dir.path()), PatternCatalog::default()).unwrap();
        ctx.update(|store| store.create("Speedrun")).unwrap();
        ctx.update(|store| store.switch("Speedrun")).unwrap();

        let reopened = ControllerContext::open(StoreLayout::new(dir.path()), PatternCatalog::default()).unwrap();
        assert_eq!(reopened.read(|store| store.active_name().to_string()), "Speedrun");
    }

    #[test]
    fn test_failed_operation_does_not_save() {
        let dir = tempdir().unwrap();
        let ctx = ControllerContext::open(StoreLayout::new(dir.path()), PatternCatalog::default()).unwrap();
        let err = ctx.update(|store| store.delete("Default")).unwrap_err();
        assert!(matches!(err, StoreError::LastProfile(_)));
        assert!(!ctx.layout().manifest_path().exists());
    }

    #[test]
    fn test_concurrent_edits_all_land() {
        let dir = tempdir().unwrap();
        let ctx = Arc::new(
            ControllerContext::open(StoreLayout::new(dir.path()), PatternCatalog::default()).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    let name = format!("Worker {n}");
                    ctx.update(|store| store.create(&name)).unwrap();
                    ctx.update(|store| store.set_field(&name, 1, FieldKey::Enabled, "true"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ctx.read(|store| store.len()), 5);
        let loaded = ctx.layout().load().unwrap();
        assert_eq!(loaded.len(), 5);
        assert!(loaded.profile("Worker 2").unwrap().field(1).unwrap().enabled());
    }

    #[test]
    fn test_run_state_goes_to_file() {
        let dir = tempdir().unwrap();
        let ctx = ControllerContext::open(StoreLayout::new(dir.path()), PatternCatalog::default()).unwrap();
        ctx.run_state().request_pause().unwrap();
        assert_eq!(ctx.run_state().reader().current(), Some(RunState::Paused));
        assert!(ctx.layout().run_state_path().exists());
    }
}
