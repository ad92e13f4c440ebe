//! Worker-side view of the persisted configuration
//!
//! The automation worker never writes settings. It reads the active profile
//! once at startup and follows the run-state word for the rest of its life.

use std::sync::Arc;

use tracing::info;

use crate::config::field::FieldConfig;
use crate::config::profile::Profile;
use crate::error::StoreResult;
use crate::persistence::StoreLayout;
use crate::run_state::{FileWord, RunState, RunStateReader};

pub struct WorkerView {
    profile: Profile,
    run_state: RunStateReader,
}

impl WorkerView {
    /// Read the active profile; a stale pointer falls back to another profile
    pub fn load(layout: &StoreLayout) -> StoreResult<Self> {
        let store = layout.load()?;
        let profile = store.active_profile().clone();
        info!(profile = %profile.name(), "Using profile for worker settings");
        Ok(Self {
            profile,
            run_state: RunStateReader::new(Arc::new(FileWord::new(layout.run_state_path()))),
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Enabled slots in gathering order, with their 1-based slot number
    pub fn enabled_fields(&self) -> impl Iterator<Item = (usize, &FieldConfig)> {
        self.profile
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| field.enabled())
            .map(|(idx, field)| (idx + 1, field))
    }

    pub fn run_state(&self) -> Option<RunState> {
        self.run_state.current()
    }
}
