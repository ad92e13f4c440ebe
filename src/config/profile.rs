//! Profile - a complete named set of field slots and global settings

use crate::catalog::PatternCatalog;
use crate::constants::config::MAX_FILE_NAME_BYTES;
use crate::constants::profile::{FIELD_SLOTS, MAX_NAME_CHARS};
use crate::error::{StoreError, StoreResult};
use crate::persistence::profile_file_name;

use super::field::FieldConfig;
use super::global::GlobalSettings;

/// A named profile, switchable as a unit
///
/// The name is only changed through the store so it always matches the
/// store's key for this profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: String,
    fields: [FieldConfig; FIELD_SLOTS],
    global: GlobalSettings,
}

impl Profile {
    /// New profile with default field slots and global settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Default::default(),
            global: GlobalSettings::default(),
        }
    }

    pub fn from_parts(
        name: impl Into<String>,
        fields: [FieldConfig; FIELD_SLOTS],
        global: GlobalSettings,
    ) -> Self {
        Self {
            name: name.into(),
            fields,
            global,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn fields(&self) -> &[FieldConfig; FIELD_SLOTS] {
        &self.fields
    }

    /// Field config by slot number (1-based)
    pub fn field(&self, slot: usize) -> StoreResult<&FieldConfig> {
        slot_index(slot).map(|idx| &self.fields[idx])
    }

    pub fn field_mut(&mut self, slot: usize) -> StoreResult<&mut FieldConfig> {
        slot_index(slot).map(move |idx| &mut self.fields[idx])
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalSettings {
        &mut self.global
    }

    /// Slots whose pattern is not in the catalog, with the pattern name
    pub fn unresolved_patterns<'a>(&'a self, catalog: &PatternCatalog) -> Vec<(usize, &'a str)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| !field.pattern_resolved(catalog))
            .map(|(idx, field)| (idx + 1, field.pattern_shape()))
            .collect()
    }
}

/// Whether `name` is short enough to keep, both as text and as a file name
///
/// Every non-ASCII byte takes three once percent-encoded, so the file name
/// can run out before the character limit does.
pub fn name_fits(name: &str) -> bool {
    name.chars().count() <= MAX_NAME_CHARS && profile_file_name(name).len() <= MAX_FILE_NAME_BYTES
}

fn slot_index(slot: usize) -> StoreResult<usize> {
    if (1..=FIELD_SLOTS).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(StoreError::InvalidSlot(slot))
    }
}
