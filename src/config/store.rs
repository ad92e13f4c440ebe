//! Multi-profile store
//!
//! Owns every named [`Profile`] plus the pointer to the active one. Each
//! operation either applies completely or returns an error with the store
//! untouched. Two invariants hold after every call:
//! - the store is never empty
//! - `active` names an existing profile

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::catalog::PatternCatalog;
use crate::constants::profile::DEFAULT_NAME;
use crate::error::{StoreError, StoreResult};
use crate::validation::Outcome;

use super::field::{FieldConfig, FieldKey};
use super::global::GlobalKey;
use super::profile::{Profile, name_fits};
use super::serializer;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
    active: String,
}

impl Default for ProfileStore {
    /// Fresh store holding only the default profile
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_NAME.to_string(), Profile::new(DEFAULT_NAME));
        Self {
            profiles,
            active: DEFAULT_NAME.to_string(),
        }
    }
}

impl ProfileStore {
    /// Rebuild a store from loaded profiles
    ///
    /// An empty set yields the default store. A missing or unknown active
    /// name falls back the same way deleting the active profile does.
    pub fn from_profiles(profiles: Vec<Profile>, active: Option<&str>) -> Self {
        let profiles: BTreeMap<String, Profile> = profiles
            .into_iter()
            .map(|profile| (profile.name().to_string(), profile))
            .collect();
        if profiles.is_empty() {
            return Self::default();
        }

        let active = match active {
            Some(name) if profiles.contains_key(name) => name.to_string(),
            requested => {
                let fallback = fallback_name(&profiles);
                warn!(requested = ?requested, fallback = %fallback, "Active profile not found, falling back");
                fallback
            }
        };
        Self { profiles, active }
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active_profile(&self) -> &Profile {
        // Invariant: active always names an existing profile
        &self.profiles[&self.active]
    }

    /// Profile names in store order
    pub fn list(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name.trim())
    }

    /// Lookups trim `name` the same way `create` does
    pub fn profile(&self, name: &str) -> StoreResult<&Profile> {
        let name = name.trim();
        self.profiles
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn profile_mut(&mut self, name: &str) -> StoreResult<&mut Profile> {
        let name = name.trim();
        self.profiles
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Insert a profile with default settings; does not change `active`
    pub fn create(&mut self, name: &str) -> StoreResult<()> {
        let name = self.available_name(name)?;
        self.profiles.insert(name.clone(), Profile::new(name.clone()));
        info!(profile = %name, "Created profile");
        Ok(())
    }

    pub fn switch(&mut self, name: &str) -> StoreResult<()> {
        let name = name.trim();
        if !self.profiles.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.active = name.to_string();
        info!(profile = %name, "Switched active profile");
        Ok(())
    }

    /// Deep copy of `source` under `new_name`; does not change `active`
    pub fn duplicate(&mut self, source: &str, new_name: &str) -> StoreResult<()> {
        let source = source.trim();
        let mut copy = self.profile(source)?.clone();
        let new_name = self.available_name(new_name)?;
        copy.set_name(new_name.clone());
        self.profiles.insert(new_name.clone(), copy);
        info!(source = %source, profile = %new_name, "Duplicated profile");
        Ok(())
    }

    /// Rename, carrying the active pointer along if needed
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> StoreResult<()> {
        let old_name = old_name.trim();
        if !self.profiles.contains_key(old_name) {
            return Err(StoreError::NotFound(old_name.to_string()));
        }
        if old_name == new_name.trim() {
            return Ok(());
        }
        let new_name = self.available_name(new_name)?;

        let Some(mut profile) = self.profiles.remove(old_name) else {
            return Err(StoreError::NotFound(old_name.to_string()));
        };
        profile.set_name(new_name.clone());
        self.profiles.insert(new_name.clone(), profile);
        if self.active == old_name {
            self.active = new_name.clone();
        }
        info!(from = %old_name, to = %new_name, "Renamed profile");
        Ok(())
    }

    /// Remove a profile; the last remaining one cannot be deleted
    ///
    /// Deleting the active profile first repoints `active` to the default
    /// profile if it survives, otherwise to the lowest-ordered remaining name.
    pub fn delete(&mut self, name: &str) -> StoreResult<()> {
        let name = name.trim();
        if !self.profiles.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        if self.profiles.len() == 1 {
            return Err(StoreError::LastProfile(name.to_string()));
        }

        if self.active == name {
            let fallback = if name != DEFAULT_NAME && self.profiles.contains_key(DEFAULT_NAME) {
                DEFAULT_NAME.to_string()
            } else {
                self.profiles
                    .keys()
                    .find(|candidate| candidate.as_str() != name)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_NAME.to_string())
            };
            info!(from = %name, to = %fallback, "Deleting active profile, switching first");
            self.active = fallback;
        }
        self.profiles.remove(name);
        info!(profile = %name, "Deleted profile");
        Ok(())
    }

    pub fn export_profile(&self, name: &str) -> StoreResult<String> {
        Ok(serializer::encode(self.profile(name)?))
    }

    /// Decode and insert a profile, returning the name it was stored under
    ///
    /// A name collision gets a numeric suffix (`Name (1)`, `Name (2)`...);
    /// `NameTooLong` if the suffixed name would not fit. On any error the
    /// store is left exactly as it was.
    pub fn import_profile(&mut self, text: &str) -> StoreResult<String> {
        let mut profile: Profile = serializer::decode(text)?;
        let name = self.unique_name(profile.name());
        if !name_fits(&name) {
            return Err(StoreError::NameTooLong(name));
        }
        if name != profile.name() {
            info!(requested = %profile.name(), stored_as = %name, "Imported profile name in use, renamed");
        }
        profile.set_name(name.clone());
        self.profiles.insert(name.clone(), profile);
        info!(profile = %name, "Imported profile");
        Ok(name)
    }

    /// Edit one field setting of a named profile
    pub fn set_field(&mut self, name: &str, slot: usize, key: FieldKey, raw: &str) -> StoreResult<Outcome> {
        Ok(self.profile_mut(name)?.field_mut(slot)?.set(key, raw))
    }

    /// Edit one global setting of a named profile
    pub fn set_global(&mut self, name: &str, key: GlobalKey, raw: &str) -> StoreResult<Outcome> {
        Ok(self.profile_mut(name)?.global_mut().set(key, raw))
    }

    pub fn reset_field(&mut self, name: &str, slot: usize) -> StoreResult<()> {
        self.profile_mut(name)?.field_mut(slot)?.reset();
        info!(profile = %name, slot, "Reset field to defaults");
        Ok(())
    }

    pub fn export_field(&self, name: &str, slot: usize) -> StoreResult<String> {
        Ok(serializer::encode(self.profile(name)?.field(slot)?))
    }

    /// Replace one slot from exported field text; all-or-nothing
    pub fn import_field(&mut self, name: &str, slot: usize, text: &str) -> StoreResult<()> {
        // Resolve the target before decoding so a bad slot is reported even
        // for valid text, and decode before touching anything.
        self.profile(name)?.field(slot)?;
        let field: FieldConfig = serializer::decode(text)?;
        *self.profile_mut(name)?.field_mut(slot)? = field;
        info!(profile = %name, slot, "Imported field settings");
        Ok(())
    }

    pub fn unresolved_patterns(&self, name: &str, catalog: &PatternCatalog) -> StoreResult<Vec<(usize, String)>> {
        Ok(self
            .profile(name)?
            .unresolved_patterns(catalog)
            .into_iter()
            .map(|(slot, pattern)| (slot, pattern.to_string()))
            .collect())
    }

    /// Normalize `name` and make sure it can be inserted and saved
    fn available_name(&self, name: &str) -> StoreResult<String> {
        let name = name.trim();
        if name.is_empty() || self.profiles.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        if !name_fits(name) {
            return Err(StoreError::NameTooLong(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// `base` if free, else the first free `base (n)`
    fn unique_name(&self, base: &str) -> String {
        if !self.profiles.contains_key(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| !self.profiles.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Deterministic fallback for the active pointer
fn fallback_name(profiles: &BTreeMap<String, Profile>) -> String {
    if profiles.contains_key(DEFAULT_NAME) {
        return DEFAULT_NAME.to_string();
    }
    profiles
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}
