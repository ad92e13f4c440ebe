//! On-disk layout of the profile store
//!
//! ```text
//! <data dir>/store.json            manifest: active profile pointer
//! <data dir>/profiles/<name>.json  one canonical blob per profile
//! <data dir>/run_state             shared run-state word
//! <data dir>/patterns/             pattern catalog
//! ```
//!
//! Every file is replaced atomically, so a reader sees either the old or the
//! new contents and never a partial write.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::profile::Profile;
use crate::config::serializer;
use crate::config::ProfileStore;
use crate::constants::config::*;
use crate::error::{DecodeError, StoreError, StoreResult};

/// Manifest file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub active: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

/// Paths of everything the store keeps under one data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory from an explicit path, else the environment, else the
    /// user's config dir
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        if let Some(root) = explicit {
            return Self::new(root);
        }
        if let Some(root) = env::var_os(DIR_ENV).filter(|value| !value.is_empty()) {
            return Self::new(root);
        }
        let mut root = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        root.push(APP_DIR);
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(PROFILES_DIR)
    }

    pub fn patterns_dir(&self) -> PathBuf {
        self.root.join(PATTERNS_DIR)
    }

    pub fn run_state_path(&self) -> PathBuf {
        self.root.join(RUN_STATE_FILE)
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(profile_file_name(name))
    }

    /// Load the persisted store
    ///
    /// A data directory that does not exist yet gives a fresh store (nothing
    /// is written until the first save).
    ///
    /// Safe to call while another process saves: profiles are read before
    /// the manifest, which a save writes after the blobs it points to.
    pub fn load(&self) -> StoreResult<ProfileStore> {
        if !self.root.exists() {
            info!(path = %self.root.display(), "No saved profiles found, starting with defaults");
            return Ok(ProfileStore::default());
        }

        let profiles = self.load_profiles()?;
        let manifest = self.load_manifest()?;
        self.assemble(profiles, manifest)
    }

    /// Build the store from a profile set and the manifest read after it
    ///
    /// A manifest naming a profile the set lacks means a save landed between
    /// the two reads, so both are read once more before falling back.
    fn assemble(
        &self,
        mut profiles: Vec<Profile>,
        mut manifest: Option<StoreManifest>,
    ) -> StoreResult<ProfileStore> {
        if manifest
            .as_ref()
            .is_some_and(|m| !profiles.iter().any(|p| p.name() == m.active))
        {
            debug!(path = %self.root.display(), "Active profile missing from set, reading again");
            profiles = self.load_profiles()?;
            manifest = self.load_manifest()?;
        }

        info!(
            path = %self.root.display(),
            count = profiles.len(),
            "Loaded profiles"
        );
        Ok(ProfileStore::from_profiles(
            profiles,
            manifest.as_ref().map(|m| m.active.as_str()),
        ))
    }

    fn load_manifest(&self) -> StoreResult<Option<StoreManifest>> {
        let path = self.manifest_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Manifest missing, active profile will fall back");
                return Ok(None);
            }
            Err(err) => return Err(StoreError::persistence(path, err)),
        };

        let manifest: StoreManifest = serde_json::from_str(&contents).map_err(|err| StoreError::Corrupt {
            path: path.clone(),
            source: DecodeError::from(err),
        })?;
        if manifest.version > MANIFEST_VERSION {
            warn!(
                path = %path.display(),
                version = manifest.version,
                supported = MANIFEST_VERSION,
                "Manifest written by a newer version"
            );
        }
        Ok(Some(manifest))
    }

    fn load_profiles(&self) -> StoreResult<Vec<Profile>> {
        let dir = self.profiles_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::persistence(dir, err)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| StoreError::persistence(&dir, err))?.path();
            if is_profile_blob(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(profile) = read_profile(&path)? else {
                continue;
            };
            if !seen.insert(profile.name().to_string()) {
                warn!(path = %path.display(), profile = %profile.name(), "Duplicate profile name on disk, skipping");
                continue;
            }
            debug!(path = %path.display(), profile = %profile.name(), "Loaded profile");
            profiles.push(profile);
        }
        Ok(profiles)
    }

    /// Persist the whole store
    ///
    /// Order: profile blobs, then the manifest, then blobs of profiles that
    /// no longer exist. A crash part way leaves at worst an extra profile.
    pub fn save(&self, store: &ProfileStore) -> StoreResult<()> {
        let dir = self.profiles_dir();
        fs::create_dir_all(&dir).map_err(|err| StoreError::persistence(&dir, err))?;

        for profile in store.profiles() {
            self.save_profile(profile)?;
        }
        self.save_manifest(store.active_name())?;
        self.remove_stale(store)?;

        info!(path = %self.root.display(), count = store.len(), active = %store.active_name(), "Saved profiles");
        Ok(())
    }

    /// Persist a single profile blob
    pub fn save_profile(&self, profile: &Profile) -> StoreResult<()> {
        let path = self.profile_path(profile.name());
        atomic_write(&path, serializer::encode(profile).as_bytes())
            .map_err(|err| StoreError::persistence(&path, err))?;
        debug!(path = %path.display(), profile = %profile.name(), "Wrote profile");
        Ok(())
    }

    fn save_manifest(&self, active: &str) -> StoreResult<()> {
        let path = self.manifest_path();
        let manifest = StoreManifest {
            active: active.to_string(),
            version: MANIFEST_VERSION,
        };
        let mut contents = serde_json::to_string_pretty(&manifest).map_err(|err| {
            StoreError::persistence(&path, io::Error::new(io::ErrorKind::InvalidData, err))
        })?;
        contents.push('\n');
        atomic_write(&path, contents.as_bytes()).map_err(|err| StoreError::persistence(&path, err))
    }

    fn remove_stale(&self, store: &ProfileStore) -> StoreResult<()> {
        let dir = self.profiles_dir();
        let expected: HashSet<String> = store.list().into_iter().map(profile_file_name).collect();

        for entry in fs::read_dir(&dir).map_err(|err| StoreError::persistence(&dir, err))? {
            let path = entry.map_err(|err| StoreError::persistence(&dir, err))?.path();
            if !is_profile_blob(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !expected.contains(file_name) {
                fs::remove_file(&path).map_err(|err| StoreError::persistence(&path, err))?;
                info!(path = %path.display(), "Removed blob of deleted profile");
            }
        }
        Ok(())
    }
}

/// One profile blob; `None` if it was removed after the directory listing
fn read_profile(path: &Path) -> StoreResult<Option<Profile>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Profile blob removed while loading, skipping");
            return Ok(None);
        }
        Err(err) => return Err(StoreError::persistence(path, err)),
    };
    serializer::decode(&text)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace `path` with `contents` via a synced temp file in the same directory
///
/// The temp file is removed on every failure path when it is dropped.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Everything but `[A-Za-z0-9_-]`
const FILE_NAME_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-');

/// Stable file name for a profile name
///
/// Distinct names never collide and the encoding can be reversed.
pub fn profile_file_name(name: &str) -> String {
    format!("{}.{PROFILE_EXTENSION}", utf8_percent_encode(name, FILE_NAME_ESCAPES))
}

fn is_profile_blob(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(PROFILE_EXTENSION)
}
