//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the configuration core, providing a single source of truth for bounds,
//! defaults and on-disk names.

/// Data directory and file naming
pub mod config {
    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "fuzzy-control";

    /// Environment variable overriding the data directory
    pub const DIR_ENV: &str = "FUZZY_CONTROL_DIR";

    /// Manifest holding the current-profile pointer
    pub const MANIFEST_FILE: &str = "store.json";

    /// Directory holding one serialized blob per profile
    pub const PROFILES_DIR: &str = "profiles";

    /// Directory scanned for pattern identifiers
    pub const PATTERNS_DIR: &str = "patterns";

    /// File backing the shared run-state word
    pub const RUN_STATE_FILE: &str = "run_state";

    /// Extension of serialized profile blobs
    pub const PROFILE_EXTENSION: &str = "json";

    /// Manifest format version
    pub const MANIFEST_VERSION: u32 = 1;

    /// Longest file name most filesystems accept
    pub const MAX_FILE_NAME_BYTES: usize = 255;
}

/// Profile store constants
pub mod profile {
    /// Name of the profile that exists in a fresh store
    pub const DEFAULT_NAME: &str = "Default";

    /// Number of configurable field slots per profile
    pub const FIELD_SLOTS: usize = 5;

    /// Longest profile name, in characters
    pub const MAX_NAME_CHARS: usize = 64;
}

/// Per-field validation bounds and defaults
pub mod field {
    pub const MIN_PATTERN_WIDTH: i64 = 1;
    pub const MAX_PATTERN_WIDTH: i64 = 8;

    pub const MIN_TURN_COUNT: i64 = 1;
    pub const MAX_TURN_COUNT: i64 = 4;

    /// Gather time in minutes (4 characters in the editor)
    pub const MIN_MINUTES: f64 = 0.0;
    pub const MAX_MINUTES: f64 = 9999.0;
    pub const MINUTES_CHARS: usize = 4;

    pub const MIN_BACKPACK_PCT: i64 = 0;
    pub const MAX_BACKPACK_PCT: i64 = 100;
    pub const BACKPACK_CHARS: usize = 3;

    pub const MIN_START_DISTANCE: i64 = 1;
    pub const MAX_START_DISTANCE: i64 = 10;

    /// Hard floor for goo usage interval
    pub const MIN_GOO_INTERVAL: i64 = 3;
    pub const MAX_GOO_INTERVAL: i64 = 9999;
    pub const GOO_INTERVAL_CHARS: usize = 4;

    /// Pattern identifiers longer than this are truncated
    pub const PATTERN_NAME_CHARS: usize = 64;

    pub const DEFAULT_PATTERN: &str = "squares";
    pub const DEFAULT_PATTERN_WIDTH: i64 = 3;
    pub const DEFAULT_MINUTES: f64 = 15.0;
    pub const DEFAULT_BACKPACK_PCT: i64 = 100;
}

/// Global (non-per-field) settings bounds
pub mod global {
    pub const MAX_HIVE_SLOT: i64 = 6;
    pub const MAX_INVENTORY_SLOT: i64 = 7;

    pub const MAX_MOVESPEED: f64 = 99.99;
    pub const MOVESPEED_CHARS: usize = 5;

    pub const MAX_BEES: i64 = 50;
    pub const BEES_CHARS: usize = 2;

    pub const MAX_REJOIN_HOURS: f64 = 9999.0;
    pub const REJOIN_HOURS_CHARS: usize = 4;

    pub const URL_CHARS: usize = 256;
    pub const TOKEN_CHARS: usize = 128;
    pub const SHORT_TEXT_CHARS: usize = 32;
}

/// Run-state protocol constants
pub mod run_state {
    /// Shared-word values (fixed by the persisted representation)
    pub const STOPPED: i32 = 0;
    pub const RUNNING: i32 = 2;
    pub const PAUSED: i32 = 5;

    /// Controller display polling interval
    pub const DISPLAY_POLL_INTERVAL_MS: u64 = 1000;
}
