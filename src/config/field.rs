//! Per-slot gathering settings
//!
//! A [`FieldConfig`] can only be changed through [`FieldConfig::set`], which
//! runs the edit through the validation engine using the static rule table
//! in [`FieldKey::rule`]. Every field therefore always holds an in-domain
//! value and any snapshot is safe to persist.

use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error};

use crate::catalog::PatternCatalog;
use crate::constants::field::*;
use crate::error::{SchemaIssue, SchemaProblem};
use crate::validation::{self, Outcome, Rule, Value};

choice_enum! {
    /// Gathering location
    pub enum GatherField {
        Sunflower => "sunflower",
        Dandelion => "dandelion",
        Mushroom => "mushroom",
        BlueFlower => "blue_flower",
        Clover => "clover",
        Strawberry => "strawberry",
        Spider => "spider",
        Bamboo => "bamboo",
        Pineapple => "pineapple",
        Stump => "stump",
        Cactus => "cactus",
        Pumpkin => "pumpkin",
        PineTree => "pine_tree",
        Rose => "rose",
        MountainTop => "mountain_top",
        Pepper => "pepper",
        Coconut => "coconut",
    }
}

choice_enum! {
    /// Overall area covered by the pattern
    pub enum PatternSize {
        ExtraSmall => "XS",
        Small => "S",
        Medium => "M",
        Large => "L",
        ExtraLarge => "XL",
    }
}

choice_enum! {
    pub enum CameraTurn {
        None => "none",
        Left => "left",
        Right => "right",
    }
}

choice_enum! {
    /// How the worker gets back to the hive when gathering ends
    pub enum ReturnMethod {
        Reset => "reset",
        Walk => "walk",
        Rejoin => "rejoin",
        Whirligig => "whirligig",
    }
}

choice_enum! {
    /// Starting position inside the field
    pub enum StartLocation {
        Center => "center",
        UpperRight => "upper_right",
        Right => "right",
        LowerRight => "lower_right",
        Bottom => "bottom",
        LowerLeft => "lower_left",
        Left => "left",
        UpperLeft => "upper_left",
        Top => "top",
    }
}

choice_enum! {
    /// Canonical key of one setting in a [`FieldConfig`]
    pub enum FieldKey {
        Enabled => "enabled",
        Field => "field",
        ShiftLock => "shift_lock",
        DriftCompensation => "drift_compensation",
        PatternShape => "pattern_shape",
        PatternSize => "pattern_size",
        PatternWidth => "pattern_width",
        InvertHorizontal => "invert_horizontal",
        InvertVertical => "invert_vertical",
        CameraTurn => "camera_turn",
        CameraTurnCount => "camera_turn_count",
        MaxMinutes => "max_minutes",
        BackpackThresholdPct => "backpack_threshold_pct",
        ReturnMethod => "return_method",
        StartLocation => "start_location",
        StartDistance => "start_distance",
        UseGoo => "use_goo",
        GooIntervalSeconds => "goo_interval_seconds",
    }
}

impl FieldKey {
    /// Domain of each key
    pub fn rule(self) -> Rule {
        match self {
            FieldKey::Enabled
            | FieldKey::ShiftLock
            | FieldKey::DriftCompensation
            | FieldKey::InvertHorizontal
            | FieldKey::InvertVertical
            | FieldKey::UseGoo => Rule::Bool,
            FieldKey::Field => Rule::one_of(GatherField::NAMES),
            FieldKey::PatternShape => Rule::text(PATTERN_NAME_CHARS),
            FieldKey::PatternSize => Rule::one_of(PatternSize::NAMES),
            FieldKey::PatternWidth => Rule::int(MIN_PATTERN_WIDTH, MAX_PATTERN_WIDTH),
            FieldKey::CameraTurn => Rule::one_of(CameraTurn::NAMES),
            FieldKey::CameraTurnCount => Rule::int(MIN_TURN_COUNT, MAX_TURN_COUNT),
            FieldKey::MaxMinutes => Rule::Float {
                min: Some(MIN_MINUTES),
                max: Some(MAX_MINUTES),
                max_length: Some(MINUTES_CHARS),
            },
            FieldKey::BackpackThresholdPct => Rule::Int {
                min: Some(MIN_BACKPACK_PCT),
                max: Some(MAX_BACKPACK_PCT),
                max_length: Some(BACKPACK_CHARS),
            },
            FieldKey::ReturnMethod => Rule::one_of(ReturnMethod::NAMES),
            FieldKey::StartLocation => Rule::one_of(StartLocation::NAMES),
            FieldKey::StartDistance => Rule::int(MIN_START_DISTANCE, MAX_START_DISTANCE),
            FieldKey::GooIntervalSeconds => Rule::Int {
                min: Some(MIN_GOO_INTERVAL),
                max: Some(MAX_GOO_INTERVAL),
                max_length: Some(GOO_INTERVAL_CHARS),
            },
        }
    }
}

/// Settings for one field slot
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    enabled: bool,
    field: GatherField,
    shift_lock: bool,
    drift_compensation: bool,
    pattern_shape: String,
    pattern_size: PatternSize,
    pattern_width: u8,
    invert_horizontal: bool,
    invert_vertical: bool,
    camera_turn: CameraTurn,
    camera_turn_count: u8,
    max_minutes: f64,
    backpack_threshold_pct: u8,
    return_method: ReturnMethod,
    start_location: StartLocation,
    start_distance: u8,
    use_goo: bool,
    goo_interval_seconds: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field: GatherField::Sunflower,
            shift_lock: false,
            drift_compensation: false,
            pattern_shape: DEFAULT_PATTERN.to_string(),
            pattern_size: PatternSize::Medium,
            pattern_width: DEFAULT_PATTERN_WIDTH as u8,
            invert_horizontal: false,
            invert_vertical: false,
            camera_turn: CameraTurn::None,
            camera_turn_count: MIN_TURN_COUNT as u8,
            max_minutes: DEFAULT_MINUTES,
            backpack_threshold_pct: DEFAULT_BACKPACK_PCT as u8,
            return_method: ReturnMethod::Walk,
            start_location: StartLocation::Center,
            start_distance: MIN_START_DISTANCE as u8,
            use_goo: false,
            goo_interval_seconds: MIN_GOO_INTERVAL as u32,
        }
    }
}

impl FieldConfig {
    /// Current value of one key in its canonical form
    pub fn get(&self, key: FieldKey) -> Value {
        match key {
            FieldKey::Enabled => Value::Bool(self.enabled),
            FieldKey::Field => choice(self.field.as_str()),
            FieldKey::ShiftLock => Value::Bool(self.shift_lock),
            FieldKey::DriftCompensation => Value::Bool(self.drift_compensation),
            FieldKey::PatternShape => Value::Text(self.pattern_shape.clone()),
            FieldKey::PatternSize => choice(self.pattern_size.as_str()),
            FieldKey::PatternWidth => Value::Int(self.pattern_width.into()),
            FieldKey::InvertHorizontal => Value::Bool(self.invert_horizontal),
            FieldKey::InvertVertical => Value::Bool(self.invert_vertical),
            FieldKey::CameraTurn => choice(self.camera_turn.as_str()),
            FieldKey::CameraTurnCount => Value::Int(self.camera_turn_count.into()),
            FieldKey::MaxMinutes => Value::Float(self.max_minutes),
            FieldKey::BackpackThresholdPct => Value::Int(self.backpack_threshold_pct.into()),
            FieldKey::ReturnMethod => choice(self.return_method.as_str()),
            FieldKey::StartLocation => choice(self.start_location.as_str()),
            FieldKey::StartDistance => Value::Int(self.start_distance.into()),
            FieldKey::UseGoo => Value::Bool(self.use_goo),
            FieldKey::GooIntervalSeconds => Value::Int(self.goo_interval_seconds.into()),
        }
    }

    /// Apply one edit from the editing surface
    ///
    /// Called on every change event, not only on commit. A rejected edit
    /// leaves the previous value in place.
    pub fn set(&mut self, key: FieldKey, raw: &str) -> Outcome {
        let outcome = validation::validate(raw, &key.rule());
        match &outcome {
            Outcome::Accepted(value) => {
                debug!(key = %key, value = %value, "Field setting updated");
            }
            Outcome::Clamped { value, requested } => {
                debug!(key = %key, requested = %requested, committed = %value, "Field setting clamped");
            }
            Outcome::Rejected(reason) => {
                debug!(key = %key, raw = %raw, reason = %reason, "Field edit rejected");
            }
        }

        if let Some(value) = outcome.value() {
            if !self.assign(key, value) {
                error!(key = %key, value = %value, "Validated value does not fit field type");
            }
        }
        outcome
    }

    /// Canonical key/value mapping of every setting
    pub fn to_canonical(&self) -> Map<String, JsonValue> {
        FieldKey::ALL
            .iter()
            .map(|key| (key.as_str().to_string(), self.get(*key).to_json()))
            .collect()
    }

    /// Build from canonical data, collecting every schema issue
    ///
    /// Unknown keys are rejected. Missing keys take their documented
    /// defaults. Values are checked strictly (no clamping), so untrusted
    /// input can never smuggle in e.g. a goo interval below the floor.
    pub fn from_canonical(map: &Map<String, JsonValue>) -> Result<Self, Vec<SchemaIssue>> {
        let mut config = Self::default();
        let mut issues: Vec<SchemaIssue> = map
            .keys()
            .filter(|key| FieldKey::from_str(key).is_err())
            .map(|key| SchemaIssue::new(key.as_str(), SchemaProblem::UnknownKey))
            .collect();

        let mut defaulted = Vec::new();
        for &key in FieldKey::ALL {
            let Some(json) = map.get(key.as_str()) else {
                defaulted.push(key.as_str());
                continue;
            };
            match validation::check(json, &key.rule()) {
                Ok(value) if config.assign(key, &value) => {}
                Ok(_) => issues.push(SchemaIssue::new(
                    key.as_str(),
                    SchemaProblem::TypeMismatch { expected: key.rule().kind_name() },
                )),
                Err(problem) => issues.push(SchemaIssue::new(key.as_str(), problem)),
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }
        if !defaulted.is_empty() {
            debug!(keys = ?defaulted, "Filled missing field settings with defaults");
        }
        Ok(config)
    }

    /// Whether the selected pattern is in the currently loaded catalog
    ///
    /// Checked lazily: the catalog can change between edit and save.
    pub fn pattern_resolved(&self, catalog: &PatternCatalog) -> bool {
        catalog.contains(&self.pattern_shape)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn field(&self) -> GatherField {
        self.field
    }

    pub fn shift_lock(&self) -> bool {
        self.shift_lock
    }

    pub fn drift_compensation(&self) -> bool {
        self.drift_compensation
    }

    pub fn pattern_shape(&self) -> &str {
        &self.pattern_shape
    }

    pub fn pattern_size(&self) -> PatternSize {
        self.pattern_size
    }

    pub fn pattern_width(&self) -> u8 {
        self.pattern_width
    }

    pub fn invert_horizontal(&self) -> bool {
        self.invert_horizontal
    }

    pub fn invert_vertical(&self) -> bool {
        self.invert_vertical
    }

    pub fn camera_turn(&self) -> CameraTurn {
        self.camera_turn
    }

    pub fn camera_turn_count(&self) -> u8 {
        self.camera_turn_count
    }

    pub fn max_minutes(&self) -> f64 {
        self.max_minutes
    }

    pub fn backpack_threshold_pct(&self) -> u8 {
        self.backpack_threshold_pct
    }

    pub fn return_method(&self) -> ReturnMethod {
        self.return_method
    }

    pub fn start_location(&self) -> StartLocation {
        self.start_location
    }

    pub fn start_distance(&self) -> u8 {
        self.start_distance
    }

    pub fn use_goo(&self) -> bool {
        self.use_goo
    }

    pub fn goo_interval_seconds(&self) -> u32 {
        self.goo_interval_seconds
    }

    /// Store an already-validated value; false if it does not fit the key
    fn assign(&mut self, key: FieldKey, value: &Value) -> bool {
        match key {
            FieldKey::Enabled => put_bool(&mut self.enabled, value),
            FieldKey::Field => put_choice(&mut self.field, value),
            FieldKey::ShiftLock => put_bool(&mut self.shift_lock, value),
            FieldKey::DriftCompensation => put_bool(&mut self.drift_compensation, value),
            FieldKey::PatternShape => match value.as_text() {
                Some(text) => {
                    self.pattern_shape = text.to_string();
                    true
                }
                None => false,
            },
            FieldKey::PatternSize => put_choice(&mut self.pattern_size, value),
            FieldKey::PatternWidth => put_int(&mut self.pattern_width, value),
            FieldKey::InvertHorizontal => put_bool(&mut self.invert_horizontal, value),
            FieldKey::InvertVertical => put_bool(&mut self.invert_vertical, value),
            FieldKey::CameraTurn => put_choice(&mut self.camera_turn, value),
            FieldKey::CameraTurnCount => put_int(&mut self.camera_turn_count, value),
            FieldKey::MaxMinutes => match value.as_float() {
                Some(minutes) => {
                    self.max_minutes = minutes;
                    true
                }
                None => false,
            },
            FieldKey::BackpackThresholdPct => put_int(&mut self.backpack_threshold_pct, value),
            FieldKey::ReturnMethod => put_choice(&mut self.return_method, value),
            FieldKey::StartLocation => put_choice(&mut self.start_location, value),
            FieldKey::StartDistance => put_int(&mut self.start_distance, value),
            FieldKey::UseGoo => put_bool(&mut self.use_goo, value),
            FieldKey::GooIntervalSeconds => put_int(&mut self.goo_interval_seconds, value),
        }
    }
}

fn choice(text: &str) -> Value {
    Value::Text(text.to_string())
}

fn put_bool(slot: &mut bool, value: &Value) -> bool {
    value.as_bool().map(|b| *slot = b).is_some()
}

fn put_int<T: TryFrom<i64>>(slot: &mut T, value: &Value) -> bool {
    match value.as_int().and_then(|n| T::try_from(n).ok()) {
        Some(n) => {
            *slot = n;
            true
        }
        None => false,
    }
}

fn put_choice<T: FromStr>(slot: &mut T, value: &Value) -> bool {
    match value.as_text().and_then(|s| s.parse().ok()) {
        Some(choice) => {
            *slot = choice;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = FieldConfig::default();
        assert_eq!(config.backpack_threshold_pct(), 100);
        assert_eq!(config.goo_interval_seconds(), 3);
        assert_eq!(config.pattern_size(), PatternSize::Medium);
        assert!(!config.enabled());
    }

    #[test]
    fn test_set_clamps_backpack() {
        let mut config = FieldConfig::default();
        config.set(FieldKey::BackpackThresholdPct, "40");
        assert_eq!(config.backpack_threshold_pct(), 40);

        let outcome = config.set(FieldKey::BackpackThresholdPct, "150");
        assert!(matches!(outcome, Outcome::Clamped { .. }));
        assert_eq!(config.backpack_threshold_pct(), 100);
    }

    #[test]
    fn test_goo_interval_floor() {
        let mut config = FieldConfig::default();
        config.set(FieldKey::GooIntervalSeconds, "10");
        config.set(FieldKey::GooIntervalSeconds, "1");
        assert_eq!(config.goo_interval_seconds(), 3);
    }

    #[test]
    fn test_rejected_edit_keeps_previous_value() {
        let mut config = FieldConfig::default();
        config.set(FieldKey::MaxMinutes, "20");
        assert!(config.set(FieldKey::MaxMinutes, "").is_rejected());
        assert!(config.set(FieldKey::MaxMinutes, "abc").is_rejected());
        assert_eq!(config.max_minutes(), 20.0);

        assert!(config.set(FieldKey::CameraTurn, "sideways").is_rejected());
        assert_eq!(config.camera_turn(), CameraTurn::None);
    }

    #[test]
    fn test_enum_edits() {
        let mut config = FieldConfig::default();
        config.set(FieldKey::Field, "pine_tree");
        config.set(FieldKey::PatternSize, "XL");
        config.set(FieldKey::ReturnMethod, "whirligig");
        config.set(FieldKey::StartLocation, "upper_left");
        assert_eq!(config.field(), GatherField::PineTree);
        assert_eq!(config.pattern_size(), PatternSize::ExtraLarge);
        assert_eq!(config.return_method(), ReturnMethod::Whirligig);
        assert_eq!(config.start_location(), StartLocation::UpperLeft);
    }

    #[test]
    fn test_every_rule_bound_fits_its_length_and_type() {
        // Setting a key to each of its bounds must be accepted verbatim and
        // read back unchanged, otherwise clamping would not be idempotent.
        for &key in FieldKey::ALL {
            let bounds: Vec<String> = match key.rule() {
                Rule::Int { min, max, .. } => {
                    [min, max].into_iter().flatten().map(|n| n.to_string()).collect()
                }
                Rule::Float { min, max, .. } => {
                    [min, max].into_iter().flatten().map(|x| x.to_string()).collect()
                }
                _ => continue,
            };
            for bound in bounds {
                let mut config = FieldConfig::default();
                let outcome = config.set(key, &bound);
                assert!(matches!(outcome, Outcome::Accepted(_)), "{key}={bound}: {outcome:?}");
                assert_eq!(config.get(key).to_string(), bound);
            }
        }
    }

    #[test]
    fn test_canonical_has_exactly_the_declared_keys() {
        let canonical = FieldConfig::default().to_canonical();
        let mut keys: Vec<&str> = canonical.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = FieldKey::NAMES.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_from_canonical_fills_missing_keys() {
        let map = json!({ "enabled": true, "field": "rose" });
        let config = FieldConfig::from_canonical(map.as_object().unwrap()).unwrap();
        assert!(config.enabled());
        assert_eq!(config.field(), GatherField::Rose);
        assert_eq!(config.goo_interval_seconds(), 3);
        assert_eq!(config.backpack_threshold_pct(), 100);
    }

    #[test]
    fn test_from_canonical_collects_every_issue() {
        let map = json!({
            "colour": "blue",
            "goo_interval_seconds": 1,
            "pattern_width": "wide",
            "camera_turn": "up"
        });
        let issues = FieldConfig::from_canonical(map.as_object().unwrap()).unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(issues.len(), 4);
        assert!(paths.contains(&"colour"));
        assert!(paths.contains(&"goo_interval_seconds"));
        assert!(issues.iter().any(|i| i.path == "pattern_width"
            && matches!(i.problem, SchemaProblem::TypeMismatch { .. })));
        assert!(issues.iter().any(|i| i.path == "camera_turn"
            && matches!(i.problem, SchemaProblem::OutOfDomain { .. })));
    }

    #[test]
    fn test_assign_refuses_wrong_type() {
        let mut config = FieldConfig::default();
        assert!(!config.assign(FieldKey::Enabled, &Value::Int(1)));
        assert!(!config.assign(FieldKey::MaxMinutes, &Value::Text("ten".to_string())));
        assert!(!config.assign(FieldKey::CameraTurn, &Value::Text("backwards".to_string())));
        assert_eq!(config, FieldConfig::default());

        assert!(config.assign(FieldKey::Enabled, &Value::Bool(true)));
        assert!(config.enabled());
    }

    #[test]
    fn test_pattern_resolution_is_lazy() {
        let mut config = FieldConfig::default();
        let outcome = config.set(FieldKey::PatternShape, "cornerxsnake");
        assert!(matches!(outcome, Outcome::Accepted(_)));

        let catalog = PatternCatalog::new(["squares"]);
        assert!(!config.pattern_resolved(&catalog));
        let catalog = PatternCatalog::new(["squares", "cornerxsnake"]);
        assert!(config.pattern_resolved(&catalog));
    }

    #[test]
    fn test_reset() {
        let mut config = FieldConfig::default();
        config.set(FieldKey::UseGoo, "true");
        config.reset();
        assert_eq!(config, FieldConfig::default());
    }
}
