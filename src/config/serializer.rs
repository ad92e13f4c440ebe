//! Canonical JSON encoding for field configs, global settings and profiles
//!
//! Encoding is deterministic: keys are written in sorted order at every
//! level and the output always ends with a newline, so exported files diff
//! cleanly. Decoding either fully succeeds or returns an error; it never
//! touches any existing state.

use serde_json::{Map, Value as JsonValue};

use crate::constants::profile::{FIELD_SLOTS, MAX_NAME_CHARS};
use crate::error::{DecodeError, SchemaIssue, SchemaProblem};

use super::field::FieldConfig;
use super::global::GlobalSettings;
use super::profile::{Profile, name_fits};

const KEY_NAME: &str = "name";
const KEY_FIELDS: &str = "fields";
const KEY_GLOBAL: &str = "global_settings";

/// Something that has a canonical text encoding
pub trait Canonical: Sized {
    fn to_json(&self) -> JsonValue;
    fn from_json(json: &JsonValue) -> Result<Self, Vec<SchemaIssue>>;
}

impl Canonical for FieldConfig {
    fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.to_canonical())
    }

    fn from_json(json: &JsonValue) -> Result<Self, Vec<SchemaIssue>> {
        FieldConfig::from_canonical(expect_object(json)?)
    }
}

impl Canonical for GlobalSettings {
    fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.to_canonical())
    }

    fn from_json(json: &JsonValue) -> Result<Self, Vec<SchemaIssue>> {
        GlobalSettings::from_canonical(expect_object(json)?)
    }
}

impl Canonical for Profile {
    fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert(KEY_NAME.to_string(), JsonValue::String(self.name().to_string()));
        map.insert(
            KEY_FIELDS.to_string(),
            JsonValue::Array(self.fields().iter().map(Canonical::to_json).collect()),
        );
        map.insert(KEY_GLOBAL.to_string(), self.global().to_json());
        JsonValue::Object(map)
    }

    fn from_json(json: &JsonValue) -> Result<Self, Vec<SchemaIssue>> {
        let map = expect_object(json)?;
        let mut issues: Vec<SchemaIssue> = map
            .keys()
            .filter(|key| ![KEY_NAME, KEY_FIELDS, KEY_GLOBAL].contains(&key.as_str()))
            .map(|key| SchemaIssue::new(key.as_str(), SchemaProblem::UnknownKey))
            .collect();

        let name = match map.get(KEY_NAME) {
            None => {
                issues.push(SchemaIssue::new(KEY_NAME, SchemaProblem::MissingKey));
                None
            }
            Some(JsonValue::String(name)) if !name.trim().is_empty() => {
                let name = name.trim();
                if name_fits(name) {
                    Some(name.to_string())
                } else {
                    issues.push(SchemaIssue::new(
                        KEY_NAME,
                        SchemaProblem::OutOfDomain {
                            detail: format!("name is too long (at most {MAX_NAME_CHARS} characters)"),
                        },
                    ));
                    None
                }
            }
            Some(JsonValue::String(_)) => {
                issues.push(SchemaIssue::new(
                    KEY_NAME,
                    SchemaProblem::OutOfDomain { detail: "name must not be empty".to_string() },
                ));
                None
            }
            Some(_) => {
                issues.push(SchemaIssue::new(KEY_NAME, SchemaProblem::TypeMismatch { expected: "string" }));
                None
            }
        };

        let fields = match map.get(KEY_FIELDS) {
            None => {
                issues.push(SchemaIssue::new(KEY_FIELDS, SchemaProblem::MissingKey));
                None
            }
            Some(JsonValue::Array(items)) if items.len() != FIELD_SLOTS => {
                issues.push(SchemaIssue::new(
                    KEY_FIELDS,
                    SchemaProblem::WrongLength { expected: FIELD_SLOTS, found: items.len() },
                ));
                None
            }
            Some(JsonValue::Array(items)) => {
                let mut decoded = Vec::with_capacity(FIELD_SLOTS);
                for (idx, item) in items.iter().enumerate() {
                    match FieldConfig::from_json(item) {
                        Ok(field) => decoded.push(field),
                        Err(errs) => issues.extend(
                            errs.into_iter()
                                .map(|issue| issue.nested(&format!("[{idx}]")).nested(KEY_FIELDS)),
                        ),
                    }
                }
                <[FieldConfig; FIELD_SLOTS]>::try_from(decoded).ok()
            }
            Some(_) => {
                issues.push(SchemaIssue::new(KEY_FIELDS, SchemaProblem::TypeMismatch { expected: "array" }));
                None
            }
        };

        let global = match map.get(KEY_GLOBAL) {
            None => Some(GlobalSettings::default()),
            Some(json) => match GlobalSettings::from_json(json) {
                Ok(global) => Some(global),
                Err(errs) => {
                    issues.extend(errs.into_iter().map(|issue| issue.nested(KEY_GLOBAL)));
                    None
                }
            },
        };

        match (name, fields, global) {
            (Some(name), Some(fields), Some(global)) if issues.is_empty() => {
                Ok(Profile::from_parts(name, fields, global))
            }
            _ => Err(issues),
        }
    }
}

/// Deterministic pretty-printed text for `entity`
pub fn encode<T: Canonical>(entity: &T) -> String {
    let json = entity.to_json();
    // `{:#}` pretty-prints a Value
    let mut text = format!("{json:#}");
    text.push('\n');
    text
}

/// Parse and schema-check `text`
pub fn decode<T: Canonical>(text: &str) -> Result<T, DecodeError> {
    let json: JsonValue = serde_json::from_str(text)?;
    T::from_json(&json).map_err(DecodeError::Schema)
}

fn expect_object(json: &JsonValue) -> Result<&Map<String, JsonValue>, Vec<SchemaIssue>> {
    json.as_object().ok_or_else(|| {
        vec![SchemaIssue::new("$", SchemaProblem::TypeMismatch { expected: "object" })]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::field::FieldKey;
    use crate::config::global::GlobalKey;

    fn sample_profile() -> Profile {
        let mut profile = Profile::new("Speedrun");
        let field = profile.field_mut(1).unwrap();
        field.set(FieldKey::Enabled, "true");
        field.set(FieldKey::Field, "pepper");
        field.set(FieldKey::MaxMinutes, "12.5");
        field.set(FieldKey::PatternShape, "e_lol");
        let field = profile.field_mut(4).unwrap();
        field.set(FieldKey::CameraTurn, "right");
        field.set(FieldKey::GooIntervalSeconds, "45");
        profile.global_mut().set(GlobalKey::DiscordWebhookEnabled, "true");
        profile.global_mut().set(GlobalKey::Movespeed, "33.6");
        profile
    }

    #[test]
    fn test_profile_round_trip() {
        let profile = sample_profile();
        let decoded: Profile = decode(&encode(&profile)).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_field_round_trip() {
        let field = sample_profile().field(1).unwrap().clone();
        let decoded: FieldConfig = decode(&encode(&field)).unwrap();
        assert_eq!(decoded, field);
    }

    #[test]
    fn test_encode_is_deterministic_and_sorted() {
        let profile = sample_profile();
        let first = encode(&profile);
        assert_eq!(first, encode(&profile.clone()));
        assert!(first.ends_with('\n'));

        let fields_at = first.find("\"fields\"").unwrap();
        let global_at = first.find("\"global_settings\"").unwrap();
        let name_at = first.find("\"name\"").unwrap();
        assert!(fields_at < global_at && global_at < name_at);
    }

    #[test]
    fn test_truncated_text_is_parse_error() {
        let text = encode(&sample_profile());
        let truncated = &text[..text.len() / 2];
        match decode::<Profile>(truncated) {
            Err(DecodeError::Parse { line, column, .. }) => assert!(line > 1 && column > 0),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_profile_schema_errors_have_paths() {
        let mut json = sample_profile().to_json();
        json["fields"][2]["goo_interval_seconds"] = JsonValue::from(1);
        json["global_settings"]["hive_slot"] = JsonValue::from("one");
        json["extra"] = JsonValue::Bool(true);

        let err = decode::<Profile>(&json.to_string()).unwrap_err();
        let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"extra"));
        assert!(paths.contains(&"fields[2].goo_interval_seconds"));
        assert!(paths.contains(&"global_settings.hive_slot"));
    }

    #[test]
    fn test_profile_requires_name_and_five_fields() {
        let err = decode::<Profile>(r#"{"fields": []}"#).unwrap_err();
        assert!(err.issues().iter().any(|i| i.path == "name" && i.problem == SchemaProblem::MissingKey));
        assert!(err.issues().iter().any(|i| i.path == "fields"
            && i.problem == SchemaProblem::WrongLength { expected: 5, found: 0 }));

        let err = decode::<Profile>(r#"{"name": "  ", "fields": [{}, {}, {}, {}, {}]}"#).unwrap_err();
        assert_eq!(err.issues().len(), 1);
    }

    #[test]
    fn test_profile_name_too_long() {
        let text = format!(r#"{{"name": "{}", "fields": [{{}}, {{}}, {{}}, {{}}, {{}}]}}"#, "é".repeat(60));
        let err = decode::<Profile>(&text).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].path, "name");
        assert!(matches!(err.issues()[0].problem, SchemaProblem::OutOfDomain { .. }));
    }

    /// Deterministic spread of values in `[0, max]` with full mantissas
    fn spread(count: usize, max: f64) -> impl Iterator<Item = f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..count).map(move |_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * max
        })
    }

    #[test]
    fn test_floats_survive_round_trip() {
        for minutes in spread(10_000, 9999.0) {
            let mut map = FieldConfig::default().to_canonical();
            map.insert("max_minutes".to_string(), JsonValue::from(minutes));
            let field = FieldConfig::from_canonical(&map).unwrap();
            let decoded: FieldConfig = decode(&encode(&field)).unwrap();
            assert_eq!(decoded, field, "max_minutes {minutes} changed");
        }

        for (speed, hours) in spread(10_000, 99.99).zip(spread(10_000, 9999.0).skip(7)) {
            let mut map = GlobalSettings::default().to_canonical();
            map.insert("movespeed".to_string(), JsonValue::from(speed));
            map.insert("rejoin_every_hours".to_string(), JsonValue::from(hours));
            let global = GlobalSettings::from_canonical(&map).unwrap();
            let decoded: GlobalSettings = decode(&encode(&global)).unwrap();
            assert_eq!(decoded, global, "movespeed {speed} / rejoin {hours} changed");
        }
    }

    #[test]
    fn test_missing_global_settings_use_defaults() {
        let profile: Profile =
            decode(r#"{"name": "Minimal", "fields": [{}, {}, {}, {}, {}]}"#).unwrap();
        assert_eq!(profile.name(), "Minimal");
        assert_eq!(profile.global(), &GlobalSettings::default());
        assert_eq!(profile.fields()[0], FieldConfig::default());
    }

    #[test]
    fn test_non_object_is_schema_error() {
        let err = decode::<FieldConfig>("[1, 2]").unwrap_err();
        assert_eq!(err.issues()[0].path, "$");
    }
}
