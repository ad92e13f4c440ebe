//! Global (non-per-field) settings
//!
//! Rejoining, Discord integration, keybinds and the other settings that
//! apply to the whole profile rather than to one field slot. Stored as a
//! key → validated value mapping over a fixed key table.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::constants::global::*;
use crate::error::{SchemaIssue, SchemaProblem};
use crate::validation::{self, Outcome, Rule, Value};

const SPRINKLER_TYPES: &[&str] = &["basic", "silver", "golden", "diamond", "saturator"];
const BALLOON_MODES: &[&str] = &["always", "every_x", "never"];
const REJOIN_METHODS: &[&str] = &["deeplink", "new_tab", "reload"];

choice_enum! {
    /// Canonical key of one global setting
    pub enum GlobalKey {
        HiveSlot => "hive_slot",
        Movespeed => "movespeed",
        BeeCount => "bee_count",
        SprinklerType => "sprinkler_type",
        SprinklerSlot => "sprinkler_slot",
        GooSlot => "goo_slot",
        BalloonConvert => "balloon_convert",
        PrivateServerLink => "private_server_link",
        RejoinMethod => "rejoin_method",
        RejoinEveryHours => "rejoin_every_hours",
        HasteCompensation => "haste_compensation",
        StartKeybind => "start_keybind",
        StopKeybind => "stop_keybind",
        PauseKeybind => "pause_keybind",
        DiscordWebhookEnabled => "discord_webhook_enabled",
        DiscordWebhookUrl => "discord_webhook_url",
        DiscordBotEnabled => "discord_bot_enabled",
        DiscordBotToken => "discord_bot_token",
        DiscordPingsEnabled => "discord_pings_enabled",
        DiscordUserId => "discord_user_id",
        StreamEnabled => "stream_enabled",
        StreamPinUrl => "stream_pin_url",
    }
}

impl GlobalKey {
    pub fn rule(self) -> Rule {
        match self {
            GlobalKey::HiveSlot => Rule::int(1, MAX_HIVE_SLOT),
            GlobalKey::Movespeed => Rule::Float {
                min: Some(0.0),
                max: Some(MAX_MOVESPEED),
                max_length: Some(MOVESPEED_CHARS),
            },
            GlobalKey::BeeCount => Rule::Int {
                min: Some(0),
                max: Some(MAX_BEES),
                max_length: Some(BEES_CHARS),
            },
            GlobalKey::SprinklerType => Rule::one_of(SPRINKLER_TYPES),
            GlobalKey::SprinklerSlot | GlobalKey::GooSlot => Rule::int(1, MAX_INVENTORY_SLOT),
            GlobalKey::BalloonConvert => Rule::one_of(BALLOON_MODES),
            GlobalKey::RejoinMethod => Rule::one_of(REJOIN_METHODS),
            GlobalKey::RejoinEveryHours => Rule::Float {
                min: Some(0.0),
                max: Some(MAX_REJOIN_HOURS),
                max_length: Some(REJOIN_HOURS_CHARS),
            },
            GlobalKey::PrivateServerLink | GlobalKey::DiscordWebhookUrl => Rule::text(URL_CHARS),
            GlobalKey::DiscordBotToken => Rule::text(TOKEN_CHARS),
            GlobalKey::StartKeybind
            | GlobalKey::StopKeybind
            | GlobalKey::PauseKeybind
            | GlobalKey::DiscordUserId => Rule::text(SHORT_TEXT_CHARS),
            GlobalKey::HasteCompensation
            | GlobalKey::DiscordWebhookEnabled
            | GlobalKey::DiscordBotEnabled
            | GlobalKey::DiscordPingsEnabled
            | GlobalKey::StreamEnabled
            | GlobalKey::StreamPinUrl => Rule::Bool,
        }
    }

    pub fn default_value(self) -> Value {
        let text = |s: &str| Value::Text(s.to_string());
        match self {
            GlobalKey::HiveSlot | GlobalKey::SprinklerSlot => Value::Int(1),
            GlobalKey::GooSlot => Value::Int(2),
            GlobalKey::Movespeed => Value::Float(28.0),
            GlobalKey::BeeCount => Value::Int(MAX_BEES),
            GlobalKey::SprinklerType => text("basic"),
            GlobalKey::BalloonConvert => text("always"),
            GlobalKey::RejoinMethod => text("deeplink"),
            GlobalKey::RejoinEveryHours => Value::Float(0.0),
            GlobalKey::StartKeybind => text("F1"),
            GlobalKey::PauseKeybind => text("F2"),
            GlobalKey::StopKeybind => text("F3"),
            GlobalKey::PrivateServerLink
            | GlobalKey::DiscordWebhookUrl
            | GlobalKey::DiscordBotToken
            | GlobalKey::DiscordUserId => text(""),
            GlobalKey::HasteCompensation
            | GlobalKey::DiscordWebhookEnabled
            | GlobalKey::DiscordBotEnabled
            | GlobalKey::DiscordPingsEnabled
            | GlobalKey::StreamEnabled
            | GlobalKey::StreamPinUrl => Value::Bool(false),
        }
    }
}

/// Validated global settings; every key in the table always has a value
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    values: BTreeMap<GlobalKey, Value>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            values: GlobalKey::ALL
                .iter()
                .map(|&key| (key, key.default_value()))
                .collect(),
        }
    }
}

impl GlobalSettings {
    pub fn get(&self, key: GlobalKey) -> Value {
        self.values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.default_value())
    }

    /// Apply one edit; rejected edits leave the previous value
    pub fn set(&mut self, key: GlobalKey, raw: &str) -> Outcome {
        let outcome = validation::validate(raw, &key.rule());
        match &outcome {
            Outcome::Rejected(reason) => {
                debug!(key = %key, reason = %reason, "Global setting edit rejected");
            }
            Outcome::Clamped { value, requested } => {
                debug!(key = %key, requested = %requested, committed = %value, "Global setting clamped");
            }
            Outcome::Accepted(_) => {}
        }
        if let Some(value) = outcome.value() {
            self.values.insert(key, value.clone());
        }
        outcome
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalKey, &Value)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn to_canonical(&self) -> Map<String, JsonValue> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value.to_json()))
            .collect()
    }

    /// Same contract as [`FieldConfig::from_canonical`](super::FieldConfig::from_canonical)
    pub fn from_canonical(map: &Map<String, JsonValue>) -> Result<Self, Vec<SchemaIssue>> {
        let mut settings = Self::default();
        let mut issues = Vec::new();

        for (name, json) in map {
            let Ok(key) = GlobalKey::from_str(name) else {
                issues.push(SchemaIssue::new(name.as_str(), SchemaProblem::UnknownKey));
                continue;
            };
            match validation::check(json, &key.rule()) {
                Ok(value) => {
                    settings.values.insert(key, value);
                }
                Err(problem) => issues.push(SchemaIssue::new(name.as_str(), problem)),
            }
        }

        if issues.is_empty() {
            Ok(settings)
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_satisfy_their_rules() {
        for &key in GlobalKey::ALL {
            let json = key.default_value().to_json();
            assert!(
                validation::check(&json, &key.rule()).is_ok(),
                "default for {key} violates its rule"
            );
        }
    }

    #[test]
    fn test_set_and_clamp() {
        let mut settings = GlobalSettings::default();
        settings.set(GlobalKey::BeeCount, "99");
        assert_eq!(settings.get(GlobalKey::BeeCount), Value::Int(50));

        settings.set(GlobalKey::RejoinMethod, "new_tab");
        assert_eq!(settings.get(GlobalKey::RejoinMethod), Value::Text("new_tab".to_string()));

        assert!(settings.set(GlobalKey::RejoinMethod, "teleport").is_rejected());
        assert_eq!(settings.get(GlobalKey::RejoinMethod), Value::Text("new_tab".to_string()));
    }

    #[test]
    fn test_text_truncated_to_limit() {
        let mut settings = GlobalSettings::default();
        let long = "x".repeat(SHORT_TEXT_CHARS + 10);
        settings.set(GlobalKey::DiscordUserId, &long);
        assert_eq!(
            settings.get(GlobalKey::DiscordUserId).as_text().map(|s| s.len()),
            Some(SHORT_TEXT_CHARS)
        );
    }

    #[test]
    fn test_from_canonical() {
        let map = json!({ "haste_compensation": true, "hive_slot": 4 });
        let settings = GlobalSettings::from_canonical(map.as_object().unwrap()).unwrap();
        assert_eq!(settings.get(GlobalKey::HasteCompensation), Value::Bool(true));
        assert_eq!(settings.get(GlobalKey::HiveSlot), Value::Int(4));
        assert_eq!(settings.get(GlobalKey::StartKeybind), Value::Text("F1".to_string()));

        let bad = json!({ "hive_slot": 9, "theme": "dark" });
        let issues = GlobalSettings::from_canonical(bad.as_object().unwrap()).unwrap_err();
        assert_eq!(issues.len(), 2);
    }
}
