use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One generated unit of story text. Its position in the stored list is its key.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Episode {
    pub text: String,
    pub summary: String,
    pub title: String,
    pub model: String, // "xai", "gemini", "anthropic", "openai", ...
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct Character {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Character {
    /// Builds a character from form input, skipping entries with a blank name.
    pub fn from_input(name: &str, description: &str) -> Option<Self> {
        if name.trim().is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
        })
    }
}

/// Parameters that seeded the current story. Replaced wholesale on each new
/// generation, never merged.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_choice: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<Character>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Continuation context derived from the latest episode and the session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoryContext {
    pub summary: String,
    pub episode_number: usize,
    pub title: String,
    pub model: String,
    pub genre: Option<String>,
    pub prompt: Option<String>,
    pub characters: Vec<Character>,
}

/// Export format. Older exports used `storyList` and `exportDate`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(alias = "storyList")]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub session_data: SessionData,
    #[serde(alias = "exportDate")]
    pub export_timestamp: DateTime<Utc>,
}

/// Reads a catalog field the backend may send as text, a number or a list.
///
/// Numbers become their decimal text and lists of scalars are joined with `, `.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn text(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(items.iter().filter_map(text).collect::<Vec<_>>().join(", "))),
        Value::Object(_) => Err(de::Error::custom("expected a string, number or list")),
        other => Ok(text(&other)),
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct CharacterProfile {
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub speech_pattern: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterProfile {
    /// Folds the profile into the `{name, description}` pair the generator takes.
    pub fn to_character(&self) -> Option<Character> {
        let description = [
            ("性別", &self.gender),
            ("年齢", &self.age),
            ("職業", &self.occupation),
            ("外見", &self.appearance),
            ("性格", &self.personality),
            ("口調", &self.speech_pattern),
        ]
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| format!("{}：{}", label, v))
        })
        .collect::<Vec<_>>()
        .join("、");

        Character::from_input(self.name.as_deref().unwrap_or(""), &description)
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct LocationProfile {
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationProfile {
    /// One-line setting note, e.g. `舞台：隠れ家カフェ（路地裏の小さなカフェ）`.
    pub fn setting_note(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|n| !n.trim().is_empty())?;
        match self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(description) => Some(format!("舞台：{}（{}）", name, description)),
            None => Some(format!("舞台：{}", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_serializes_to_empty_object() {
        let json = serde_json::to_string(&SessionData::default()).unwrap();
        assert_eq!(json, "{}");

        let parsed: SessionData = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_episode_missing_fields_default_to_empty() {
        let episode: Episode = serde_json::from_str(r#"{"title": "第1話"}"#).unwrap();
        assert_eq!(episode.title, "第1話");
        assert_eq!(episode.text, "");
        assert_eq!(episode.model, "");
    }

    #[test]
    fn test_snapshot_accepts_legacy_keys() {
        let json = r#"{
            "storyList": [{"text": "T1", "summary": "S1", "title": "第1話", "model": "xai"}],
            "sessionData": {"genre": "fantasy"},
            "exportDate": "2024-05-01T10:00:00.000Z"
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.episodes.len(), 1);
        assert_eq!(snapshot.session_data.genre.as_deref(), Some("fantasy"));

        let out = serde_json::to_value(&snapshot).unwrap();
        assert!(out.get("episodes").is_some());
        assert!(out.get("exportTimestamp").is_some());
    }

    #[test]
    fn test_character_from_input_skips_blank_names() {
        assert!(Character::from_input("   ", "desc").is_none());
        let c = Character::from_input("山田太郎", "15歳").unwrap();
        assert_eq!(c.name, "山田太郎");
    }

    #[test]
    fn test_profiles_keep_unknown_fields() {
        let json = r#"{"id": "1", "name": "テスト花子", "age": "28", "created_at": "2024-01-01"}"#;
        let profile: CharacterProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.extra.get("created_at").and_then(Value::as_str), Some("2024-01-01"));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["created_at"], "2024-01-01");
    }

    #[test]
    fn test_profile_folds_into_character() {
        let profile = CharacterProfile {
            name: Some("テスト太郎".to_string()),
            age: Some("30".to_string()),
            occupation: Some("会社員".to_string()),
            ..Default::default()
        };
        let character = profile.to_character().unwrap();
        assert_eq!(character.description, "年齢：30、職業：会社員");

        assert!(CharacterProfile::default().to_character().is_none());
    }

    #[test]
    fn test_profiles_accept_numeric_fields() {
        let json = r#"{"name": "太郎", "gender": "male", "age": 31, "speech_pattern": null}"#;
        let profile: CharacterProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.age.as_deref(), Some("31"));
        assert_eq!(profile.speech_pattern, None);
        assert_eq!(
            profile.to_character().unwrap().description,
            "性別：male、年齢：31"
        );

        let json = r#"{"id": 3, "name": "カフェ", "tags": ["隠れ家", "静か"]}"#;
        let location: LocationProfile = serde_json::from_str(json).unwrap();
        assert_eq!(location.id.as_deref(), Some("3"));
        assert_eq!(location.tags.as_deref(), Some("隠れ家, 静か"));
    }

    #[test]
    fn test_location_setting_note() {
        let location = LocationProfile {
            name: Some("隠れ家カフェ".to_string()),
            description: Some("路地裏の小さなカフェ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            location.setting_note().as_deref(),
            Some("舞台：隠れ家カフェ（路地裏の小さなカフェ）")
        );
        assert!(LocationProfile::default().setting_note().is_none());
    }
}
