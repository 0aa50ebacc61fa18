use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::literature::AFFILIATION_NOT_FOUND;
use crate::models::record::{coerce_string, normalize_key};

/// Placeholder the completion service is asked to use for unknown fields.
pub const NOT_AVAILABLE: &str = "Not available";

/// Key carrying a generation failure.
pub const ERROR_FIELD: &str = "error";

/// Normalized keys read as the subject's affiliation.
pub const AFFILIATION_KEYS: [&str; 2] = ["primary_affiliation", "affiliation"];

/// Untyped key/value output of the generative fallback.
///
/// Missing fields are normal. Only a non-empty `error` value marks the
/// profile as failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedProfile {
    fields: Map<String, Value>,
}

impl GeneratedProfile {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ERROR_FIELD.to_string(), Value::String(error.into()));
        Self { fields }
    }

    pub fn error(&self) -> Option<&str> {
        self.fields
            .get(ERROR_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// The generated affiliation, if it is real data rather than a placeholder.
    ///
    /// Keys are matched the way [`CanonicalRecord::from_profile`] matches them.
    ///
    /// [`CanonicalRecord::from_profile`]: crate::models::CanonicalRecord::from_profile
    pub fn affiliation(&self) -> Option<String> {
        self.fields
            .iter()
            .filter(|(key, _)| is_affiliation_key(key))
            .find_map(|(_, value)| coerce_string(value))
    }
}

pub fn is_affiliation_key(key: &str) -> bool {
    AFFILIATION_KEYS.contains(&normalize_key(key).as_str())
}

/// `true` for empty strings and the placeholders both sources emit for unknowns.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.eq_ignore_ascii_case(NOT_AVAILABLE)
        || value.eq_ignore_ascii_case(AFFILIATION_NOT_FOUND)
        || value.eq_ignore_ascii_case("n/a")
        || value.eq_ignore_ascii_case("unknown")
        || value.eq_ignore_ascii_case("none")
}
