use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::literature::{LiteratureRecord, Work};
use crate::models::profile::{ERROR_FIELD, GeneratedProfile, is_affiliation_key, is_placeholder};

/// Placeholder for a missing portrait.
pub const IMAGE_NOT_AVAILABLE: &str = "Not Available";

// ─── CanonicalRecord ────────────────────────────────────────

/// The merged profile persisted for one subject, keyed by `name`.
///
/// Generated fields are coerced into typed slots; anything the schema does
/// not name is carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Subject name as supplied by the caller. Identity key for upserts.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_summary: Option<String>,

    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub professional_history: Vec<String>,
    #[serde(default)]
    pub conferences_and_awards: Vec<String>,
    #[serde(default)]
    pub areas_of_interest: Vec<String>,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(default)]
    pub geographical_influence: Vec<String>,
    #[serde(default)]
    pub speaking_engagements: Vec<String>,
    #[serde(default)]
    pub patient_advocacy: Vec<String>,

    /// Literature works rendered as `title: <title> -- <year>`.
    #[serde(default)]
    pub research: Vec<String>,
    #[serde(default)]
    pub publications: Vec<Work>,
    #[serde(default = "image_not_available")]
    pub image_url: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn image_not_available() -> String {
    IMAGE_NOT_AVAILABLE.to_string()
}

impl CanonicalRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            gender: None,
            primary_affiliation: None,
            country: None,
            department: None,
            title: None,
            email: None,
            phone: None,
            fax: None,
            twitter: None,
            linkedin: None,
            professional_summary: None,
            qualifications: Vec::new(),
            education: Vec::new(),
            professional_history: Vec::new(),
            conferences_and_awards: Vec::new(),
            areas_of_interest: Vec::new(),
            collaborators: Vec::new(),
            geographical_influence: Vec::new(),
            speaking_engagements: Vec::new(),
            patient_advocacy: Vec::new(),
            research: Vec::new(),
            publications: Vec::new(),
            image_url: image_not_available(),
            extra: Map::new(),
        }
    }

    /// Coerce a generated profile into typed fields.
    ///
    /// Keys are matched case-insensitively with spaces and hyphens read as
    /// underscores. Placeholder values such as `"Not available"` count as
    /// missing. `research`, `publications`, `image_url` and `name` belong
    /// to the pipeline and are dropped here.
    pub fn from_profile(name: impl Into<String>, profile: GeneratedProfile) -> Self {
        let mut record = Self::new(name);
        for (key, value) in profile.into_fields() {
            if is_affiliation_key(&key) {
                if let Some(affiliation) = coerce_string(&value) {
                    record.primary_affiliation = Some(affiliation);
                }
                continue;
            }
            let key = normalize_key(&key);
            match key.as_str() {
                "full_name" => record.full_name = coerce_string(&value),
                "gender" => record.gender = coerce_string(&value),
                "country" => record.country = coerce_string(&value),
                "department" => record.department = coerce_string(&value),
                "title" => record.title = coerce_string(&value),
                "email" => record.email = coerce_string(&value),
                "phone" => record.phone = coerce_string(&value),
                "fax" => record.fax = coerce_string(&value),
                "twitter" => record.twitter = coerce_string(&value),
                "linkedin" => record.linkedin = coerce_string(&value),
                "professional_summary" => record.professional_summary = coerce_string(&value),
                "qualifications" => record.qualifications = coerce_list(&value),
                "education" => record.education = coerce_list(&value),
                "professional_history" => record.professional_history = coerce_list(&value),
                "conferences_and_awards" => record.conferences_and_awards = coerce_list(&value),
                "areas_of_interest" => record.areas_of_interest = coerce_list(&value),
                "collaborators" => record.collaborators = coerce_list(&value),
                "geographical_influence" | "geographic_influence" => {
                    record.geographical_influence = coerce_list(&value)
                }
                "speaking_engagements" => record.speaking_engagements = coerce_list(&value),
                "patient_advocacy" => record.patient_advocacy = coerce_list(&value),
                "research" | "publications" | "image_url" | "name" | ERROR_FIELD => {}
                _ => {
                    record.extra.insert(key, value);
                }
            }
        }
        record
    }

    /// Attach the literature works; these always win over anything generated.
    pub fn attach_literature(&mut self, literature: &LiteratureRecord) {
        self.research = literature.research();
        self.publications = literature.works.clone();
    }

    /// Serialize for storage. Field order is stable across runs.
    pub fn to_document(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ─── KolSummary ─────────────────────────────────────────────

/// Listing view over stored profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KolSummary {
    pub full_name: String,
    pub title: String,
    pub phone: String,
    pub email: String,
    pub country: String,
    pub image_url: String,
}

impl KolSummary {
    pub fn from_columns(
        full_name: Option<String>,
        title: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        country: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        let or_na = |value: Option<String>| value.unwrap_or_else(image_not_available);
        Self {
            full_name: full_name.unwrap_or_else(|| "Unknown".to_string()),
            title: or_na(title),
            phone: or_na(phone),
            email: or_na(email),
            country: or_na(country),
            image_url: or_na(image_url),
        }
    }
}

// ─── Coercion helpers ───────────────────────────────────────

pub(crate) fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !is_placeholder(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(coerce_string)
                .collect::<Vec<_>>()
                .join("; ");
            Some(joined).filter(|s| !s.is_empty())
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn coerce_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(_) => Some(item.to_string()),
                other => coerce_string(other),
            })
            .collect(),
        other => coerce_string(other).into_iter().collect(),
    }
}
