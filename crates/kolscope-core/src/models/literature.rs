use serde::{Deserialize, Serialize};

pub const AFFILIATION_NOT_FOUND: &str = "Affiliation not found";
pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const YEAR_NOT_FOUND: &str = "Year not found";
pub const AFFILIATION_ERROR_PREFIX: &str = "Error fetching";

/// Sentinel used for dates that could not be normalized.
pub const DATE_UNKNOWN: &str = "N/A";

// ─── Work ───────────────────────────────────────────────────

/// One titled publication pulled from the literature source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub title: String,
    pub year: String,
    /// Publication date as `YYYY-MM-DD`, or `N/A`.
    #[serde(default = "unknown_date")]
    pub published: String,
}

fn unknown_date() -> String {
    DATE_UNKNOWN.to_string()
}

impl Work {
    pub fn new(title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: year.into(),
            published: unknown_date(),
        }
    }

    /// Rendering stored in a profile's `research` list.
    pub fn research_line(&self) -> String {
        format!("title: {} -- {}", self.title, self.year)
    }
}

// ─── LiteratureRecord ───────────────────────────────────────

/// What one PubMed round trip tells us about a subject.
///
/// Every field carries a value: a missing affiliation is the
/// [`AFFILIATION_NOT_FOUND`] sentinel, never an absent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteratureRecord {
    pub affiliation: String,
    pub collaborator_names: Vec<String>,
    pub geographic_mentions: Vec<String>,
    pub works: Vec<Work>,
}

impl Default for LiteratureRecord {
    fn default() -> Self {
        Self::not_found()
    }
}

impl LiteratureRecord {
    /// All-sentinel record, used when the name search returns no articles.
    pub fn not_found() -> Self {
        Self {
            affiliation: AFFILIATION_NOT_FOUND.to_string(),
            collaborator_names: Vec::new(),
            geographic_mentions: Vec::new(),
            works: Vec::new(),
        }
    }

    /// Record describing a failed lookup; the detail lands in the affiliation field.
    pub fn failed(detail: impl std::fmt::Display) -> Self {
        Self {
            affiliation: format!("{AFFILIATION_ERROR_PREFIX} PubMed affiliation: {detail}"),
            ..Self::not_found()
        }
    }

    pub fn is_error(&self) -> bool {
        self.affiliation.starts_with(AFFILIATION_ERROR_PREFIX)
    }

    /// `true` when the affiliation is real data rather than a sentinel.
    pub fn has_affiliation(&self) -> bool {
        let affiliation = self.affiliation.trim();
        !affiliation.is_empty() && affiliation != AFFILIATION_NOT_FOUND && !self.is_error()
    }

    pub fn research(&self) -> Vec<String> {
        self.works.iter().map(Work::research_line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_all_sentinel() {
        let record = LiteratureRecord::not_found();
        assert_eq!(record.affiliation, AFFILIATION_NOT_FOUND);
        assert!(record.collaborator_names.is_empty());
        assert!(record.geographic_mentions.is_empty());
        assert!(record.works.is_empty());
        assert!(!record.has_affiliation());
        assert!(!record.is_error());
    }

    #[test]
    fn test_failed_record_is_error_sentinel() {
        let record = LiteratureRecord::failed("connection refused");
        assert_eq!(
            record.affiliation,
            "Error fetching PubMed affiliation: connection refused"
        );
        assert!(record.is_error());
        assert!(!record.has_affiliation());
    }

    #[test]
    fn test_research_lines() {
        let record = LiteratureRecord {
            affiliation: "UCSF".to_string(),
            works: vec![Work::new("Title X", "2020"), Work::new(TITLE_NOT_FOUND, YEAR_NOT_FOUND)],
            ..LiteratureRecord::not_found()
        };
        assert!(record.has_affiliation());
        assert_eq!(
            record.research(),
            vec![
                "title: Title X -- 2020".to_string(),
                "title: Title not found -- Year not found".to_string(),
            ]
        );
    }
}
