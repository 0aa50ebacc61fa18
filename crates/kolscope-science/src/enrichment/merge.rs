//! Literature + generated profile → [`CanonicalRecord`].

use std::sync::Arc;

use kolscope_ai::ProfileGenerator;
use kolscope_core::{CanonicalRecord, LiteratureRecord, is_placeholder};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::images::{ImageLookup, resolve_image_url};

static EMAIL_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(electronic address:.*$|\S+@\S+)").expect("valid regex")
});

/// Where the profile fields of a merged record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Trusted literature affiliation, generated details.
    LiteratureAndGenerated,
    /// No literature affiliation; the generator supplied one.
    GeneratedOnly,
    /// Trusted literature affiliation, generation failed.
    LiteratureOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Record {
        record: Box<CanonicalRecord>,
        origin: ProfileOrigin,
    },
    Skipped {
        reason: String,
    },
}

impl MergeOutcome {
    pub fn record(&self) -> Option<&CanonicalRecord> {
        match self {
            MergeOutcome::Record { record, .. } => Some(record.as_ref()),
            MergeOutcome::Skipped { .. } => None,
        }
    }
}

pub struct RecordMerger {
    generator: ProfileGenerator,
    images: Arc<dyn ImageLookup>,
}

impl RecordMerger {
    pub fn new(generator: ProfileGenerator, images: Arc<dyn ImageLookup>) -> Self {
        Self { generator, images }
    }

    /// Apply the fallback policy for one subject.
    pub async fn merge(&self, subject: &str, literature: &LiteratureRecord) -> MergeOutcome {
        let profile = self
            .generator
            .generate(
                subject,
                &literature.affiliation,
                &literature.geographic_mentions,
                &literature.collaborator_names,
            )
            .await;

        let (mut record, origin) = if !literature.has_affiliation() {
            if let Some(error) = profile.error() {
                return MergeOutcome::Skipped {
                    reason: format!(
                        "no affiliation from PubMed ({}); profile generation failed: {error}",
                        literature.affiliation
                    ),
                };
            }
            if profile.affiliation().is_none() {
                return MergeOutcome::Skipped {
                    reason: format!(
                        "no affiliation from PubMed ({}) or from the generated profile",
                        literature.affiliation
                    ),
                };
            }
            (
                CanonicalRecord::from_profile(subject, profile),
                ProfileOrigin::GeneratedOnly,
            )
        } else if let Some(error) = profile.error() {
            info!(subject = %subject, error = %error, "generation failed, using literature profile");
            (
                minimal_profile(subject, literature),
                ProfileOrigin::LiteratureOnly,
            )
        } else {
            let mut record = CanonicalRecord::from_profile(subject, profile);
            fill_from_literature(&mut record, literature);
            (record, ProfileOrigin::LiteratureAndGenerated)
        };

        if record.country.is_none() {
            record.country = record
                .primary_affiliation
                .as_deref()
                .and_then(country_from_affiliation)
                .or_else(|| {
                    literature
                        .has_affiliation()
                        .then(|| country_from_affiliation(&literature.affiliation))
                        .flatten()
                });
        }
        record.attach_literature(literature);
        record.image_url = resolve_image_url(self.images.as_ref(), subject).await;

        debug!(subject = %subject, ?origin, "record merged");
        MergeOutcome::Record {
            record: Box::new(record),
            origin,
        }
    }
}

/// Profile built from literature alone.
pub fn minimal_profile(subject: &str, literature: &LiteratureRecord) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(subject);
    record.full_name = Some(subject.to_string());
    record.primary_affiliation = Some(literature.affiliation.clone());
    record.collaborators = collaborators_without_subject(subject, &literature.collaborator_names);
    record.geographical_influence = dedup(&literature.geographic_mentions);
    record
}

/// Fill gaps the generator left with literature data.
fn fill_from_literature(record: &mut CanonicalRecord, literature: &LiteratureRecord) {
    if record.primary_affiliation.is_none() {
        record.primary_affiliation = Some(literature.affiliation.clone());
    }
    if record.collaborators.is_empty() {
        record.collaborators =
            collaborators_without_subject(&record.name, &literature.collaborator_names);
    }
    if record.geographical_influence.is_empty() {
        record.geographical_influence = dedup(&literature.geographic_mentions);
    }
}

/// Country named by an affiliation string: its last comma-separated segment,
/// with any electronic address and trailing period removed.
pub fn country_from_affiliation(affiliation: &str) -> Option<String> {
    let cleaned = EMAIL_TAIL_RE.replace_all(affiliation, "");
    let parts: Vec<&str> = cleaned
        .split([',', ';'])
        .map(|part| part.trim().trim_end_matches('.').trim())
        .filter(|part| !part.is_empty())
        .collect();
    let [_, .., last] = parts.as_slice() else {
        return None;
    };
    if is_placeholder(last) || last.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(last.to_string())
}

fn collaborators_without_subject(subject: &str, names: &[String]) -> Vec<String> {
    let subject = subject.trim().to_lowercase();
    dedup(names)
        .into_iter()
        .filter(|name| name.trim().to_lowercase() != subject)
        .collect()
}

fn dedup(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::NoImageLookup;
    use async_trait::async_trait;
    use kolscope_ai::{AiError, CompletionClient, CompletionRequest, GenerationSettings};
    use kolscope_core::{AFFILIATION_NOT_FOUND, IMAGE_NOT_AVAILABLE, Work};

    struct FixedReply(std::result::Result<String, u16>);

    #[async_trait]
    impl CompletionClient for FixedReply {
        async fn complete(&self, _request: &CompletionRequest) -> kolscope_ai::Result<String> {
            match &self.0 {
                Ok(reply) => Ok(reply.clone()),
                Err(status) => Err(AiError::Api {
                    status: *status,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn merger(reply: std::result::Result<&str, u16>) -> RecordMerger {
        let client = FixedReply(reply.map(str::to_string));
        RecordMerger::new(
            ProfileGenerator::new(Arc::new(client), GenerationSettings::default()),
            Arc::new(NoImageLookup),
        )
    }

    fn ucsf_literature() -> LiteratureRecord {
        LiteratureRecord {
            affiliation: "Dept of Oncology, UCSF, USA".to_string(),
            collaborator_names: vec!["Alan P Venook".to_string(), "Jane Roe".to_string()],
            geographic_mentions: vec!["Dept of Oncology, UCSF, USA".to_string()],
            works: vec![Work::new("Colorectal cancer outcomes.", "2021")],
        }
    }

    #[tokio::test]
    async fn trusted_literature_with_generated_details() {
        let merger = merger(Ok(
            r#"{"full_name": "Dr. Alan Paul Venook", "title": "Professor", "primary_affiliation": "UCSF"}"#,
        ));
        let outcome = merger.merge("Alan Paul Venook", &ucsf_literature()).await;

        let MergeOutcome::Record { record, origin } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(origin, ProfileOrigin::LiteratureAndGenerated);
        assert_eq!(record.title.as_deref(), Some("Professor"));
        assert_eq!(record.research, vec!["title: Colorectal cancer outcomes. -- 2021"]);
        assert_eq!(record.image_url, IMAGE_NOT_AVAILABLE);
        assert_eq!(record.collaborators, vec!["Alan P Venook", "Jane Roe"]);
        assert_eq!(record.country.as_deref(), Some("USA"));
    }

    #[tokio::test]
    async fn generation_failure_with_trusted_literature_keeps_minimal_profile() {
        let merger = merger(Err(503));
        let outcome = merger.merge("Alan Paul Venook", &ucsf_literature()).await;

        let MergeOutcome::Record { record, origin } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(origin, ProfileOrigin::LiteratureOnly);
        assert_eq!(
            record.primary_affiliation.as_deref(),
            Some("Dept of Oncology, UCSF, USA")
        );
        assert_eq!(record.country.as_deref(), Some("USA"));
        assert_eq!(record.research.len(), 1);
        assert!(record.extra.is_empty());
    }

    #[tokio::test]
    async fn not_found_and_placeholder_affiliation_is_skipped() {
        let merger = merger(Ok(
            r#"{"full_name": "Dr. X", "primary_affiliation": "Not available"}"#,
        ));
        let outcome = merger.merge("X", &LiteratureRecord::not_found()).await;

        let MergeOutcome::Skipped { reason } = outcome else {
            panic!("expected skip");
        };
        assert!(reason.contains(AFFILIATION_NOT_FOUND));
    }

    #[tokio::test]
    async fn error_sentinel_and_failed_generation_is_skipped() {
        let merger = merger(Err(500));
        let literature = LiteratureRecord::failed("timeout");
        let outcome = merger.merge("Jane Roe", &literature).await;
        assert!(matches!(outcome, MergeOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn generated_affiliation_rescues_missing_literature() {
        let merger = merger(Ok(
            r#"{"full_name": "Dr. Jane Roe", "primary_affiliation": "Mayo Clinic, Rochester, MN, USA"}"#,
        ));
        let outcome = merger.merge("Jane Roe", &LiteratureRecord::not_found()).await;

        let MergeOutcome::Record { record, origin } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(origin, ProfileOrigin::GeneratedOnly);
        assert_eq!(record.country.as_deref(), Some("USA"));
        assert!(record.research.is_empty());
    }

    #[tokio::test]
    async fn placeholder_fields_defer_to_trusted_literature() {
        let merger = merger(Ok(
            r#"{"primary_affiliation": "Not available", "country": "Not available"}"#,
        ));
        let outcome = merger.merge("Alan Paul Venook", &ucsf_literature()).await;

        let MergeOutcome::Record { record, origin } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(origin, ProfileOrigin::LiteratureAndGenerated);
        assert_eq!(
            record.primary_affiliation.as_deref(),
            Some("Dept of Oncology, UCSF, USA")
        );
        assert_eq!(record.country.as_deref(), Some("USA"));
    }

    #[tokio::test]
    async fn capitalized_affiliation_key_rescues_missing_literature() {
        let merger = merger(Ok(r#"{"Primary_Affiliation": "Mayo Clinic, Rochester, MN, USA"}"#));
        let outcome = merger.merge("Jane Roe", &LiteratureRecord::not_found()).await;

        let MergeOutcome::Record { record, origin } = outcome else {
            panic!("expected a record");
        };
        assert_eq!(origin, ProfileOrigin::GeneratedOnly);
        assert_eq!(
            record.primary_affiliation.as_deref(),
            Some("Mayo Clinic, Rochester, MN, USA")
        );
        assert_eq!(record.country.as_deref(), Some("USA"));
    }

    #[test]
    fn country_parsing() {
        assert_eq!(
            country_from_affiliation("Dept of Oncology, UCSF, USA").as_deref(),
            Some("USA")
        );
        assert_eq!(
            country_from_affiliation(
                "Department of Surgery, Charité, Berlin, Germany. Electronic address: a.b@charite.de."
            )
            .as_deref(),
            Some("Germany")
        );
        assert_eq!(
            country_from_affiliation("University of Tokyo, Tokyo, Japan. x@u-tokyo.ac.jp").as_deref(),
            Some("Japan")
        );
        assert_eq!(country_from_affiliation("San Francisco, CA 94143"), None);
        assert_eq!(country_from_affiliation("Not available"), None);
        assert_eq!(country_from_affiliation("UCSF"), None);
    }

    #[test]
    fn minimal_profile_drops_subject_from_collaborators() {
        let literature = LiteratureRecord {
            collaborator_names: vec!["Jane Roe".to_string(), "John Doe".to_string()],
            geographic_mentions: vec!["Boston".to_string(), "Boston".to_string()],
            ..ucsf_literature()
        };
        let record = minimal_profile("Jane Roe", &literature);
        assert_eq!(record.collaborators, vec!["John Doe"]);
        assert_eq!(record.geographical_influence, vec!["Boston"]);
        assert_eq!(record.full_name.as_deref(), Some("Jane Roe"));
    }
}
