use std::sync::Arc;

use kolscope_ai::ProfileGenerator;
use kolscope_core::AppConfig;
use tracing::{debug, instrument};

use crate::enrichment::merge::{MergeOutcome, RecordMerger};
use crate::error::{Result, ScienceError};
use crate::images::{ImageLookup, image_lookup_from_config};
use crate::pubmed::{LiteratureSource, PubMedClient};

/// Literature lookup followed by the merge policy, for one subject at a time.
pub struct KolEnricher {
    literature: Arc<dyn LiteratureSource>,
    merger: RecordMerger,
}

impl KolEnricher {
    pub fn new(literature: Arc<dyn LiteratureSource>, merger: RecordMerger) -> Self {
        Self { literature, merger }
    }

    /// Wire PubMed, the completion service and image lookup from configuration.
    ///
    /// Fails only when the completion API key is missing or a client cannot
    /// be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.ai_api_key().ok_or_else(|| {
            ScienceError::Config(format!(
                "completion API key not set (environment variable {})",
                config.ai.api_key_env
            ))
        })?;
        let generator = ProfileGenerator::from_config(&config.ai, api_key)?;
        let pubmed = PubMedClient::new(&config.pubmed)?;
        let images: Arc<dyn ImageLookup> = image_lookup_from_config(&config.images)?;

        Ok(Self::new(
            Arc::new(pubmed),
            RecordMerger::new(generator, images),
        ))
    }

    #[instrument(skip_all, fields(subject = %subject))]
    pub async fn enrich(&self, subject: &str) -> MergeOutcome {
        let literature = self.literature.fetch_literature(subject).await;
        debug!(
            affiliation = %literature.affiliation,
            works = literature.works.len(),
            "literature gathered"
        );
        self.merger.merge(subject, &literature).await
    }
}
