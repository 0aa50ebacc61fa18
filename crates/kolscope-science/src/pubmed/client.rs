use std::time::Duration;

use async_trait::async_trait;
use kolscope_core::LiteratureRecord;
use kolscope_core::config::PubMedConfig;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ScienceError};
use crate::http::{RateLimitedClient, RetryPolicy};
use crate::pubmed::parser::parse_literature_xml;

const SOURCE_NAME: &str = "PubMed";

/// Anything that can describe a subject's published work.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Never fails: problems are folded into the returned record.
    async fn fetch_literature(&self, subject: &str) -> LiteratureRecord;
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedClient {
    client: RateLimitedClient,
    base_url: String,
    api_key: Option<String>,
    max_results: u32,
}

impl PubMedClient {
    pub fn new(config: &PubMedConfig) -> Result<Self> {
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        };
        let client = RateLimitedClient::new(
            Duration::from_millis(config.min_interval_ms),
            policy,
            &config.user_agent,
        )?;
        Ok(Self::with_client(
            client,
            &config.base_url,
            config.api_key.clone(),
            config.max_results,
        ))
    }

    pub fn with_client(
        client: RateLimitedClient,
        base_url: &str,
        api_key: Option<String>,
        max_results: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results,
        }
    }

    fn with_api_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Article identifiers authored by `name`. `Ok(None)` when throttled out.
    pub async fn search_author_ids(&self, name: &str) -> Result<Option<Vec<String>>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let params = self.with_api_key(vec![
            ("db", "pubmed".to_string()),
            ("term", format!("{name}[au]")),
            ("retmode", "json".to_string()),
            ("retmax", self.max_results.to_string()),
        ]);

        let response: Option<ESearchResponse> = self.client.get_json(&url, &params).await?;
        Ok(response.map(|r| r.esearchresult.idlist))
    }

    /// Raw efetch XML for the given identifiers. `Ok(None)` when throttled out.
    pub async fn fetch_articles_xml(&self, ids: &[String]) -> Result<Option<String>> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let params = self.with_api_key(vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
            ("rettype", "xml".to_string()),
        ]);
        self.client.get(&url, &params).await
    }

    /// Search then fetch. Errors propagate; see [`LiteratureSource`] for the
    /// infallible form.
    pub async fn try_fetch_literature(&self, name: &str) -> Result<LiteratureRecord> {
        let ids = self
            .search_author_ids(name)
            .await?
            .ok_or_else(|| request_failed("search"))?;

        if ids.is_empty() {
            debug!(subject = %name, "no PubMed articles");
            return Ok(LiteratureRecord::not_found());
        }

        let xml = self
            .fetch_articles_xml(&ids)
            .await?
            .ok_or_else(|| request_failed("fetch"))?;

        let record = parse_literature_xml(&xml)?;
        info!(
            subject = %name,
            articles = ids.len(),
            collaborators = record.collaborator_names.len(),
            "PubMed literature fetched"
        );
        Ok(record)
    }
}

fn request_failed(stage: &str) -> ScienceError {
    ScienceError::SourceUnavailable(format!("{SOURCE_NAME} {stage} request failed"))
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn fetch_literature(&self, subject: &str) -> LiteratureRecord {
        match self.try_fetch_literature(subject).await {
            Ok(record) => record,
            Err(e) => {
                warn!(subject = %subject, error = %e, "PubMed lookup failed");
                LiteratureRecord::failed(e)
            }
        }
    }
}
