//! Portrait lookup for merged profiles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kolscope_core::IMAGE_NOT_AVAILABLE;
use kolscope_core::config::ImageConfig;
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::http::{RateLimitedClient, RetryPolicy};

#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn find_image(&self, name: &str) -> Result<Option<String>>;
}

/// Lookup that never finds anything. Used when image search is disabled.
pub struct NoImageLookup;

#[async_trait]
impl ImageLookup for NoImageLookup {
    async fn find_image(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: Option<String>,
    #[serde(default)]
    thumbnail: Option<SummaryImage>,
    #[serde(default)]
    originalimage: Option<SummaryImage>,
}

#[derive(Debug, Deserialize)]
struct SummaryImage {
    source: String,
}

/// Wikipedia REST `page/summary` thumbnails.
pub struct WikipediaImageLookup {
    client: RateLimitedClient,
    base_url: String,
}

impl WikipediaImageLookup {
    pub fn new(base_url: &str) -> Result<Self> {
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff_unit: Duration::from_millis(500),
        };
        let client = RateLimitedClient::new(Duration::from_millis(100), policy, "kolscope/0.1")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: RateLimitedClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageLookup for WikipediaImageLookup {
    async fn find_image(&self, name: &str) -> Result<Option<String>> {
        let title = name.trim().replace(' ', "_");
        if title.is_empty() {
            return Ok(None);
        }
        let url = format!(
            "{}/page/summary/{}",
            self.base_url,
            urlencoding::encode(&title)
        );

        let Some(summary) = self.client.get_json::<PageSummary>(&url, &[]).await? else {
            return Ok(None);
        };
        if summary.page_type.as_deref() == Some("disambiguation") {
            return Ok(None);
        }
        Ok(summary
            .thumbnail
            .or(summary.originalimage)
            .map(|image| image.source))
    }
}

/// Build the configured lookup.
pub fn image_lookup_from_config(config: &ImageConfig) -> Result<Arc<dyn ImageLookup>> {
    if !config.enabled {
        return Ok(Arc::new(NoImageLookup));
    }
    Ok(Arc::new(WikipediaImageLookup::new(&config.base_url)?))
}

/// Image URL for a subject, or `"Not Available"` on any miss or failure.
pub async fn resolve_image_url(lookup: &dyn ImageLookup, name: &str) -> String {
    match lookup.find_image(name).await {
        Ok(Some(url)) if !url.trim().is_empty() => url,
        Ok(_) => IMAGE_NOT_AVAILABLE.to_string(),
        Err(e) => {
            debug!(subject = %name, error = %e, "image lookup failed");
            IMAGE_NOT_AVAILABLE.to_string()
        }
    }
}
