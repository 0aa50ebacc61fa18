use std::sync::Arc;

use futures::StreamExt;
use kolscope_core::config::BatchConfig;
use kolscope_core::{AppConfig, CanonicalRecord};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::enrichment::merge::MergeOutcome;
use crate::enrichment::pipeline::KolEnricher;
use crate::error::Result;
use crate::sink::ProfileSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
        }
    }
}

/// A subject left out of the stored aggregate, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectIssue {
    pub subject: String,
    pub reason: String,
}

impl SubjectIssue {
    fn new(subject: &str, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            reason: reason.into(),
        }
    }
}

/// Aggregate of one batch run. Order follows completion, not input.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub stored: Vec<CanonicalRecord>,
    pub skipped: Vec<SubjectIssue>,
    pub failed: Vec<SubjectIssue>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.stored.len() + self.skipped.len() + self.failed.len()
    }

    fn absorb(&mut self, outcome: SubjectOutcome) {
        match outcome {
            SubjectOutcome::Stored(record) => self.stored.push(*record),
            SubjectOutcome::Skipped(issue) => self.skipped.push(issue),
            SubjectOutcome::Failed(issue) => self.failed.push(issue),
        }
    }
}

enum SubjectOutcome {
    Stored(Box<CanonicalRecord>),
    Skipped(SubjectIssue),
    Failed(SubjectIssue),
}

pub struct BatchOrchestrator {
    enricher: KolEnricher,
    sink: Arc<dyn ProfileSink>,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(enricher: KolEnricher, sink: Arc<dyn ProfileSink>, options: BatchOptions) -> Self {
        Self {
            enricher,
            sink,
            options,
        }
    }

    pub fn from_config(config: &AppConfig, sink: Arc<dyn ProfileSink>) -> Result<Self> {
        Ok(Self::new(
            KolEnricher::from_config(config)?,
            sink,
            BatchOptions::from(&config.batch),
        ))
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Enrich and store every subject.
    ///
    /// Chunks run one after another; within a chunk at most
    /// `concurrency` subjects are in flight. A skip or a failed store for
    /// one subject never stops the others.
    pub async fn run(&self, subjects: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        let total_chunks = subjects.len().div_ceil(self.options.batch_size);

        for (index, chunk) in subjects.chunks(self.options.batch_size).enumerate() {
            info!(
                chunk = index + 1,
                of = total_chunks,
                subjects = chunk.len(),
                "processing chunk"
            );
            let mut outcomes = futures::stream::iter(chunk)
                .map(|subject| self.process(subject))
                .buffer_unordered(self.options.concurrency);

            while let Some(outcome) = outcomes.next().await {
                report.absorb(outcome);
            }
        }

        info!(
            stored = report.stored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        report
    }

    async fn process(&self, subject: &str) -> SubjectOutcome {
        let subject = subject.trim();
        if subject.is_empty() {
            return SubjectOutcome::Skipped(SubjectIssue::new(subject, "empty subject name"));
        }

        match self.enricher.enrich(subject).await {
            MergeOutcome::Skipped { reason } => {
                warn!(subject = %subject, reason = %reason, "subject skipped");
                SubjectOutcome::Skipped(SubjectIssue::new(subject, reason))
            }
            MergeOutcome::Record { record, origin } => match self.sink.upsert(&record).await {
                Ok(()) => {
                    info!(subject = %subject, ?origin, "profile stored");
                    SubjectOutcome::Stored(record)
                }
                Err(e) => {
                    error!(subject = %subject, error = %e, "failed to store profile");
                    SubjectOutcome::Failed(SubjectIssue::new(subject, e.to_string()))
                }
            },
        }
    }
}
