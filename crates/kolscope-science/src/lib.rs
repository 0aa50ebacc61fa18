//! KOLScope science: PubMed literature, profile merging and batch enrichment.

pub mod dates;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod images;
pub mod pubmed;
pub mod sink;

pub use dates::normalize_date;
pub use enrichment::{
    BatchOptions, BatchOrchestrator, BatchReport, KolEnricher, MergeOutcome, RecordMerger,
    SubjectIssue,
};
pub use error::{Result, ScienceError};
pub use images::{ImageLookup, NoImageLookup, WikipediaImageLookup};
pub use pubmed::{LiteratureSource, PubMedClient};
pub use sink::ProfileSink;
