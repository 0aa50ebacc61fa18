pub mod batch;
pub mod merge;
pub mod pipeline;

pub use batch::{BatchOptions, BatchOrchestrator, BatchReport, SubjectIssue};
pub use merge::{MergeOutcome, ProfileOrigin, RecordMerger, country_from_affiliation};
pub use pipeline::KolEnricher;
