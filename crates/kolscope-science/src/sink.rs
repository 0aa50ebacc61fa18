use async_trait::async_trait;
use kolscope_core::{CanonicalRecord, ProfileStore};

use crate::error::Result;

/// Destination for merged records. Upserts are keyed by `record.name` and
/// replace any earlier document for the same subject.
#[async_trait]
pub trait ProfileSink: Send + Sync {
    async fn upsert(&self, record: &CanonicalRecord) -> Result<()>;
}

#[async_trait]
impl ProfileSink for ProfileStore {
    async fn upsert(&self, record: &CanonicalRecord) -> Result<()> {
        ProfileStore::upsert(self, record)?;
        Ok(())
    }
}
