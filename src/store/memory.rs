use std::borrow::Cow;

use tracing::debug;

use super::StatusStore;

/// In-process store that keeps the last blob in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStatusStore {
    blob: Vec<u8>,
    store_count: u64,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `blob`, as if it had been persisted
    /// by an earlier session.
    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: blob.into(),
            store_count: 0,
        }
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Number of times a blob has been stored since creation.
    pub fn store_count(&self) -> u64 {
        self.store_count
    }
}

impl StatusStore for MemoryStatusStore {
    fn read_status(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.blob)
    }

    fn store_status(&mut self, blob: &[u8]) {
        self.blob.clear();
        self.blob.extend_from_slice(blob);
        self.store_count += 1;
        debug!(len = blob.len(), "Status stored in memory");
    }
}
