//! Persistence boundary for the raw status blob.

pub mod file;
pub mod memory;

use std::borrow::Cow;

pub use file::{FileStatusStore, StoreError};
pub use memory::MemoryStatusStore;

/// Durable storage for the encoded status record.
///
/// The store never interprets the blob; it only hands back whatever was
/// stored last.
pub trait StatusStore {
    /// Returns the last persisted blob, or an empty slice when none exists.
    ///
    /// `Cow::Owned` hands the buffer to the caller, which drops it once
    /// parsed. `Cow::Borrowed` leaves ownership with the store.
    fn read_status(&self) -> Cow<'_, [u8]>;

    /// Persists `blob`. Failures are not reported back to the caller.
    fn store_status(&mut self, blob: &[u8]);
}
