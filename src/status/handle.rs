use tracing::{debug, info};

use crate::store::StatusStore;

use super::codec::Digest;
use super::error::StatusError;
use super::record::StatusRecord;

/// Session-scoped owner of the status record and its backing store.
///
/// The record may be absent, either because the handle was created detached
/// or because [`StatusHandle::destroy`] was called. Accessors on an absent
/// record return neutral values (`false`, `0`, `None`); mutators and
/// [`StatusHandle::save`] fail with [`StatusError::InvalidArgument`].
pub struct StatusHandle<S: StatusStore> {
    store: S,
    record: Option<StatusRecord>,
}

impl<S: StatusStore> StatusHandle<S> {
    /// Loads the record from `store`, starting fresh when nothing usable was
    /// persisted.
    pub fn open(store: S) -> Result<Self, StatusError> {
        let record = StatusRecord::load(&store)?;
        info!(
            registered = record.is_endpoint_registered(),
            fresh = record.is_fresh(),
            "Endpoint status opened"
        );
        Ok(Self {
            store,
            record: Some(record),
        })
    }

    /// Creates a handle without a record.
    pub fn detached(store: S) -> Self {
        Self {
            store,
            record: None,
        }
    }

    /// Releases the record and its token. The store is kept.
    pub fn destroy(&mut self) {
        if self.record.take().is_some() {
            debug!("Endpoint status destroyed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.record.is_some()
    }

    pub fn record(&self) -> Option<&StatusRecord> {
        self.record.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persists the current record through the store.
    pub fn save(&mut self) -> Result<(), StatusError> {
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| StatusError::invalid("no status record to save"))?;
        record.save(&mut self.store)
    }

    pub fn is_endpoint_registered(&self) -> bool {
        self.record
            .as_ref()
            .is_some_and(StatusRecord::is_endpoint_registered)
    }

    pub fn set_endpoint_registered(&mut self, is_registered: bool) -> Result<(), StatusError> {
        self.record_mut()?.set_endpoint_registered(is_registered);
        Ok(())
    }

    pub fn is_endpoint_attached_to_user(&self) -> bool {
        self.record
            .as_ref()
            .is_some_and(StatusRecord::is_endpoint_attached_to_user)
    }

    pub fn set_endpoint_attached_to_user(&mut self, is_attached: bool) -> Result<(), StatusError> {
        self.record_mut()?.set_endpoint_attached_to_user(is_attached);
        Ok(())
    }

    pub fn endpoint_access_token(&self) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(StatusRecord::endpoint_access_token)
    }

    pub fn set_endpoint_access_token(&mut self, token: &str) -> Result<(), StatusError> {
        self.record_mut()?.set_endpoint_access_token(token)
    }

    pub fn endpoint_public_key_hash(&self) -> Option<&Digest> {
        self.record.as_ref().map(StatusRecord::endpoint_public_key_hash)
    }

    pub fn set_endpoint_public_key_hash(&mut self, hash: &Digest) -> Result<(), StatusError> {
        self.record_mut()?.set_endpoint_public_key_hash(hash);
        Ok(())
    }

    pub fn profile_hash(&self) -> Option<&Digest> {
        self.record.as_ref().map(StatusRecord::profile_hash)
    }

    pub fn set_profile_hash(&mut self, hash: &Digest) -> Result<(), StatusError> {
        self.record_mut()?.set_profile_hash(hash);
        Ok(())
    }

    pub fn event_sequence_number(&self) -> i32 {
        self.record
            .as_ref()
            .map_or(0, StatusRecord::event_sequence_number)
    }

    pub fn set_event_sequence_number(&mut self, seq: i32) -> Result<(), StatusError> {
        self.record_mut()?.set_event_sequence_number(seq)
    }

    fn record_mut(&mut self) -> Result<&mut StatusRecord, StatusError> {
        self.record
            .as_mut()
            .ok_or_else(|| StatusError::invalid("no status record"))
    }
}
