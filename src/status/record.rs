use tracing::{debug, warn};

use crate::store::StatusStore;

use super::codec::{Digest, MIN_ENCODED_LEN, Reader, STATIC_SIZE, TOKEN_LENGTH_SIZE, Writer};
use super::error::{DecodeError, StatusError};

/// Durable facts about an endpoint's registration and sync state.
///
/// A record with every field zeroed and no token describes an endpoint that
/// has never talked to the server; see [`StatusRecord::is_fresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    is_registered: bool,
    is_attached: bool,
    event_sequence_number: i32,
    endpoint_public_key_hash: Digest,
    profile_hash: Digest,
    endpoint_access_token: Option<String>,
}

impl StatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the record from whatever the store last persisted.
    pub fn load<S: StatusStore + ?Sized>(store: &S) -> Result<Self, StatusError> {
        let blob = store.read_status();
        Self::from_bytes(&blob)
    }

    /// Decodes a persisted blob, falling back to a fresh record when the blob
    /// is empty, too short or its token length runs past the end.
    ///
    /// A token that is not UTF-8 or contains NUL is dropped on its own; the
    /// fixed fields are kept. Only allocation failure is reported as an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StatusError> {
        if bytes.is_empty() {
            debug!("No persisted status, starting fresh");
            return Ok(Self::default());
        }

        let (mut record, raw_token) = match Self::decode_fields(bytes) {
            Ok(parts) => parts,
            Err(err) => {
                warn!(error = %err, len = bytes.len(), "Discarding malformed status, starting fresh");
                return Ok(Self::default());
            }
        };

        if let Some(raw) = raw_token {
            match decode_token(raw) {
                Ok(token) => record.endpoint_access_token = Some(token),
                Err(DecodeError::OutOfMemory) => return Err(StatusError::OutOfMemory),
                Err(err) => {
                    warn!(error = %err, len = raw.len(), "Dropping unusable access token");
                }
            }
        }

        debug!(
            len = bytes.len(),
            registered = record.is_registered,
            attached = record.is_attached,
            sequence = record.event_sequence_number,
            key_hash = %hex::encode(record.endpoint_public_key_hash),
            "Status loaded"
        );
        Ok(record)
    }

    /// Strict decoding of a persisted blob.
    ///
    /// Bytes following the token are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (mut record, raw_token) = Self::decode_fields(bytes)?;
        if let Some(raw) = raw_token {
            record.endpoint_access_token = Some(decode_token(raw)?);
        }
        Ok(record)
    }

    /// Reads the fixed fields and slices out the raw token bytes, if any.
    fn decode_fields(bytes: &[u8]) -> Result<(Self, Option<&[u8]>), DecodeError> {
        if bytes.len() < MIN_ENCODED_LEN {
            return Err(DecodeError::Undersized {
                len: bytes.len(),
                min: MIN_ENCODED_LEN,
            });
        }

        let mut reader = Reader::new(bytes);
        let is_registered = reader.read_bool("is_registered")?;
        let is_attached = reader.read_bool("is_attached")?;
        let event_sequence_number = reader.read_i32("event_sequence_number")?;
        let endpoint_public_key_hash = reader.read_digest("endpoint_public_key_hash")?;
        let profile_hash = reader.read_digest("profile_hash")?;
        let token_len = reader.read_usize("token_length")?;

        let raw_token = if token_len > 0 {
            Some(reader.take("endpoint_access_token", token_len)?)
        } else {
            None
        };

        let record = Self {
            is_registered,
            is_attached,
            event_sequence_number,
            endpoint_public_key_hash,
            profile_hash,
            endpoint_access_token: None,
        };
        Ok((record, raw_token))
    }

    /// Encodes the record and hands the blob to `store`.
    pub fn save<S: StatusStore + ?Sized>(&self, store: &mut S) -> Result<(), StatusError> {
        let blob = self.to_bytes()?;
        store.store_status(&blob);
        debug!(
            len = blob.len(),
            sequence = self.event_sequence_number,
            "Status saved"
        );
        Ok(())
    }

    /// Encodes the record into a buffer sized exactly to its content.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StatusError> {
        let token = self.token_bytes();
        let mut writer = Writer::with_exact_capacity(self.encoded_len())?;
        writer.put_bool(self.is_registered);
        writer.put_bool(self.is_attached);
        writer.put_i32(self.event_sequence_number);
        writer.put_bytes(&self.endpoint_public_key_hash);
        writer.put_bytes(&self.profile_hash);
        writer.put_usize(token.len());
        writer.put_bytes(token);
        Ok(writer.finish())
    }

    pub fn encoded_len(&self) -> usize {
        STATIC_SIZE + TOKEN_LENGTH_SIZE + self.token_bytes().len()
    }

    /// True when the record carries no state beyond the defaults.
    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_endpoint_registered(&self) -> bool {
        self.is_registered
    }

    pub fn set_endpoint_registered(&mut self, is_registered: bool) {
        self.is_registered = is_registered;
    }

    pub fn is_endpoint_attached_to_user(&self) -> bool {
        self.is_attached
    }

    pub fn set_endpoint_attached_to_user(&mut self, is_attached: bool) {
        self.is_attached = is_attached;
    }

    pub fn endpoint_access_token(&self) -> Option<&str> {
        self.endpoint_access_token.as_deref()
    }

    /// Replaces the access token.
    ///
    /// The previous token is released before the new one is allocated, so on
    /// failure the record is left without a token. An empty `token` clears it.
    pub fn set_endpoint_access_token(&mut self, token: &str) -> Result<(), StatusError> {
        if token.contains('\0') {
            return Err(StatusError::invalid("access token contains a NUL byte"));
        }

        self.endpoint_access_token = None;
        if token.is_empty() {
            return Ok(());
        }

        let mut owned = String::new();
        owned.try_reserve_exact(token.len())?;
        owned.push_str(token);
        self.endpoint_access_token = Some(owned);
        Ok(())
    }

    pub fn endpoint_public_key_hash(&self) -> &Digest {
        &self.endpoint_public_key_hash
    }

    pub fn set_endpoint_public_key_hash(&mut self, hash: &Digest) {
        self.endpoint_public_key_hash = *hash;
    }

    pub fn profile_hash(&self) -> &Digest {
        &self.profile_hash
    }

    pub fn set_profile_hash(&mut self, hash: &Digest) {
        self.profile_hash = *hash;
    }

    pub fn event_sequence_number(&self) -> i32 {
        self.event_sequence_number
    }

    /// Advances the event sequence number. Moving it backwards is rejected
    /// and leaves the current value in place.
    pub fn set_event_sequence_number(&mut self, seq: i32) -> Result<(), StatusError> {
        if seq < self.event_sequence_number {
            return Err(StatusError::invalid(format!(
                "event sequence number {seq} is below current {}",
                self.event_sequence_number
            )));
        }
        self.event_sequence_number = seq;
        Ok(())
    }

    fn token_bytes(&self) -> &[u8] {
        self.endpoint_access_token
            .as_deref()
            .map(str::as_bytes)
            .unwrap_or_default()
    }
}

fn decode_token(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.contains(&0) {
        return Err(DecodeError::TokenNul);
    }
    let mut owned = Vec::new();
    owned.try_reserve_exact(raw.len())?;
    owned.extend_from_slice(raw);
    String::from_utf8(owned).map_err(|_| DecodeError::TokenEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::codec::DIGEST_LENGTH;
    use crate::store::MemoryStatusStore;
    use std::mem::size_of;

    fn sample_record() -> StatusRecord {
        let mut record = StatusRecord::new();
        record.set_endpoint_registered(true);
        record.set_endpoint_attached_to_user(true);
        record.set_event_sequence_number(1234).unwrap();
        record.set_endpoint_public_key_hash(&[0xab; DIGEST_LENGTH]);
        record.set_profile_hash(&[0x5c; DIGEST_LENGTH]);
        record.set_endpoint_access_token("token-xyz").unwrap();
        record
    }

    #[test]
    fn test_default_record_is_fresh() {
        let record = StatusRecord::new();
        assert!(record.is_fresh());
        assert!(!record.is_endpoint_registered());
        assert!(!record.is_endpoint_attached_to_user());
        assert_eq!(record.event_sequence_number(), 0);
        assert_eq!(record.endpoint_public_key_hash(), &[0; DIGEST_LENGTH]);
        assert_eq!(record.profile_hash(), &[0; DIGEST_LENGTH]);
        assert!(record.endpoint_access_token().is_none());
    }

    #[test]
    fn test_save_then_load_restores_every_field() {
        let record = sample_record();
        let mut store = MemoryStatusStore::new();
        record.save(&mut store).unwrap();

        let loaded = StatusRecord::load(&store).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.endpoint_access_token(), Some("token-xyz"));
    }

    #[test]
    fn test_encoding_layout() {
        let bytes = sample_record().to_bytes().unwrap();
        let w = size_of::<usize>();

        assert_eq!(bytes.len(), 46 + w + 9);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..6], &1234i32.to_ne_bytes());
        assert_eq!(&bytes[6..26], &[0xab; 20]);
        assert_eq!(&bytes[26..46], &[0x5c; 20]);
        assert_eq!(&bytes[46..46 + w], &9usize.to_ne_bytes());
        assert_eq!(&bytes[46 + w..], b"token-xyz");
    }

    #[test]
    fn test_absent_token_encodes_zero_length_and_no_trailer() {
        let bytes = StatusRecord::new().to_bytes().unwrap();
        assert_eq!(bytes.len(), MIN_ENCODED_LEN);
        assert_eq!(&bytes[STATIC_SIZE..], &0usize.to_ne_bytes());

        let loaded = StatusRecord::from_bytes(&bytes).unwrap();
        assert!(loaded.endpoint_access_token().is_none());
    }

    #[test]
    fn test_undersized_blob_yields_defaults() {
        let bytes = vec![1u8; MIN_ENCODED_LEN - 1];
        assert_eq!(
            StatusRecord::decode(&bytes),
            Err(DecodeError::Undersized {
                len: MIN_ENCODED_LEN - 1,
                min: MIN_ENCODED_LEN,
            })
        );
        assert!(StatusRecord::from_bytes(&bytes).unwrap().is_fresh());
    }

    #[test]
    fn test_token_length_past_end_yields_defaults() {
        let mut bytes = sample_record().to_bytes().unwrap();
        bytes.truncate(bytes.len() - 1);

        assert!(matches!(
            StatusRecord::decode(&bytes),
            Err(DecodeError::Truncated {
                field: "endpoint_access_token",
                ..
            })
        ));
        assert!(StatusRecord::from_bytes(&bytes).unwrap().is_fresh());
    }

    #[test]
    fn test_huge_token_length_yields_defaults() {
        let mut bytes = StatusRecord::new().to_bytes().unwrap();
        bytes[STATIC_SIZE..].copy_from_slice(&usize::MAX.to_ne_bytes());
        assert!(StatusRecord::from_bytes(&bytes).unwrap().is_fresh());
    }

    #[test]
    fn test_non_utf8_token_is_dropped_and_fields_kept() {
        let mut expected = sample_record();
        expected.set_endpoint_access_token("").unwrap();
        let mut bytes = expected.to_bytes().unwrap();
        bytes[STATIC_SIZE..].copy_from_slice(&3usize.to_ne_bytes());
        bytes.extend_from_slice(&[0xc3, 0x28, 0x41]);

        assert_eq!(StatusRecord::decode(&bytes), Err(DecodeError::TokenEncoding));

        let loaded = StatusRecord::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, expected);
        assert!(loaded.is_endpoint_registered());
        assert_eq!(loaded.event_sequence_number(), 1234);
        assert!(loaded.endpoint_access_token().is_none());
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let record = sample_record();
        let mut bytes = record.to_bytes().unwrap();
        bytes.extend_from_slice(&[9, 9, 9]);
        assert_eq!(StatusRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn test_sequence_number_never_decreases() {
        let mut record = StatusRecord::new();
        record.set_event_sequence_number(10).unwrap();
        record.set_event_sequence_number(10).unwrap();

        let err = record.set_event_sequence_number(9).unwrap_err();
        assert_eq!(err.error_label(), "invalid_argument");
        assert_eq!(record.event_sequence_number(), 10);
    }

    #[test]
    fn test_negative_sequence_rejected_on_fresh_record() {
        let mut record = StatusRecord::new();
        assert!(record.set_event_sequence_number(-1).is_err());
        assert_eq!(record.event_sequence_number(), 0);
    }

    #[test]
    fn test_token_replacement_keeps_latest() {
        let mut record = StatusRecord::new();
        record.set_endpoint_access_token("a").unwrap();
        record.set_endpoint_access_token("bb").unwrap();
        assert_eq!(record.endpoint_access_token(), Some("bb"));
    }

    #[test]
    fn test_empty_token_clears() {
        let mut record = sample_record();
        record.set_endpoint_access_token("").unwrap();
        assert!(record.endpoint_access_token().is_none());
    }

    #[test]
    fn test_token_with_nul_rejected_and_previous_kept() {
        let mut record = sample_record();
        let err = record.set_endpoint_access_token("ab\0c").unwrap_err();
        assert!(matches!(err, StatusError::InvalidArgument(_)));
        assert_eq!(record.endpoint_access_token(), Some("token-xyz"));
    }

    #[test]
    fn test_digests_are_copied() {
        let mut record = StatusRecord::new();
        let mut hash = [3u8; DIGEST_LENGTH];
        record.set_profile_hash(&hash);
        hash[0] = 4;
        assert_eq!(record.profile_hash()[0], 3);
    }
}
