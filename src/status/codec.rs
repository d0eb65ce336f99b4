//! Binary layout of a persisted status record.
//!
//! Fields are packed back to back in native byte order, without padding or a
//! version tag:
//!
//! ```text
//! offset  size             field
//! 0       1                is_registered
//! 1       1                is_attached
//! 2       4                event_sequence_number (i32)
//! 6       20               endpoint_public_key_hash
//! 26      20               profile_hash
//! 46      size_of::<usize> token length (0 when absent)
//! 46+W    token length     token bytes, no terminator
//! ```

use std::mem::size_of;

use super::error::{DecodeError, StatusError};

/// Length of an endpoint or profile digest (SHA-1 sized).
pub const DIGEST_LENGTH: usize = 20;

pub type Digest = [u8; DIGEST_LENGTH];

/// Size of the fixed fields preceding the token length.
pub const STATIC_SIZE: usize =
    size_of::<u8>() + size_of::<u8>() + size_of::<i32>() + DIGEST_LENGTH + DIGEST_LENGTH;

pub const TOKEN_LENGTH_SIZE: usize = size_of::<usize>();

/// Smallest blob that carries prior state.
pub const MIN_ENCODED_LEN: usize = STATIC_SIZE + TOKEN_LENGTH_SIZE;

/// Append-only writer over a buffer allocated once at its final size.
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn with_exact_capacity(len: usize) -> Result<Self, StatusError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        Ok(Self { buf })
    }

    pub(crate) fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub(crate) fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub(crate) fn put_usize(&mut self, value: usize) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::Truncated {
                field,
                needed: len,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    /// Any non-zero byte reads as `true`.
    pub(crate) fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        let [byte] = self.take_array::<1>(field)?;
        Ok(byte != 0)
    }

    pub(crate) fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_ne_bytes(self.take_array(field)?))
    }

    pub(crate) fn read_usize(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        Ok(usize::from_ne_bytes(self.take_array(field)?))
    }

    pub(crate) fn read_digest(&mut self, field: &'static str) -> Result<Digest, DecodeError> {
        self.take_array(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(STATIC_SIZE, 46);
        assert_eq!(MIN_ENCODED_LEN, 46 + size_of::<usize>());
    }

    #[test]
    fn test_writer_packs_fields_without_padding() {
        let mut writer = Writer::with_exact_capacity(1 + 4 + TOKEN_LENGTH_SIZE).unwrap();
        writer.put_bool(true);
        writer.put_i32(-2);
        writer.put_usize(7);
        let bytes = writer.finish();

        assert_eq!(bytes.len(), 1 + 4 + TOKEN_LENGTH_SIZE);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &(-2i32).to_ne_bytes());
        assert_eq!(&bytes[5..], &7usize.to_ne_bytes());
    }

    #[test]
    fn test_writer_reports_out_of_memory() {
        assert!(matches!(
            Writer::with_exact_capacity(usize::MAX),
            Err(StatusError::OutOfMemory)
        ));
    }

    #[test]
    fn test_reader_treats_nonzero_byte_as_true() {
        let mut reader = Reader::new(&[0, 1, 0xff]);
        assert!(!reader.read_bool("a").unwrap());
        assert!(reader.read_bool("b").unwrap());
        assert!(reader.read_bool("c").unwrap());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut reader = Reader::new(&[1, 2, 3]);
        let err = reader.read_i32("event_sequence_number").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "event_sequence_number",
                needed: 4,
                remaining: 3,
            }
        );
        // A failed read does not advance the cursor.
        assert_eq!(reader.remaining(), 3);
    }
}
