//! Endpoint status record and its persisted form.

pub mod codec;
pub mod error;
pub mod handle;
pub mod record;

pub use codec::{DIGEST_LENGTH, Digest, MIN_ENCODED_LEN};
pub use error::{DecodeError, StatusError};
pub use handle::StatusHandle;
pub use record::StatusRecord;
