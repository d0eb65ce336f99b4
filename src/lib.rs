pub mod config;
pub mod status;
pub mod store;
pub mod telemetry;

pub use status::{DIGEST_LENGTH, Digest, StatusError, StatusHandle, StatusRecord};
pub use store::{FileStatusStore, MemoryStatusStore, StatusStore};

#[cfg(test)]
mod test_utils;
