//! Wire types for the OOMOL Fusion HTTP API.
//!
//! Field names follow the server's JSON exactly (`sessionID`, `uploadURL`,
//! `partNumber`, ...). Nothing in this crate performs I/O.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::ApiEnvelope;
pub use types::{TaskState, UploadProgress};
