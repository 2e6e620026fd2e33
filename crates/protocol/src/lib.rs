//! Wire and on-disk types for the session keeper.
//!
//! This crate contains the serde-serializable shapes that cross a process
//! boundary: cookie records persisted to the session file, and the JSON
//! bodies served by the status endpoints.
//!
//! Types in this crate are pure data. Behaviour lives in `wak-core`.

pub mod cookie;
pub mod status;

pub use cookie::*;
pub use status::*;
