//! Repository implementations.
//!
//! - `local`: in-memory store used by the server and the test suite
pub mod local;

pub use local::LocalRepository;
