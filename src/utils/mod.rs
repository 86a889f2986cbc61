//! Helpers shared by generated code.

pub mod datetime;

pub use datetime::{KvDateTime, chrono};
