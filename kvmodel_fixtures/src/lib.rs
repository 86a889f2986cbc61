//! Reference models for kvmodel.
//!
//! The build script runs the generator over this crate, so everything here
//! is compiled together with the code generated for it.

pub mod builders;
pub mod models;
pub mod ops;

include!(concat!(env!("OUT_DIR"), "/kvmodel_generated.rs"));
