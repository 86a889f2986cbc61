//! # kvmodel
//!
//! Declarative data models for key-value stores. Models are ordinary Rust
//! structs annotated with key, index and mapping attributes; a build-time
//! pipeline (`kvmodel_codegen`) analyses them and generates
//!
//! - encode/decode routines between each entity and its wire attribute map,
//! - key-builder routines and wire-name constants,
//! - aggregated secondary-index descriptors per table,
//! - entity-bound wrapper methods on request builders.
//!
//! This crate is the runtime surface that generated code targets.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kvmodel::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, kvmodel::Entity)]
//! #[table(name = "commerce")]
//! pub struct Order {
//!     #[partition_key(prefix = "ORDER")]
//!     #[attribute("pk")]
//!     pub order_id: String,
//!     #[sort_key]
//!     #[attribute("sk")]
//!     pub sort: String,
//!     pub amount: u64,
//! }
//!
//! // build.rs
//! fn main() {
//!     kvmodel_codegen::build::generate_from_env().unwrap();
//! }
//!
//! // lib.rs
//! include!(concat!(env!("OUT_DIR"), "/kvmodel_generated.rs"));
//!
//! let item = order.to_item();
//! assert_eq!(Order::from_item(&item)?, order);
//! assert_eq!(Order::build_partition_key("17"), "ORDER#17");
//! ```

pub mod config;
pub mod convert;
pub mod encryption;
pub mod error;
pub mod hydration;
pub mod index;
pub mod keys;
pub mod prelude;
pub mod query;
pub mod traits;
pub mod utils;
pub mod value;

pub use error::{ConversionError, KvError, KvResult};
pub use traits::{Entity, EntityFields, ItemConvert, Projection};
pub use value::{AttributeMap, AttributeValue};

#[cfg(feature = "macros")]
pub use kvmodel_macros::{Entity, Projection, entity_builder, template_operation};
