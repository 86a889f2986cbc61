//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use kvmodel::prelude::*;
//! ```

pub use crate::config::{HydrationOptions, UnknownRecordPolicy};
pub use crate::convert::{AttributeConverter, ScalarAttribute, SetElement};
pub use crate::encryption::FieldEncryptor;
pub use crate::error::{ConversionError, KvError, KvResult};
pub use crate::index::{IndexDescriptor, TableSchema};
pub use crate::query::{
    Condition, Conditional, Field, Filterable, KeyConditioned, Projectable, Request,
    RequestBuilder, Sortable, SortOrder, Updatable, UpdateAction,
};
pub use crate::traits::{Entity, EntityFields, ItemConvert, Projection};
pub use crate::utils::KvDateTime;
pub use crate::value::{AttributeMap, AttributeValue};

#[cfg(feature = "macros")]
pub use kvmodel_macros::{entity_builder, template_operation};
