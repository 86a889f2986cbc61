pub mod entity;
pub mod metadata;

pub use entity::{Entity, EntityFields, ItemConvert, Projection};
pub use metadata::{
    AttributeKind, DiscriminatorMetadata, EntityMetadata, KeyFormat, KeyRole, PropertyMetadata,
    QueryOperator, RelationMetadata,
};
