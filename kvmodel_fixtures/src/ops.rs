//! Request operations written once against the capability traits.

use kvmodel::prelude::*;
use kvmodel::query::{Condition, Field};

/// Caps the number of items returned.
#[template_operation]
pub fn limit<B: RequestBuilder + Projectable>(mut builder: B, n: usize) -> B {
    builder.request_mut().limit = Some(n);
    builder
}

/// Adds a filter. Filters are joined with `AND`.
#[template_operation]
pub fn filter<B, E>(mut builder: B, condition: Condition<E>) -> B
where
    B: RequestBuilder<Entity = E> + Filterable,
    E: Entity,
{
    builder.request_mut().filters.push(condition.into_expr());
    builder
}

/// Adds a write condition.
#[template_operation]
pub fn only_if<B, E>(mut builder: B, condition: Condition<E>) -> B
where
    B: RequestBuilder<Entity = E> + Conditional,
    E: Entity,
{
    builder.request_mut().conditions.push(condition.into_expr());
    builder
}

#[template_operation]
pub fn order_by<B, E, X, R>(mut builder: B, select: impl Fn(&X) -> Field<E, R>, order: SortOrder) -> B
where
    B: RequestBuilder<Entity = E> + Sortable,
    E: Entity<Fields = X>,
    X: EntityFields<Entity = E>,
{
    let field = select(&X::default());
    builder.request_mut().order = Some((field.attribute(), order));
    builder
}

/// Sets one attribute to `value`.
#[template_operation]
pub fn set<B, E, X, R>(mut builder: B, select: impl Fn(&X) -> Field<E, R>, value: R) -> B
where
    B: RequestBuilder<Entity = E> + Updatable,
    E: Entity<Fields = X>,
    X: EntityFields<Entity = E>,
    R: ScalarAttribute,
{
    let action = select(&X::default()).set(&value);
    builder.request_mut().updates.push(action);
    builder
}

#[template_operation(specialize = false)]
pub fn consistent_read<B: RequestBuilder + KeyConditioned>(mut builder: B) -> B {
    builder.request_mut().consistent_read = true;
    builder
}
