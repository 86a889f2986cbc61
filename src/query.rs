//! Typed field references, conditions and request builder capabilities.
//!
//! Template operations are written against the capability traits here
//! (`B: Filterable<Entity = E>`); the code generator then emits concrete,
//! chainable wrapper methods on each entity-bound builder.

use std::fmt;
use std::marker::PhantomData;

use crate::convert::ScalarAttribute;
use crate::traits::entity::Entity;
use crate::traits::metadata::QueryOperator;
use crate::value::AttributeValue;

/// A typed reference to one attribute of entity `E` holding values of `T`.
pub struct Field<E, T> {
    attribute: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Field<E, T> {
    pub const fn new(attribute: &'static str) -> Self {
        Self {
            attribute,
            _marker: PhantomData,
        }
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn exists(&self) -> Condition<E> {
        Condition::compare(self.attribute, QueryOperator::Exists, Vec::new())
    }

    pub fn not_exists(&self) -> Condition<E> {
        Condition::compare(self.attribute, QueryOperator::NotExists, Vec::new())
    }
}

impl<E, T: ScalarAttribute> Field<E, T> {
    fn binary(&self, operator: QueryOperator, value: &T) -> Condition<E> {
        Condition::compare(self.attribute, operator, vec![value.to_attribute()])
    }

    pub fn eq(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Eq, value)
    }

    pub fn ne(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Ne, value)
    }

    pub fn lt(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Lt, value)
    }

    pub fn le(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Le, value)
    }

    pub fn gt(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Gt, value)
    }

    pub fn ge(&self, value: &T) -> Condition<E> {
        self.binary(QueryOperator::Ge, value)
    }

    pub fn between(&self, low: &T, high: &T) -> Condition<E> {
        Condition::compare(
            self.attribute,
            QueryOperator::Between,
            vec![low.to_attribute(), high.to_attribute()],
        )
    }

    pub fn set(&self, value: &T) -> UpdateAction {
        UpdateAction::Set {
            attribute: self.attribute.to_string(),
            value: value.to_attribute(),
        }
    }
}

impl<E> Field<E, String> {
    pub fn begins_with(&self, prefix: &str) -> Condition<E> {
        Condition::compare(
            self.attribute,
            QueryOperator::BeginsWith,
            vec![AttributeValue::S(prefix.to_string())],
        )
    }

    pub fn contains(&self, fragment: &str) -> Condition<E> {
        Condition::compare(
            self.attribute,
            QueryOperator::Contains,
            vec![AttributeValue::S(fragment.to_string())],
        )
    }
}

impl<E, T> Field<E, T> {
    pub fn remove(&self) -> UpdateAction {
        UpdateAction::Remove {
            attribute: self.attribute.to_string(),
        }
    }
}

impl<E, T> Clone for Field<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Field<E, T> {}

impl<E, T> fmt::Debug for Field<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.attribute).finish()
    }
}

/// Untyped condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Compare {
        attribute: String,
        operator: QueryOperator,
        operands: Vec<AttributeValue>,
    },
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
    Not(Box<ConditionExpr>),
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpr::Compare {
                attribute,
                operator,
                operands,
            } => match (operator, operands.as_slice()) {
                (QueryOperator::Between, [low, high]) => {
                    write!(f, "{attribute} BETWEEN {low} AND {high}")
                }
                (
                    QueryOperator::BeginsWith
                    | QueryOperator::Contains
                    | QueryOperator::Exists
                    | QueryOperator::NotExists,
                    operands,
                ) => {
                    write!(f, "{operator}({attribute}")?;
                    for operand in operands {
                        write!(f, ", {operand}")?;
                    }
                    write!(f, ")")
                }
                (_, [operand]) => write!(f, "{attribute} {operator} {operand}"),
                (_, _) => write!(f, "{attribute} {operator}"),
            },
            ConditionExpr::And(parts) => join(f, parts, " AND "),
            ConditionExpr::Or(parts) => join(f, parts, " OR "),
            ConditionExpr::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, parts: &[ConditionExpr], glue: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(glue)?;
        }
        write!(f, "{part}")?;
    }
    write!(f, ")")
}

/// A condition over the attributes of entity `E`.
pub struct Condition<E> {
    expr: ConditionExpr,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Condition<E> {
    fn compare(attribute: &str, operator: QueryOperator, operands: Vec<AttributeValue>) -> Self {
        Self::from_expr(ConditionExpr::Compare {
            attribute: attribute.to_string(),
            operator,
            operands,
        })
    }

    fn from_expr(expr: ConditionExpr) -> Self {
        Self {
            expr,
            _entity: PhantomData,
        }
    }

    pub fn and(self, other: Condition<E>) -> Self {
        match self.expr {
            ConditionExpr::And(mut parts) => {
                parts.push(other.expr);
                Self::from_expr(ConditionExpr::And(parts))
            }
            expr => Self::from_expr(ConditionExpr::And(vec![expr, other.expr])),
        }
    }

    pub fn or(self, other: Condition<E>) -> Self {
        match self.expr {
            ConditionExpr::Or(mut parts) => {
                parts.push(other.expr);
                Self::from_expr(ConditionExpr::Or(parts))
            }
            expr => Self::from_expr(ConditionExpr::Or(vec![expr, other.expr])),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::from_expr(ConditionExpr::Not(Box::new(self.expr)))
    }

    pub fn expr(&self) -> &ConditionExpr {
        &self.expr
    }

    pub fn into_expr(self) -> ConditionExpr {
        self.expr
    }
}

impl<E> Clone for Condition<E> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<E> fmt::Debug for Condition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.expr).finish()
    }
}

impl<E> fmt::Display for Condition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    Set {
        attribute: String,
        value: AttributeValue,
    },
    Remove {
        attribute: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Accumulated request state shared by every builder.
#[derive(Debug, Clone)]
pub struct Request<E> {
    pub key_conditions: Vec<ConditionExpr>,
    pub filters: Vec<ConditionExpr>,
    pub conditions: Vec<ConditionExpr>,
    pub updates: Vec<UpdateAction>,
    pub projection: Vec<&'static str>,
    pub index_name: Option<&'static str>,
    pub order: Option<(&'static str, SortOrder)>,
    pub limit: Option<usize>,
    pub consistent_read: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Default for Request<E> {
    fn default() -> Self {
        Self {
            key_conditions: Vec::new(),
            filters: Vec::new(),
            conditions: Vec::new(),
            updates: Vec::new(),
            projection: Vec::new(),
            index_name: None,
            order: None,
            limit: None,
            consistent_read: false,
            _entity: PhantomData,
        }
    }
}

impl<E> Request<E> {
    /// Filter expression of all accumulated filters, joined with `AND`.
    pub fn filter_expression(&self) -> Option<String> {
        combined(&self.filters)
    }

    pub fn key_condition_expression(&self) -> Option<String> {
        combined(&self.key_conditions)
    }

    pub fn condition_expression(&self) -> Option<String> {
        combined(&self.conditions)
    }
}

fn combined(parts: &[ConditionExpr]) -> Option<String> {
    match parts {
        [] => None,
        [single] => Some(single.to_string()),
        many => Some(ConditionExpr::And(many.to_vec()).to_string()),
    }
}

/// A builder bound to one entity type.
pub trait RequestBuilder: Sized {
    type Entity: Entity;

    fn request(&self) -> &Request<Self::Entity>;

    fn request_mut(&mut self) -> &mut Request<Self::Entity>;
}

/// Builders that accept key conditions (queries).
pub trait KeyConditioned: RequestBuilder {}

/// Builders that accept filter expressions (queries and scans).
pub trait Filterable: RequestBuilder {}

/// Builders that accept write conditions (put, update, delete).
pub trait Conditional: RequestBuilder {}

/// Builders that accept update actions.
pub trait Updatable: RequestBuilder {}

/// Builders that accept projections, ordering and limits.
pub trait Projectable: RequestBuilder {}

pub trait Sortable: RequestBuilder {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;

    #[test]
    fn comparisons_render() {
        let amount: Field<Thing, u32> = Field::new("amount");
        let state: Field<Thing, String> = Field::new("state");

        let cond = amount
            .gt(&10)
            .and(state.begins_with("OP"))
            .and(amount.between(&1, &5).not());
        assert_eq!(
            cond.to_string(),
            "(amount > {N: 10} AND begins_with(state, {S: OP}) AND NOT (amount BETWEEN {N: 1} AND {N: 5}))"
        );
    }

    #[test]
    fn presence_checks_take_no_operands() {
        let note: Field<Thing, Vec<String>> = Field::new("note");
        assert_eq!(note.exists().to_string(), "attribute_exists(note)");
    }

    #[test]
    fn update_actions() {
        let amount: Field<Thing, u32> = Field::new("amount");
        assert_eq!(
            amount.set(&3),
            UpdateAction::Set {
                attribute: "amount".into(),
                value: AttributeValue::N("3".into())
            }
        );
        assert_eq!(
            amount.remove(),
            UpdateAction::Remove {
                attribute: "amount".into()
            }
        );
    }
}
