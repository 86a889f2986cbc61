//! Generated wrapper methods on the entity-bound builders.

use kvmodel::prelude::*;
use kvmodel::query::ConditionExpr;
use kvmodel_fixtures::builders::{CustomerScan, OrderQuery, OrderUpdate};
use kvmodel_fixtures::models::{Customer, Order};

#[test_log::test]
fn query_methods_chain() {
    let query = OrderQuery::partition("17")
        .filter(Order::fields().amount.ge(&100))
        .filter(Order::fields().stage.eq(&Order::build_stage_index_partition_key("open")))
        .order_by(|f| f.placed, SortOrder::Descending)
        .limit(25)
        .consistent_read();

    let request = query.request();
    assert_eq!(
        request.key_condition_expression().as_deref(),
        Some("pk = {S: ORDER#17}")
    );
    assert_eq!(
        request.filter_expression().as_deref(),
        Some("(amount >= {N: 100} AND stage = {S: STAGE#open})")
    );
    assert_eq!(request.order, Some(("sk", SortOrder::Descending)));
    assert_eq!(request.limit, Some(25));
    assert!(request.consistent_read);
}

#[test_log::test]
fn update_methods_only_cover_listed_operations() {
    let update = OrderUpdate::default()
        .set(|f| f.amount, 450)
        .set(|f| f.stage, Order::build_stage_index_partition_key("shipped"))
        .only_if(Order::fields().stage.eq(&Order::build_stage_index_partition_key("open")));

    let request = update.request();
    assert_eq!(
        request.updates,
        vec![
            UpdateAction::Set {
                attribute: "amount".into(),
                value: AttributeValue::N("450".into()),
            },
            UpdateAction::Set {
                attribute: "stage".into(),
                value: AttributeValue::S("STAGE#shipped".into()),
            },
        ]
    );
    assert_eq!(
        request.condition_expression().as_deref(),
        Some("stage = {S: STAGE#open}")
    );
    assert!(request.filters.is_empty());
}

#[test_log::test]
fn scans_are_bound_to_their_entity() {
    let scan = CustomerScan::default()
        .filter(Customer::fields().country.eq(&"ZA".to_string()))
        .limit(10);

    let request = scan.request();
    assert_eq!(request.limit, Some(10));
    assert_eq!(
        request.filters,
        vec![ConditionExpr::Compare {
            attribute: "country".into(),
            operator: kvmodel::traits::QueryOperator::Eq,
            operands: vec![AttributeValue::S("ZA".into())],
        }]
    );
}
