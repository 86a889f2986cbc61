//! Assembling an order from the records of its partition.

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use kvmodel::prelude::*;
use kvmodel_fixtures::models::{Address, Click, Order, OrderLine};

fn order() -> Order {
    Order {
        id: "17".into(),
        placed: "2024-05-01".into(),
        amount: 300,
        stage: "open".into(),
        tags: Default::default(),
        note: Some("leave at the door".into()),
        created: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        shipping: Address::default(),
        lines: Vec::new(),
    }
}

fn line(n: u32) -> OrderLine {
    OrderLine {
        id: "17".into(),
        line: n,
        sku: format!("SKU-{n}"),
        quantity: n,
        amount: 100,
        stage: "open".into(),
    }
}

fn partition() -> Vec<AttributeMap> {
    vec![line(1).to_item(), order().to_item(), line(2).to_item()]
}

#[test_log::test]
fn root_and_relations_are_assembled() {
    let items = partition();
    let hydrated = Order::hydrate(&items, &HydrationOptions::default())
        .unwrap()
        .expect("root record");

    let mut expected = order();
    expected.lines = vec![line(1), line(2)];
    assert_eq!(hydrated, expected);
}

#[test_log::test]
fn relations_can_be_left_out() {
    let items = partition();
    let options = HydrationOptions::builder().include_relations(false).build();
    let hydrated = Order::hydrate(&items, &options).unwrap().unwrap();
    assert!(hydrated.lines.is_empty());
}

#[test_log::test]
fn missing_root_yields_none() {
    let items = vec![line(1).to_item()];
    assert_eq!(Order::hydrate(&items, &HydrationOptions::default()).unwrap(), None);
    assert_eq!(Order::hydrate(&Vec::<AttributeMap>::new(), &HydrationOptions::default()).unwrap(), None);
}

#[test_log::test]
fn unknown_records_follow_the_policy() {
    let mut items = partition();
    let mut stray = Click {
        account: "ada".into(),
        seen: 1,
        target_url: "https://example.com".into(),
    }
    .to_item();
    stray.insert("sk".into(), AttributeValue::S("PAYMENT#1".into()));
    items.push(stray);

    assert_matches!(
        Order::hydrate(&items, &HydrationOptions::default()),
        Err(ConversionError::UnknownRecord { attribute, value: Some(value) })
            if attribute == "sk" && value == "PAYMENT#1"
    );

    let lenient = HydrationOptions::builder()
        .unknown_records(UnknownRecordPolicy::Skip)
        .build();
    let hydrated = Order::hydrate(&items, &lenient).unwrap().unwrap();
    assert_eq!(hydrated.lines.len(), 2);
}

#[test_log::test]
fn broken_relation_records_fail_hydration() {
    let mut items = partition();
    items[0].remove("sku");
    assert_matches!(
        Order::hydrate(&items, &HydrationOptions::default()),
        Err(ConversionError::MissingAttribute(attribute)) if attribute == "sku"
    );
}
