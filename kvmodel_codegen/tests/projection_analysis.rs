//! Projections resolved against their source entities.

mod common;

use common::{COMMERCE, codes, compact_source, count, run_models};
use kvmodel_codegen::diagnostics::DiagnosticId;
use kvmodel_codegen::generate::UnitKind;

fn with_commerce(projections: &str) -> String {
    format!("{COMMERCE}\n{projections}")
}

#[test_log::test]
fn projection_of_known_properties() {
    let output = run_models(&with_commerce(
        r#"
        #[derive(Debug, Projection)]
        #[projection(source = Order)]
        pub struct OrderSummary {
            pub id: String,
            pub amount: Option<u64>,
        }
        "#,
    ));
    assert!(output.diagnostics.is_empty(), "{:?}", codes(&output));

    let model = &output.projections["OrderSummary"];
    assert_eq!(model.source, "Order");
    assert_eq!(model.attributes, vec!["amount".to_string(), "pk".to_string()]);
    assert!(model.properties[1].nullable);

    let source = compact_source(&output, UnitKind::Projection, "OrderSummary");
    assert!(source.contains("impl::kvmodel::Projectionforcrate::models::OrderSummary"));
    assert!(source.contains("typeSource=crate::models::Order;"));
    assert!(source.contains(r#"constATTRIBUTES:&'static[&'staticstr]=&["amount","pk"];"#));
    assert!(source.contains(r#"table:::core::option::Option::Some("commerce")"#));
}

#[test_log::test]
fn missing_property_blocks_the_projection() {
    let output = run_models(&with_commerce(
        r#"
        #[derive(Projection)]
        #[projection(source = Order)]
        pub struct OrderSummary {
            pub id: String,
            pub total: u64,
        }
        "#,
    ));
    assert_eq!(codes(&output), vec!["KVP002"]);
    assert!(output.diagnostics[0].message().contains("'total'"));
    assert!(output.unit(UnitKind::Projection, "OrderSummary").is_none());
    // The source entity is unaffected.
    assert!(output.unit(UnitKind::Entity, "Order").is_some());
}

#[test_log::test]
fn declared_type_must_match_the_source() {
    let output = run_models(&with_commerce(
        r#"
        #[derive(Projection)]
        #[projection(source = Order)]
        pub struct OrderSummary {
            pub id: String,
            pub amount: String,
        }

        #[derive(Projection)]
        #[projection(source = Order)]
        pub struct OrderIds {
            pub id: Option<Option<String>>,
        }
        "#,
    ));
    assert_eq!(count(&output, DiagnosticId::ProjectionTypeMismatch), 2);
    assert!(output.projections.is_empty());
}

#[test_log::test]
fn unknown_source_entity() {
    let output = run_models(
        r#"
        #[derive(Projection)]
        #[projection(source = Invoice)]
        pub struct InvoiceSummary {
            pub id: String,
        }
        "#,
    );
    assert_eq!(codes(&output), vec!["KVP001"]);
}

#[test_log::test]
fn embedded_source_is_not_a_projection_source() {
    let output = run_models(
        r#"
        #[derive(Entity)]
        pub struct Address {
            pub street: String,
        }

        #[derive(Projection)]
        #[projection(source = Address)]
        pub struct Street {
            pub street: String,
        }
        "#,
    );
    assert_eq!(codes(&output), vec!["KVP001"]);
}

#[test_log::test]
fn failed_source_is_reported_once() {
    let output = run_models(
        r#"
        #[derive(Entity)]
        #[table(name = "orders")]
        pub struct Order {
            pub id: String,
        }

        #[derive(Projection)]
        #[projection(source = Order)]
        pub struct OrderSummary {
            pub id: String,
        }
        "#,
    );
    assert_eq!(codes(&output), vec!["KVS001"]);
}

#[test_log::test]
fn projection_covering_the_source_warns() {
    let output = run_models(&with_commerce(
        r#"
        #[derive(Projection)]
        #[projection(source = OrderLine)]
        pub struct FullLine {
            pub id: String,
            pub line: u32,
            pub amount: u64,
            pub stage: String,
        }
        "#,
    ));
    assert_eq!(codes(&output), vec!["KVP004"]);
    assert!(output.unit(UnitKind::Projection, "FullLine").is_some());
}

#[test_log::test]
fn discriminator_attribute_is_always_fetched() {
    let output = run_models(
        r#"
        #[derive(Entity)]
        #[table(name = "events", discriminator(attribute = "kind", value = "CLICK"))]
        pub struct Click {
            #[partition_key]
            #[attribute("pk")]
            pub id: String,
            pub target_url: String,
        }

        #[derive(Projection)]
        #[projection(source = Click)]
        pub struct ClickTarget {
            pub target_url: String,
        }
        "#,
    );
    assert!(output.diagnostics.is_empty(), "{:?}", codes(&output));
    let model = &output.projections["ClickTarget"];
    assert_eq!(model.attributes, vec!["kind".to_string(), "target_url".to_string()]);

    let source = compact_source(&output, UnitKind::Projection, "ClickTarget");
    assert!(source.contains("record_tag"));
    assert!(source.contains("DiscriminatorMismatch"));
}

#[test_log::test]
fn projection_needs_a_source_attribute() {
    let output = run_models(
        r#"
        #[derive(Projection)]
        pub struct Loose {
            pub id: String,
        }
        "#,
    );
    assert_eq!(codes(&output), vec!["KVS014"]);
}
