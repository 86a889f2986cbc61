//! Shape of the generated conversion code for each property kind.

mod common;

use std::collections::BTreeMap;

use common::{COMMERCE, codes, compact_source, run_models, run_with_config};
use kvmodel_codegen::config::CodegenConfig;
use kvmodel_codegen::generate::UnitKind;
use kvmodel_codegen::scan::SourceFile;

const SESSION: &str = r#"
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Entity)]
#[table(name = "sessions")]
pub struct Session {
    #[partition_key(prefix = "ACCOUNT", separator = "|")]
    #[attribute("pk")]
    pub account: u64,
    #[sort_key]
    #[attribute("sk")]
    pub started: String,
    pub labels: BTreeSet<String>,
    pub scores: BTreeMap<String, u32>,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    #[ttl]
    pub expires: DateTime<Utc>,
    pub spent: Money,
    #[converter(crate::models::UpperCase)]
    pub country: String,
    #[sensitive]
    pub email: String,
    #[skip]
    pub cache: Vec<u8>,
}
"#;

fn session_source() -> String {
    let config = CodegenConfig::builder()
        .emit_cargo_directives(false)
        .converters(BTreeMap::from([(
            "Money".to_string(),
            "crate::models::MoneyConverter".to_string(),
        )]))
        .build();
    let output = run_with_config(config, &[SourceFile::inline(&["models"], SESSION)]);
    assert!(output.diagnostics.is_empty(), "{:?}", codes(&output));
    compact_source(&output, UnitKind::Entity, "Session")
}

#[test_log::test]
fn keys_are_formatted_and_parsed() {
    let source = session_source();
    assert!(source.contains(
        r#"::kvmodel::AttributeValue::S(::kvmodel::keys::format_key(::core::option::Option::Some("ACCOUNT"),"|",&self.account))"#
    ));
    assert!(source.contains(
        r#"::kvmodel::keys::parse_key(::core::option::Option::Some("ACCOUNT"),"|",raw)"#
    ));
    assert!(source.contains("::kvmodel::keys::parse_component::<u64>"));

    assert!(source.contains(
        r#"pubfnbuild_partition_key(value:impl::std::fmt::Display)->::std::string::String{::kvmodel::keys::format_key(::core::option::Option::Some("ACCOUNT"),"|",value)}"#
    ));
    assert!(source.contains(
        r##"::kvmodel::keys::format_key(::core::option::Option::None,"#",value)"##
    ));

    // The partition key field compares as its formatted string.
    assert!(source.contains("pubaccount:::kvmodel::query::Field<crate::models::Session,::std::string::String>"));
}

#[test_log::test]
fn collections_and_optionals() {
    let source = session_source();
    assert!(source.contains(
        "iflet::core::option::Option::Some(encoded)=::kvmodel::convert::encode_set(&self.labels)"
    ));
    assert!(source.contains("::kvmodel::convert::decode_set::<BTreeSet<String>,String>(v)"));
    assert!(source.contains("::kvmodel::convert::encode_map(&self.scores,"));
    assert!(source.contains("::kvmodel::convert::decode_map::<BTreeMap<String,u32>,_,_>"));
    assert!(source.contains("iflet::core::option::Option::Some(v)=&self.notes"));
    assert!(source.contains(r#"notes:match::kvmodel::convert::optional(item,"notes")"#));
}

#[test_log::test]
fn datetimes_converters_and_skipped_fields() {
    let source = session_source();
    assert!(source.contains("::kvmodel::utils::datetime::encode_datetime(&self.created)"));
    assert!(source.contains("::kvmodel::utils::datetime::encode_ttl(&self.expires)"));
    assert!(source.contains("::kvmodel::utils::datetime::decode_ttl(v)"));
    assert!(source.contains("pubexpires:::kvmodel::query::Field<crate::models::Session,i64>"));
    assert!(source.contains("pubcreated:::kvmodel::query::Field<crate::models::Session,::std::string::String>"));

    assert!(source.contains(
        "<crate::models::MoneyConverteras::kvmodel::convert::AttributeConverter<Money>>::to_attribute(&self.spent)"
    ));
    assert!(source.contains(
        "<crate::models::UpperCaseas::kvmodel::convert::AttributeConverter<String>>::from_attribute(v)"
    ));
    assert!(source.contains("cache:::core::default::Default::default()"));
    assert!(!source.contains(r#""cache""#));
}

#[test_log::test]
fn metadata_statics() {
    let source = session_source();
    assert!(source.contains("pubstaticSESSION_PROPERTIES:[::kvmodel::traits::PropertyMetadata;10]"));
    assert!(source.contains("pubstaticSESSION_RELATIONS:[::kvmodel::traits::RelationMetadata;0]"));
    assert!(source.contains(
        r#"name:"email",attribute:"email",kind:::kvmodel::traits::AttributeKind::String,nullable:false,key_role:::core::option::Option::None,key_format:::core::option::Option::None,operations:::kvmodel::traits::QueryOperator::STRING,indexes:&[],sensitive:true,encrypted:false"#
    ));
    assert!(source.contains("operations:::kvmodel::traits::QueryOperator::PARTITION_KEY"));
    assert!(source.contains("operations:::kvmodel::traits::QueryOperator::SET"));
    assert!(source.contains(r#"pubconstPK:&'staticstr="pk";"#));
}

#[test_log::test]
fn relations_get_a_hydration_routine() {
    let output = run_models(COMMERCE);
    let order = compact_source(&output, UnitKind::Entity, "Order");
    assert!(order.contains("pubfnhydrate<'a,I>("));
    assert!(order.contains(r#"::kvmodel::hydration::pattern_matches("LINE#*",tag)"#));
    assert!(order.contains("lines_records.push(<OrderLineas::kvmodel::ItemConvert>::from_item(item)?);"));
    assert!(order.contains("::kvmodel::hydration::unknown_record(options,metadata,tag,item)?;"));
    assert!(order.contains("lines:::core::default::Default::default()"));
    assert!(order.contains(
        r#"::kvmodel::traits::RelationMetadata{name:"lines",pattern:"LINE#*",target:"OrderLine",many:true"#
    ));

    let line = compact_source(&output, UnitKind::Entity, "OrderLine");
    assert!(!line.contains("hydrate"));
}

#[test_log::test]
fn discriminators_are_written_and_checked() {
    let output = run_models(
        r#"
        #[derive(Entity)]
        #[table(name = "events", default_entity, discriminator(attribute = "kind", value = "CLICK"))]
        pub struct Click {
            #[partition_key]
            #[attribute("pk")]
            pub id: String,
        }

        #[derive(Entity)]
        #[table(name = "events", discriminator(attribute = "kind", value = "VIEW*"))]
        pub struct View {
            #[partition_key]
            #[attribute("pk")]
            pub id: String,
            pub kind: String,
        }
        "#,
    );
    assert!(output.diagnostics.is_empty(), "{:?}", codes(&output));

    let click = compact_source(&output, UnitKind::Entity, "Click");
    assert!(click.contains(r#"item.insert("kind".to_string(),::kvmodel::AttributeValue::S("CLICK".to_string()));"#));
    assert!(click.contains(r#"::kvmodel::hydration::pattern_matches("CLICK",tag)"#));
    assert!(click.contains(r#"pubconstKIND:&'staticstr="kind";"#));

    // The holding property writes the value itself.
    let view = compact_source(&output, UnitKind::Entity, "View");
    assert!(!view.contains(r#"AttributeValue::S("VIEW*".to_string())"#));
    assert!(view.contains(r#"::kvmodel::hydration::pattern_matches("VIEW*",tag)"#));
}

#[test_log::test]
fn units_carry_the_generated_header() {
    let output = run_models(COMMERCE);
    for unit in &output.units {
        assert!(unit.source.starts_with("// @generated by kvmodel_codegen."), "{}", unit.file_name);
        assert!(syn::parse_file(&unit.source).is_ok(), "{}", unit.file_name);
    }
    let names: Vec<&str> = output.units.iter().map(|u| u.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["entity_order.rs", "entity_order_line.rs", "table_commerce.rs"]
    );
    assert_eq!(output.unit(UnitKind::Entity, "Order").map(|u| u.exports.clone()), Some(vec!["OrderFields".to_string()]));
}
