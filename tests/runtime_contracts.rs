/// Integration tests for the runtime traits the generated units implement.
///
/// The entity below is written by hand in the shape the generator emits, so
/// these tests cover the default trait methods without running a build.
use assert_matches::assert_matches;
use kvmodel::index::{IndexDescriptor, IndexKey, IndexProjection, TableSchema};
use kvmodel::prelude::*;
use kvmodel::query::Field;
use kvmodel::traits::{
    AttributeKind, EntityMetadata, KeyFormat, KeyRole, PropertyMetadata, QueryOperator,
};

#[derive(Debug, Clone, PartialEq)]
struct Ticket {
    id: String,
    seat: u32,
}

static TICKET_PROPERTIES: [PropertyMetadata; 2] = [
    PropertyMetadata {
        name: "id",
        attribute: "pk",
        kind: AttributeKind::String,
        nullable: false,
        key_role: Some(KeyRole::Partition),
        key_format: Some(KeyFormat {
            prefix: Some("EVENT"),
            separator: "#",
        }),
        operations: QueryOperator::PARTITION_KEY,
        indexes: &[],
        sensitive: false,
        encrypted: false,
    },
    PropertyMetadata {
        name: "seat",
        attribute: "sk",
        kind: AttributeKind::String,
        nullable: false,
        key_role: Some(KeyRole::Sort),
        key_format: Some(KeyFormat {
            prefix: Some("SEAT"),
            separator: "#",
        }),
        operations: QueryOperator::SORT_KEY,
        indexes: &["SeatIndex"],
        sensitive: false,
        encrypted: false,
    },
];

static TICKET_METADATA: EntityMetadata = EntityMetadata {
    type_name: "Ticket",
    table: Some("events"),
    properties: &TICKET_PROPERTIES,
    discriminator: None,
    relations: &[],
};

impl ItemConvert for Ticket {
    const TYPE_NAME: &'static str = "Ticket";

    fn to_item(&self) -> AttributeMap {
        self.key()
    }

    fn from_item(item: &AttributeMap) -> Result<Self, ConversionError> {
        let id = kvmodel::convert::required(item, "pk")?.as_s()?;
        let seat = kvmodel::convert::required(item, "sk")?.as_s()?;
        Ok(Ticket {
            id: kvmodel::keys::parse_key(Some("EVENT"), "#", id)
                .map_err(|e| e.at("pk"))?
                .to_string(),
            seat: kvmodel::keys::parse_key(Some("SEAT"), "#", seat)
                .and_then(kvmodel::keys::parse_component::<u32>)
                .map_err(|e| e.at("sk"))?,
        })
    }

    fn metadata() -> &'static EntityMetadata {
        &TICKET_METADATA
    }
}

#[derive(Debug, Clone, Copy)]
struct TicketFields {
    seat: Field<Ticket, String>,
}

impl Default for TicketFields {
    fn default() -> Self {
        Self {
            seat: Field::new("sk"),
        }
    }
}

impl EntityFields for TicketFields {
    type Entity = Ticket;
}

impl Entity for Ticket {
    type Fields = TicketFields;

    const TABLE: &'static str = "events";

    const DISCRIMINATOR: Option<kvmodel::traits::DiscriminatorMetadata> = None;

    fn partition_key(&self) -> AttributeValue {
        AttributeValue::S(kvmodel::keys::format_key(Some("EVENT"), "#", &self.id))
    }

    fn sort_key(&self) -> Option<AttributeValue> {
        Some(AttributeValue::S(kvmodel::keys::format_key(Some("SEAT"), "#", self.seat)))
    }

    fn key(&self) -> AttributeMap {
        let mut key = AttributeMap::new();
        key.insert("pk".into(), self.partition_key());
        if let Some(sort_key) = self.sort_key() {
            key.insert("sk".into(), sort_key);
        }
        key
    }
}

struct SeatOnly {
    seat: u32,
}

impl Projection for SeatOnly {
    type Source = Ticket;

    const TYPE_NAME: &'static str = "SeatOnly";

    const ATTRIBUTES: &'static [&'static str] = &["sk"];

    fn from_item(item: &AttributeMap) -> Result<Self, ConversionError> {
        Ticket::from_item(item).map(|t| SeatOnly { seat: t.seat })
    }

    fn metadata() -> &'static EntityMetadata {
        &TICKET_METADATA
    }
}

static EVENT_INDEXES: [IndexDescriptor; 1] = [IndexDescriptor {
    name: "SeatIndex",
    table: "events",
    entities: &["Ticket"],
    partition_key: IndexKey {
        attribute: "sk",
        kind: AttributeKind::String,
        format: KeyFormat {
            prefix: Some("SEAT"),
            separator: "#",
        },
    },
    sort_key: None,
    projection: IndexProjection::All,
    projection_type: None,
}];

struct EventsTable;

impl TableSchema for EventsTable {
    const NAME: &'static str = "events";

    const ENTITIES: &'static [&'static str] = &["Ticket"];

    const DEFAULT_ENTITY: Option<&'static str> = Some("Ticket");

    fn indexes() -> &'static [IndexDescriptor] {
        &EVENT_INDEXES
    }
}

fn ticket() -> Ticket {
    Ticket {
        id: "gala".into(),
        seat: 12,
    }
}

#[test_log::test]
fn sort_key_prefix_decides_membership() {
    let item = ticket().to_item();
    assert!(Ticket::is_record(&item));

    let mut other = item.clone();
    other.insert("sk".into(), AttributeValue::S("SEATING#12".into()));
    assert!(!Ticket::is_record(&other));

    other.insert("sk".into(), AttributeValue::N("12".into()));
    assert!(!Ticket::is_record(&other));
}

#[test_log::test]
fn item_round_trip_through_json() {
    let item = ticket().to_item();
    let json = serde_json::to_string(&item).unwrap();
    assert_eq!(json, r#"{"pk":{"S":"EVENT#gala"},"sk":{"S":"SEAT#12"}}"#);
    let parsed: AttributeMap = serde_json::from_str(&json).unwrap();
    assert_eq!(Ticket::from_item(&parsed).unwrap(), ticket());
}

#[test_log::test]
fn key_errors_carry_the_attribute() {
    let mut item = ticket().to_item();
    item.insert("sk".into(), AttributeValue::S("SEAT#twelve".into()));
    assert_matches!(
        Ticket::from_item(&item),
        Err(ConversionError::Attribute { attribute, .. }) if attribute == "sk"
    );
}

#[test_log::test]
fn fields_and_projections() {
    let seat = Ticket::fields().seat;
    assert_eq!(
        seat.begins_with("SEAT#1").to_string(),
        "begins_with(sk, {S: SEAT#1})"
    );
    assert_eq!(SeatOnly::projection_expression(), "sk");
    assert_eq!(SeatOnly::from_item(&ticket().to_item()).unwrap().seat, 12);
}

#[test_log::test]
fn table_schema_lookups() {
    assert_eq!(EventsTable::index("SeatIndex").map(|i| i.name), Some("SeatIndex"));
    assert_eq!(EventsTable::indexes_for("Ticket").count(), 1);
    assert_eq!(EventsTable::indexes_for("Refund").count(), 0);
    let index = EventsTable::index("SeatIndex").unwrap();
    assert_eq!(index.projected_attributes(), None);
    assert_eq!(index.format_partition_key(3), "SEAT#3");
    assert!(Ticket::metadata().property("seat").unwrap().supports(QueryOperator::BeginsWith));
}
