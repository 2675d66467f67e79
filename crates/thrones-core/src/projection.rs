//! Entity projectors.
//!
//! A projector turns a raw [`Node`] into one of the flat entity types. Each
//! projector declares its field set up front: every required field is checked
//! before anything is copied, optional fields are emitted as `null` when
//! absent. Values are never coerced.

use crate::entity::{House, Person, Region, Seat};
use crate::{InternalId, Node, Record, RecordError, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("{entity} {node} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        field: &'static str,
        node: InternalId,
    },
    #[error("node {node} is not a {entity}")]
    WrongLabel { entity: &'static str, node: InternalId },
    #[error("malformed record: {0}")]
    Record(#[from] RecordError),
}

/// Maps a node onto an entity with a fixed field set.
///
/// A missing or null `REQUIRED` property fails the projection. A missing
/// `OPTIONAL` property is serialized as `null` rather than rejecting the
/// record, so houses and persons seeded without every attribute still list.
pub trait Projection: Sized {
    /// Node label the entity is stored under.
    const LABEL: &'static str;
    /// Properties that must be present and non-null.
    const REQUIRED: &'static [&'static str];
    const OPTIONAL: &'static [&'static str];

    fn from_node(node: &Node) -> Result<Self, ProjectionError>;

    /// Projects the node stored in `column`.
    fn from_column(record: &Record, column: &str) -> Result<Self, ProjectionError> {
        Self::from_node(record.node(column)?)
    }

    /// Projects the node in `column` together with its internal id.
    fn with_internal_id(
        record: &Record,
        column: &str,
        id_column: &str,
    ) -> Result<(Self, InternalId), ProjectionError> {
        Ok((Self::from_column(record, column)?, record.internal_id(id_column)?))
    }
}

/// A node whose label and required fields have been checked against `P`.
struct Fields<'a> {
    node: &'a Node,
    declared: [&'static [&'static str]; 2],
}

impl<'a> Fields<'a> {
    fn open<P: Projection>(node: &'a Node) -> Result<Self, ProjectionError> {
        if !node.has_label(P::LABEL) {
            return Err(ProjectionError::WrongLabel {
                entity: P::LABEL,
                node: node.id,
            });
        }
        if let Some(field) = P::REQUIRED
            .iter()
            .copied()
            .find(|field| node.property(field).is_none_or(Value::is_null))
        {
            return Err(ProjectionError::MissingField {
                entity: P::LABEL,
                field,
                node: node.id,
            });
        }
        Ok(Self {
            node,
            declared: [P::REQUIRED, P::OPTIONAL],
        })
    }

    fn get(&self, field: &'static str) -> Value {
        debug_assert!(
            self.declared.iter().any(|set| set.contains(&field)),
            "undeclared field '{}'",
            field
        );
        self.node.property(field).cloned().unwrap_or_default()
    }
}

impl Projection for Region {
    const LABEL: &'static str = "Region";
    const REQUIRED: &'static [&'static str] = &["id", "name"];
    const OPTIONAL: &'static [&'static str] = &[];

    fn from_node(node: &Node) -> Result<Self, ProjectionError> {
        let f = Fields::open::<Self>(node)?;
        Ok(Region {
            id: f.get("id"),
            name: f.get("name"),
        })
    }
}

impl Projection for Seat {
    const LABEL: &'static str = "Seat";
    const REQUIRED: &'static [&'static str] = &["id", "name"];
    const OPTIONAL: &'static [&'static str] = &[];

    fn from_node(node: &Node) -> Result<Self, ProjectionError> {
        let f = Fields::open::<Self>(node)?;
        Ok(Seat {
            id: f.get("id"),
            name: f.get("name"),
        })
    }
}

impl Projection for House {
    const LABEL: &'static str = "House";
    const REQUIRED: &'static [&'static str] = &["id", "name"];
    const OPTIONAL: &'static [&'static str] = &["coatOfArms", "words", "founded", "titles", "ancestralWeapons"];

    /// Projects the house alone; `region` and `seats` stay empty.
    fn from_node(node: &Node) -> Result<Self, ProjectionError> {
        let f = Fields::open::<Self>(node)?;
        Ok(House {
            id: f.get("id"),
            name: f.get("name"),
            coat_of_arms: f.get("coatOfArms"),
            words: f.get("words"),
            founded: f.get("founded"),
            titles: f.get("titles"),
            ancestral_weapons: f.get("ancestralWeapons"),
            region: None,
            seats: Vec::new(),
        })
    }
}

impl House {
    /// Projects a `house, region, seats` record.
    pub fn from_record(record: &Record) -> Result<Self, ProjectionError> {
        let mut house = House::from_column(record, "house")?;
        house.region = record.optional_node("region")?.map(Region::from_node).transpose()?;
        house.seats = record
            .nodes("seats")?
            .into_iter()
            .map(Seat::from_node)
            .collect::<Result<_, _>>()?;
        Ok(house)
    }
}

impl Projection for Person {
    const LABEL: &'static str = "Person";
    const REQUIRED: &'static [&'static str] = &["name"];
    const OPTIONAL: &'static [&'static str] = &[
        "id", "aliases", "born", "died", "books", "tvSeries", "playedBy", "isFemale", "culture", "title", "titles",
    ];

    fn from_node(node: &Node) -> Result<Self, ProjectionError> {
        let f = Fields::open::<Self>(node)?;
        Ok(Person {
            id: f.get("id"),
            name: f.get("name"),
            aliases: f.get("aliases"),
            born: f.get("born"),
            died: f.get("died"),
            books: f.get("books"),
            tv_series: f.get("tvSeries"),
            played_by: f.get("playedBy"),
            is_female: f.get("isFemale"),
            culture: f.get("culture"),
            title: f.get("title"),
            titles: f.get("titles"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn stark() -> Node {
        Node::new(10, vec!["House".into()])
            .with_property("id", 362i64)
            .with_property("name", "House Stark of Winterfell")
            .with_property("words", "Winter is Coming")
            .with_property("titles", vec!["King in the North", "Lord of Winterfell"])
    }

    /// JSON keys a projected entity serializes.
    fn keys<T: serde::Serialize>(entity: &T) -> BTreeSet<String> {
        match serde_json::to_value(entity).unwrap() {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("expected an object, got {}", other),
        }
    }

    fn declared<P: Projection>(extra: &[&str]) -> BTreeSet<String> {
        P::REQUIRED
            .iter()
            .chain(P::OPTIONAL)
            .chain(extra)
            .map(|f| f.to_string())
            .collect()
    }

    #[test]
    fn test_projected_keys_match_declared_fields() {
        let region = Node::new(0, vec!["Region".into()])
            .with_property("id", 1i64)
            .with_property("name", "The North");
        let seat = Node::new(1, vec!["Seat".into()])
            .with_property("id", 1i64)
            .with_property("name", "Winterfell");
        let person = Node::new(2, vec!["Person".into()]).with_property("name", "Arya Stark");

        assert_eq!(keys(&Region::from_node(&region).unwrap()), declared::<Region>(&[]));
        assert_eq!(keys(&Seat::from_node(&seat).unwrap()), declared::<Seat>(&[]));
        assert_eq!(keys(&Person::from_node(&person).unwrap()), declared::<Person>(&[]));
        assert_eq!(
            keys(&House::from_node(&stark()).unwrap()),
            declared::<House>(&["region", "seats"])
        );
    }

    #[test]
    fn test_house_optional_fields_default_to_null() {
        let house = House::from_node(&stark()).unwrap();
        assert_eq!(house.id, Value::Int(362));
        assert_eq!(house.words, Value::from("Winter is Coming"));
        assert_eq!(house.coat_of_arms, Value::Null);
        assert_eq!(house.ancestral_weapons, Value::Null);
        assert!(house.region.is_none());
    }

    #[test]
    fn test_missing_required_field_is_typed() {
        let node = Node::new(4, vec!["Region".into()]).with_property("id", 1i64);
        assert_eq!(
            Region::from_node(&node),
            Err(ProjectionError::MissingField {
                entity: "Region",
                field: "name",
                node: InternalId(4),
            })
        );
    }

    #[test]
    fn test_null_required_field_counts_as_missing() {
        let node = Node::new(5, vec!["Seat".into()])
            .with_property("id", 1i64)
            .with_property("name", Value::Null);
        assert!(matches!(
            Seat::from_node(&node),
            Err(ProjectionError::MissingField { field: "name", .. })
        ));
    }

    #[test]
    fn test_label_is_checked() {
        assert_eq!(
            Region::from_node(&stark()),
            Err(ProjectionError::WrongLabel {
                entity: "Region",
                node: InternalId(10),
            })
        );
    }

    #[test]
    fn test_house_record_resolves_region_and_seats() {
        let north = Node::new(0, vec!["Region".into()])
            .with_property("id", 1i64)
            .with_property("name", "The North");
        let winterfell = Node::new(2, vec!["Seat".into()])
            .with_property("id", 7i64)
            .with_property("name", "Winterfell");
        let record = Record::new()
            .with("house", Value::Node(stark()))
            .with("region", Value::Node(north))
            .with("seats", Value::List(vec![Value::Node(winterfell)]));

        let house = House::from_record(&record).unwrap();
        assert_eq!(house.region.unwrap().name, Value::from("The North"));
        assert_eq!(house.seats.len(), 1);
        assert_eq!(house.seats[0].name, Value::from("Winterfell"));
    }

    #[test]
    fn test_house_record_without_column_is_malformed() {
        let record = Record::new().with("house", Value::Node(stark()));
        assert_eq!(
            House::from_record(&record),
            Err(ProjectionError::Record(RecordError::MissingColumn("region".into())))
        );
    }

    #[test]
    fn test_created_person_projects_with_internal_id() {
        let node = Node::new(99, vec!["Person".into()])
            .with_property("name", "Ser Pounce")
            .with_property("isFemale", false)
            .with_property("playedBy", "A cat")
            .with_property("culture", "Westerman");
        let record = Record::new()
            .with("person", Value::Node(node))
            .with("internal_id", 99i64);

        let (person, id) = Person::with_internal_id(&record, "person", "internal_id").unwrap();
        assert_eq!(id, InternalId(99));
        assert_eq!(person.is_female, Value::Bool(false));
        assert_eq!(person.id, Value::Null);

        let json = serde_json::to_value(&(person, id)).unwrap();
        assert_eq!(json[0]["playedBy"], "A cat");
        assert_eq!(json[1], 99);
    }
}
