//! Projected entities, as they appear in JSON responses.
//!
//! Property values are copied verbatim from the store, so most fields are raw
//! [`Value`]s rather than coerced Rust types.

use crate::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    pub id: Value,
    pub name: Value,
    pub coat_of_arms: Value,
    pub words: Value,
    pub founded: Value,
    pub titles: Value,
    pub ancestral_weapons: Value,
    /// Resolved at query time through `IN_REGION`.
    pub region: Option<Region>,
    /// Resolved at query time through `SEAT_OF`.
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub id: Value,
    pub name: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub id: Value,
    pub name: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Value,
    pub name: Value,
    pub aliases: Value,
    pub born: Value,
    pub died: Value,
    pub books: Value,
    pub tv_series: Value,
    pub played_by: Value,
    pub is_female: Value,
    pub culture: Value,
    pub title: Value,
    pub titles: Value,
}

/// Properties of a person created through the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharacter {
    pub name: String,
    pub is_female: bool,
    pub played_by: String,
    pub culture: String,
}

impl NewCharacter {
    /// Only the literal `"true"` marks a character as female.
    pub fn parse_is_female(raw: Option<&str>) -> bool {
        raw == Some("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_house_field_names() {
        let house = House {
            id: Value::Int(1),
            name: "House Stark".into(),
            coat_of_arms: "A grey direwolf".into(),
            words: "Winter is Coming".into(),
            founded: "Age of Heroes".into(),
            titles: Value::from(vec!["King in the North"]),
            ancestral_weapons: Value::from(vec!["Ice"]),
            region: Some(Region { id: Value::Int(1), name: "The North".into() }),
            seats: vec![Seat { id: Value::Int(9), name: "Winterfell".into() }],
        };
        let json = serde_json::to_value(&house).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["ancestralWeapons", "coatOfArms", "founded", "id", "name", "region", "seats", "titles", "words"]
        );
        assert_eq!(json["region"]["name"], "The North");
        assert_eq!(json["seats"][0]["id"], 9);
    }

    #[test]
    fn test_is_female_parsing() {
        assert!(NewCharacter::parse_is_female(Some("true")));
        assert!(!NewCharacter::parse_is_female(Some("True")));
        assert!(!NewCharacter::parse_is_female(Some("1")));
        assert!(!NewCharacter::parse_is_female(None));
    }
}
