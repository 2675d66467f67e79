//! The fixed catalog of graph queries.
//!
//! Every route of the service runs exactly one of these. Each variant carries
//! its own parameters, which are always bound by name (`$house_id`) and never
//! interpolated into the Cypher text.

use crate::entity::NewCharacter;
use crate::{InternalId, Value};

/// Houses returned by the popularity ranking.
pub const TOP_HOUSES_LIMIT: i64 = 10;

/// Maximum rows returned by the search endpoints.
pub const SEARCH_LIMIT: i64 = 20;

/// Whether a query may mutate the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NamedQuery {
    /// Houses ranked by the summed `size(tvSeries)` of their allied persons.
    TopHouses { limit: i64 },
    /// Number of distinct persons allied with the house.
    AllyCount { house_id: i64 },
    /// Name of the person that founded the house, if any.
    Founder { house_id: i64 },
    /// Houses whose name contains the term, ignoring case.
    SearchHouses { term: String, limit: i64 },
    /// Persons whose name contains the term.
    SearchCharacters { term: String, limit: i64 },
    CreateCharacter(NewCharacter),
    /// Creates `(person)-[:ALLIED_WITH]->(house)` unless it already exists.
    CreateAlliance { house_id: i64, character: InternalId },
    /// Distinct seats of the houses located in the region.
    RegionSeatCount { region: InternalId },
    Regions,
    /// Connectivity probe used by the health check.
    Ping,
}

const TOP_HOUSES: &str = "\
MATCH (p:Person)-[:ALLIED_WITH]->(h:House)
WITH h, sum(size(coalesce(p.tvSeries, []))) AS appearances
ORDER BY appearances DESC, h.id ASC
LIMIT $limit
OPTIONAL MATCH (h)-[:IN_REGION]->(r:Region)
OPTIONAL MATCH (s:Seat)-[:SEAT_OF]->(h)
WITH h, appearances, head(collect(DISTINCT r)) AS region, collect(DISTINCT s) AS seats
RETURN h AS house, region, seats, appearances
ORDER BY appearances DESC, h.id ASC";

const ALLY_COUNT: &str = "\
MATCH (p:Person)-[:ALLIED_WITH]->(h:House {id: $house_id})
RETURN count(DISTINCT p) AS allies";

const FOUNDER: &str = "\
MATCH (h:House {id: $house_id})-[:FOUNDED_BY]->(p:Person)
RETURN p.name AS founder
ORDER BY id(p)
LIMIT 1";

const SEARCH_HOUSES: &str = "\
MATCH (h:House)
WHERE toLower(h.name) CONTAINS toLower($term)
WITH h
ORDER BY h.name, id(h)
LIMIT $limit
OPTIONAL MATCH (h)-[:IN_REGION]->(r:Region)
OPTIONAL MATCH (s:Seat)-[:SEAT_OF]->(h)
WITH h, head(collect(DISTINCT r)) AS region, collect(DISTINCT s) AS seats
RETURN h AS house, region, seats
ORDER BY h.name, id(h)";

const SEARCH_CHARACTERS: &str = "\
MATCH (p:Person)
WHERE p.name CONTAINS $term
RETURN p AS person, id(p) AS internal_id
ORDER BY p.name, id(p)
LIMIT $limit";

const CREATE_CHARACTER: &str = "\
CREATE (p:Person {name: $name, isFemale: $is_female, playedBy: $played_by, culture: $culture})
RETURN p AS person, id(p) AS internal_id";

// Writing to the person takes its write lock before the existence check, so
// concurrent requests for the same pair serialize until the first commits.
const CREATE_ALLIANCE: &str = "\
MATCH (p:Person) WHERE id(p) = $character_id
MATCH (h:House {id: $house_id})
SET p._lock = true
REMOVE p._lock
WITH p, h
OPTIONAL MATCH (p)-[existing:ALLIED_WITH]->(h)
WITH p, h, count(existing) AS found
FOREACH (x IN CASE WHEN found = 0 THEN [1] ELSE [] END |
  CREATE (p)-[:ALLIED_WITH]->(h))
RETURN found = 0 AS created";

const REGION_SEAT_COUNT: &str = "\
MATCH (s:Seat)-[:SEAT_OF]->(:House)-[:IN_REGION]->(r:Region)
WHERE id(r) = $region_id
RETURN count(DISTINCT s) AS seats";

const REGIONS: &str = "\
MATCH (r:Region)
RETURN r AS region, id(r) AS internal_id
ORDER BY id(r)";

const PING: &str = "RETURN 1 AS ok";

impl NamedQuery {
    /// Stable name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            NamedQuery::TopHouses { .. } => "top_houses",
            NamedQuery::AllyCount { .. } => "ally_count",
            NamedQuery::Founder { .. } => "founder",
            NamedQuery::SearchHouses { .. } => "search_houses",
            NamedQuery::SearchCharacters { .. } => "search_characters",
            NamedQuery::CreateCharacter(_) => "create_character",
            NamedQuery::CreateAlliance { .. } => "create_alliance",
            NamedQuery::RegionSeatCount { .. } => "region_seat_count",
            NamedQuery::Regions => "regions",
            NamedQuery::Ping => "ping",
        }
    }

    pub fn access(&self) -> AccessMode {
        match self {
            NamedQuery::CreateCharacter(_) | NamedQuery::CreateAlliance { .. } => AccessMode::Write,
            _ => AccessMode::Read,
        }
    }

    pub fn cypher(&self) -> &'static str {
        match self {
            NamedQuery::TopHouses { .. } => TOP_HOUSES,
            NamedQuery::AllyCount { .. } => ALLY_COUNT,
            NamedQuery::Founder { .. } => FOUNDER,
            NamedQuery::SearchHouses { .. } => SEARCH_HOUSES,
            NamedQuery::SearchCharacters { .. } => SEARCH_CHARACTERS,
            NamedQuery::CreateCharacter(_) => CREATE_CHARACTER,
            NamedQuery::CreateAlliance { .. } => CREATE_ALLIANCE,
            NamedQuery::RegionSeatCount { .. } => REGION_SEAT_COUNT,
            NamedQuery::Regions => REGIONS,
            NamedQuery::Ping => PING,
        }
    }

    /// Columns every returned record carries.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            NamedQuery::TopHouses { .. } => &["house", "region", "seats", "appearances"],
            NamedQuery::AllyCount { .. } => &["allies"],
            NamedQuery::Founder { .. } => &["founder"],
            NamedQuery::SearchHouses { .. } => &["house", "region", "seats"],
            NamedQuery::SearchCharacters { .. } | NamedQuery::CreateCharacter(_) => &["person", "internal_id"],
            NamedQuery::CreateAlliance { .. } => &["created"],
            NamedQuery::RegionSeatCount { .. } => &["seats"],
            NamedQuery::Regions => &["region", "internal_id"],
            NamedQuery::Ping => &["ok"],
        }
    }

    /// Named parameters bound to the placeholders of [`Self::cypher`].
    pub fn params(&self) -> Vec<(&'static str, Value)> {
        match self {
            NamedQuery::TopHouses { limit } => vec![("limit", Value::Int(*limit))],
            NamedQuery::AllyCount { house_id } | NamedQuery::Founder { house_id } => {
                vec![("house_id", Value::Int(*house_id))]
            }
            NamedQuery::SearchHouses { term, limit } | NamedQuery::SearchCharacters { term, limit } => vec![
                ("term", Value::String(term.clone())),
                ("limit", Value::Int(*limit)),
            ],
            NamedQuery::CreateCharacter(c) => vec![
                ("name", Value::String(c.name.clone())),
                ("is_female", Value::Bool(c.is_female)),
                ("played_by", Value::String(c.played_by.clone())),
                ("culture", Value::String(c.culture.clone())),
            ],
            NamedQuery::CreateAlliance { house_id, character } => vec![
                ("house_id", Value::Int(*house_id)),
                ("character_id", Value::from(*character)),
            ],
            NamedQuery::RegionSeatCount { region } => vec![("region_id", Value::from(*region))],
            NamedQuery::Regions | NamedQuery::Ping => Vec::new(),
        }
    }
}
