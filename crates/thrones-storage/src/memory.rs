//! In-process graph store.
//!
//! Nodes are stored densely; a node's internal id is its position. Every
//! [`NamedQuery`] is evaluated natively with the same semantics as its Cypher
//! text, so the memory store can stand in for Neo4j in tests and offline runs.
//!
//! Concurrency: a write transaction holds the write guard of the graph for its
//! whole lifetime, read transactions share the read guard.

use crate::backend::{GraphBackend, GraphSession, GraphTransaction};
use crate::transaction::{Mutation, Transaction, TransactionManager};
use crate::StorageError;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thrones_core::{AccessMode, InternalId, NamedQuery, NewCharacter, Node, Record, Value};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

pub const ALLIED_WITH: &str = "ALLIED_WITH";
pub const FOUNDED_BY: &str = "FOUNDED_BY";
pub const SEAT_OF: &str = "SEAT_OF";
pub const IN_REGION: &str = "IN_REGION";

/// A typed, directed relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: InternalId,
    pub target: InternalId,
    pub rel_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Id the next created node receives.
    pub fn next_id(&self) -> InternalId {
        InternalId(self.nodes.len() as i64)
    }

    pub fn add_node(&mut self, labels: Vec<String>, properties: BTreeMap<String, Value>) -> InternalId {
        let id = self.next_id();
        self.nodes.push(Node { id, labels, properties });
        id
    }

    pub fn add_edge(&mut self, source: InternalId, target: InternalId, rel_type: impl Into<String>) -> Result<(), String> {
        for id in [source, target] {
            if self.node(id).is_none() {
                return Err(format!("edge endpoint {} does not exist", id));
            }
        }
        self.edges.push(Edge {
            source,
            target,
            rel_type: rel_type.into(),
        });
        Ok(())
    }

    pub fn node(&self, id: InternalId) -> Option<&Node> {
        usize::try_from(id.as_i64()).ok().and_then(|idx| self.nodes.get(idx))
    }

    pub fn nodes_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.has_label(label))
    }

    /// Number of `rel_type` edges from `source` to `target`.
    pub fn edges_between(&self, source: InternalId, target: InternalId, rel_type: &str) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == source && e.target == target && e.rel_type == rel_type)
            .count()
    }

    /// Sources of `rel_type` edges pointing at `target` carrying `label`, one per edge.
    fn incoming<'a>(&'a self, target: InternalId, rel_type: &'a str, label: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.target == target && e.rel_type == rel_type)
            .filter_map(move |e| self.node(e.source))
            .filter(move |n| n.has_label(label))
    }

    /// Targets of `rel_type` edges leaving `source` carrying `label`, one per edge.
    fn outgoing<'a>(&'a self, source: InternalId, rel_type: &'a str, label: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == source && e.rel_type == rel_type)
            .filter_map(move |e| self.node(e.target))
            .filter(move |n| n.has_label(label))
    }

    fn houses_with_id(&self, house_id: i64) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_with_label("House")
            .filter(move |h| h.property("id") == Some(&Value::Int(house_id)))
    }

    /// Applies a committed mutation.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), String> {
        match mutation {
            Mutation::CreateNode { id, labels, properties } => {
                if *id != self.next_id() {
                    return Err(format!("node {} created out of order, expected {}", id, self.next_id()));
                }
                self.add_node(labels.clone(), properties.clone());
                Ok(())
            }
            Mutation::CreateEdge { source, target, rel_type } => self.add_edge(*source, *target, rel_type.clone()),
        }
    }

    // =========================================================================
    // Query evaluation
    // =========================================================================

    /// Evaluates a catalog query. Mutations are buffered in `tx`.
    pub fn evaluate(&self, query: &NamedQuery, tx: &mut Transaction) -> Result<Vec<Record>, StorageError> {
        if query.access() == AccessMode::Write && tx.mode() == AccessMode::Read {
            return Err(StorageError::AccessDenied {
                query: query.name(),
                mode: tx.mode(),
            });
        }

        let records = match query {
            NamedQuery::TopHouses { limit } => self.top_houses(*limit),
            NamedQuery::AllyCount { house_id } => vec![self.ally_count(*house_id)],
            NamedQuery::Founder { house_id } => self.founder(*house_id).into_iter().collect(),
            NamedQuery::SearchHouses { term, limit } => self.search_houses(term, *limit),
            NamedQuery::SearchCharacters { term, limit } => self.search_characters(term, *limit),
            NamedQuery::CreateCharacter(character) => vec![self.create_character(character, tx)?],
            NamedQuery::CreateAlliance { house_id, character } => self.create_alliance(*house_id, *character, tx)?,
            NamedQuery::RegionSeatCount { region } => vec![self.region_seat_count(*region)],
            NamedQuery::Regions => self.regions(),
            NamedQuery::Ping => vec![Record::new().with("ok", 1i64)],
        };
        Ok(records)
    }

    fn house_record(&self, house: &Node) -> Record {
        let region = self
            .outgoing(house.id, IN_REGION, "Region")
            .min_by_key(|r| r.id)
            .map(|r| Value::Node(r.clone()))
            .unwrap_or(Value::Null);

        let mut seats: Vec<&Node> = self.incoming(house.id, SEAT_OF, "Seat").collect();
        seats.sort_by_key(|s| s.id);
        seats.dedup_by_key(|s| s.id);

        Record::new()
            .with("house", Value::Node(house.clone()))
            .with("region", region)
            .with("seats", Value::List(seats.into_iter().map(|s| Value::Node(s.clone())).collect()))
    }

    fn top_houses(&self, limit: i64) -> Vec<Record> {
        let mut ranked: Vec<(&Node, i64)> = self
            .nodes_with_label("House")
            .filter_map(|house| {
                let allies: Vec<&Node> = self.incoming(house.id, ALLIED_WITH, "Person").collect();
                if allies.is_empty() {
                    return None;
                }
                let appearances = allies
                    .iter()
                    .map(|p| p.property("tvSeries").and_then(Value::as_list).map_or(0, |l| l.len() as i64))
                    .sum();
                Some((house, appearances))
            })
            .collect();

        ranked.sort_by(|(a, a_count), (b, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| compare_values(a.property("id"), b.property("id")))
                .then_with(|| a.id.cmp(&b.id))
        });

        ranked
            .into_iter()
            .take(clamp_limit(limit))
            .map(|(house, appearances)| self.house_record(house).with("appearances", appearances))
            .collect()
    }

    fn ally_count(&self, house_id: i64) -> Record {
        let allies: BTreeSet<InternalId> = self
            .houses_with_id(house_id)
            .flat_map(|h| self.incoming(h.id, ALLIED_WITH, "Person"))
            .map(|p| p.id)
            .collect();
        Record::new().with("allies", allies.len() as i64)
    }

    fn founder(&self, house_id: i64) -> Option<Record> {
        self.houses_with_id(house_id)
            .flat_map(|h| self.outgoing(h.id, FOUNDED_BY, "Person"))
            .min_by_key(|p| p.id)
            .map(|p| Record::new().with("founder", p.property("name").cloned().unwrap_or_default()))
    }

    fn search_houses(&self, term: &str, limit: i64) -> Vec<Record> {
        let needle = term.to_lowercase();
        let mut houses: Vec<&Node> = self
            .nodes_with_label("House")
            .filter(|h| {
                h.property("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .collect();
        sort_by_name(&mut houses);

        houses
            .into_iter()
            .take(clamp_limit(limit))
            .map(|h| self.house_record(h))
            .collect()
    }

    fn search_characters(&self, term: &str, limit: i64) -> Vec<Record> {
        let mut persons: Vec<&Node> = self
            .nodes_with_label("Person")
            .filter(|p| p.property("name").and_then(Value::as_str).is_some_and(|name| name.contains(term)))
            .collect();
        sort_by_name(&mut persons);

        persons
            .into_iter()
            .take(clamp_limit(limit))
            .map(|p| person_record(p.clone()))
            .collect()
    }

    fn create_character(&self, character: &NewCharacter, tx: &mut Transaction) -> Result<Record, StorageError> {
        let id = InternalId(self.next_id().as_i64() + tx.pending_node_count as i64);
        let labels = vec!["Person".to_string()];
        let properties = BTreeMap::from([
            ("name".to_string(), Value::from(character.name.as_str())),
            ("isFemale".to_string(), Value::Bool(character.is_female)),
            ("playedBy".to_string(), Value::from(character.played_by.as_str())),
            ("culture".to_string(), Value::from(character.culture.as_str())),
        ]);

        let node = Node {
            id,
            labels: labels.clone(),
            properties: properties.clone(),
        };
        tx.buffer(Mutation::CreateNode { id, labels, properties })?;
        Ok(person_record(node))
    }

    fn create_alliance(
        &self,
        house_id: i64,
        character: InternalId,
        tx: &mut Transaction,
    ) -> Result<Vec<Record>, StorageError> {
        let Some(person) = self.node(character).filter(|n| n.has_label("Person")) else {
            return Ok(Vec::new());
        };

        let houses: Vec<InternalId> = self.houses_with_id(house_id).map(|h| h.id).collect();
        let mut records = Vec::with_capacity(houses.len());
        for house in houses {
            let buffered = tx
                .pending()
                .iter()
                .filter(|m| {
                    matches!(m, Mutation::CreateEdge { source, target, rel_type }
                        if *source == person.id && *target == house && rel_type == ALLIED_WITH)
                })
                .count();
            let existing = self.edges_between(person.id, house, ALLIED_WITH) + buffered;
            if existing == 0 {
                tx.buffer(Mutation::CreateEdge {
                    source: person.id,
                    target: house,
                    rel_type: ALLIED_WITH.to_string(),
                })?;
            }
            records.push(Record::new().with("created", existing == 0));
        }
        Ok(records)
    }

    fn region_seat_count(&self, region: InternalId) -> Record {
        let seats: BTreeSet<InternalId> = match self.node(region).filter(|n| n.has_label("Region")) {
            Some(region) => self
                .incoming(region.id, IN_REGION, "House")
                .flat_map(|h| self.incoming(h.id, SEAT_OF, "Seat"))
                .map(|s| s.id)
                .collect(),
            None => BTreeSet::new(),
        };
        Record::new().with("seats", seats.len() as i64)
    }

    fn regions(&self) -> Vec<Record> {
        self.nodes_with_label("Region")
            .map(|r| {
                Record::new()
                    .with("region", Value::Node(r.clone()))
                    .with("internal_id", r.id)
            })
            .collect()
    }
}

fn person_record(person: Node) -> Record {
    let id = person.id;
    Record::new().with("person", Value::Node(person)).with("internal_id", id)
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

fn sort_by_name(nodes: &mut [&Node]) {
    nodes.sort_by(|a, b| {
        compare_values(a.property("name"), b.property("name")).then_with(|| a.id.cmp(&b.id))
    });
}

/// Cypher-like ordering: numbers, then strings, then everything else; nulls last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Int(_)) | Some(Value::Float(_)) => 0,
            Some(Value::String(_)) => 1,
            Some(Value::Null) | None => 3,
            Some(_) => 2,
        }
    }

    match (a, b) {
        (Some(Value::Int(x)), Some(Value::Int(y))) => x.cmp(y),
        (Some(Value::Float(x)), Some(Value::Float(y))) => x.total_cmp(y),
        (Some(Value::Int(x)), Some(Value::Float(y))) => (*x as f64).total_cmp(y),
        (Some(Value::Float(x)), Some(Value::Int(y))) => x.total_cmp(&(*y as f64)),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Backend serving sessions over a shared [`MemoryGraph`].
#[derive(Clone)]
pub struct MemoryBackend {
    graph: Arc<RwLock<MemoryGraph>>,
    transactions: Arc<TransactionManager>,
}

impl MemoryBackend {
    pub fn new(graph: MemoryGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            transactions: Arc::new(TransactionManager::new()),
        }
    }

    /// Shared handle to the underlying graph.
    pub fn graph(&self) -> Arc<RwLock<MemoryGraph>> {
        self.graph.clone()
    }
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn open_session(&self) -> Result<Box<dyn GraphSession>, StorageError> {
        Ok(Box::new(MemorySession {
            graph: self.graph.clone(),
            transactions: self.transactions.clone(),
        }))
    }
}

struct MemorySession {
    graph: Arc<RwLock<MemoryGraph>>,
    transactions: Arc<TransactionManager>,
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn begin(&mut self, mode: AccessMode) -> Result<Box<dyn GraphTransaction>, StorageError> {
        let guard = match mode {
            AccessMode::Read => GraphGuard::Read(self.graph.clone().read_owned().await),
            AccessMode::Write => GraphGuard::Write(self.graph.clone().write_owned().await),
        };
        Ok(Box::new(MemoryTransaction {
            guard,
            tx: self.transactions.begin(mode),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }
}

enum GraphGuard {
    Read(OwnedRwLockReadGuard<MemoryGraph>),
    Write(OwnedRwLockWriteGuard<MemoryGraph>),
}

impl GraphGuard {
    fn graph(&self) -> &MemoryGraph {
        match self {
            GraphGuard::Read(g) => g,
            GraphGuard::Write(g) => g,
        }
    }
}

struct MemoryTransaction {
    guard: GraphGuard,
    tx: Transaction,
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    async fn run(&mut self, query: &NamedQuery) -> Result<Vec<Record>, StorageError> {
        self.guard.graph().evaluate(query, &mut self.tx)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction { mut guard, mut tx } = *self;
        match &mut guard {
            GraphGuard::Write(graph) => tx.commit(graph)?,
            GraphGuard::Read(_) => tx.release()?,
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction { mut tx, .. } = *self;
        tx.rollback()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    /// The North with Stark (Winterfell) and Bolton (Dreadfort), Lannister in the West.
    fn westeros() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        let north = g.add_node(vec!["Region".into()], props(&[("id", 1i64.into()), ("name", "The North".into())]));
        let west = g.add_node(vec!["Region".into()], props(&[("id", 2i64.into()), ("name", "The Westerlands".into())]));
        let stark = g.add_node(vec!["House".into()], props(&[("id", 362i64.into()), ("name", "House Stark of Winterfell".into())]));
        let bolton = g.add_node(vec!["House".into()], props(&[("id", 34i64.into()), ("name", "House Bolton of the Dreadfort".into())]));
        let lannister = g.add_node(vec!["House".into()], props(&[("id", 229i64.into()), ("name", "House Lannister of Casterly Rock".into())]));
        let winterfell = g.add_node(vec!["Seat".into()], props(&[("id", 1i64.into()), ("name", "Winterfell".into())]));
        let dreadfort = g.add_node(vec!["Seat".into()], props(&[("id", 2i64.into()), ("name", "Dreadfort".into())]));
        let arya = g.add_node(
            vec!["Person".into()],
            props(&[("name", "Arya Stark".into()), ("tvSeries", Value::from(vec!["S1", "S2", "S3"]))]),
        );
        let tyrion = g.add_node(
            vec!["Person".into()],
            props(&[("name", "Tyrion Lannister".into()), ("tvSeries", Value::from(vec!["S1", "S2"]))]),
        );
        let roose = g.add_node(vec!["Person".into()], props(&[("name", "Roose Bolton".into())]));
        let brandon = g.add_node(vec!["Person".into()], props(&[("name", "Brandon the Builder".into())]));

        for (s, t, r) in [
            (stark, north, IN_REGION),
            (bolton, north, IN_REGION),
            (lannister, west, IN_REGION),
            (winterfell, stark, SEAT_OF),
            (dreadfort, bolton, SEAT_OF),
            (arya, stark, ALLIED_WITH),
            (tyrion, lannister, ALLIED_WITH),
            (roose, bolton, ALLIED_WITH),
            (stark, brandon, FOUNDED_BY),
        ] {
            g.add_edge(s, t, r).unwrap();
        }
        g
    }

    fn read(graph: &MemoryGraph, query: NamedQuery) -> Vec<Record> {
        let mut tx = TransactionManager::new().begin(AccessMode::Read);
        graph.evaluate(&query, &mut tx).unwrap()
    }

    #[test]
    fn test_top_houses_ranking() {
        let records = read(&westeros(), NamedQuery::TopHouses { limit: 10 });
        let counts: Vec<i64> = records.iter().map(|r| r.int("appearances").unwrap()).collect();
        assert_eq!(counts, vec![3, 2, 0]);

        let first = records[0].node("house").unwrap();
        assert_eq!(first.property("id"), Some(&Value::Int(362)));
        assert_eq!(records[0].optional_node("region").unwrap().unwrap().property("name"), Some(&"The North".into()));
        assert_eq!(records[0].nodes("seats").unwrap().len(), 1);
    }

    #[test]
    fn test_top_houses_respects_limit() {
        assert_eq!(read(&westeros(), NamedQuery::TopHouses { limit: 1 }).len(), 1);
    }

    #[test]
    fn test_top_houses_ties_break_on_house_id() {
        let mut g = MemoryGraph::new();
        let b = g.add_node(vec!["House".into()], props(&[("id", 20i64.into()), ("name", "B".into())]));
        let a = g.add_node(vec!["House".into()], props(&[("id", 10i64.into()), ("name", "A".into())]));
        let p = g.add_node(vec!["Person".into()], props(&[("name", "P".into())]));
        g.add_edge(p, b, ALLIED_WITH).unwrap();
        g.add_edge(p, a, ALLIED_WITH).unwrap();

        let ids: Vec<_> = read(&g, NamedQuery::TopHouses { limit: 10 })
            .iter()
            .map(|r| r.node("house").unwrap().property("id").cloned())
            .collect();
        assert_eq!(ids, vec![Some(Value::Int(10)), Some(Value::Int(20))]);
    }

    #[test]
    fn test_ally_count() {
        let g = westeros();
        assert_eq!(read(&g, NamedQuery::AllyCount { house_id: 362 })[0].int("allies").unwrap(), 1);
        assert_eq!(read(&g, NamedQuery::AllyCount { house_id: 9999 })[0].int("allies").unwrap(), 0);
    }

    #[test]
    fn test_founder() {
        let g = westeros();
        let rows = read(&g, NamedQuery::Founder { house_id: 362 });
        assert_eq!(rows[0].get("founder").unwrap(), &Value::from("Brandon the Builder"));
        assert!(read(&g, NamedQuery::Founder { house_id: 34 }).is_empty());
    }

    #[test]
    fn test_search_houses_ignores_case() {
        let rows = read(&westeros(), NamedQuery::SearchHouses { term: "STARK".into(), limit: 20 });
        assert_eq!(rows.len(), 1);
        assert!(rows[0].nodes("seats").is_ok());
    }

    #[test]
    fn test_search_empty_term_matches_everything() {
        let rows = read(&westeros(), NamedQuery::SearchHouses { term: String::new(), limit: 20 });
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.node("house").unwrap().property("name").and_then(Value::as_str).unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "House Bolton of the Dreadfort",
                "House Lannister of Casterly Rock",
                "House Stark of Winterfell"
            ]
        );
    }

    #[test]
    fn test_search_characters_is_case_sensitive() {
        let g = westeros();
        assert_eq!(read(&g, NamedQuery::SearchCharacters { term: "Stark".into(), limit: 20 }).len(), 1);
        assert!(read(&g, NamedQuery::SearchCharacters { term: "stark".into(), limit: 20 }).is_empty());
    }

    #[test]
    fn test_region_seat_count() {
        let g = westeros();
        assert_eq!(read(&g, NamedQuery::RegionSeatCount { region: InternalId(0) })[0].int("seats").unwrap(), 2);
        assert_eq!(read(&g, NamedQuery::RegionSeatCount { region: InternalId(1) })[0].int("seats").unwrap(), 0);
        // Not a region.
        assert_eq!(read(&g, NamedQuery::RegionSeatCount { region: InternalId(2) })[0].int("seats").unwrap(), 0);
    }

    #[test]
    fn test_create_alliance_is_idempotent_within_transaction() {
        let mut g = westeros();
        let mut tx = TransactionManager::new().begin(AccessMode::Write);
        let query = NamedQuery::CreateAlliance { house_id: 229, character: InternalId(7) };

        let first = g.evaluate(&query, &mut tx).unwrap();
        let second = g.evaluate(&query, &mut tx).unwrap();
        assert!(first[0].bool("created").unwrap());
        assert!(!second[0].bool("created").unwrap());

        tx.commit(&mut g).unwrap();
        assert_eq!(g.edges_between(InternalId(7), InternalId(4), ALLIED_WITH), 1);
    }

    #[test]
    fn test_create_alliance_with_unknown_person_returns_nothing() {
        let g = westeros();
        let mut tx = TransactionManager::new().begin(AccessMode::Write);
        let rows = g
            .evaluate(&NamedQuery::CreateAlliance { house_id: 362, character: InternalId(2) }, &mut tx)
            .unwrap();
        assert!(rows.is_empty());
        assert!(tx.pending().is_empty());
    }

    #[test]
    fn test_write_query_denied_in_read_transaction() {
        let g = westeros();
        let mut tx = TransactionManager::new().begin(AccessMode::Read);
        let err = g
            .evaluate(&NamedQuery::CreateAlliance { house_id: 362, character: InternalId(8) }, &mut tx)
            .unwrap_err();
        assert!(matches!(err, StorageError::AccessDenied { query: "create_alliance", .. }));
    }

    #[tokio::test]
    async fn test_backend_commit_and_rollback() {
        let backend = MemoryBackend::new(westeros());
        let before = backend.graph().read().await.node_count();
        let mut session = backend.open_session().await.unwrap();

        let create = NamedQuery::CreateCharacter(NewCharacter {
            name: "Hot Pie".into(),
            is_female: false,
            played_by: "Ben Hawkey".into(),
            culture: "Rivermen".into(),
        });

        let mut tx = session.begin(AccessMode::Write).await.unwrap();
        let rows = tx.run(&create).await.unwrap();
        assert_eq!(rows[0].internal_id("internal_id").unwrap(), InternalId(before as i64));
        tx.rollback().await.unwrap();
        assert_eq!(backend.graph().read().await.node_count(), before);

        let mut tx = session.begin(AccessMode::Write).await.unwrap();
        tx.run(&create).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(backend.graph().read().await.node_count(), before + 1);

        session.close().await.unwrap();
    }
}
