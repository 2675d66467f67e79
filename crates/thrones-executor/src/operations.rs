//! Typed operations behind every route.
//!
//! Each operation runs exactly one catalog query through the request's
//! session and projects the records into entities.

use crate::session::RequestContext;
use crate::{ExecutionError, Result};
use thrones_core::{
    House, InternalId, NamedQuery, NewCharacter, Person, Projection, Region, Value, SEARCH_LIMIT, TOP_HOUSES_LIMIT,
};

/// Returned by [`RequestContext::founder_name`] for houses without a founder.
pub const NO_FOUNDER: &str = "None";

impl RequestContext {
    /// Houses ranked by the screen time of their allies.
    pub async fn top_houses(&mut self) -> Result<Vec<House>> {
        let records = self.run_read(&NamedQuery::TopHouses { limit: TOP_HOUSES_LIMIT }).await?;
        records
            .iter()
            .map(|r| House::from_record(r).map_err(Into::into))
            .collect()
    }

    pub async fn ally_count(&mut self, house_id: i64) -> Result<i64> {
        let records = self.run_read(&NamedQuery::AllyCount { house_id }).await?;
        match records.first() {
            Some(record) => Ok(record.int("allies")?),
            None => Ok(0),
        }
    }

    /// Founder's name, or `"None"` when the house has no founder.
    pub async fn founder_name(&mut self, house_id: i64) -> Result<String> {
        let records = self.run_read(&NamedQuery::Founder { house_id }).await?;
        let Some(record) = records.first() else {
            return Ok(NO_FOUNDER.to_string());
        };
        match record.get("founder")? {
            Value::String(name) => Ok(name.clone()),
            Value::Null => Ok(NO_FOUNDER.to_string()),
            other => Err(thrones_core::RecordError::UnexpectedKind {
                column: "founder".to_string(),
                expected: "string",
                found: other.kind(),
            }
            .into()),
        }
    }

    pub async fn search_houses(&mut self, term: &str) -> Result<Vec<House>> {
        let query = NamedQuery::SearchHouses {
            term: term.to_string(),
            limit: SEARCH_LIMIT,
        };
        let records = self.run_read(&query).await?;
        records
            .iter()
            .map(|r| House::from_record(r).map_err(Into::into))
            .collect()
    }

    pub async fn search_characters(&mut self, term: &str) -> Result<Vec<(Person, InternalId)>> {
        let query = NamedQuery::SearchCharacters {
            term: term.to_string(),
            limit: SEARCH_LIMIT,
        };
        let records = self.run_read(&query).await?;
        records
            .iter()
            .map(|r| Person::with_internal_id(r, "person", "internal_id").map_err(Into::into))
            .collect()
    }

    pub async fn create_character(&mut self, character: NewCharacter) -> Result<(Person, InternalId)> {
        let query = NamedQuery::CreateCharacter(character);
        let records = self.run_write(&query).await?;
        let record = records.first().ok_or(ExecutionError::EmptyResult(query.name()))?;
        Ok(Person::with_internal_id(record, "person", "internal_id")?)
    }

    /// Allies the person with the house. `true` when the edge was created,
    /// `false` when it already existed.
    pub async fn create_alliance(&mut self, house_id: i64, character: InternalId) -> Result<bool> {
        let records = self.run_write(&NamedQuery::CreateAlliance { house_id, character }).await?;
        if records.is_empty() {
            return Err(ExecutionError::NotFound(format!(
                "house {} or person {}",
                house_id,
                character.as_i64()
            )));
        }
        // Several houses sharing one id each get their own edge.
        let mut created = false;
        for record in &records {
            created |= record.bool("created")?;
        }
        Ok(created)
    }

    /// Distinct seats of the houses in the region; 0 for unknown regions.
    pub async fn region_seat_count(&mut self, region: InternalId) -> Result<i64> {
        let records = self.run_read(&NamedQuery::RegionSeatCount { region }).await?;
        match records.first() {
            Some(record) => Ok(record.int("seats")?),
            None => Ok(0),
        }
    }

    pub async fn regions(&mut self) -> Result<Vec<(Region, InternalId)>> {
        let records = self.run_read(&NamedQuery::Regions).await?;
        records
            .iter()
            .map(|r| Region::with_internal_id(r, "region", "internal_id").map_err(Into::into))
            .collect()
    }

    /// Round trip to the store.
    pub async fn ping(&mut self) -> Result<()> {
        let records = self.run_read(&NamedQuery::Ping).await?;
        if records.is_empty() {
            return Err(ExecutionError::EmptyResult("ping"));
        }
        Ok(())
    }
}
