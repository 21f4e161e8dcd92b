//! Read side: listing filters, pagination and view composition.
//!
//! Records are stored flat, with property values as bare `(property_id, value)` pairs.
//! [`QueryComposer`] joins the catalog definitions back on when a record is read. A pair
//! whose definition no longer exists is dropped on every read path, never surfaced half
//! populated.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicantSnapshot, DraftRecord, EntityRecord, FileRef, PropertyValue};
use super::sequence::RegistryNumber;
use crate::caller::{Caller, UserId};
use crate::catalog::{Property, PropertyCatalog, PropertyKind, PropertyOption};
use crate::geography::{CityId, LocationSnapshot, RegionId, Soato};
use crate::ids::{DraftId, EntityId, PropertyId, StatusId};
use crate::pagination::{Page, PageRequest};
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Query string accepted by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub city_id: Option<String>,
    pub region_id: Option<String>,
    pub status_id: Option<String>,
    pub entity_number: Option<String>,
    pub entity_type_code: Option<u32>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Validated listing filter. Every present criterion must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub city_id: Option<CityId>,
    pub region_id: Option<RegionId>,
    pub status: Option<StatusId>,
    /// Lower-cased fragment matched against the rendered registry number.
    pub number_fragment: Option<String>,
    pub entity_type_code: Option<u32>,
    pub soato: Option<Soato>,
    pub applicant: Option<UserId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// Build the filter and page for `caller`. Staff only ever see their own region.
    pub fn from_query(
        query: &ListQuery,
        caller: &Caller,
    ) -> Result<(Self, PageRequest), ValidationError> {
        let page = PageRequest::from_optional(query.page, query.limit)?;

        let created_from = query
            .from_date
            .as_deref()
            .and_then(non_blank)
            .map(|value| parse_day("from_date", value))
            .transpose()?;
        let to_day = query
            .to_date
            .as_deref()
            .and_then(non_blank)
            .map(|value| parse_day_value("to_date", value))
            .transpose()?;

        if let (Some(from), Some(to)) = (created_from, to_day) {
            if from.date_naive() > to {
                return Err(ValidationError::InvertedDateRange);
            }
        }

        let filter = Self {
            city_id: query.city_id.as_deref().and_then(non_blank).map(CityId::new),
            region_id: query
                .region_id
                .as_deref()
                .and_then(non_blank)
                .map(RegionId::new),
            status: query
                .status_id
                .as_deref()
                .and_then(non_blank)
                .map(StatusId::parse)
                .transpose()?,
            number_fragment: query
                .entity_number
                .as_deref()
                .and_then(non_blank)
                .map(str::to_lowercase),
            entity_type_code: query.entity_type_code.filter(|code| *code != 0),
            soato: caller.staff_soato(),
            applicant: None,
            created_from,
            created_before: to_day.and_then(|day| day.succ_opt()).map(start_of_day),
        };

        Ok((filter, page))
    }

    pub fn matches<R: ListableRecord>(&self, record: &R) -> bool {
        if record.is_deleted() {
            return false;
        }
        let location = record.location();
        if let Some(city) = &self.city_id {
            if &location.city.id != city {
                return false;
            }
        }
        if let Some(region) = &self.region_id {
            if &location.region.id != region {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if &record.status() != status {
                return false;
            }
        }
        if let Some(fragment) = &self.number_fragment {
            if !record.number().to_string().to_lowercase().contains(fragment) {
                return false;
            }
        }
        if let (Some(code), Some(record_code)) = (self.entity_type_code, record.type_code()) {
            if code != record_code {
                return false;
            }
        }
        if let Some(soato) = self.soato {
            if record.soato() != soato {
                return false;
            }
        }
        if let Some(applicant) = &self.applicant {
            if record.applicant() != Some(applicant) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if record.created_at() < from {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if record.created_at() >= before {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_day_value(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn parse_day(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    parse_day_value(field, value).map(start_of_day)
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Fields the listing filter inspects.
pub trait ListableRecord {
    fn location(&self) -> &LocationSnapshot;
    fn status(&self) -> StatusId;
    fn number(&self) -> &RegistryNumber;
    fn soato(&self) -> Soato;
    fn type_code(&self) -> Option<u32>;
    fn applicant(&self) -> Option<&UserId>;
    fn created_at(&self) -> DateTime<Utc>;
    fn is_deleted(&self) -> bool;
}

impl ListableRecord for EntityRecord {
    fn location(&self) -> &LocationSnapshot {
        &self.location
    }

    fn status(&self) -> StatusId {
        self.status
    }

    fn number(&self) -> &RegistryNumber {
        &self.entity_number
    }

    fn soato(&self) -> Soato {
        self.entity_soato
    }

    fn type_code(&self) -> Option<u32> {
        Some(self.entity_type_code)
    }

    fn applicant(&self) -> Option<&UserId> {
        None
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl ListableRecord for DraftRecord {
    fn location(&self) -> &LocationSnapshot {
        &self.location
    }

    fn status(&self) -> StatusId {
        self.status
    }

    fn number(&self) -> &RegistryNumber {
        &self.draft_number
    }

    fn soato(&self) -> Soato {
        self.draft_soato
    }

    fn type_code(&self) -> Option<u32> {
        None
    }

    fn applicant(&self) -> Option<&UserId> {
        Some(&self.applicant.user_id)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Filter, sort newest first and window a record set.
pub fn paginate<R, I>(records: I, filter: &RecordFilter, page: PageRequest) -> Page<R>
where
    R: ListableRecord,
    I: IntoIterator<Item = R>,
{
    let mut matches: Vec<R> = records
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect();
    matches.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.number().sequence.cmp(&a.number().sequence))
    });
    page.window(matches)
}

/// A property value with its catalog definition joined on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyValueView {
    pub property_id: PropertyId,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub is_required: bool,
    pub property_options: Vec<PropertyOption>,
    pub value: String,
}

impl PropertyValueView {
    fn new(definition: &Property, value: String) -> Self {
        Self {
            property_id: definition.id,
            name: definition.name.clone(),
            label: definition.label.clone(),
            kind: definition.kind,
            is_required: definition.is_required,
            property_options: definition.options.clone(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub entity_number: RegistryNumber,
    pub entity_soato: Soato,
    pub entity_type_code: u32,
    pub status: StatusId,
    pub version: u32,
    pub address: String,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&EntityRecord> for EntitySummary {
    fn from(record: &EntityRecord) -> Self {
        Self {
            id: record.id,
            entity_number: record.entity_number,
            entity_soato: record.entity_soato,
            entity_type_code: record.entity_type_code,
            status: record.status,
            version: record.version,
            address: record.address.clone(),
            location: record.location.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub entity_number: RegistryNumber,
    pub entity_soato: Soato,
    pub entity_type_code: u32,
    pub status: StatusId,
    pub version: u32,
    pub address: String,
    pub revert_comment: String,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    pub entity_properties: Vec<PropertyValueView>,
    pub entity_files: Vec<FileRef>,
    pub entity_gallery: Vec<String>,
    pub entity_drafts: Vec<DraftId>,
    pub staff_ids: Vec<UserId>,
    pub organizations: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub entity_status_update: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub id: DraftId,
    pub entity_draft_number: RegistryNumber,
    pub entity_draft_soato: Soato,
    pub status: StatusId,
    pub comment: String,
    pub entity_id: Option<EntityId>,
    pub applicant: ApplicantSnapshot,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DraftRecord> for DraftSummary {
    fn from(record: &DraftRecord) -> Self {
        Self {
            id: record.id,
            entity_draft_number: record.draft_number,
            entity_draft_soato: record.draft_soato,
            status: record.status,
            comment: record.comment.clone(),
            entity_id: record.entity_id,
            applicant: record.applicant.clone(),
            location: record.location.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftView {
    pub id: DraftId,
    pub entity_draft_number: RegistryNumber,
    pub entity_draft_soato: Soato,
    pub status: StatusId,
    pub comment: String,
    pub entity_id: Option<EntityId>,
    /// Summary of the linked entity, when the link still resolves.
    pub entity: Option<EntitySummary>,
    pub applicant: ApplicantSnapshot,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    pub entity_properties: Vec<PropertyValueView>,
    pub entity_gallery: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Joins catalog definitions onto stored records.
#[derive(Clone)]
pub struct QueryComposer {
    catalog: Arc<dyn PropertyCatalog>,
}

impl QueryComposer {
    pub fn new(catalog: Arc<dyn PropertyCatalog>) -> Self {
        Self { catalog }
    }

    /// Keep only values whose property is defined in the catalog, in submitted order.
    pub fn retain_known(
        &self,
        values: Vec<PropertyValue>,
    ) -> Result<Vec<PropertyValue>, RepositoryError> {
        let definitions = self.definitions(values.iter())?;
        let before = values.len();
        let kept: Vec<PropertyValue> = values
            .into_iter()
            .filter(|value| definitions.contains_key(&value.property_id))
            .collect();
        if kept.len() < before {
            tracing::debug!(dropped = before - kept.len(), "undefined property values dropped");
        }
        Ok(kept)
    }

    pub fn entity_view(&self, record: EntityRecord) -> Result<EntityView, RepositoryError> {
        let definitions = self.definitions(record.properties.iter())?;
        Ok(assemble_entity(record, &definitions))
    }

    pub fn entity_views(&self, page: Page<EntityRecord>) -> Result<Page<EntityView>, RepositoryError> {
        let definitions =
            self.definitions(page.items.iter().flat_map(|record| record.properties.iter()))?;
        Ok(page.map(|record| assemble_entity(record, &definitions)))
    }

    pub fn draft_view(
        &self,
        record: DraftRecord,
        linked: Option<&EntityRecord>,
    ) -> Result<DraftView, RepositoryError> {
        let definitions = self.definitions(record.properties.iter())?;
        let entity_properties = join(&record.properties, &definitions);

        Ok(DraftView {
            id: record.id,
            entity_draft_number: record.draft_number,
            entity_draft_soato: record.draft_soato,
            status: record.status,
            comment: record.comment,
            entity_id: record.entity_id,
            entity: linked.map(EntitySummary::from),
            applicant: record.applicant,
            location: record.location,
            entity_properties,
            entity_gallery: record.gallery,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        })
    }

    fn definitions<'a, I>(&self, values: I) -> Result<HashMap<PropertyId, Property>, RepositoryError>
    where
        I: Iterator<Item = &'a PropertyValue>,
    {
        let mut seen = HashSet::new();
        let ids: Vec<PropertyId> = values
            .map(|value| value.property_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(self
            .catalog
            .properties(&ids)?
            .into_iter()
            .map(|property| (property.id, property))
            .collect())
    }
}

impl std::fmt::Debug for QueryComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryComposer").finish_non_exhaustive()
    }
}

fn join(values: &[PropertyValue], definitions: &HashMap<PropertyId, Property>) -> Vec<PropertyValueView> {
    values
        .iter()
        .filter_map(|value| match definitions.get(&value.property_id) {
            Some(definition) => Some(PropertyValueView::new(definition, value.value.clone())),
            None => {
                tracing::debug!(property_id = %value.property_id, "value without definition skipped");
                None
            }
        })
        .collect()
}

fn assemble_entity(record: EntityRecord, definitions: &HashMap<PropertyId, Property>) -> EntityView {
    let entity_properties = join(&record.properties, definitions);
    EntityView {
        id: record.id,
        entity_number: record.entity_number,
        entity_soato: record.entity_soato,
        entity_type_code: record.entity_type_code,
        status: record.status,
        version: record.version,
        address: record.address,
        revert_comment: record.revert_comment,
        location: record.location,
        entity_properties,
        entity_files: record.files,
        entity_gallery: record.gallery,
        entity_drafts: record.drafts,
        staff_ids: record.staff_ids,
        organizations: record.organizations,
        created_at: record.created_at,
        updated_at: record.updated_at,
        entity_status_update: record.status_updated_at,
        deleted_at: record.deleted_at,
    }
}
