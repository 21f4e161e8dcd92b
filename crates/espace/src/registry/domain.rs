use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sequence::RegistryNumber;
use crate::caller::UserId;
use crate::geography::{LocationSnapshot, Soato};
use crate::ids::{DraftId, EntityId, PropertyId, StatusId};

/// New entities start at version 2; every full update adds one.
pub const INITIAL_ENTITY_VERSION: u32 = 2;

/// A stored `(property, value)` pair. Values stay untyped strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub property_id: PropertyId,
    pub value: String,
}

/// Property value as submitted by a client, before the id is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValueInput {
    pub property_id: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    #[serde(default)]
    pub comment: String,
}

/// Applicant details copied onto a draft when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSnapshot {
    pub user_id: UserId,
    pub full_name: String,
    pub phone_number: String,
}

/// A finalized registration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
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
    #[serde(rename = "entity_properties")]
    pub properties: Vec<PropertyValue>,
    #[serde(rename = "entity_files")]
    pub files: Vec<FileRef>,
    #[serde(rename = "entity_gallery")]
    pub gallery: Vec<String>,
    #[serde(rename = "entity_drafts")]
    pub drafts: Vec<DraftId>,
    pub staff_ids: Vec<UserId>,
    pub organizations: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "entity_status_update")]
    pub status_updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A pending application awaiting staff confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: DraftId,
    #[serde(rename = "entity_draft_number")]
    pub draft_number: RegistryNumber,
    #[serde(rename = "entity_draft_soato")]
    pub draft_soato: Soato,
    pub comment: String,
    pub status: StatusId,
    pub entity_id: Option<EntityId>,
    pub applicant: ApplicantSnapshot,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    #[serde(rename = "entity_properties")]
    pub properties: Vec<PropertyValue>,
    #[serde(rename = "entity_gallery")]
    pub gallery: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Body of entity create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySubmission {
    #[serde(default)]
    pub entity_type_code: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub revert_comment: String,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    #[serde(rename = "entity_properties", default)]
    pub properties: Vec<PropertyValueInput>,
    #[serde(rename = "entity_files", default)]
    pub files: Vec<FileRef>,
    #[serde(rename = "entity_gallery", default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub organizations: BTreeMap<String, bool>,
}

/// Body of draft create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftSubmission {
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub location: LocationSnapshot,
    #[serde(rename = "entity_properties", default)]
    pub properties: Vec<PropertyValueInput>,
    #[serde(rename = "entity_gallery", default)]
    pub gallery: Vec<String>,
}

/// Staff decision on a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfirmation {
    pub status_id: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub comment: String,
}

/// Validated confirmation handed to the draft repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedDraft {
    pub status: StatusId,
    pub entity_id: Option<EntityId>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status_id: String,
}
