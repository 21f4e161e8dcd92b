use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ConfirmedDraft, DraftRecord, EntityRecord};
use super::query::RecordFilter;
use crate::caller::UserId;
use crate::ids::{DraftId, EntityId, StatusId};
use crate::pagination::{Page, PageRequest};
use crate::storage::RepositoryError;

/// Storage contract for entities. Every method is atomic on a single record.
pub trait EntityRepository: Send + Sync {
    /// Fails with `Conflict` when the id or the `(soato, number)` pair is taken.
    fn insert(&self, record: EntityRecord) -> Result<EntityRecord, RepositoryError>;
    /// Write `record` only while the stored record still equals `expected`, the copy
    /// the caller read. Fails with `Conflict` otherwise.
    fn replace(
        &self,
        expected: &EntityRecord,
        record: EntityRecord,
    ) -> Result<EntityRecord, RepositoryError>;
    fn fetch(&self, id: &EntityId) -> Result<Option<EntityRecord>, RepositoryError>;
    /// Set the status, optionally only when the stored status still equals `expected`.
    fn transition_status(
        &self,
        id: &EntityId,
        expected: Option<&StatusId>,
        status: StatusId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError>;
    fn attach_draft(
        &self,
        id: &EntityId,
        draft: DraftId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError>;
    fn mark_deleted(&self, id: &EntityId, at: DateTime<Utc>) -> Result<EntityRecord, RepositoryError>;
    fn remove(&self, id: &EntityId) -> Result<(), RepositoryError>;
    /// Matching records, newest first, windowed by `page`.
    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<EntityRecord>, RepositoryError>;
}

/// Storage contract for drafts.
pub trait DraftRepository: Send + Sync {
    fn insert(&self, record: DraftRecord) -> Result<DraftRecord, RepositoryError>;
    /// Conditional write, same contract as [`EntityRepository::replace`].
    fn replace(
        &self,
        expected: &DraftRecord,
        record: DraftRecord,
    ) -> Result<DraftRecord, RepositoryError>;
    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError>;
    fn confirm(
        &self,
        id: &DraftId,
        confirmation: ConfirmedDraft,
        at: DateTime<Utc>,
    ) -> Result<DraftRecord, RepositoryError>;
    fn mark_deleted(&self, id: &DraftId, at: DateTime<Utc>) -> Result<DraftRecord, RepositoryError>;
    fn remove(&self, id: &DraftId) -> Result<(), RepositoryError>;
    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<DraftRecord>, RepositoryError>;
    /// Non-deleted drafts last touched before `cutoff`, oldest first.
    fn expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError>;
}

/// Citizen account as held by the applicant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub user_id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
}

impl Applicant {
    /// Stored full name, or one assembled from the name parts when it is blank.
    pub fn display_name(&self) -> String {
        if !self.full_name.trim().is_empty() {
            return self.full_name.trim().to_string();
        }
        [&self.last_name, &self.first_name, &self.middle_name]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait ApplicantDirectory: Send + Sync {
    fn applicant(&self, user_id: &UserId) -> Result<Option<Applicant>, RepositoryError>;
}
