use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::audit::{ActionHistory, ActionHistoryRecorder, AuditError};
use super::domain::{ConfirmedDraft, DraftRecord, EntityRecord};
use super::query::{paginate, RecordFilter};
use super::repository::{Applicant, ApplicantDirectory, DraftRepository, EntityRepository};
use super::sequence::{NumberPrefix, RegistryNumber, SequenceScope, SequenceStore};
use crate::caller::UserId;
use crate::ids::{DraftId, EntityId, StatusId};
use crate::pagination::{Page, PageRequest};
use crate::storage::{lock, RepositoryError};

#[derive(Debug, Default)]
struct RegistryState {
    entities: HashMap<EntityId, EntityRecord>,
    drafts: HashMap<DraftId, DraftRecord>,
    counters: HashMap<SequenceScope, u64>,
}

impl RegistryState {
    fn numbers(&self, scope: SequenceScope) -> Vec<u64> {
        let in_scope = |number: &RegistryNumber| number.scope() == scope;
        match scope.prefix {
            NumberPrefix::Entity => self
                .entities
                .values()
                .map(|record| record.entity_number)
                .filter(in_scope)
                .map(|number| number.sequence)
                .collect(),
            NumberPrefix::Draft => self
                .drafts
                .values()
                .map(|record| record.draft_number)
                .filter(in_scope)
                .map(|number| number.sequence)
                .collect(),
        }
    }
}

/// Entity and draft storage plus numbering counters behind one lock, so every trait
/// call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
    state: Mutex<RegistryState>,
}

impl InMemoryRegistryStore {
    pub fn entity_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.state)?.entities.len())
    }

    pub fn draft_count(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.state)?.drafts.len())
    }
}

impl SequenceStore for InMemoryRegistryStore {
    fn next_value(&self, scope: SequenceScope) -> Result<u64, RepositoryError> {
        let mut state = lock(&self.state)?;
        if !state.counters.contains_key(&scope) {
            let numbers = state.numbers(scope);
            let seed = numbers
                .iter()
                .copied()
                .max()
                .unwrap_or(0)
                .max(numbers.len() as u64);
            state.counters.insert(scope, seed);
        }

        let counter = state.counters.entry(scope).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

impl EntityRepository for InMemoryRegistryStore {
    fn insert(&self, record: EntityRecord) -> Result<EntityRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let taken = state.entities.contains_key(&record.id)
            || state
                .entities
                .values()
                .any(|existing| existing.entity_number == record.entity_number);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        state.entities.insert(record.id, record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        expected: &EntityRecord,
        record: EntityRecord,
    ) -> Result<EntityRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let slot = state
            .entities
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot != expected {
            return Err(RepositoryError::Conflict);
        }
        *slot = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: &EntityId) -> Result<Option<EntityRecord>, RepositoryError> {
        Ok(lock(&self.state)?.entities.get(id).cloned())
    }

    fn transition_status(
        &self,
        id: &EntityId,
        expected: Option<&StatusId>,
        status: StatusId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let record = state.entities.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if expected.map_or(false, |expected| &record.status != expected) {
            return Err(RepositoryError::Conflict);
        }
        record.status = status;
        record.status_updated_at = at;
        record.updated_at = at;
        Ok(record.clone())
    }

    fn attach_draft(
        &self,
        id: &EntityId,
        draft: DraftId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let record = state.entities.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if !record.drafts.contains(&draft) {
            record.drafts.push(draft);
            record.updated_at = at;
        }
        Ok(record.clone())
    }

    fn mark_deleted(&self, id: &EntityId, at: DateTime<Utc>) -> Result<EntityRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let record = state.entities.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.deleted_at.get_or_insert(at);
        Ok(record.clone())
    }

    fn remove(&self, id: &EntityId) -> Result<(), RepositoryError> {
        lock(&self.state)?
            .entities
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<EntityRecord>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(paginate(state.entities.values().cloned(), filter, page))
    }
}

impl DraftRepository for InMemoryRegistryStore {
    fn insert(&self, record: DraftRecord) -> Result<DraftRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let taken = state.drafts.contains_key(&record.id)
            || state
                .drafts
                .values()
                .any(|existing| existing.draft_number == record.draft_number);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        state.drafts.insert(record.id, record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        expected: &DraftRecord,
        record: DraftRecord,
    ) -> Result<DraftRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let slot = state
            .drafts
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot != expected {
            return Err(RepositoryError::Conflict);
        }
        *slot = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        Ok(lock(&self.state)?.drafts.get(id).cloned())
    }

    fn confirm(
        &self,
        id: &DraftId,
        confirmation: ConfirmedDraft,
        at: DateTime<Utc>,
    ) -> Result<DraftRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let record = state.drafts.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.status = confirmation.status;
        record.comment = confirmation.comment;
        if confirmation.entity_id.is_some() {
            record.entity_id = confirmation.entity_id;
        }
        record.updated_at = at;
        Ok(record.clone())
    }

    fn mark_deleted(&self, id: &DraftId, at: DateTime<Utc>) -> Result<DraftRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let record = state.drafts.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.deleted_at.get_or_insert(at);
        Ok(record.clone())
    }

    fn remove(&self, id: &DraftId) -> Result<(), RepositoryError> {
        lock(&self.state)?
            .drafts
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<DraftRecord>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(paginate(state.drafts.values().cloned(), filter, page))
    }

    fn expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        let state = lock(&self.state)?;
        let mut stale: Vec<DraftRecord> = state
            .drafts
            .values()
            .filter(|draft| draft.deleted_at.is_none() && draft.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|draft| draft.updated_at);
        stale.truncate(limit);
        Ok(stale)
    }
}

/// Audit sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryActionHistory {
    entries: Mutex<Vec<ActionHistory>>,
}

impl InMemoryActionHistory {
    pub fn entries(&self) -> Result<Vec<ActionHistory>, RepositoryError> {
        Ok(lock(&self.entries)?.clone())
    }
}

impl ActionHistoryRecorder for InMemoryActionHistory {
    fn record(&self, entry: ActionHistory) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|_| AuditError::Transport("history mutex poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryApplicantDirectory {
    applicants: Mutex<HashMap<UserId, Applicant>>,
}

impl InMemoryApplicantDirectory {
    pub fn register(&self, applicant: Applicant) -> Result<(), RepositoryError> {
        lock(&self.applicants)?.insert(applicant.user_id.clone(), applicant);
        Ok(())
    }
}

impl ApplicantDirectory for InMemoryApplicantDirectory {
    fn applicant(&self, user_id: &UserId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(lock(&self.applicants)?.get(user_id).cloned())
    }
}
