use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::StatusId;
use crate::storage::RepositoryError;

/// Entity type code whose records start in the second intake status.
pub const ENTITY_TYPE_TWO: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub name: String,
}

impl Status {
    pub fn new(id: StatusId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Read access to the externally managed status catalog.
pub trait StatusCatalog: Send + Sync {
    fn status(&self, id: &StatusId) -> Result<Option<Status>, RepositoryError>;
    /// The "parent" status that follows `id`, or `None` at the end of the chain.
    fn successor(&self, id: &StatusId) -> Result<Option<Status>, RepositoryError>;
    fn initial_draft_status(&self) -> Result<Status, RepositoryError>;
}

/// Status catalog where every entity status is followed by the next one in the list.
#[derive(Debug, Clone)]
pub struct LinearStatusChain {
    chain: Vec<Status>,
    initial_draft: Status,
}

impl LinearStatusChain {
    pub fn new(chain: Vec<Status>, initial_draft: Status) -> Self {
        Self {
            chain,
            initial_draft,
        }
    }

    pub fn statuses(&self) -> &[Status] {
        &self.chain
    }
}

impl StatusCatalog for LinearStatusChain {
    fn status(&self, id: &StatusId) -> Result<Option<Status>, RepositoryError> {
        if &self.initial_draft.id == id {
            return Ok(Some(self.initial_draft.clone()));
        }
        Ok(self.chain.iter().find(|status| &status.id == id).cloned())
    }

    fn successor(&self, id: &StatusId) -> Result<Option<Status>, RepositoryError> {
        let position = self.chain.iter().position(|status| &status.id == id);
        Ok(position.and_then(|index| self.chain.get(index + 1)).cloned())
    }

    fn initial_draft_status(&self) -> Result<Status, RepositoryError> {
        Ok(self.initial_draft.clone())
    }
}

/// Statuses new entities start in, selected by entity type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialStatuses {
    pub entity_type_one: StatusId,
    pub entity_type_two: StatusId,
}

#[derive(Clone)]
pub struct StatusWorkflow {
    catalog: Arc<dyn StatusCatalog>,
    initial: InitialStatuses,
}

impl StatusWorkflow {
    pub fn new(catalog: Arc<dyn StatusCatalog>, initial: InitialStatuses) -> Self {
        Self { catalog, initial }
    }

    pub fn initial_entity_status(&self, entity_type_code: u32) -> StatusId {
        if entity_type_code == ENTITY_TYPE_TWO {
            self.initial.entity_type_two
        } else {
            self.initial.entity_type_one
        }
    }

    pub fn initial_draft_status(&self) -> Result<StatusId, WorkflowError> {
        Ok(self.catalog.initial_draft_status()?.id)
    }

    /// Resolve the status that follows `current` in the catalog.
    pub fn successor_of(&self, current: &StatusId) -> Result<Status, WorkflowError> {
        if self.catalog.status(current)?.is_none() {
            return Err(WorkflowError::UnknownStatus(*current));
        }
        self.catalog
            .successor(current)?
            .ok_or(WorkflowError::NoSuccessor(*current))
    }
}

impl std::fmt::Debug for StatusWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusWorkflow")
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("status {0} is not in the status catalog")]
    UnknownStatus(StatusId),
    #[error("status {0} is the last step and has no parent status")]
    NoSuccessor(StatusId),
    #[error(transparent)]
    Catalog(#[from] RepositoryError),
}
