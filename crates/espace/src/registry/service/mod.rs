//! Registry operations: validation and orchestration on top of the repositories.

mod drafts;
mod entities;

pub use drafts::DraftService;
pub use entities::EntityService;

use std::sync::Arc;

use super::audit::AuditTrail;
use super::domain::{PropertyValue, PropertyValueInput};
use super::query::QueryComposer;
use super::sequence::{NumberPrefix, SequenceGenerator, SequenceStore};
use super::workflow::{StatusWorkflow, WorkflowError};
use crate::caller::Caller;
use crate::catalog::PropertyCatalog;
use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::ErrorKind;
use crate::geography::{LocationSnapshot, Soato};
use crate::ids::PropertyId;
use crate::storage::RepositoryError;
use crate::validation::ValidationError;

/// Collaborators shared by the entity and draft services.
#[derive(Clone)]
pub struct RegistryContext {
    pub composer: QueryComposer,
    pub workflow: StatusWorkflow,
    pub sequences: SequenceGenerator,
    pub audit: AuditTrail,
    pub clock: Arc<dyn Clock>,
    pub settings: RegistryConfig,
}

impl RegistryContext {
    pub fn new(
        catalog: Arc<dyn PropertyCatalog>,
        workflow: StatusWorkflow,
        sequences: Arc<dyn SequenceStore>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        settings: RegistryConfig,
    ) -> Self {
        Self {
            composer: QueryComposer::new(catalog),
            workflow,
            sequences: SequenceGenerator::new(sequences),
            audit,
            clock,
            settings,
        }
    }

    /// Parse submitted values and drop those whose property is not in the catalog.
    pub(crate) fn property_values(
        &self,
        inputs: Vec<PropertyValueInput>,
    ) -> Result<Vec<PropertyValue>, ServiceError> {
        let values = inputs
            .into_iter()
            .map(|input| {
                Ok(PropertyValue {
                    property_id: PropertyId::parse(&input.property_id)?,
                    value: input.value,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(self.composer.retain_known(values)?)
    }

    /// Insert a freshly numbered record, drawing a new number whenever the insert
    /// collides with an existing one.
    pub(crate) fn insert_numbered<T, F>(
        &self,
        prefix: NumberPrefix,
        soato: Soato,
        mut insert: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut(super::sequence::RegistryNumber) -> Result<T, RepositoryError>,
    {
        let attempts = self.settings.sequence_attempts.max(1);
        for attempt in 1..=attempts {
            let number = self.sequences.next(prefix, soato)?;
            match insert(number) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Conflict) => {
                    tracing::warn!(%number, attempt, attempts, "registry number collided, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(ServiceError::SequenceExhausted {
            prefix: prefix.letter(),
            soato,
            attempts,
        })
    }
}

impl std::fmt::Debug for RegistryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryContext")
            .field("workflow", &self.workflow)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

pub(crate) fn region_code(location: &LocationSnapshot) -> Result<Soato, ValidationError> {
    let soato = location.region_code();
    if soato.is_zero() {
        return Err(ValidationError::MissingSoato);
    }
    Ok(soato)
}

pub(crate) fn require_staff(caller: &Caller, operation: &'static str) -> Result<(), ServiceError> {
    if caller.is_staff() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("only staff may {operation}")))
    }
}

/// Error raised by the registry services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("could not assign a unique {prefix} number in region {soato} after {attempts} attempts")]
    SequenceExhausted {
        prefix: char,
        soato: Soato,
        attempts: u32,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::Workflow(WorkflowError::UnknownStatus(_))
            | ServiceError::Workflow(WorkflowError::NoSuccessor(_)) => ErrorKind::NotFound,
            ServiceError::Workflow(WorkflowError::Catalog(err)) => repository_kind(err),
            ServiceError::SequenceExhausted { .. } => ErrorKind::Conflict,
            ServiceError::Repository(err) => repository_kind(err),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

fn repository_kind(error: &RepositoryError) -> ErrorKind {
    match error {
        RepositoryError::Conflict => ErrorKind::Conflict,
        RepositoryError::NotFound => ErrorKind::NotFound,
        RepositoryError::Unavailable(_) => ErrorKind::Internal,
    }
}

/// Map a repository `NotFound` onto a named resource.
pub(crate) fn missing(resource: &'static str, id: impl ToString) -> impl FnOnce(RepositoryError) -> ServiceError {
    let id = id.to_string();
    move |error| match error {
        RepositoryError::NotFound => ServiceError::NotFound { resource, id },
        other => ServiceError::Repository(other),
    }
}
