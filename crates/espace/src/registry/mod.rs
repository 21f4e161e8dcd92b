//! Registration of cadastre entities and the citizen drafts that feed them.
//!
//! Entities and drafts carry a per-region registry number, a location snapshot, and a
//! list of catalog-defined property values. Staff move entities along the status chain;
//! applicants submit drafts which staff later confirm and attach to an entity.

pub mod audit;
pub mod domain;
pub mod memory;
pub mod query;
pub mod repository;
pub mod router;
pub mod sequence;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use audit::{ActionHistory, ActionHistoryRecorder, AuditAction, AuditError, AuditTrail};
pub use domain::{
    DraftConfirmation, DraftRecord, DraftSubmission, EntityRecord, EntitySubmission,
    PropertyValueInput, StatusChange,
};
pub use memory::{InMemoryActionHistory, InMemoryApplicantDirectory, InMemoryRegistryStore};
pub use query::{DraftSummary, DraftView, EntitySummary, EntityView, ListQuery, QueryComposer};
pub use repository::{Applicant, ApplicantDirectory, DraftRepository, EntityRepository};
pub use router::{registry_router, RegistryState};
pub use sequence::{NumberPrefix, RegistryNumber, SequenceGenerator, SequenceStore};
pub use service::{DraftService, EntityService, RegistryContext, ServiceError};
pub use workflow::{InitialStatuses, LinearStatusChain, Status, StatusCatalog, StatusWorkflow};
