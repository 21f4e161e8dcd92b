use std::sync::Arc;

use super::{missing, region_code, require_staff, RegistryContext, ServiceError};
use crate::caller::Caller;
use crate::ids::{DraftId, EntityId, StatusId};
use crate::pagination::Page;
use crate::registry::audit::{AuditAction, AuditSubject};
use crate::registry::domain::{EntityRecord, EntitySubmission, INITIAL_ENTITY_VERSION};
use crate::registry::query::{EntitySummary, EntityView, ListQuery, RecordFilter};
use crate::registry::repository::EntityRepository;
use crate::registry::sequence::NumberPrefix;
use crate::validation::ValidationError;

/// Lifecycle of finalized registration records.
pub struct EntityService<R> {
    repository: Arc<R>,
    context: Arc<RegistryContext>,
}

impl<R> Clone for EntityService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            context: Arc::clone(&self.context),
        }
    }
}

impl<R> EntityService<R>
where
    R: EntityRepository + 'static,
{
    pub fn new(repository: Arc<R>, context: Arc<RegistryContext>) -> Self {
        Self {
            repository,
            context,
        }
    }

    /// Register a new entity in the region of the submitted district.
    pub fn create(
        &self,
        caller: &Caller,
        submission: EntitySubmission,
    ) -> Result<EntityView, ServiceError> {
        require_staff(caller, "register entities")?;
        let soato = region_code(&submission.location)?;
        let properties = self.context.property_values(submission.properties)?;
        let status = self
            .context
            .workflow
            .initial_entity_status(submission.entity_type_code);
        let now = self.context.clock.now();

        let stored = self
            .context
            .insert_numbered(NumberPrefix::Entity, soato, |entity_number| {
                self.repository.insert(EntityRecord {
                    id: EntityId::generate(),
                    entity_number,
                    entity_soato: soato,
                    entity_type_code: submission.entity_type_code,
                    status,
                    version: INITIAL_ENTITY_VERSION,
                    address: submission.address.clone(),
                    revert_comment: submission.revert_comment.clone(),
                    location: submission.location.clone(),
                    properties: properties.clone(),
                    files: submission.files.clone(),
                    gallery: submission.gallery.clone(),
                    drafts: Vec::new(),
                    staff_ids: vec![caller.user_id.clone()],
                    organizations: submission.organizations.clone(),
                    created_at: now,
                    updated_at: now,
                    status_updated_at: now,
                    deleted_at: None,
                })
            })?;

        tracing::info!(
            entity_id = %stored.id,
            entity_number = %stored.entity_number,
            status = %stored.status,
            "entity registered"
        );
        self.context.audit.record(
            caller,
            AuditAction::Created,
            AuditSubject::Entity(stored.id),
            now,
        );
        Ok(self.context.composer.entity_view(stored)?)
    }

    pub fn get(&self, entity_id: &str) -> Result<EntityView, ServiceError> {
        let record = self.fetch(EntityId::parse(entity_id)?)?;
        Ok(self.context.composer.entity_view(record)?)
    }

    pub fn list(
        &self,
        caller: &Caller,
        query: &ListQuery,
    ) -> Result<Page<EntitySummary>, ServiceError> {
        let (filter, page) = RecordFilter::from_query(query, caller)?;
        let records = self.repository.list(&filter, page)?;
        Ok(records.map(|record| EntitySummary::from(&record)))
    }

    /// Same listing as [`Self::list`], with property definitions joined on.
    pub fn list_with_properties(
        &self,
        caller: &Caller,
        query: &ListQuery,
    ) -> Result<Page<EntityView>, ServiceError> {
        let (filter, page) = RecordFilter::from_query(query, caller)?;
        let records = self.repository.list(&filter, page)?;
        Ok(self.context.composer.entity_views(records)?)
    }

    /// Full replace of the editable fields. Number, region, status and links are kept,
    /// and a status change, link or delete that lands after the read makes the write
    /// fail with a retryable conflict.
    pub fn update(
        &self,
        caller: &Caller,
        entity_id: &str,
        submission: EntitySubmission,
    ) -> Result<EntityView, ServiceError> {
        require_staff(caller, "edit entities")?;
        let id = EntityId::parse(entity_id)?;
        let submitted = region_code(&submission.location)?;
        let existing = self.fetch(id)?;
        if submitted != existing.entity_soato {
            return Err(ValidationError::SoatoChanged {
                stored: existing.entity_soato,
                submitted,
            }
            .into());
        }
        let properties = self.context.property_values(submission.properties)?;
        let now = self.context.clock.now();

        let mut staff_ids = existing.staff_ids.clone();
        if !staff_ids.contains(&caller.user_id) {
            staff_ids.push(caller.user_id.clone());
        }

        let record = EntityRecord {
            id,
            entity_number: existing.entity_number,
            entity_soato: existing.entity_soato,
            entity_type_code: submission.entity_type_code,
            status: existing.status,
            version: existing.version + 1,
            address: submission.address,
            revert_comment: submission.revert_comment,
            location: submission.location,
            properties,
            files: submission.files,
            gallery: submission.gallery,
            drafts: existing.drafts.clone(),
            staff_ids,
            organizations: submission.organizations,
            created_at: existing.created_at,
            updated_at: now,
            status_updated_at: existing.status_updated_at,
            deleted_at: existing.deleted_at,
        };

        let stored = self
            .repository
            .replace(&existing, record)
            .map_err(missing("entity", id))?;
        self.context
            .audit
            .record(caller, AuditAction::Updated, AuditSubject::Entity(id), now);
        Ok(self.context.composer.entity_view(stored)?)
    }

    /// Set the status explicitly. Any well-formed status id is accepted.
    pub fn update_status(
        &self,
        caller: &Caller,
        entity_id: &str,
        status_id: &str,
    ) -> Result<EntityView, ServiceError> {
        require_staff(caller, "change entity status")?;
        let id = EntityId::parse(entity_id)?;
        let status = StatusId::parse(status_id)?;
        let now = self.context.clock.now();

        let stored = self
            .repository
            .transition_status(&id, None, status, now)
            .map_err(missing("entity", id))?;
        tracing::info!(entity_id = %id, status = %status, "entity status set");
        self.context.audit.record(
            caller,
            AuditAction::StatusChanged,
            AuditSubject::Entity(id),
            now,
        );
        Ok(self.context.composer.entity_view(stored)?)
    }

    /// Move the entity to the parent status of the status it is stored with. The
    /// caller's notion of the current status is only checked for format.
    ///
    /// The claimed status is never used as the starting point, even when it names a
    /// different step of the chain.
    pub fn advance_status(
        &self,
        caller: &Caller,
        entity_id: &str,
        current_status_id: &str,
    ) -> Result<EntityView, ServiceError> {
        require_staff(caller, "advance entity status")?;
        let id = EntityId::parse(entity_id)?;
        let claimed = StatusId::parse(current_status_id)?;
        let existing = self.fetch(id)?;
        if claimed != existing.status {
            tracing::debug!(
                entity_id = %id,
                claimed = %claimed,
                stored = %existing.status,
                "advancing from stored status"
            );
        }

        let next = self.context.workflow.successor_of(&existing.status)?;
        let now = self.context.clock.now();
        let stored = self
            .repository
            .transition_status(&id, Some(&existing.status), next.id, now)
            .map_err(missing("entity", id))?;

        tracing::info!(entity_id = %id, from = %existing.status, to = %next.id, "entity advanced");
        self.context.audit.record(
            caller,
            AuditAction::StatusAdvanced,
            AuditSubject::Entity(id),
            now,
        );
        Ok(self.context.composer.entity_view(stored)?)
    }

    /// Record a confirmed draft on the entity. Linking twice is a no-op.
    pub fn attach_draft(
        &self,
        caller: &Caller,
        entity_id: &str,
        draft_id: &str,
    ) -> Result<EntityView, ServiceError> {
        require_staff(caller, "link drafts")?;
        let id = EntityId::parse(entity_id)?;
        let draft = DraftId::parse(draft_id)?;
        let now = self.context.clock.now();

        let stored = self
            .repository
            .attach_draft(&id, draft, now)
            .map_err(missing("entity", id))?;
        self.context.audit.record(
            caller,
            AuditAction::DraftAttached,
            AuditSubject::Entity(id),
            now,
        );
        Ok(self.context.composer.entity_view(stored)?)
    }

    /// Soft delete. The record stays readable by id but leaves every listing.
    pub fn delete(&self, caller: &Caller, entity_id: &str) -> Result<EntityView, ServiceError> {
        require_staff(caller, "delete entities")?;
        let id = EntityId::parse(entity_id)?;
        let now = self.context.clock.now();

        let stored = self
            .repository
            .mark_deleted(&id, now)
            .map_err(missing("entity", id))?;
        self.context
            .audit
            .record(caller, AuditAction::Deleted, AuditSubject::Entity(id), now);
        Ok(self.context.composer.entity_view(stored)?)
    }

    pub fn delete_permanently(&self, caller: &Caller, entity_id: &str) -> Result<(), ServiceError> {
        require_staff(caller, "delete entities")?;
        let id = EntityId::parse(entity_id)?;

        self.repository.remove(&id).map_err(missing("entity", id))?;
        tracing::info!(entity_id = %id, "entity removed");
        self.context.audit.record(
            caller,
            AuditAction::DeletedPermanently,
            AuditSubject::Entity(id),
            self.context.clock.now(),
        );
        Ok(())
    }

    fn fetch(&self, id: EntityId) -> Result<EntityRecord, ServiceError> {
        self.repository
            .fetch(&id)?
            .ok_or_else(|| ServiceError::not_found("entity", id))
    }
}
