use std::sync::Arc;

use chrono::Duration;

use super::{missing, region_code, require_staff, RegistryContext, ServiceError};
use crate::caller::Caller;
use crate::ids::{DraftId, EntityId, StatusId};
use crate::pagination::Page;
use crate::registry::audit::{AuditAction, AuditSubject};
use crate::registry::domain::{
    ApplicantSnapshot, ConfirmedDraft, DraftConfirmation, DraftRecord, DraftSubmission,
};
use crate::registry::query::{DraftSummary, DraftView, ListQuery, RecordFilter};
use crate::registry::repository::{ApplicantDirectory, DraftRepository, EntityRepository};
use crate::registry::sequence::NumberPrefix;
use crate::validation::ValidationError;

pub const DEFAULT_EXPIRED_LIMIT: usize = 10;

/// Lifecycle of applications submitted by citizens.
pub struct DraftService<D, E> {
    drafts: Arc<D>,
    entities: Arc<E>,
    applicants: Arc<dyn ApplicantDirectory>,
    context: Arc<RegistryContext>,
}

impl<D, E> Clone for DraftService<D, E> {
    fn clone(&self) -> Self {
        Self {
            drafts: Arc::clone(&self.drafts),
            entities: Arc::clone(&self.entities),
            applicants: Arc::clone(&self.applicants),
            context: Arc::clone(&self.context),
        }
    }
}

impl<D, E> DraftService<D, E>
where
    D: DraftRepository + 'static,
    E: EntityRepository + 'static,
{
    pub fn new(
        drafts: Arc<D>,
        entities: Arc<E>,
        applicants: Arc<dyn ApplicantDirectory>,
        context: Arc<RegistryContext>,
    ) -> Self {
        Self {
            drafts,
            entities,
            applicants,
            context,
        }
    }

    pub fn create(
        &self,
        caller: &Caller,
        submission: DraftSubmission,
    ) -> Result<DraftView, ServiceError> {
        if caller.is_staff() {
            return Err(ServiceError::Forbidden(
                "drafts are submitted by applicants".to_string(),
            ));
        }
        let applicant = self
            .applicants
            .applicant(&caller.user_id)?
            .ok_or_else(|| ServiceError::not_found("applicant", &caller.user_id))?;
        let soato = region_code(&submission.location)?;
        let status = self.context.workflow.initial_draft_status()?;
        let properties = self.context.property_values(submission.properties)?;
        let snapshot = ApplicantSnapshot {
            user_id: applicant.user_id.clone(),
            full_name: applicant.display_name(),
            phone_number: applicant.phone_number.clone(),
        };
        let now = self.context.clock.now();

        let stored = self
            .context
            .insert_numbered(NumberPrefix::Draft, soato, |draft_number| {
                self.drafts.insert(DraftRecord {
                    id: DraftId::generate(),
                    draft_number,
                    draft_soato: soato,
                    comment: submission.comment.clone(),
                    status,
                    entity_id: None,
                    applicant: snapshot.clone(),
                    location: submission.location.clone(),
                    properties: properties.clone(),
                    gallery: submission.gallery.clone(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                })
            })?;

        tracing::info!(
            draft_id = %stored.id,
            draft_number = %stored.draft_number,
            "draft submitted"
        );
        self.context.audit.record(
            caller,
            AuditAction::Created,
            AuditSubject::Draft(stored.id),
            now,
        );
        Ok(self.context.composer.draft_view(stored, None)?)
    }

    pub fn get(&self, caller: &Caller, draft_id: &str) -> Result<DraftView, ServiceError> {
        let record = self.fetch(DraftId::parse(draft_id)?)?;
        ensure_visible(caller, &record)?;
        self.view(record)
    }

    /// Staff see their region; applicants see only their own drafts.
    pub fn list(
        &self,
        caller: &Caller,
        query: &ListQuery,
    ) -> Result<Page<DraftSummary>, ServiceError> {
        let (mut filter, page) = RecordFilter::from_query(query, caller)?;
        if !caller.is_staff() {
            filter.applicant = Some(caller.user_id.clone());
        }
        let records = self.drafts.list(&filter, page)?;
        Ok(records.map(|record| DraftSummary::from(&record)))
    }

    /// Applicants may edit their own draft while it is still in the initial status;
    /// staff may edit any draft. Fails with a retryable conflict when the draft
    /// changed after it was read.
    pub fn update(
        &self,
        caller: &Caller,
        draft_id: &str,
        submission: DraftSubmission,
    ) -> Result<DraftView, ServiceError> {
        let id = DraftId::parse(draft_id)?;
        let submitted = region_code(&submission.location)?;
        let existing = self.fetch(id)?;

        if !caller.is_staff() {
            if existing.applicant.user_id != caller.user_id {
                return Err(ServiceError::Forbidden(
                    "drafts can only be edited by their applicant".to_string(),
                ));
            }
            if existing.status != self.context.workflow.initial_draft_status()? {
                return Err(ServiceError::Forbidden(
                    "draft is under review and can no longer be edited".to_string(),
                ));
            }
        }
        if submitted != existing.draft_soato {
            return Err(ValidationError::SoatoChanged {
                stored: existing.draft_soato,
                submitted,
            }
            .into());
        }

        let properties = self.context.property_values(submission.properties)?;
        let now = self.context.clock.now();
        let record = DraftRecord {
            comment: submission.comment,
            location: submission.location,
            properties,
            gallery: submission.gallery,
            updated_at: now,
            ..existing.clone()
        };

        // A confirm landing after the read changes the stored status and turns this
        // write into a conflict, so the applicant check above still holds at write time.
        let stored = self
            .drafts
            .replace(&existing, record)
            .map_err(missing("draft", id))?;
        self.context
            .audit
            .record(caller, AuditAction::Updated, AuditSubject::Draft(id), now);
        self.view(stored)
    }

    /// Record the staff decision on a draft. Linking the draft on the entity is a
    /// separate step, see `EntityService::attach_draft`.
    pub fn confirm(
        &self,
        caller: &Caller,
        draft_id: &str,
        confirmation: DraftConfirmation,
    ) -> Result<DraftView, ServiceError> {
        require_staff(caller, "confirm drafts")?;
        let id = DraftId::parse(draft_id)?;
        let status = StatusId::parse(&confirmation.status_id)?;
        let entity_id = confirmation
            .entity_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(EntityId::parse)
            .transpose()?;
        let comment = confirmation.comment.trim();
        if comment.is_empty() {
            return Err(ValidationError::MissingComment.into());
        }

        let linked = match entity_id {
            Some(entity_id) => Some(
                self.entities
                    .fetch(&entity_id)?
                    .ok_or_else(|| ServiceError::not_found("entity", entity_id))?,
            ),
            None => None,
        };

        let now = self.context.clock.now();
        let stored = self
            .drafts
            .confirm(
                &id,
                ConfirmedDraft {
                    status,
                    entity_id,
                    comment: comment.to_string(),
                },
                now,
            )
            .map_err(missing("draft", id))?;

        tracing::info!(draft_id = %id, status = %status, "draft confirmed");
        self.context
            .audit
            .record(caller, AuditAction::Confirmed, AuditSubject::Draft(id), now);
        Ok(self.context.composer.draft_view(stored, linked.as_ref())?)
    }

    /// Drafts untouched for longer than the configured expiry, oldest first.
    pub fn expired(
        &self,
        caller: &Caller,
        limit: Option<usize>,
    ) -> Result<Vec<DraftSummary>, ServiceError> {
        require_staff(caller, "review expired drafts")?;
        let limit = limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_EXPIRED_LIMIT);
        let cutoff = self.context.clock.now()
            - Duration::days(i64::from(self.context.settings.draft_expiry_days));

        let records = self.drafts.expired(cutoff, limit)?;
        Ok(records.iter().map(DraftSummary::from).collect())
    }

    pub fn delete(&self, caller: &Caller, draft_id: &str) -> Result<DraftView, ServiceError> {
        require_staff(caller, "delete drafts")?;
        let id = DraftId::parse(draft_id)?;
        let now = self.context.clock.now();

        let stored = self
            .drafts
            .mark_deleted(&id, now)
            .map_err(missing("draft", id))?;
        self.context
            .audit
            .record(caller, AuditAction::Deleted, AuditSubject::Draft(id), now);
        self.view(stored)
    }

    pub fn delete_permanently(&self, caller: &Caller, draft_id: &str) -> Result<(), ServiceError> {
        require_staff(caller, "delete drafts")?;
        let id = DraftId::parse(draft_id)?;

        self.drafts.remove(&id).map_err(missing("draft", id))?;
        tracing::info!(draft_id = %id, "draft removed");
        self.context.audit.record(
            caller,
            AuditAction::DeletedPermanently,
            AuditSubject::Draft(id),
            self.context.clock.now(),
        );
        Ok(())
    }

    fn fetch(&self, id: DraftId) -> Result<DraftRecord, ServiceError> {
        self.drafts
            .fetch(&id)?
            .ok_or_else(|| ServiceError::not_found("draft", id))
    }

    fn view(&self, record: DraftRecord) -> Result<DraftView, ServiceError> {
        let linked = match record.entity_id {
            Some(entity_id) => self.entities.fetch(&entity_id)?,
            None => None,
        };
        Ok(self.context.composer.draft_view(record, linked.as_ref())?)
    }
}

fn ensure_visible(caller: &Caller, record: &DraftRecord) -> Result<(), ServiceError> {
    if caller.is_staff() || record.applicant.user_id == caller.user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "drafts are only visible to their applicant and staff".to_string(),
        ))
    }
}
