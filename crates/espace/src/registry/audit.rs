use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::caller::{Caller, UserId};
use crate::ids::{DraftId, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    StatusChanged,
    StatusAdvanced,
    Confirmed,
    DraftAttached,
    Deleted,
    DeletedPermanently,
}

impl AuditAction {
    pub fn describe(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::StatusChanged => "status changed",
            AuditAction::StatusAdvanced => "advanced to next step",
            AuditAction::Confirmed => "confirmed",
            AuditAction::DraftAttached => "draft attached",
            AuditAction::Deleted => "deleted",
            AuditAction::DeletedPermanently => "deleted permanently",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSubject {
    Entity(EntityId),
    Draft(DraftId),
}

impl AuditSubject {
    fn parts(self) -> (Uuid, &'static str) {
        match self {
            AuditSubject::Entity(id) => (id.0, "entity"),
            AuditSubject::Draft(id) => (id.0, "entity_draft"),
        }
    }
}

/// One append-only audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHistory {
    pub id: Uuid,
    pub user_id: UserId,
    pub action: String,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub updated_fields: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

pub trait ActionHistoryRecorder: Send + Sync {
    fn record(&self, entry: ActionHistory) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Transport(String),
}

/// Best-effort audit channel: a failed write is logged, never propagated.
#[derive(Clone)]
pub struct AuditTrail {
    recorder: Arc<dyn ActionHistoryRecorder>,
}

impl AuditTrail {
    pub fn new(recorder: Arc<dyn ActionHistoryRecorder>) -> Self {
        Self { recorder }
    }

    pub fn record(
        &self,
        caller: &Caller,
        action: AuditAction,
        subject: AuditSubject,
        at: DateTime<Utc>,
    ) {
        let (entity_id, entity_name) = subject.parts();
        let entry = ActionHistory {
            id: Uuid::new_v4(),
            user_id: caller.user_id.clone(),
            action: action.describe().to_string(),
            entity_id,
            entity_name: entity_name.to_string(),
            updated_fields: Vec::new(),
            recorded_at: at,
        };

        if let Err(error) = self.recorder.record(entry) {
            tracing::warn!(
                %error,
                action = action.describe(),
                entity_id = %entity_id,
                "action history write failed"
            );
        }
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail").finish_non_exhaustive()
    }
}
