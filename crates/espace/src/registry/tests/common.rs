use std::sync::{Arc, Mutex};

use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::caller::Caller;
use crate::catalog::{InMemoryPropertyCatalog, Property, PropertyCatalog, PropertyKind};
use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::geography::{
    CityId, CitySnapshot, DistrictId, DistrictSnapshot, LocationSnapshot, RegionId,
    RegionSnapshot, Soato,
};
use crate::ids::{DraftId, EntityId, PropertyId, StatusId};
use crate::pagination::{Page, PageRequest};
use crate::registry::audit::{ActionHistory, ActionHistoryRecorder, AuditError, AuditTrail};
use crate::registry::domain::{
    ConfirmedDraft, DraftRecord, DraftSubmission, EntityRecord, EntitySubmission,
    PropertyValueInput,
};
use crate::registry::memory::{
    InMemoryActionHistory, InMemoryApplicantDirectory, InMemoryRegistryStore,
};
use crate::registry::query::RecordFilter;
use crate::registry::router::{registry_router, RegistryState};
use crate::registry::repository::{Applicant, DraftRepository, EntityRepository};
use crate::registry::sequence::{SequenceScope, SequenceStore};
use crate::registry::service::{DraftService, EntityService, RegistryContext};
use crate::registry::workflow::{InitialStatuses, LinearStatusChain, Status, StatusWorkflow};
use crate::storage::RepositoryError;

pub(super) const REGION: Soato = Soato(1703);
pub(super) const OTHER_REGION: Soato = Soato(1726);
pub(super) const APPLICANT_ID: &str = "citizen-1";

pub(super) fn status(n: u128) -> StatusId {
    StatusId(Uuid::from_u128(n))
}

pub(super) fn s1() -> StatusId {
    status(0x51)
}

pub(super) fn s2() -> StatusId {
    status(0x52)
}

pub(super) fn s3() -> StatusId {
    status(0x53)
}

pub(super) fn draft_intake() -> StatusId {
    status(0xd1)
}

pub(super) fn status_chain() -> LinearStatusChain {
    LinearStatusChain::new(
        vec![
            Status::new(s1(), "received"),
            Status::new(s2(), "surveyed"),
            Status::new(s3(), "registered"),
        ],
        Status::new(draft_intake(), "submitted"),
    )
}

pub(super) fn workflow() -> StatusWorkflow {
    StatusWorkflow::new(
        Arc::new(status_chain()),
        InitialStatuses {
            entity_type_one: s1(),
            entity_type_two: s2(),
        },
    )
}

pub(super) fn staff() -> Caller {
    Caller::staff("staff-1", "inspector", REGION)
}

pub(super) fn other_staff() -> Caller {
    Caller::staff("staff-2", "surveyor", REGION)
}

pub(super) fn applicant() -> Caller {
    Caller::applicant(APPLICANT_ID, "aziz")
}

pub(super) fn stranger() -> Caller {
    Caller::applicant("citizen-2", "dilnoza")
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(super) fn location(city: &str, soato: Soato) -> LocationSnapshot {
    LocationSnapshot {
        city: CitySnapshot {
            id: CityId::new(city),
            name: "Samarkand".to_string(),
            ru_name: "Samarkand".to_string(),
            code: 17,
            soato: Soato(17),
        },
        region: RegionSnapshot {
            id: RegionId::new(format!("{city}-region")),
            name: "Urgut".to_string(),
            ru_name: "Urgut".to_string(),
            code: 3,
            soato: Soato(1703),
        },
        district: DistrictSnapshot {
            id: DistrictId::new(format!("{city}-district-{soato}")),
            name: "Kamangaron".to_string(),
            ru_name: "Kamangaron".to_string(),
            code: 1,
            soato,
        },
    }
}

pub(super) fn property(id: PropertyId, name: &str) -> Property {
    Property {
        id,
        name: name.to_string(),
        label: name.to_uppercase(),
        placeholder: String::new(),
        kind: PropertyKind::Text,
        validation: String::new(),
        description: String::new(),
        collection_name: String::new(),
        active: true,
        is_required: false,
        with_confirmation: false,
        options: Vec::new(),
        created_at: start(),
        updated_at: start(),
    }
}

pub(super) fn value(property_id: PropertyId, value: &str) -> PropertyValueInput {
    PropertyValueInput {
        property_id: property_id.to_string(),
        value: value.to_string(),
    }
}

pub(super) fn entity_submission(soato: Soato) -> EntitySubmission {
    EntitySubmission {
        entity_type_code: 1,
        address: "Registon street 4".to_string(),
        location: location("samarkand", soato),
        ..EntitySubmission::default()
    }
}

pub(super) fn draft_submission(soato: Soato) -> DraftSubmission {
    DraftSubmission {
        comment: "new house".to_string(),
        location: location("samarkand", soato),
        ..DraftSubmission::default()
    }
}

/// Services wired on in-memory collaborators, with handles kept for assertions.
pub(super) struct Harness {
    pub(super) store: Arc<InMemoryRegistryStore>,
    pub(super) catalog: Arc<InMemoryPropertyCatalog>,
    pub(super) history: Arc<InMemoryActionHistory>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) entities: Arc<EntityService<InMemoryRegistryStore>>,
    pub(super) drafts: Arc<DraftService<InMemoryRegistryStore, InMemoryRegistryStore>>,
    pub(super) area: PropertyId,
    context: Arc<RegistryContext>,
    applicants: Arc<InMemoryApplicantDirectory>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let store = Arc::new(InMemoryRegistryStore::default());
        Self::build(store.clone(), store, None)
    }

    /// Harness whose numbering goes through `sequences` instead of the store.
    pub(super) fn with_sequences<S, F>(sequences: F) -> Self
    where
        S: SequenceStore + 'static,
        F: FnOnce(Arc<InMemoryRegistryStore>) -> S,
    {
        let store = Arc::new(InMemoryRegistryStore::default());
        let sequences = Arc::new(sequences(store.clone()));
        Self::build(store, sequences, None)
    }

    pub(super) fn with_recorder(recorder: Arc<dyn ActionHistoryRecorder>) -> Self {
        let store = Arc::new(InMemoryRegistryStore::default());
        Self::build(store.clone(), store, Some(recorder))
    }

    /// Services over the same store whose next fetch runs `step` right after reading.
    pub(super) fn interleaved<F>(&self, step: F) -> Interleaved
    where
        F: FnOnce(&InMemoryRegistryStore) + Send + 'static,
    {
        let store = Arc::new(InterleavingStore {
            inner: self.store.clone(),
            pending: Mutex::new(Some(Box::new(step))),
        });
        Interleaved {
            entities: EntityService::new(store.clone(), self.context.clone()),
            drafts: DraftService::new(
                store.clone(),
                store,
                self.applicants.clone(),
                self.context.clone(),
            ),
        }
    }

    pub(super) fn router(&self) -> Router {
        registry_router(Arc::new(RegistryState {
            entities: (*self.entities).clone(),
            drafts: (*self.drafts).clone(),
        }))
    }

    fn build(
        store: Arc<InMemoryRegistryStore>,
        sequences: Arc<dyn SequenceStore>,
        recorder: Option<Arc<dyn ActionHistoryRecorder>>,
    ) -> Self {
        let catalog = Arc::new(InMemoryPropertyCatalog::default());
        let area = PropertyId::generate();
        catalog
            .insert_property(property(area, "area"))
            .expect("seed property");

        let applicants = Arc::new(InMemoryApplicantDirectory::default());
        applicants
            .register(Applicant {
                user_id: crate::caller::UserId::new(APPLICANT_ID),
                first_name: "Aziz".to_string(),
                last_name: "Karimov".to_string(),
                middle_name: String::new(),
                full_name: String::new(),
                phone_number: "+998901234567".to_string(),
            })
            .expect("seed applicant");
        applicants
            .register(Applicant {
                user_id: crate::caller::UserId::new("citizen-2"),
                first_name: "Dilnoza".to_string(),
                last_name: "Rashidova".to_string(),
                middle_name: String::new(),
                full_name: String::new(),
                phone_number: "+998907654321".to_string(),
            })
            .expect("seed applicant");

        let history = Arc::new(InMemoryActionHistory::default());
        let recorder: Arc<dyn ActionHistoryRecorder> = match recorder {
            Some(recorder) => recorder,
            None => history.clone(),
        };
        let clock = Arc::new(ManualClock::at(start()));

        let context = Arc::new(RegistryContext::new(
            catalog.clone(),
            workflow(),
            sequences,
            AuditTrail::new(recorder),
            clock.clone(),
            RegistryConfig::default(),
        ));

        let entities = Arc::new(EntityService::new(store.clone(), context.clone()));
        let drafts = Arc::new(DraftService::new(
            store.clone(),
            store.clone(),
            applicants.clone(),
            context.clone(),
        ));

        Self {
            store,
            catalog,
            history,
            clock,
            entities,
            drafts,
            area,
            context,
            applicants,
        }
    }
}

/// Counter that hands out a scripted series of values before deferring to the store.
pub(super) struct ScriptedSequences {
    pub(super) inner: Arc<InMemoryRegistryStore>,
    pub(super) script: Mutex<Vec<u64>>,
}

impl ScriptedSequences {
    pub(super) fn new(inner: Arc<InMemoryRegistryStore>, script: Vec<u64>) -> Self {
        Self {
            inner,
            script: Mutex::new(script),
        }
    }
}

impl SequenceStore for ScriptedSequences {
    fn next_value(&self, scope: SequenceScope) -> Result<u64, RepositoryError> {
        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            return self.inner.next_value(scope);
        }
        Ok(script.remove(0))
    }
}

/// Counter stuck on one value.
pub(super) struct FrozenSequences(pub(super) u64);

impl SequenceStore for FrozenSequences {
    fn next_value(&self, _scope: SequenceScope) -> Result<u64, RepositoryError> {
        Ok(self.0)
    }
}

pub(super) struct FailingHistory;

impl ActionHistoryRecorder for FailingHistory {
    fn record(&self, _entry: ActionHistory) -> Result<(), AuditError> {
        Err(AuditError::Transport("history collection offline".to_string()))
    }
}

type Step = Box<dyn FnOnce(&InMemoryRegistryStore) + Send>;

/// Store wrapper that lets another writer slip in between a read and the write
/// that follows it.
pub(super) struct InterleavingStore {
    inner: Arc<InMemoryRegistryStore>,
    pending: Mutex<Option<Step>>,
}

impl InterleavingStore {
    fn run_pending(&self) {
        let step = self.pending.lock().expect("step lock").take();
        if let Some(step) = step {
            step(&self.inner);
        }
    }
}

pub(super) struct Interleaved {
    pub(super) entities: EntityService<InterleavingStore>,
    pub(super) drafts: DraftService<InterleavingStore, InterleavingStore>,
}

impl EntityRepository for InterleavingStore {
    fn insert(&self, record: EntityRecord) -> Result<EntityRecord, RepositoryError> {
        EntityRepository::insert(self.inner.as_ref(), record)
    }

    fn replace(
        &self,
        expected: &EntityRecord,
        record: EntityRecord,
    ) -> Result<EntityRecord, RepositoryError> {
        EntityRepository::replace(self.inner.as_ref(), expected, record)
    }

    fn fetch(&self, id: &EntityId) -> Result<Option<EntityRecord>, RepositoryError> {
        let record = EntityRepository::fetch(self.inner.as_ref(), id);
        self.run_pending();
        record
    }

    fn transition_status(
        &self,
        id: &EntityId,
        expected: Option<&StatusId>,
        status: StatusId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        self.inner.transition_status(id, expected, status, at)
    }

    fn attach_draft(
        &self,
        id: &EntityId,
        draft: DraftId,
        at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        self.inner.attach_draft(id, draft, at)
    }

    fn mark_deleted(&self, id: &EntityId, at: DateTime<Utc>) -> Result<EntityRecord, RepositoryError> {
        EntityRepository::mark_deleted(self.inner.as_ref(), id, at)
    }

    fn remove(&self, id: &EntityId) -> Result<(), RepositoryError> {
        EntityRepository::remove(self.inner.as_ref(), id)
    }

    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<EntityRecord>, RepositoryError> {
        EntityRepository::list(self.inner.as_ref(), filter, page)
    }
}

impl DraftRepository for InterleavingStore {
    fn insert(&self, record: DraftRecord) -> Result<DraftRecord, RepositoryError> {
        DraftRepository::insert(self.inner.as_ref(), record)
    }

    fn replace(
        &self,
        expected: &DraftRecord,
        record: DraftRecord,
    ) -> Result<DraftRecord, RepositoryError> {
        DraftRepository::replace(self.inner.as_ref(), expected, record)
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        let record = DraftRepository::fetch(self.inner.as_ref(), id);
        self.run_pending();
        record
    }

    fn confirm(
        &self,
        id: &DraftId,
        confirmation: ConfirmedDraft,
        at: DateTime<Utc>,
    ) -> Result<DraftRecord, RepositoryError> {
        self.inner.confirm(id, confirmation, at)
    }

    fn mark_deleted(&self, id: &DraftId, at: DateTime<Utc>) -> Result<DraftRecord, RepositoryError> {
        DraftRepository::mark_deleted(self.inner.as_ref(), id, at)
    }

    fn remove(&self, id: &DraftId) -> Result<(), RepositoryError> {
        DraftRepository::remove(self.inner.as_ref(), id)
    }

    fn list(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<DraftRecord>, RepositoryError> {
        DraftRepository::list(self.inner.as_ref(), filter, page)
    }

    fn expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.expired(cutoff, limit)
    }
}

pub(super) struct UnavailableRegistry;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl EntityRepository for UnavailableRegistry {
    fn insert(&self, _record: EntityRecord) -> Result<EntityRecord, RepositoryError> {
        offline()
    }

    fn replace(
        &self,
        _expected: &EntityRecord,
        _record: EntityRecord,
    ) -> Result<EntityRecord, RepositoryError> {
        offline()
    }

    fn fetch(&self, _id: &EntityId) -> Result<Option<EntityRecord>, RepositoryError> {
        offline()
    }

    fn transition_status(
        &self,
        _id: &EntityId,
        _expected: Option<&StatusId>,
        _status: StatusId,
        _at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        offline()
    }

    fn attach_draft(
        &self,
        _id: &EntityId,
        _draft: DraftId,
        _at: DateTime<Utc>,
    ) -> Result<EntityRecord, RepositoryError> {
        offline()
    }

    fn mark_deleted(&self, _id: &EntityId, _at: DateTime<Utc>) -> Result<EntityRecord, RepositoryError> {
        offline()
    }

    fn remove(&self, _id: &EntityId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list(
        &self,
        _filter: &RecordFilter,
        _page: PageRequest,
    ) -> Result<Page<EntityRecord>, RepositoryError> {
        offline()
    }
}

impl DraftRepository for UnavailableRegistry {
    fn insert(&self, _record: DraftRecord) -> Result<DraftRecord, RepositoryError> {
        offline()
    }

    fn replace(
        &self,
        _expected: &DraftRecord,
        _record: DraftRecord,
    ) -> Result<DraftRecord, RepositoryError> {
        offline()
    }

    fn fetch(&self, _id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        offline()
    }

    fn confirm(
        &self,
        _id: &DraftId,
        _confirmation: ConfirmedDraft,
        _at: DateTime<Utc>,
    ) -> Result<DraftRecord, RepositoryError> {
        offline()
    }

    fn mark_deleted(&self, _id: &DraftId, _at: DateTime<Utc>) -> Result<DraftRecord, RepositoryError> {
        offline()
    }

    fn remove(&self, _id: &DraftId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list(
        &self,
        _filter: &RecordFilter,
        _page: PageRequest,
    ) -> Result<Page<DraftRecord>, RepositoryError> {
        offline()
    }

    fn expired(
        &self,
        _cutoff: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        offline()
    }
}

/// Router whose repositories are all offline.
pub(super) fn unavailable_router() -> Router {
    let context = Arc::new(RegistryContext::new(
        Arc::new(InMemoryPropertyCatalog::default()),
        workflow(),
        Arc::new(InMemoryRegistryStore::default()),
        AuditTrail::new(Arc::new(InMemoryActionHistory::default())),
        Arc::new(ManualClock::at(start())),
        RegistryConfig::default(),
    ));
    let offline = Arc::new(UnavailableRegistry);

    registry_router(Arc::new(RegistryState {
        entities: EntityService::new(offline.clone(), context.clone()),
        drafts: DraftService::new(
            offline.clone(),
            offline,
            Arc::new(InMemoryApplicantDirectory::default()),
            context,
        ),
    }))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
