use espace::caller::UserId;
use espace::catalog::{
    CatalogError, CatalogService, InMemoryPropertyCatalog, PropertyInput, PropertyKind,
    PropertyOption,
};
use espace::clock::SystemClock;
use espace::config::RegistryConfig;
use espace::geography::{
    City, CityId, District, DistrictId, InMemoryReferenceStore, Region, RegionId, Soato,
};
use espace::ids::{PropertyId, StatusId};
use espace::registry::{
    Applicant, AuditTrail, DraftService, EntityService, InMemoryActionHistory,
    InMemoryApplicantDirectory, InMemoryRegistryStore, InitialStatuses, LinearStatusChain,
    RegistryContext, RegistryState, Status, StatusWorkflow,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Registry = RegistryState<InMemoryRegistryStore, InMemoryRegistryStore>;

pub(crate) const RECEIVED: StatusId = StatusId(Uuid::from_u128(0x0101));
pub(crate) const SURVEYED: StatusId = StatusId(Uuid::from_u128(0x0102));
pub(crate) const VERIFIED: StatusId = StatusId(Uuid::from_u128(0x0103));
pub(crate) const REGISTERED: StatusId = StatusId(Uuid::from_u128(0x0104));
pub(crate) const SUBMITTED: StatusId = StatusId(Uuid::from_u128(0x0201));

pub(crate) const DEMO_APPLICANT: &str = "applicant-demo";

/// Registration steps in the order the parent-status workflow walks them.
pub(crate) fn default_status_chain() -> LinearStatusChain {
    LinearStatusChain::new(
        vec![
            Status::new(RECEIVED, "received"),
            Status::new(SURVEYED, "surveyed"),
            Status::new(VERIFIED, "verified"),
            Status::new(REGISTERED, "registered"),
        ],
        Status::new(SUBMITTED, "submitted"),
    )
}

/// Type-two entities skip the intake step.
pub(crate) fn default_initial_statuses() -> InitialStatuses {
    InitialStatuses {
        entity_type_one: RECEIVED,
        entity_type_two: SURVEYED,
    }
}

/// Reference tables used when no geography directory is configured.
pub(crate) fn sample_reference() -> InMemoryReferenceStore {
    InMemoryReferenceStore::default()
        .with_city(City {
            id: CityId::new("samarqand"),
            name: "Samarqand".to_string(),
            ru_name: "Самарканд".to_string(),
            code: 17,
            soato: Soato(17),
        })
        .with_region(Region {
            id: RegionId::new("urgut"),
            city_id: CityId::new("samarqand"),
            name: "Urgut".to_string(),
            ru_name: "Ургут".to_string(),
            code: 3,
            external_id: 173,
            soato: Soato(1703),
        })
        .with_district(District {
            id: DistrictId::new("kamangaron"),
            city_id: CityId::new("samarqand"),
            region_id: RegionId::new("urgut"),
            name: "Kamangaron".to_string(),
            ru_name: "Камангаран".to_string(),
            code: 1,
            external_id: 1701,
            soato: Soato(1703),
        })
        .with_district(District {
            id: DistrictId::new("qoratepa"),
            city_id: CityId::new("samarqand"),
            region_id: RegionId::new("urgut"),
            name: "Qoratepa".to_string(),
            ru_name: "Каратепа".to_string(),
            code: 2,
            external_id: 1702,
            soato: Soato(1703),
        })
}

/// In-memory adapters wired into the catalog and registry services.
pub(crate) struct Wiring {
    pub(crate) catalog: Arc<CatalogService<InMemoryPropertyCatalog>>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) store: Arc<InMemoryRegistryStore>,
    pub(crate) history: Arc<InMemoryActionHistory>,
    pub(crate) applicants: Arc<InMemoryApplicantDirectory>,
}

pub(crate) fn wire(settings: RegistryConfig) -> Wiring {
    let clock = Arc::new(SystemClock);
    let properties = Arc::new(InMemoryPropertyCatalog::default());
    let catalog = Arc::new(CatalogService::new(properties.clone(), clock.clone()));

    let store = Arc::new(InMemoryRegistryStore::default());
    let history = Arc::new(InMemoryActionHistory::default());
    let applicants = Arc::new(InMemoryApplicantDirectory::default());
    let workflow = StatusWorkflow::new(
        Arc::new(default_status_chain()),
        default_initial_statuses(),
    );

    let context = Arc::new(RegistryContext::new(
        properties,
        workflow,
        store.clone(),
        AuditTrail::new(history.clone()),
        clock,
        settings,
    ));
    let registry = Arc::new(RegistryState {
        entities: EntityService::new(store.clone(), context.clone()),
        drafts: DraftService::new(store.clone(), store.clone(), applicants.clone(), context),
    });

    Wiring {
        catalog,
        registry,
        store,
        history,
        applicants,
    }
}

/// Properties created by [`seed`], in form order.
#[derive(Debug, Clone)]
pub(crate) struct SeededProperties {
    pub(crate) plot_area: PropertyId,
    pub(crate) land_use: PropertyId,
}

fn property(name: &str, label: &str, kind: PropertyKind) -> PropertyInput {
    PropertyInput {
        name: name.to_string(),
        label: label.to_string(),
        placeholder: String::new(),
        kind,
        validation: String::new(),
        description: String::new(),
        collection_name: String::new(),
        active: true,
        is_required: true,
        with_confirmation: false,
        options: Vec::new(),
    }
}

/// Seed a minimal property catalog and one applicant so a fresh instance is usable.
pub(crate) fn seed(wiring: &Wiring) -> Result<SeededProperties, CatalogError> {
    let plot_area = wiring
        .catalog
        .create_property(property("plot_area", "Plot area, m2", PropertyKind::Number))?
        .id;

    let mut land_use = property("land_use", "Land use", PropertyKind::Select);
    land_use.options = vec![
        PropertyOption {
            name: "Residential".to_string(),
            value: "residential".to_string(),
        },
        PropertyOption {
            name: "Farming".to_string(),
            value: "farming".to_string(),
        },
    ];
    let land_use = wiring.catalog.create_property(land_use)?.id;

    wiring.applicants.register(Applicant {
        user_id: UserId::new(DEMO_APPLICANT),
        first_name: "Aziz".to_string(),
        last_name: "Karimov".to_string(),
        middle_name: String::new(),
        full_name: String::new(),
        phone_number: "+998901234567".to_string(),
    })?;

    Ok(SeededProperties {
        plot_area,
        land_use,
    })
}
