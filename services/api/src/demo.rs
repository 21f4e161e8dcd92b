use crate::infra::{sample_reference, seed, wire, Wiring, DEMO_APPLICANT};
use clap::Args;
use espace::caller::Caller;
use espace::config::RegistryConfig;
use espace::error::AppError;
use espace::geography::{
    CityId, DistrictId, GeographyImporter, LocationSnapshot, ReferenceStore, RegionId, Soato,
};
use espace::registry::{
    DraftConfirmation, DraftSubmission, EntitySubmission, ListQuery, PropertyValueInput,
    ServiceError,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of entities to register before the draft is confirmed
    #[arg(long, default_value_t = 3)]
    pub(crate) entities: usize,
    /// City the demo records are located in
    #[arg(long, default_value = "samarqand")]
    pub(crate) city: String,
    /// Region the demo records are located in
    #[arg(long, default_value = "urgut")]
    pub(crate) region: String,
    /// District the demo records are located in
    #[arg(long, default_value = "kamangaron")]
    pub(crate) district: String,
    /// Directory holding cities.csv, regions.csv and districts.csv
    #[arg(long)]
    pub(crate) geography_dir: Option<PathBuf>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            entities: 3,
            city: "samarqand".to_string(),
            region: "urgut".to_string(),
            district: "kamangaron".to_string(),
            geography_dir: None,
        }
    }
}

/// Walk one application through intake, registration and the status chain,
/// printing each step.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let reference: Box<dyn ReferenceStore> = match &args.geography_dir {
        Some(dir) => Box::new(GeographyImporter::from_dir(dir)?),
        None => Box::new(sample_reference()),
    };
    let location = match LocationSnapshot::resolve(
        reference.as_ref(),
        &CityId::new(args.city.as_str()),
        &RegionId::new(args.region.as_str()),
        &DistrictId::new(args.district.as_str()),
    ) {
        Ok(location) => location,
        Err(err) => {
            println!("Location unavailable: {}", err);
            return Ok(());
        }
    };
    let soato = location.region_code();

    let wiring = wire(RegistryConfig::default());
    let seeded = seed(&wiring)?;
    let staff = Caller::staff("staff-demo", "registrar", soato);
    let applicant = Caller::applicant(DEMO_APPLICANT, "aziz");

    println!("Cadastre registration demo");
    println!(
        "Location: {} / {} / {} (soato {})",
        location.city.name, location.region.name, location.district.name, soato
    );

    let draft = wiring.registry.drafts.create(
        &applicant,
        DraftSubmission {
            comment: "Please register my plot".to_string(),
            location: location.clone(),
            properties: vec![PropertyValueInput {
                property_id: seeded.plot_area.to_string(),
                value: "600".to_string(),
            }],
            gallery: Vec::new(),
        },
    )?;
    println!(
        "\nDraft {} submitted by {}",
        draft.entity_draft_number, draft.applicant.full_name
    );

    let mut registered = Vec::with_capacity(args.entities);
    for index in 0..args.entities.max(1) {
        let entity = wiring.registry.entities.create(
            &staff,
            EntitySubmission {
                entity_type_code: 1,
                address: format!("{} {}", location.district.name, index + 1),
                location: location.clone(),
                properties: vec![
                    PropertyValueInput {
                        property_id: seeded.plot_area.to_string(),
                        value: (600 + index * 25).to_string(),
                    },
                    PropertyValueInput {
                        property_id: seeded.land_use.to_string(),
                        value: "residential".to_string(),
                    },
                ],
                ..EntitySubmission::default()
            },
        )?;
        println!("Entity {} registered at {}", entity.entity_number, entity.address);
        registered.push(entity);
    }

    let target = &registered[0];
    let confirmed = wiring.registry.drafts.confirm(
        &staff,
        &draft.id.to_string(),
        DraftConfirmation {
            status_id: target.status.to_string(),
            entity_id: Some(target.id.to_string()),
            comment: "Matches the field survey".to_string(),
        },
    )?;
    wiring
        .registry
        .entities
        .attach_draft(&staff, &target.id.to_string(), &confirmed.id.to_string())?;
    println!(
        "\nDraft {} confirmed and attached to {}",
        confirmed.entity_draft_number, target.entity_number
    );

    println!("\nStatus progression for {}", target.entity_number);
    let mut current = target.status;
    loop {
        match wiring.registry.entities.advance_status(
            &staff,
            &target.id.to_string(),
            &current.to_string(),
        ) {
            Ok(entity) => {
                println!("  {} -> {}", current, entity.status);
                current = entity.status;
            }
            Err(ServiceError::Workflow(err)) => {
                println!("  Final status reached ({})", err);
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    render_listing(&wiring, &staff, soato)?;

    println!("\nAction history");
    for entry in wiring.history.entries().map_err(ServiceError::from)? {
        println!(
            "  {} {} {} by {}",
            entry.recorded_at.format("%H:%M:%S"),
            entry.entity_name,
            entry.action,
            entry.user_id
        );
    }
    Ok(())
}

fn render_listing(
    wiring: &Wiring,
    staff: &Caller,
    soato: Soato,
) -> Result<(), ServiceError> {
    let page = wiring
        .registry
        .entities
        .list_with_properties(staff, &ListQuery::default())?;
    println!("\nEntities in region {} ({} total)", soato, page.count);
    for entity in page.items {
        let properties: Vec<String> = entity
            .entity_properties
            .iter()
            .map(|property| format!("{}={}", property.label, property.value))
            .collect();
        println!(
            "  {} v{} status {} [{}]",
            entity.entity_number,
            entity.version,
            entity.status,
            properties.join(", ")
        );
    }
    Ok(())
}
