use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{CityId, DistrictId, LocationSnapshot, ReferenceStore, RegionId, ResolveError};
use crate::error::{error_response, ErrorKind};
use crate::storage::RepositoryError;

type Reference = State<Arc<dyn ReferenceStore>>;

/// Read-only lookups over the reference tables, used by forms to build locations.
pub fn geography_router(store: Arc<dyn ReferenceStore>) -> Router {
    Router::new()
        .route("/api/v1/cities", get(list_cities_handler))
        .route("/api/v1/cities/:city_id/regions", get(list_regions_handler))
        .route(
            "/api/v1/regions/:region_id/districts",
            get(list_districts_handler),
        )
        .route("/api/v1/locations", get(resolve_location_handler))
        .with_state(store)
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub city_id: String,
    pub region_id: String,
    pub district_id: String,
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::UnknownCity(_)
            | ResolveError::UnknownRegion(_)
            | ResolveError::UnknownDistrict(_) => ErrorKind::NotFound,
            ResolveError::RegionOutsideCity { .. } | ResolveError::DistrictOutsideRegion { .. } => {
                ErrorKind::Validation
            }
            ResolveError::Repository(_) => ErrorKind::Internal,
        }
    }
}

fn unavailable(error: RepositoryError) -> Response {
    tracing::warn!(%error, "reference lookup failed");
    error_response(ErrorKind::Internal, error.to_string())
}

async fn list_cities_handler(State(store): Reference) -> Response {
    match store.cities() {
        Ok(cities) => (StatusCode::OK, Json(cities)).into_response(),
        Err(error) => unavailable(error),
    }
}

async fn list_regions_handler(State(store): Reference, Path(city_id): Path<String>) -> Response {
    match store.regions_in_city(&CityId::new(city_id)) {
        Ok(regions) => (StatusCode::OK, Json(regions)).into_response(),
        Err(error) => unavailable(error),
    }
}

async fn list_districts_handler(
    State(store): Reference,
    Path(region_id): Path<String>,
) -> Response {
    match store.districts_in_region(&RegionId::new(region_id)) {
        Ok(districts) => (StatusCode::OK, Json(districts)).into_response(),
        Err(error) => unavailable(error),
    }
}

async fn resolve_location_handler(
    State(store): Reference,
    Query(query): Query<LocationQuery>,
) -> Response {
    let resolved = LocationSnapshot::resolve(
        store.as_ref(),
        &CityId::new(query.city_id),
        &RegionId::new(query.region_id),
        &DistrictId::new(query.district_id),
    );
    match resolved {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(error) => {
            if error.kind() == ErrorKind::Internal {
                tracing::warn!(%error, "location lookup failed");
            }
            error_response(error.kind(), error.to_string())
        }
    }
}
