use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::domain::{GroupInput, PropertyInput};
use super::repository::PropertyCatalog;
use super::service::{CatalogError, CatalogService};
use crate::caller::Caller;
use crate::error::{error_response, ErrorKind};
use crate::ids::{GroupId, PropertyId, StatusId};
use crate::pagination::PageRequest;

/// Router exposing property and group administration.
pub fn catalog_router<C>(service: Arc<CatalogService<C>>) -> Router
where
    C: PropertyCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            get(list_properties_handler::<C>).post(create_property_handler::<C>),
        )
        .route(
            "/api/v1/properties/:property_id",
            get(get_property_handler::<C>).put(update_property_handler::<C>),
        )
        .route(
            "/api/v1/group-properties",
            get(list_groups_handler::<C>).post(create_group_handler::<C>),
        )
        .route(
            "/api/v1/group-properties/:group_id",
            get(get_group_handler::<C>)
                .put(update_group_handler::<C>)
                .delete(delete_group_handler::<C>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct PropertyListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    pub group_type: Option<u32>,
    pub step: Option<u32>,
    pub status_id: Option<String>,
}

fn failure(error: CatalogError) -> Response {
    if error.kind() == ErrorKind::Internal {
        tracing::warn!(%error, "catalog request failed");
    }
    error_response(error.kind(), error.to_string())
}

fn staff_only(caller: &Caller) -> Result<(), Response> {
    if caller.is_staff() {
        Ok(())
    } else {
        Err(error_response(
            ErrorKind::Forbidden,
            "only staff may change the property catalog".to_string(),
        ))
    }
}

pub(crate) async fn create_property_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    caller: Caller,
    Json(input): Json<PropertyInput>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    if let Err(response) = staff_only(&caller) {
        return response;
    }
    match service.create_property(input) {
        Ok(property) => (StatusCode::CREATED, Json(property)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn list_properties_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    _caller: Caller,
    Query(query): Query<PropertyListQuery>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    let page = match PageRequest::from_optional(query.page, query.limit) {
        Ok(page) => page,
        Err(error) => return failure(error.into()),
    };
    match service.list_properties(query.search.as_deref(), page) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn get_property_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    _caller: Caller,
    Path(property_id): Path<String>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    let result = PropertyId::parse(&property_id)
        .map_err(CatalogError::from)
        .and_then(|id| service.property(id));
    match result {
        Ok(property) => (StatusCode::OK, Json(property)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_property_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    caller: Caller,
    Path(property_id): Path<String>,
    Json(input): Json<PropertyInput>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    if let Err(response) = staff_only(&caller) {
        return response;
    }
    let result = PropertyId::parse(&property_id)
        .map_err(CatalogError::from)
        .and_then(|id| service.update_property(id, input));
    match result {
        Ok(property) => (StatusCode::OK, Json(property)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn create_group_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    caller: Caller,
    Json(input): Json<GroupInput>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    if let Err(response) = staff_only(&caller) {
        return response;
    }
    match service.create_group(input) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn list_groups_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    _caller: Caller,
    Query(query): Query<GroupListQuery>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    let result = match query.status_id.as_deref() {
        Some(raw) => StatusId::parse(raw)
            .map_err(CatalogError::from)
            .and_then(|status| service.groups_for_status(&status, query.group_type)),
        None => service.groups(query.group_type, query.step),
    };
    match result {
        Ok(groups) => (StatusCode::OK, Json(groups)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn get_group_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    _caller: Caller,
    Path(group_id): Path<String>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    let result = GroupId::parse(&group_id)
        .map_err(CatalogError::from)
        .and_then(|id| service.group(id));
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_group_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    caller: Caller,
    Path(group_id): Path<String>,
    Json(input): Json<GroupInput>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    if let Err(response) = staff_only(&caller) {
        return response;
    }
    let result = GroupId::parse(&group_id)
        .map_err(CatalogError::from)
        .and_then(|id| service.update_group(id, input));
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_group_handler<C>(
    State(service): State<Arc<CatalogService<C>>>,
    caller: Caller,
    Path(group_id): Path<String>,
) -> Response
where
    C: PropertyCatalog + 'static,
{
    if let Err(response) = staff_only(&caller) {
        return response;
    }
    let result = GroupId::parse(&group_id)
        .map_err(CatalogError::from)
        .and_then(|id| service.delete_group(id));
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}
