use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{DraftConfirmation, DraftSubmission, EntitySubmission, StatusChange};
use super::query::ListQuery;
use super::repository::{DraftRepository, EntityRepository};
use super::service::{DraftService, EntityService, ServiceError};
use crate::caller::Caller;
use crate::error::{error_response, ErrorKind};

/// Services backing the registry routes.
pub struct RegistryState<E, D> {
    pub entities: EntityService<E>,
    pub drafts: DraftService<D, E>,
}

/// Router exposing entity and draft endpoints.
pub fn registry_router<E, D>(state: Arc<RegistryState<E, D>>) -> Router
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/entities",
            get(list_entities_handler::<E, D>).post(create_entity_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-properties",
            get(list_entity_properties_handler::<E, D>),
        )
        .route(
            "/api/v1/entities/:entity_id",
            get(get_entity_handler::<E, D>)
                .put(update_entity_handler::<E, D>)
                .delete(delete_entity_handler::<E, D>),
        )
        .route(
            "/api/v1/entities/:entity_id/permanent",
            axum::routing::delete(delete_entity_permanently_handler::<E, D>),
        )
        .route(
            "/api/v1/entities/:entity_id/status",
            put(update_entity_status_handler::<E, D>),
        )
        .route(
            "/api/v1/entities/:entity_id/parent-status",
            put(advance_entity_status_handler::<E, D>),
        )
        .route(
            "/api/v1/entities/:entity_id/drafts/:draft_id",
            put(attach_draft_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-drafts",
            get(list_drafts_handler::<E, D>).post(create_draft_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-drafts-expired",
            get(expired_drafts_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-drafts/:draft_id",
            get(get_draft_handler::<E, D>)
                .put(update_draft_handler::<E, D>)
                .delete(delete_draft_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-drafts/:draft_id/confirm",
            put(confirm_draft_handler::<E, D>),
        )
        .route(
            "/api/v1/entity-drafts/:draft_id/permanent",
            axum::routing::delete(delete_draft_permanently_handler::<E, D>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpiredQuery {
    pub limit: Option<usize>,
}

fn failure(error: ServiceError) -> Response {
    match error.kind() {
        ErrorKind::Internal | ErrorKind::Conflict => {
            tracing::warn!(%error, "registry request failed");
        }
        _ => tracing::debug!(%error, "registry request rejected"),
    }
    error_response(error.kind(), error.to_string())
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => failure(error),
    }
}

fn respond_empty(result: Result<(), ServiceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

type Shared<E, D> = State<Arc<RegistryState<E, D>>>;

pub(crate) async fn create_entity_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Json(submission): Json<EntitySubmission>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        state.entities.create(&caller, submission),
    )
}

pub(crate) async fn list_entities_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.entities.list(&caller, &query))
}

pub(crate) async fn list_entity_properties_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state.entities.list_with_properties(&caller, &query),
    )
}

pub(crate) async fn get_entity_handler<E, D>(
    State(state): Shared<E, D>,
    _caller: Caller,
    Path(entity_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.entities.get(&entity_id))
}

pub(crate) async fn update_entity_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(entity_id): Path<String>,
    Json(submission): Json<EntitySubmission>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state.entities.update(&caller, &entity_id, submission),
    )
}

pub(crate) async fn delete_entity_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.entities.delete(&caller, &entity_id))
}

pub(crate) async fn delete_entity_permanently_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond_empty(state.entities.delete_permanently(&caller, &entity_id))
}

pub(crate) async fn update_entity_status_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(entity_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state
            .entities
            .update_status(&caller, &entity_id, &change.status_id),
    )
}

pub(crate) async fn advance_entity_status_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(entity_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state
            .entities
            .advance_status(&caller, &entity_id, &change.status_id),
    )
}

pub(crate) async fn attach_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path((entity_id, draft_id)): Path<(String, String)>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state.entities.attach_draft(&caller, &entity_id, &draft_id),
    )
}

pub(crate) async fn create_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Json(submission): Json<DraftSubmission>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::CREATED, state.drafts.create(&caller, submission))
}

pub(crate) async fn list_drafts_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.drafts.list(&caller, &query))
}

pub(crate) async fn expired_drafts_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Query(query): Query<ExpiredQuery>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.drafts.expired(&caller, query.limit))
}

pub(crate) async fn get_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(draft_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.drafts.get(&caller, &draft_id))
}

pub(crate) async fn update_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(draft_id): Path<String>,
    Json(submission): Json<DraftSubmission>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state.drafts.update(&caller, &draft_id, submission),
    )
}

pub(crate) async fn confirm_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(draft_id): Path<String>,
    Json(confirmation): Json<DraftConfirmation>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(
        StatusCode::OK,
        state.drafts.confirm(&caller, &draft_id, confirmation),
    )
}

pub(crate) async fn delete_draft_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(draft_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond(StatusCode::OK, state.drafts.delete(&caller, &draft_id))
}

pub(crate) async fn delete_draft_permanently_handler<E, D>(
    State(state): Shared<E, D>,
    caller: Caller,
    Path(draft_id): Path<String>,
) -> Response
where
    E: EntityRepository + 'static,
    D: DraftRepository + 'static,
{
    respond_empty(state.drafts.delete_permanently(&caller, &draft_id))
}
