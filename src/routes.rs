use crate::record::Record;
use crate::registry::{self, CollectionDef};
use crate::rest::{AppJson, ErrorBody, RequestState};
use crate::AppError;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct Ack {
    pub ok: bool,
}

#[derive(Serialize, ToSchema)]
pub struct BulkAck {
    pub ok: bool,
    pub count: usize,
}

/// Bulk imports accept either a raw array or a `{"rows": [...]}` wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum BulkBody {
    Wrapped { rows: Vec<Record> },
    Rows(Vec<Record>),
}

impl BulkBody {
    fn into_rows(self) -> Vec<Record> {
        match self {
            BulkBody::Wrapped { rows } => rows,
            BulkBody::Rows(rows) => rows,
        }
    }
}

/// The route layer resolves client-supplied collection names fallibly; only
/// internal callers go through `registry::must`.
fn resolve(collection: &str) -> Result<&'static CollectionDef, AppError> {
    registry::find(collection).ok_or_else(|| AppError::NotFound(format!("collection {}", collection)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = OK, body = Ack)),
    tag = "system"
)]
pub async fn health() -> AppJson<Ack> {
    AppJson(Ack { ok: true })
}

#[utoipa::path(
    get,
    path = "/api/{collection}",
    params(
        ("collection" = String, Path, description = "Registered collection key"),
        ("sort" = Option<String>, Query, description = "Sort field, `-` prefix for descending; all other query params are equality filters"),
    ),
    responses(
        (status = OK, body = Vec<Object>),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    tag = "entities"
)]
pub async fn list_records(
    State(state): State<RequestState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<AppJson<Vec<Record>>, AppError> {
    let def = resolve(&collection)?;
    Ok(AppJson(state.entities.list(def, &params)?))
}

#[utoipa::path(
    post,
    path = "/api/{collection}",
    params(("collection" = String, Path, description = "Registered collection key")),
    request_body = Object,
    responses(
        (status = OK, body = Object),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    tag = "entities"
)]
pub async fn create_record(
    State(state): State<RequestState>,
    Path(collection): Path<String>,
    AppJson(payload): AppJson<Record>,
) -> Result<AppJson<Record>, AppError> {
    let def = resolve(&collection)?;
    Ok(AppJson(state.entities.create(def, payload)?))
}

#[utoipa::path(
    put,
    path = "/api/{collection}/{id}",
    params(
        ("collection" = String, Path, description = "Registered collection key"),
        ("id" = String, Path, description = "Primary key"),
    ),
    request_body = Object,
    responses(
        (status = OK, body = Object),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    tag = "entities"
)]
pub async fn update_record(
    State(state): State<RequestState>,
    Path((collection, id)): Path<(String, String)>,
    AppJson(payload): AppJson<Record>,
) -> Result<AppJson<Record>, AppError> {
    let def = resolve(&collection)?;
    Ok(AppJson(state.entities.update(def, &id, payload)?))
}

#[utoipa::path(
    delete,
    path = "/api/{collection}/{id}",
    params(
        ("collection" = String, Path, description = "Registered collection key"),
        ("id" = String, Path, description = "Primary key"),
    ),
    responses(
        (status = OK, body = Ack),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    tag = "entities"
)]
pub async fn delete_record(
    State(state): State<RequestState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<AppJson<Ack>, AppError> {
    let def = resolve(&collection)?;
    state.entities.delete(def, &id)?;
    Ok(AppJson(Ack { ok: true }))
}

#[utoipa::path(
    post,
    path = "/api/{collection}/bulk",
    params(("collection" = String, Path, description = "Registered collection key")),
    request_body = Object,
    responses(
        (status = OK, body = BulkAck),
        (status = NOT_FOUND, body = ErrorBody),
    ),
    tag = "entities"
)]
pub async fn bulk_upsert_records(
    State(state): State<RequestState>,
    Path(collection): Path<String>,
    AppJson(body): AppJson<BulkBody>,
) -> Result<AppJson<BulkAck>, AppError> {
    let def = resolve(&collection)?;
    let count = state.entities.bulk_upsert(def, body.into_rows())?;
    Ok(AppJson(BulkAck { ok: true, count }))
}
