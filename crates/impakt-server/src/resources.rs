//! Generic REST routes for every entity.
//!
//! [`resource_router`] derives the routes of one entity from its schema:
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /{resource}` | create, `201` with the stored row |
//! | `GET /{resource}` | every row, by primary key |
//! | `GET /{resource}/find?field=value…` | first row matching every predicate |
//! | `GET /{resource}/{pk…}` | one row by primary key |
//! | `PATCH /{resource}/{pk…}` | partial update |
//! | `DELETE /{resource}/{pk…}` | delete, returns the removed row |
//!
//! Composite keys take one path segment per key field, in key order. Store
//! calls are blocking and run on the blocking pool with their own session.

use std::collections::HashMap;

use axum::Json;
use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use impakt_store::entities::{
    Company, CompanyDescription, CompanyInitiative, CompanyInitiativeSubSdg, Sdg, SubSdg,
};
use impakt_store::{AnySession, Entity, EntitySchema, Filter, Record, crud};

use crate::error::ApiError;
use crate::server::AppState;

/// Routes for all six entities.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(resource_router::<Company>())
        .merge(resource_router::<CompanyDescription>())
        .merge(resource_router::<CompanyInitiative>())
        .merge(resource_router::<Sdg>())
        .merge(resource_router::<SubSdg>())
        .merge(resource_router::<CompanyInitiativeSubSdg>())
}

/// Routes for one entity, derived from `E::SCHEMA`.
pub fn resource_router<E: Entity>() -> Router<AppState> {
    let schema = E::SCHEMA;
    Router::new()
        .route(
            &collection_path(schema),
            get(list_handler::<E>).post(create_handler::<E>),
        )
        .route(
            &format!("{}/find", collection_path(schema)),
            get(find_handler::<E>),
        )
        .route(
            &item_path(schema),
            get(get_handler::<E>)
                .patch(update_handler::<E>)
                .delete(delete_handler::<E>),
        )
}

/// `/companies`
pub fn collection_path(schema: &EntitySchema) -> String {
    format!("/{}", schema.resource)
}

/// `/company-descriptions/{company_id}/{description}`
pub fn item_path(schema: &EntitySchema) -> String {
    let mut path = collection_path(schema);
    for pk in schema.primary_key {
        path.push_str("/{");
        path.push_str(pk);
        path.push('}');
    }
    path
}

/// Primary-key filter from the captured path segments.
fn key_filter(schema: &EntitySchema, segments: &HashMap<String, String>) -> Result<Filter, ApiError> {
    let pairs = schema
        .primary_key
        .iter()
        .map(|pk| {
            segments
                .get(*pk)
                .map(|raw| (*pk, raw.as_str()))
                .ok_or_else(|| ApiError::bad_request(format!("missing path segment `{pk}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Filter::from_strings(schema, pairs)?)
}

/// Run a store call on the blocking pool with a fresh session.
async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut AnySession) -> impakt_store::Result<T> + Send + 'static,
{
    let db = state.db.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut session = db.session()?;
        f(&mut session)
    })
    .await;
    match joined {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "store task failed");
            Err(ApiError::internal())
        }
    }
}

/// POST /{resource}
async fn create_handler<E: Entity>(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<E>), ApiError> {
    let Json(body) = body?;
    let fields = Record::from_json(E::SCHEMA, &body)?;
    let created = run_blocking(&state, move |s| crud::create::<E, _>(s, fields)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /{resource}
async fn list_handler<E: Entity>(State(state): State<AppState>) -> Result<Json<Vec<E>>, ApiError> {
    let rows = run_blocking(&state, crud::get_all::<E, AnySession>).await?;
    Ok(Json(rows))
}

/// GET /{resource}/find?field=value…
async fn find_handler<E: Entity>(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<E>, ApiError> {
    let Query(pairs) = query?;
    let filter = Filter::from_strings(
        E::SCHEMA,
        pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    let row = run_blocking(&state, move |s| crud::get::<E, _>(s, &filter)).await?;
    Ok(Json(row))
}

/// GET /{resource}/{pk…}
async fn get_handler<E: Entity>(
    State(state): State<AppState>,
    segments: Result<Path<HashMap<String, String>>, PathRejection>,
) -> Result<Json<E>, ApiError> {
    let Path(segments) = segments?;
    let pk = key_filter(E::SCHEMA, &segments)?;
    pk.validate_primary_key(E::SCHEMA)?;
    let row = run_blocking(&state, move |s| crud::get::<E, _>(s, &pk)).await?;
    Ok(Json(row))
}

/// PATCH /{resource}/{pk…}
async fn update_handler<E: Entity>(
    State(state): State<AppState>,
    segments: Result<Path<HashMap<String, String>>, PathRejection>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<E>, ApiError> {
    let Path(segments) = segments?;
    let Json(body) = body?;
    let pk = key_filter(E::SCHEMA, &segments)?;
    let fields = Record::from_json(E::SCHEMA, &body)?;
    let row = run_blocking(&state, move |s| crud::update::<E, _>(s, &pk, fields)).await?;
    Ok(Json(row))
}

/// DELETE /{resource}/{pk…}
async fn delete_handler<E: Entity>(
    State(state): State<AppState>,
    segments: Result<Path<HashMap<String, String>>, PathRejection>,
) -> Result<Json<E>, ApiError> {
    let Path(segments) = segments?;
    let pk = key_filter(E::SCHEMA, &segments)?;
    let row = run_blocking(&state, move |s| crud::delete::<E, _>(s, &pk)).await?;
    Ok(Json(row))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
