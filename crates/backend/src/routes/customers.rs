//! Customer route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use marigold_core::api::{CustomerDto, CustomerPayload};
use marigold_core::{Customer, TokenMatch};

use crate::error::Result;
use crate::state::AppState;
use crate::storage::EntityStoreExt;

/// List all customers.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CustomerDto>>> {
    let customers = state.store().list_entities::<Customer>().await?;
    Ok(Json(customers.into_iter().map(CustomerDto::from).collect()))
}

/// Fetch one customer by id.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerDto>> {
    let stored = state.store().get_entity::<Customer>(&id).await?;
    Ok(Json(stored.into()))
}

/// Create a customer.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CustomerPayload>,
) -> Result<(StatusCode, Json<CustomerDto>)> {
    let customer = payload.into_customer();
    let stored = state.store().create_entity(&customer).await?;
    tracing::info!(customer_id = %stored.id, "customer created");
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// Update a customer. Absent fields keep their stored value; the
/// concurrency token is taken from the record read in this request
/// (last-write-wins per request).
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CustomerPayload>,
) -> Result<Json<CustomerDto>> {
    let stored = state.store().get_entity::<Customer>(&id).await?;
    let mut customer = stored.entity;
    payload.apply_to(&mut customer);

    let updated = state
        .store()
        .update_entity(&id, &customer, TokenMatch::Exact(stored.token))
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a customer. Idempotent: deleting an absent id still responds 204.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.store().delete_entity::<Customer>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
