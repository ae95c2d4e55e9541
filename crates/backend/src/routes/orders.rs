//! Order route handlers.
//!
//! Submission is asynchronous: `POST /orders` validates the request and
//! enqueues it, responding `202 Accepted` with no body. The order entity
//! does not exist until the ingestion worker materializes it, and the
//! gateway never touches the entity store: referential checks on the
//! customer and product are left to the consumer.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use marigold_core::api::{OrderDto, OrderSubmission, OrderUpdate};
use marigold_core::{Order, TokenMatch};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::EntityStoreExt;

/// Submit an order for asynchronous processing.
///
/// # Errors
///
/// Returns 400 when the body does not deserialize or the quantity is not
/// positive, and 503 when the queue is unavailable; an enqueue failure is
/// never swallowed.
#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode> {
    let submission: OrderSubmission = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("invalid order submission: {e}")))?;
    if submission.quantity == 0 {
        return Err(AppError::Validation(
            "quantity must be positive".to_string(),
        ));
    }

    let payload = serde_json::to_string(&submission)
        .map_err(|e| AppError::Internal(format!("failed to serialize submission: {e}")))?;
    state.queue().enqueue(&payload).await?;

    tracing::info!(
        customer_id = %submission.customer_id,
        product_id = %submission.product_id,
        quantity = submission.quantity,
        "order submission enqueued"
    );
    Ok(StatusCode::ACCEPTED)
}

/// List all orders.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<OrderDto>>> {
    let orders = state.store().list_entities::<Order>().await?;
    Ok(Json(orders.into_iter().map(OrderDto::from).collect()))
}

/// Fetch one order by id.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDto>> {
    let stored = state.store().get_entity::<Order>(&id).await?;
    Ok(Json(stored.into()))
}

/// Update an order's status and/or details.
///
/// Status moves are forward-monotonic unless the payload sets `force`
/// (the explicit admin override).
#[instrument(skip(state, update))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<OrderDto>> {
    let stored = state.store().get_entity::<Order>(&id).await?;
    let mut order = stored.entity;

    if let Some(next) = update.status {
        if !update.force && !order.status.can_advance_to(next) {
            return Err(AppError::Validation(format!(
                "cannot move order from {} to {} without force",
                order.status, next
            )));
        }
        order.status = next;
    }
    if let Some(details) = update.details {
        order.details = Some(details);
    }

    // Wildcard guard: concurrent admin updates are last-write-wins.
    let updated = state
        .store()
        .update_entity(&id, &order, TokenMatch::Any)
        .await?;
    tracing::info!(order_id = %id, status = %updated.entity.status, "order updated");
    Ok(Json(updated.into()))
}

/// Delete an order (admin action). Idempotent: deleting an absent id
/// still responds 204.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.store().delete_entity::<Order>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
