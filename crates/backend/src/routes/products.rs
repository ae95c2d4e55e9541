//! Product route handlers.
//!
//! Create and update accept either a JSON body or `multipart/form-data`.
//! A multipart `ImageFile` part is routed through the blob store and its
//! resolved URL replaces the product's image reference before the entity
//! write; JSON bodies pass an `ImageURL` field instead.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header},
};
use rust_decimal::Decimal;
use tracing::instrument;

use marigold_core::api::{ProductDto, ProductPayload};
use marigold_core::{Product, TokenMatch};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::EntityStoreExt;

/// List all products.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductDto>>> {
    let products = state.store().list_entities::<Product>().await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// Fetch one product by id.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDto>> {
    let stored = state.store().get_entity::<Product>(&id).await?;
    Ok(Json(stored.into()))
}

/// Create a product from JSON or multipart form data.
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<ProductDto>)> {
    let payload = read_payload(&state, request).await?;
    let product = payload.into_product();
    validate(&product)?;

    let stored = state.store().create_entity(&product).await?;
    tracing::info!(product_id = %stored.id, "product created");
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// Update a product from JSON or multipart form data. Absent fields keep
/// their stored value; the concurrency token is taken from the record read
/// in this request (last-write-wins per request).
#[instrument(skip(state, request))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<ProductDto>> {
    let stored = state.store().get_entity::<Product>(&id).await?;
    let payload = read_payload(&state, request).await?;

    let mut product = stored.entity;
    payload.apply_to(&mut product);
    validate(&product)?;

    let updated = state
        .store()
        .update_entity(&id, &product, TokenMatch::Exact(stored.token))
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a product. Idempotent: deleting an absent id still responds 204.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.store().delete_entity::<Product>(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate(product: &Product) -> Result<()> {
    if product.product_name.trim().is_empty() {
        return Err(AppError::Validation("ProductName is required".to_string()));
    }
    if product.price < Decimal::ZERO {
        return Err(AppError::Validation(
            "Price must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Extract a product payload from either body encoding.
async fn read_payload(state: &AppState, request: Request) -> Result<ProductPayload> {
    if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?;
        read_form(state, multipart).await
    } else {
        let Json(payload) = Json::<ProductPayload>::from_request(request, &())
            .await
            .map_err(|e| AppError::Validation(format!("invalid JSON body: {e}")))?;
        Ok(payload)
    }
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> Result<ProductPayload> {
    let mut payload = ProductPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "ProductName" => payload.product_name = Some(read_text(field).await?),
            "Description" => payload.description = Some(read_text(field).await?),
            "Price" => {
                let text = read_text(field).await?;
                if !text.is_empty() {
                    payload.price = Some(text.parse().map_err(|_| {
                        AppError::Validation("Price must be a decimal number".to_string())
                    })?);
                }
            }
            "AvailableStock" => {
                let text = read_text(field).await?;
                if !text.is_empty() {
                    payload.available_stock = Some(text.parse().map_err(|_| {
                        AppError::Validation(
                            "AvailableStock must be a non-negative integer".to_string(),
                        )
                    })?);
                }
            }
            "ImageURL" | "ImageUrl" => payload.image_url = Some(read_text(field).await?),
            "ImageFile" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("failed to read ImageFile: {e}"))
                })?;
                if !content.is_empty() {
                    let url = state.uploads().store_product_image(&file_name, &content).await?;
                    payload.image_url = Some(url);
                }
            }
            _ => {}
        }
    }

    Ok(payload)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart field: {e}")))
}
