//! Upload route handlers.

use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::instrument;

use marigold_core::api::UploadReceipt;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Accept a multipart proof-of-payment submission.
///
/// Expects a `ProofOfPayment` file part plus `OrderID` and `CustomerName`
/// text parts. Responds 200 with `{fileName, blobUrl}`; a missing or empty
/// file part (or a non-multipart request) is a 400.
#[instrument(skip(state, multipart))]
pub async fn proof_of_payment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut order_id = String::new();
    let mut customer_name = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "ProofOfPayment" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("failed to read ProofOfPayment: {e}"))
                })?;
                file = Some((file_name, content.to_vec()));
            }
            "OrderID" => {
                order_id = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid OrderID field: {e}")))?;
            }
            "CustomerName" => {
                customer_name = field.text().await.map_err(|e| {
                    AppError::Validation(format!("invalid CustomerName field: {e}"))
                })?;
            }
            _ => {}
        }
    }

    let Some((file_name, content)) = file.filter(|(_, content)| !content.is_empty()) else {
        return Err(AppError::Validation(
            "ProofOfPayment file is required".to_string(),
        ));
    };

    let receipt = state
        .uploads()
        .store_proof_of_payment(&order_id, &customer_name, &file_name, &content)
        .await?;
    Ok(Json(receipt))
}

/// List the metadata files written by proof-of-payment uploads.
pub async fn list_contracts(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.uploads().list_payment_metadata().await?))
}
