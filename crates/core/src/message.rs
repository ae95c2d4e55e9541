//! Schema-tolerant decoding of order queue messages.
//!
//! A queue message arrives as UTF-8 JSON in one of two shapes: the canonical
//! order-record shape (the same field names as the persisted entity, plus an
//! id and an order date) or the lighter-weight submission shape accepted by
//! `POST /orders`. Decoding tries the canonical shape first and falls back
//! to the submission shape; a message matching neither is a poison message
//! and the error carries both serde failures for the log.
//!
//! Field matching tolerates both camelCase and PascalCase producers via
//! serde aliases.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::api::OrderSubmission;
use crate::entities::Order;
use crate::types::OrderStatus;

/// Canonical order-record message shape.
///
/// `id` and `orderDate` are the discriminating fields: a message without
/// them is not canonical and falls through to the submission shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalOrderMessage {
    #[serde(alias = "Id", alias = "rowKey", alias = "RowKey")]
    pub id: String,
    #[serde(alias = "CustomerId")]
    pub customer_id: String,
    #[serde(alias = "ProductId")]
    pub product_id: String,
    #[serde(alias = "Quantity")]
    pub quantity: u32,
    #[serde(default, alias = "Details")]
    pub details: Option<String>,
    #[serde(default, alias = "Status")]
    pub status: Option<OrderStatus>,
    #[serde(alias = "OrderDate")]
    pub order_date: DateTime<Utc>,
    #[serde(default, alias = "UnitPrice")]
    pub unit_price: Option<Decimal>,
    #[serde(default, alias = "TotalPrice")]
    pub total_price: Option<Decimal>,
}

/// A decoded order message, tagged by which shape matched.
#[derive(Debug, Clone)]
pub enum OrderMessage {
    Canonical(CanonicalOrderMessage),
    Submission(OrderSubmission),
}

/// Neither shape matched: a poison message.
///
/// Carries both decode failures so the consumer can log why each shape was
/// rejected before handing the message to the queue's retry/dead-letter
/// policy.
#[derive(Debug, Error)]
#[error("message matches no known order shape (canonical: {canonical}; submission: {submission})")]
pub struct MessageDecodeError {
    pub canonical: String,
    pub submission: String,
}

impl OrderMessage {
    /// Decode a raw queue message, canonical shape first.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDecodeError`] when the text matches neither shape.
    pub fn decode(raw: &str) -> Result<Self, MessageDecodeError> {
        match serde_json::from_str::<CanonicalOrderMessage>(raw) {
            Ok(canonical) => Ok(Self::Canonical(canonical)),
            Err(canonical_err) => match serde_json::from_str::<OrderSubmission>(raw) {
                Ok(submission) => Ok(Self::Submission(submission)),
                Err(submission_err) => Err(MessageDecodeError {
                    canonical: canonical_err.to_string(),
                    submission: submission_err.to_string(),
                }),
            },
        }
    }

    /// Which shape matched, for logging.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Canonical(_) => "canonical",
            Self::Submission(_) => "submission",
        }
    }

    /// Normalize into a canonical order body.
    ///
    /// Applied unconditionally, whichever shape decoded:
    /// - any id carried by the message is discarded (the store mints a
    ///   fresh one on insert, so redelivery duplicates rather than
    ///   overwrites),
    /// - `status` defaults to `Processed` only when absent,
    /// - the order date is overwritten with `ingested_at`; the original
    ///   submission time is not preserved on this path.
    #[must_use]
    pub fn normalize(self, ingested_at: DateTime<Utc>) -> Order {
        match self {
            Self::Canonical(canonical) => Order {
                customer_id: canonical.customer_id,
                product_id: canonical.product_id,
                quantity: canonical.quantity,
                details: canonical.details,
                status: canonical.status.unwrap_or(OrderStatus::Processed),
                order_date: ingested_at,
                unit_price: canonical.unit_price,
                total_price: canonical.total_price,
            },
            Self::Submission(submission) => Order {
                customer_id: submission.customer_id,
                product_id: submission.product_id,
                quantity: submission.quantity,
                details: submission.details,
                status: OrderStatus::Processed,
                order_date: ingested_at,
                unit_price: None,
                total_price: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-08-06T12:00:00Z".parse().expect("timestamp")
    }

    #[test]
    fn test_decode_canonical_shape() {
        let raw = r#"{
            "id": "11111111-2222-3333-4444-555555555555",
            "customerId": "C1",
            "productId": "P1",
            "quantity": 2,
            "status": "Pending",
            "orderDate": "2026-08-01T08:00:00Z"
        }"#;

        let message = OrderMessage::decode(raw).expect("decode");
        assert_eq!(message.shape(), "canonical");
    }

    #[test]
    fn test_decode_canonical_pascal_case() {
        let raw = r#"{
            "RowKey": "11111111-2222-3333-4444-555555555555",
            "CustomerId": "C1",
            "ProductId": "P1",
            "Quantity": 2,
            "OrderDate": "2026-08-01T08:00:00Z"
        }"#;

        let message = OrderMessage::decode(raw).expect("decode");
        assert_eq!(message.shape(), "canonical");
    }

    #[test]
    fn test_decode_falls_back_to_submission_shape() {
        let raw = r#"{"customerId":"C1","productId":"P1","quantity":3,"details":"gift wrap"}"#;

        let message = OrderMessage::decode(raw).expect("decode");
        assert_eq!(message.shape(), "submission");
    }

    #[test]
    fn test_decode_poison_message_reports_both_failures() {
        let err = OrderMessage::decode(r#"{"unrelated": true}"#).expect_err("poison");
        assert!(err.canonical.contains("missing field"));
        assert!(err.submission.contains("missing field"));

        assert!(OrderMessage::decode("not json at all").is_err());
    }

    #[test]
    fn test_normalize_overwrites_timestamp_and_defaults_status() {
        let raw = r#"{
            "id": "old-id",
            "customerId": "C1",
            "productId": "P1",
            "quantity": 2,
            "orderDate": "2020-01-01T00:00:00Z"
        }"#;

        let order = OrderMessage::decode(raw).expect("decode").normalize(now());
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.order_date, now());
    }

    #[test]
    fn test_normalize_keeps_explicit_status() {
        let raw = r#"{
            "id": "old-id",
            "customerId": "C1",
            "productId": "P1",
            "quantity": 2,
            "status": "Cancelled",
            "orderDate": "2020-01-01T00:00:00Z"
        }"#;

        let order = OrderMessage::decode(raw).expect("decode").normalize(now());
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_equivalent_shapes_normalize_identically() {
        let canonical = r#"{
            "id": "old-id",
            "customerId": "C1",
            "productId": "P1",
            "quantity": 3,
            "details": "gift wrap",
            "orderDate": "2026-08-01T08:00:00Z"
        }"#;
        let submission = r#"{"customerId":"C1","productId":"P1","quantity":3,"details":"gift wrap"}"#;

        let from_canonical = OrderMessage::decode(canonical)
            .expect("canonical")
            .normalize(now());
        let from_submission = OrderMessage::decode(submission)
            .expect("submission")
            .normalize(now());

        assert_eq!(from_canonical, from_submission);
    }

    #[test]
    fn test_submission_preserves_details_and_quantity() {
        let raw = r#"{"customerId":"C9","productId":"P4","quantity":7}"#;

        let order = OrderMessage::decode(raw).expect("decode").normalize(now());
        assert_eq!(order.customer_id, "C9");
        assert_eq!(order.quantity, 7);
        assert_eq!(order.details, None);
        assert_eq!(order.unit_price, None);
    }
}
