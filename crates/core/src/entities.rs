//! Domain records persisted in the entity store.
//!
//! Bodies are stored as JSON documents; the store-assigned envelope (id,
//! concurrency token, last-modified timestamp) lives in
//! [`Stored`](crate::types::Stored), not here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Collection, OrderStatus, Record};

/// A retail customer.
///
/// `username` is informally unique; the store does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub shipping_address: String,
}

impl Record for Customer {
    const COLLECTION: Collection = Collection::Customer;
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    /// Non-negative; validated at the API boundary.
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub available_stock: u32,
    /// URL into the blob store, when an image has been uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Record for Product {
    const COLLECTION: Collection = Collection::Product;
}

/// A placed order.
///
/// Once persisted, only `status` and `details` may change. The price
/// snapshots are captured at order time and never recomputed, so later
/// product price changes do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    /// UTC, set at creation; the ingestion pipeline overwrites it with the
    /// ingestion-time clock.
    pub order_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

impl Record for Order {
    const COLLECTION: Collection = Collection::Order;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_body_wire_format() {
        let order = Order {
            customer_id: "C1".into(),
            product_id: "P1".into(),
            quantity: 2,
            details: Some("gift wrap".into()),
            status: OrderStatus::Processed,
            order_date: "2026-08-01T09:30:00Z".parse().expect("timestamp"),
            unit_price: None,
            total_price: None,
        };

        let value = serde_json::to_value(&order).expect("serialize");
        assert_eq!(value["customerId"], "C1");
        assert_eq!(value["productId"], "P1");
        assert_eq!(value["status"], "Processed");
        // Absent snapshots are omitted, not serialized as null.
        assert!(value.get("unitPrice").is_none());
        assert!(value.get("totalPrice").is_none());
    }

    #[test]
    fn test_product_price_accepts_number_and_string() {
        let from_number: Product =
            serde_json::from_value(serde_json::json!({"productName": "Mug", "price": 49.90}))
                .expect("numeric price");
        let from_string: Product =
            serde_json::from_value(serde_json::json!({"productName": "Mug", "price": "49.90"}))
                .expect("string price");

        assert_eq!(from_number.price, from_string.price);
    }

    #[test]
    fn test_customer_defaults_missing_fields() {
        let customer: Customer =
            serde_json::from_value(serde_json::json!({"name": "Thandi M."})).expect("decode");
        assert_eq!(customer.name, "Thandi M.");
        assert_eq!(customer.username, "");
        assert_eq!(customer.shipping_address, "");
    }
}
