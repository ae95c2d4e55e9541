//! Request and response payloads for the HTTP surface.
//!
//! Mutation payloads carry optional fields and merge into the stored entity
//! (absent fields keep their stored value). Response DTOs flatten the
//! store envelope's id into the body, which is what clients address
//! entities by.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{Customer, Order, Product};
use crate::types::{OrderStatus, Stored};

// =============================================================================
// Orders
// =============================================================================

/// Order submission request.
///
/// This is both the `POST /orders` body and the lighter-weight fallback
/// shape of a queue message. PascalCase aliases accept the legacy producer
/// casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    #[serde(alias = "CustomerId")]
    pub customer_id: String,
    #[serde(alias = "ProductId")]
    pub product_id: String,
    #[serde(alias = "Quantity")]
    pub quantity: u32,
    #[serde(default, alias = "Details")]
    pub details: Option<String>,
}

/// Mutation payload for a stored order: only status and details may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default, alias = "Status")]
    pub status: Option<OrderStatus>,
    #[serde(default, alias = "Details")]
    pub details: Option<String>,
    /// Admin override: permit a non-forward status transition.
    #[serde(default)]
    pub force: bool,
}

/// Order as returned by the read surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

impl From<Stored<Order>> for OrderDto {
    fn from(stored: Stored<Order>) -> Self {
        let Order {
            customer_id,
            product_id,
            quantity,
            details,
            status,
            order_date,
            unit_price,
            total_price,
        } = stored.entity;
        Self {
            id: stored.id,
            customer_id,
            product_id,
            quantity,
            details,
            status,
            order_date,
            unit_price,
            total_price,
        }
    }
}

// =============================================================================
// Customers
// =============================================================================

/// Create/update payload for a customer. On update, absent fields keep
/// their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(default, alias = "Username")]
    pub username: Option<String>,
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(default, alias = "ShippingAddress")]
    pub shipping_address: Option<String>,
}

impl CustomerPayload {
    /// Build a new customer, defaulting absent fields to empty.
    #[must_use]
    pub fn into_customer(self) -> Customer {
        Customer {
            name: self.name.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            shipping_address: self.shipping_address.unwrap_or_default(),
        }
    }

    /// Merge present fields into an existing customer.
    pub fn apply_to(self, customer: &mut Customer) {
        if let Some(name) = self.name {
            customer.name = name;
        }
        if let Some(username) = self.username {
            customer.username = username;
        }
        if let Some(email) = self.email {
            customer.email = email;
        }
        if let Some(shipping_address) = self.shipping_address {
            customer.shipping_address = shipping_address;
        }
    }
}

/// Customer as returned by the read surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub shipping_address: String,
}

impl From<Stored<Customer>> for CustomerDto {
    fn from(stored: Stored<Customer>) -> Self {
        let Customer {
            name,
            username,
            email,
            shipping_address,
        } = stored.entity;
        Self {
            id: stored.id,
            name,
            username,
            email,
            shipping_address,
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// Create/update payload for a product. On update, absent fields keep
/// their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[serde(default, alias = "ProductName")]
    pub product_name: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "Price")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "AvailableStock")]
    pub available_stock: Option<u32>,
    #[serde(default, alias = "ImageURL", alias = "ImageUrl")]
    pub image_url: Option<String>,
}

impl ProductPayload {
    /// Build a new product, defaulting absent fields.
    #[must_use]
    pub fn into_product(self) -> Product {
        Product {
            product_name: self.product_name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            available_stock: self.available_stock.unwrap_or_default(),
            image_url: self.image_url.filter(|url| !url.is_empty()),
        }
    }

    /// Merge present fields into an existing product.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(product_name) = self.product_name {
            product.product_name = product_name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(available_stock) = self.available_stock {
            product.available_stock = available_stock;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = if image_url.is_empty() {
                None
            } else {
                Some(image_url)
            };
        }
    }
}

/// Product as returned by the read surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub product_name: String,
    pub description: String,
    pub price: Decimal,
    pub available_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<Stored<Product>> for ProductDto {
    fn from(stored: Stored<Product>) -> Self {
        let Product {
            product_name,
            description,
            price,
            available_stock,
            image_url,
        } = stored.entity;
        Self {
            id: stored.id,
            product_name,
            description,
            price,
            available_stock,
            image_url,
        }
    }
}

// =============================================================================
// Uploads
// =============================================================================

/// Response to a successful proof-of-payment upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_name: String,
    pub blob_url: String,
}
