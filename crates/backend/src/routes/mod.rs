//! HTTP route handlers for the backend.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check (in main)
//! GET  /health/ready                - Readiness check (in main)
//!
//! # Orders
//! POST   /orders                    - Submit an order (202, enqueued)
//! GET    /orders                    - List orders
//! GET    /orders/{id}               - Order detail
//! PUT    /orders/{id}               - Update status/details (admin)
//! DELETE /orders/{id}               - Delete an order (admin)
//!
//! # Customers
//! GET    /customers                 - List customers
//! GET    /customers/{id}            - Customer detail
//! POST   /customers                 - Create customer (201)
//! PUT    /customers/{id}            - Update customer
//! DELETE /customers/{id}            - Delete customer (204)
//!
//! # Products (JSON or multipart with an ImageFile part)
//! GET    /products                  - List products
//! GET    /products/{id}             - Product detail
//! POST   /products                  - Create product (201)
//! PUT    /products/{id}             - Update product
//! DELETE /products/{id}             - Delete product (204)
//!
//! # Uploads
//! POST /uploads/proof-of-payment    - Multipart proof-of-payment upload
//! GET  /uploads/contracts           - List stored metadata files
//!
//! # Blobs
//! GET  /blobs/...                   - Static blob content (in main)
//! ```

pub mod customers;
pub mod orders;
pub mod products;
pub mod uploads;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::submit).get(orders::list))
        .route(
            "/{id}",
            get(orders::show).put(orders::update).delete(orders::delete),
        )
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::list).post(customers::create))
        .route(
            "/{id}",
            get(customers::show)
                .put(customers::update)
                .delete(customers::delete),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the upload routes router.
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/proof-of-payment", post(uploads::proof_of_payment))
        .route("/contracts", get(uploads::list_contracts))
}

/// Create all routes for the backend.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/customers", customer_routes())
        .nest("/products", product_routes())
        .nest("/uploads", upload_routes())
}
