//! Integration tests for the entity store contract and the CRUD surface
//! over it.
//!
//! Optimistic locking is enforced on update only: a stale token must fail
//! with a conflict and leave the stored entity untouched, while the
//! wildcard guard bypasses the check entirely.

use axum::http::StatusCode;

use marigold_core::{Collection, Customer, Product, TokenMatch};
use marigold_integration_tests::{TestContext, bare_request, json_request, parse_json, send};

use marigold_backend::storage::{EntityStore, EntityStoreExt, StorageError};

fn customer() -> Customer {
    Customer {
        name: "Thandi M.".to_string(),
        username: "thandi".to_string(),
        email: "thandi@example.com".to_string(),
        shipping_address: "12 Long Street".to_string(),
    }
}

// =============================================================================
// Store contract
// =============================================================================

#[tokio::test]
async fn test_stale_token_update_fails_and_preserves_entity() {
    let ctx = TestContext::new();
    let stored = ctx.store.create_entity(&customer()).await.expect("create");
    let stale = stored.token;

    // A concurrent writer advances the token.
    let renamed = Customer {
        name: "Thandi Mokoena".to_string(),
        ..customer()
    };
    ctx.store
        .update_entity(&stored.id, &renamed, TokenMatch::Exact(stale))
        .await
        .expect("first update");

    // The stale token must now be rejected.
    let err = ctx
        .store
        .update_entity(&stored.id, &customer(), TokenMatch::Exact(stale))
        .await
        .expect_err("stale update");
    assert!(matches!(err, StorageError::ConcurrencyConflict(_)));

    // And the stored entity is unchanged by the failed update.
    let current = ctx
        .store
        .get_entity::<Customer>(&stored.id)
        .await
        .expect("get");
    assert_eq!(current.entity.name, "Thandi Mokoena");
}

#[tokio::test]
async fn test_wildcard_guard_bypasses_the_lock() {
    let ctx = TestContext::new();
    let stored = ctx.store.create_entity(&customer()).await.expect("create");

    ctx.store
        .update_entity(&stored.id, &customer(), TokenMatch::Exact(stored.token))
        .await
        .expect("tokened update");

    // The original token is stale now, but Any ignores it.
    let updated = ctx
        .store
        .update_entity(
            &stored.id,
            &Customer {
                email: "new@example.com".to_string(),
                ..customer()
            },
            TokenMatch::Any,
        )
        .await
        .expect("wildcard update");
    assert_eq!(updated.entity.email, "new@example.com");
}

#[tokio::test]
async fn test_every_write_advances_the_token() {
    let ctx = TestContext::new();
    let created = ctx.store.create_entity(&customer()).await.expect("create");

    let first = ctx
        .store
        .update_entity(&created.id, &customer(), TokenMatch::Exact(created.token))
        .await
        .expect("update");
    let second = ctx
        .store
        .update_entity(&created.id, &customer(), TokenMatch::Exact(first.token))
        .await
        .expect("update");

    assert_ne!(created.token, first.token);
    assert_ne!(first.token, second.token);
}

#[tokio::test]
async fn test_insert_with_explicit_duplicate_id_conflicts() {
    let ctx = TestContext::new();
    let body = serde_json::to_value(customer()).expect("serialize");

    ctx.store
        .insert(Collection::Customer, Some("c-1".to_string()), body.clone())
        .await
        .expect("first insert");
    let err = ctx
        .store
        .insert(Collection::Customer, Some("c-1".to_string()), body)
        .await
        .expect_err("duplicate insert");

    assert!(matches!(err, StorageError::AlreadyExists(_)));
}

// =============================================================================
// CRUD surface
// =============================================================================

#[tokio::test]
async fn test_customer_crud_round_trip() {
    let ctx = TestContext::new();

    let (status, body) = send(
        ctx.router(),
        json_request(
            "POST",
            "/customers",
            &serde_json::json!({
                "name": "Thandi M.",
                "username": "thandi",
                "email": "thandi@example.com",
                "shippingAddress": "12 Long Street"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = parse_json(&body)["id"].as_str().expect("id").to_string();

    let (status, body) = send(ctx.router(), bare_request("GET", &format!("/customers/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body)["username"], "thandi");

    // Partial update merges; absent fields keep their stored value.
    let (status, body) = send(
        ctx.router(),
        json_request(
            "PUT",
            &format!("/customers/{id}"),
            &serde_json::json!({"email": "t.m@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = parse_json(&body);
    assert_eq!(updated["email"], "t.m@example.com");
    assert_eq!(updated["name"], "Thandi M.");

    // Delete is idempotent.
    let (status, _) = send(
        ctx.router(),
        bare_request("DELETE", &format!("/customers/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        ctx.router(),
        bare_request("DELETE", &format!("/customers/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(ctx.router(), bare_request("GET", &format!("/customers/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_missing_entity_is_404() {
    let ctx = TestContext::new();

    let (status, _) = send(ctx.router(), bare_request("GET", "/products/absent-id")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_create_validates_name_and_price() {
    let ctx = TestContext::new();

    let (status, _) = send(
        ctx.router(),
        json_request("POST", "/products", &serde_json::json!({"price": "10.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        ctx.router(),
        json_request(
            "POST",
            "/products",
            &serde_json::json!({"productName": "Mug", "price": "-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        ctx.router(),
        json_request(
            "POST",
            "/products",
            &serde_json::json!({
                "productName": "Mug",
                "description": "Stoneware mug",
                "price": "49.90",
                "availableStock": 12
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(parse_json(&body)["availableStock"], 12);
}

#[tokio::test]
async fn test_product_list_reflects_creates() {
    let ctx = TestContext::new();

    for name in ["Mug", "Bowl", "Plate"] {
        let (status, _) = send(
            ctx.router(),
            json_request(
                "POST",
                "/products",
                &serde_json::json!({"productName": name, "price": "10.00"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let products = ctx.store.list_entities::<Product>().await.expect("list");
    assert_eq!(products.len(), 3);
}
