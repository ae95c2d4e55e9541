//! Integration tests for the proof-of-payment upload flow.
//!
//! The upload is a coordinated dual write: blob content first, then the
//! side-car metadata record embedding the resolved blob URL. These tests
//! pin the ordering invariant in both directions and the round trip from
//! metadata back to blob content.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use marigold_backend::storage::FileStore;
use marigold_integration_tests::{TestContext, bare_request, parse_json, send};

const BOUNDARY: &str = "marigold-test-boundary";

/// Hand-rolled multipart body with a file part and the two text parts.
fn multipart_body(file: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(content) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"ProofOfPayment\"; \
                 filename=\"proof.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"OrderID\"\r\n\r\nORD-42\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"CustomerName\"\r\n\r\nThandi M.\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(file: Option<&[u8]>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uploads/proof-of-payment")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file)))
        .expect("build request")
}

#[tokio::test]
async fn test_upload_round_trip() {
    let ctx = TestContext::new();
    let content: &[u8] = b"%PDF-1.7 proof of payment";

    let (status, body) = send(ctx.router(), multipart_request(Some(content))).await;
    assert_eq!(status, StatusCode::OK);

    let receipt = parse_json(&body);
    let file_name = receipt["fileName"].as_str().expect("fileName");
    let blob_url = receipt["blobUrl"].as_str().expect("blobUrl");
    assert!(file_name.ends_with("-proof.pdf"));

    // The metadata record's BlobUrl must resolve to the uploaded bytes.
    let metadata = ctx
        .files
        .read("payments", &format!("{file_name}.meta.txt"))
        .await
        .expect("metadata file");
    let metadata = String::from_utf8(metadata).expect("utf-8 metadata");

    let blob_url_line = metadata
        .lines()
        .find_map(|line| line.strip_prefix("BlobUrl: "))
        .expect("BlobUrl line");
    assert_eq!(blob_url_line, blob_url);
    assert_eq!(
        ctx.blobs.fetch_url(blob_url_line).as_deref(),
        Some(content)
    );

    // The remaining metadata fields are present.
    assert!(metadata.contains("UploadedAtUtc: "));
    assert!(metadata.contains("OrderId: ORD-42"));
    assert!(metadata.contains("CustomerName: Thandi M."));
}

#[tokio::test]
async fn test_blob_failure_writes_no_metadata() {
    let ctx = TestContext::new();
    ctx.blobs.set_failing(true);

    let (status, _) = send(ctx.router(), multipart_request(Some(b"%PDF".as_slice()))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(ctx.files.is_empty());
    assert!(ctx.blobs.is_empty());
}

#[tokio::test]
async fn test_metadata_failure_reports_error_and_orphans_blob() {
    let ctx = TestContext::new();
    ctx.files.set_failing(true);

    let (status, _) = send(ctx.router(), multipart_request(Some(b"%PDF".as_slice()))).await;

    // Reported as an upload failure even though the blob now exists.
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(ctx.blobs.len(), 1);
    assert!(ctx.files.is_empty());
}

#[tokio::test]
async fn test_missing_file_part_is_rejected() {
    let ctx = TestContext::new();

    let (status, _) = send(ctx.router(), multipart_request(None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx.blobs.is_empty());
    assert!(ctx.files.is_empty());
}

#[tokio::test]
async fn test_non_multipart_request_is_rejected() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method("POST")
        .uri("/uploads/proof-of-payment")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"ProofOfPayment": "not a file"}"#))
        .expect("build request");
    let (status, _) = send(ctx.router(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contracts_listing_shows_metadata_files() {
    let ctx = TestContext::new();

    send(ctx.router(), multipart_request(Some(b"first".as_slice()))).await;
    send(ctx.router(), multipart_request(Some(b"second".as_slice()))).await;

    let (status, body) = send(ctx.router(), bare_request("GET", "/uploads/contracts")).await;
    assert_eq!(status, StatusCode::OK);

    let listing = parse_json(&body);
    let names = listing.as_array().expect("array");
    assert_eq!(names.len(), 2);
    assert!(names
        .iter()
        .all(|name| name.as_str().expect("name").ends_with(".meta.txt")));
}

#[tokio::test]
async fn test_distinct_uploads_get_distinct_blob_names() {
    let ctx = TestContext::new();

    let (_, first) = send(ctx.router(), multipart_request(Some(b"same".as_slice()))).await;
    let (_, second) = send(ctx.router(), multipart_request(Some(b"same".as_slice()))).await;

    let first_name = parse_json(&first)["fileName"].as_str().expect("fileName").to_string();
    let second_name = parse_json(&second)["fileName"].as_str().expect("fileName").to_string();
    assert_ne!(first_name, second_name);
}
