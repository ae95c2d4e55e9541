//! Upload coordination: blob content plus a side-car metadata record.
//!
//! A proof-of-payment upload is a dual write without a shared transaction:
//! the binary content goes to the blob store first, and only then is the
//! metadata record (which embeds the resolved blob URL) written to the
//! file share. A blob failure aborts the whole operation with no metadata
//! written; a metadata failure after a successful blob write leaves an
//! orphaned blob behind and is reported as an upload failure, not retried.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use marigold_core::api::UploadReceipt;

use crate::config::StorageNames;
use crate::storage::{BlobError, BlobStore, FileShareError, FileStore};

/// Suffix of the side-car metadata file, appended to the blob name.
const METADATA_SUFFIX: &str = ".meta.txt";

/// Errors surfaced by upload coordination.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The blob write failed; nothing was stored.
    #[error("blob upload failed: {0}")]
    Blob(#[from] BlobError),

    /// The blob write succeeded but the metadata write failed; the blob
    /// `{blob_name}` is orphaned.
    #[error("metadata write failed after blob upload of {blob_name}: {source}")]
    Metadata {
        blob_name: String,
        #[source]
        source: FileShareError,
    },

    /// Listing the metadata directory failed.
    #[error("file share error: {0}")]
    Share(#[from] FileShareError),
}

/// Coordinates blob uploads and their side-car metadata records.
#[derive(Clone)]
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    files: Arc<dyn FileStore>,
    proofs_container: String,
    images_container: String,
    payments_dir: String,
}

impl UploadService {
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>, files: Arc<dyn FileStore>, names: &StorageNames) -> Self {
        Self {
            blobs,
            files,
            proofs_container: names.payment_proofs_container.clone(),
            images_container: names.product_images_container.clone(),
            payments_dir: names.payments_dir.clone(),
        }
    }

    /// Collision-resistant blob name: `{random-hex}-{originalFileName}`.
    ///
    /// The original name is client-supplied; only its final path component
    /// is kept.
    fn blob_name(original_name: &str) -> String {
        let base = original_name
            .rsplit(['/', '\\'])
            .next()
            .filter(|base| !base.is_empty())
            .unwrap_or("upload.bin");
        format!("{}-{}", Uuid::new_v4().simple(), base)
    }

    /// Store a proof-of-payment: blob first, then the metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Blob`] when the blob write fails (no metadata
    /// is attempted) and [`UploadError::Metadata`] when the metadata write
    /// fails after the blob was stored.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn store_proof_of_payment(
        &self,
        order_id: &str,
        customer_name: &str,
        original_name: &str,
        content: &[u8],
    ) -> Result<UploadReceipt, UploadError> {
        let blob_name = Self::blob_name(original_name);
        let blob_url = self
            .blobs
            .put(&self.proofs_container, &blob_name, content)
            .await?;

        let metadata = format_metadata(Utc::now(), order_id, customer_name, &blob_url);
        let metadata_name = format!("{blob_name}{METADATA_SUFFIX}");
        self.files
            .write(&self.payments_dir, &metadata_name, metadata.as_bytes())
            .await
            .map_err(|source| {
                tracing::error!(
                    blob = %blob_name,
                    error = %source,
                    "metadata write failed after successful blob upload; blob is orphaned"
                );
                UploadError::Metadata {
                    blob_name: blob_name.clone(),
                    source,
                }
            })?;

        tracing::info!(blob = %blob_name, "stored proof of payment and metadata");
        Ok(UploadReceipt {
            file_name: blob_name,
            blob_url,
        })
    }

    /// Store a product image and return its resolved blob URL.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Blob`] when the blob write fails.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn store_product_image(
        &self,
        original_name: &str,
        content: &[u8],
    ) -> Result<String, UploadError> {
        let blob_name = Self::blob_name(original_name);
        let url = self
            .blobs
            .put(&self.images_container, &blob_name, content)
            .await?;
        Ok(url)
    }

    /// List the metadata files written so far.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Share`] when the listing fails.
    pub async fn list_payment_metadata(&self) -> Result<Vec<String>, UploadError> {
        Ok(self.files.list(&self.payments_dir).await?)
    }
}

/// Newline-separated `Key: value` metadata record.
fn format_metadata(
    uploaded_at: DateTime<Utc>,
    order_id: &str,
    customer_name: &str,
    blob_url: &str,
) -> String {
    format!(
        "UploadedAtUtc: {}\nOrderId: {order_id}\nCustomerName: {customer_name}\nBlobUrl: {blob_url}",
        uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryFileStore};

    fn names() -> StorageNames {
        StorageNames {
            customers_table: "customers".to_string(),
            products_table: "products".to_string(),
            orders_table: "orders".to_string(),
            order_queue: "orderprocessing".to_string(),
            product_images_container: "productimages".to_string(),
            payment_proofs_container: "payment-proofs".to_string(),
            file_share: "contracts".to_string(),
            payments_dir: "payments".to_string(),
        }
    }

    fn service(
        blobs: &Arc<MemoryBlobStore>,
        files: &Arc<MemoryFileStore>,
    ) -> UploadService {
        UploadService::new(
            Arc::clone(blobs) as Arc<dyn BlobStore>,
            Arc::clone(files) as Arc<dyn FileStore>,
            &names(),
        )
    }

    #[test]
    fn test_blob_name_shape() {
        let name = UploadService::blob_name("proof.pdf");
        let (prefix, rest) = name.split_once('-').expect("separator");
        assert_eq!(prefix.len(), 32);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "proof.pdf");
    }

    #[test]
    fn test_blob_name_strips_client_paths() {
        assert!(UploadService::blob_name("../../etc/passwd").ends_with("-passwd"));
        assert!(UploadService::blob_name(r"C:\Users\me\proof.pdf").ends_with("-proof.pdf"));
        assert!(UploadService::blob_name("").ends_with("-upload.bin"));
    }

    #[test]
    fn test_metadata_format() {
        let uploaded_at: DateTime<Utc> = "2026-08-06T12:00:00Z".parse().expect("timestamp");
        let metadata = format_metadata(uploaded_at, "ORD-1", "Thandi M.", "memory://blobs/p/a.pdf");

        let lines: Vec<&str> = metadata.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("UploadedAtUtc: 2026-08-06T12:00:00"));
        assert_eq!(lines[1], "OrderId: ORD-1");
        assert_eq!(lines[2], "CustomerName: Thandi M.");
        assert_eq!(lines[3], "BlobUrl: memory://blobs/p/a.pdf");
    }

    #[tokio::test]
    async fn test_blob_failure_writes_no_metadata() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let files = Arc::new(MemoryFileStore::new());
        blobs.set_failing(true);

        let err = service(&blobs, &files)
            .store_proof_of_payment("ORD-1", "Thandi", "proof.pdf", b"%PDF")
            .await
            .expect_err("blob failure");

        assert!(matches!(err, UploadError::Blob(_)));
        assert!(files.is_empty());
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_leaves_orphaned_blob() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let files = Arc::new(MemoryFileStore::new());
        files.set_failing(true);

        let err = service(&blobs, &files)
            .store_proof_of_payment("ORD-1", "Thandi", "proof.pdf", b"%PDF")
            .await
            .expect_err("metadata failure");

        assert!(matches!(err, UploadError::Metadata { .. }));
        // The blob was written before the metadata attempt and stays behind.
        assert_eq!(blobs.len(), 1);
        assert!(files.is_empty());
    }
}
