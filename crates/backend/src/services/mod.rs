//! Application services.

pub mod uploads;

pub use uploads::{UploadError, UploadService};
