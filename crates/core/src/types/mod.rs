//! Core value types shared across the workspace.

mod key;
mod record;
mod status;

pub use key::{Collection, ConcurrencyToken, EntityKey, TokenMatch};
pub use record::{Record, Stored, StoredRecord};
pub use status::OrderStatus;
