//! Stored-record envelope shared by all entity store backends.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Collection, ConcurrencyToken, EntityKey};

/// A domain type that lives in one of the entity store collections.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// The collection this record type is stored in.
    const COLLECTION: Collection;
}

/// A raw stored record: JSON body plus the store-assigned envelope.
///
/// This is what the store traits speak; typed access goes through
/// [`StoredRecord::into_typed`] or the backend's typed extension helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: EntityKey,
    pub body: serde_json::Value,
    pub token: ConcurrencyToken,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Deserialize the body into a typed record, keeping the envelope.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the stored body does not
    /// match the record type.
    pub fn into_typed<E: Record>(self) -> Result<Stored<E>, serde_json::Error> {
        let entity = serde_json::from_value(self.body)?;
        Ok(Stored {
            id: self.key.id,
            token: self.token,
            updated_at: self.updated_at,
            entity,
        })
    }
}

/// A typed entity together with its store-assigned envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<E> {
    pub id: String,
    pub token: ConcurrencyToken,
    pub updated_at: DateTime<Utc>,
    pub entity: E,
}

impl<E: Record> Stored<E> {
    /// The two-part key of this record.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::new(E::COLLECTION, self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        label: String,
    }

    impl Record for Widget {
        const COLLECTION: Collection = Collection::Product;
    }

    #[test]
    fn test_into_typed_round_trip() {
        let record = StoredRecord {
            key: EntityKey::new(Collection::Product, "w1"),
            body: serde_json::json!({"label": "gear"}),
            token: ConcurrencyToken::mint(),
            updated_at: Utc::now(),
        };
        let token = record.token;

        let stored = record.into_typed::<Widget>().expect("body should decode");
        assert_eq!(stored.id, "w1");
        assert_eq!(stored.token, token);
        assert_eq!(stored.entity.label, "gear");
        assert_eq!(stored.key(), EntityKey::new(Collection::Product, "w1"));
    }

    #[test]
    fn test_into_typed_rejects_mismatched_body() {
        let record = StoredRecord {
            key: EntityKey::new(Collection::Product, "w1"),
            body: serde_json::json!({"label": 42}),
            token: ConcurrencyToken::mint(),
            updated_at: Utc::now(),
        };

        assert!(record.into_typed::<Widget>().is_err());
    }
}
