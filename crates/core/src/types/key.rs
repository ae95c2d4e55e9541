//! Entity addressing and optimistic-lock tokens.
//!
//! Every stored entity is addressed by a two-part [`EntityKey`]: the
//! [`Collection`] it lives in plus a unique string id. Ids are minted by the
//! store at creation time and are immutable afterwards. Each stored record
//! also carries a [`ConcurrencyToken`] that the store reassigns on every
//! successful write; updates present a [`TokenMatch`] guard against it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The named collections of the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Customer,
    Product,
    Order,
}

impl Collection {
    /// The fixed wire tag for this collection.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Product => "Product",
            Self::Order => "Order",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Self::Customer),
            "Product" => Ok(Self::Product),
            "Order" => Ok(Self::Order),
            _ => Err(format!("unknown collection: {s}")),
        }
    }
}

/// Two-part key addressing a stored entity.
///
/// `(collection, id)` is unique and immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub collection: Collection,
    pub id: String,
}

impl EntityKey {
    /// Create a key from a collection and an id.
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Opaque version marker for optimistic-lock update checks.
///
/// Assigned by the store on create and reassigned on every successful
/// update. Callers never construct a token for an entity themselves; they
/// echo back the one they last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcurrencyToken(Uuid);

impl ConcurrencyToken {
    /// Mint a fresh token. Store implementations call this on every write.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ConcurrencyToken {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Guard presented with an update.
///
/// `Exact` enforces the optimistic lock; `Any` is the wildcard "ignore"
/// value that bypasses it (last write wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMatch {
    /// Match any stored token (wildcard; disables the lost-update check).
    Any,
    /// Match only this exact stored token.
    Exact(ConcurrencyToken),
}

impl TokenMatch {
    /// Whether this guard accepts the currently stored token.
    #[must_use]
    pub fn accepts(&self, current: ConcurrencyToken) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => *expected == current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_tag_round_trip() {
        for collection in [Collection::Customer, Collection::Product, Collection::Order] {
            let parsed: Collection = collection.tag().parse().expect("tag should parse");
            assert_eq!(parsed, collection);
        }
        assert!("Basket".parse::<Collection>().is_err());
    }

    #[test]
    fn test_entity_key_display() {
        let key = EntityKey::new(Collection::Order, "abc-123");
        assert_eq!(key.to_string(), "Order/abc-123");
    }

    #[test]
    fn test_token_match_accepts() {
        let current = ConcurrencyToken::mint();
        let stale = ConcurrencyToken::mint();

        assert!(TokenMatch::Any.accepts(current));
        assert!(TokenMatch::Exact(current).accepts(current));
        assert!(!TokenMatch::Exact(stale).accepts(current));
    }

    #[test]
    fn test_minted_tokens_are_distinct() {
        assert_ne!(ConcurrencyToken::mint(), ConcurrencyToken::mint());
    }
}
