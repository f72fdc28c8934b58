//! Strongly-typed identifiers used across the catalog.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a product, as assigned by the remote product service.
///
/// The service hands out plain integers; the newtype keeps them from being
/// mixed up with prices, sizes and other numbers flowing through the client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ProductId> for i64 {
    fn from(value: ProductId) -> Self {
        value.0
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = i64::from_str(s.trim())
            .map_err(|e| DomainError::invalid_id(format!("ProductId: {e}")))?;
        Ok(Self(raw))
    }
}
