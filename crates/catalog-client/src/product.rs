use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as served by the catalog service.
///
/// Immutable value; the `code` is the product's external identifier and the
/// only notion of identity. `price` is a decimal so monetary amounts survive
/// serialization without floating-point rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub code: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: Decimal,
}

/// The outcome of a product lookup.
///
/// This is the entire surface the client exposes: either the product, or an
/// explicit absence. Transport failures never appear here; the fallback path
/// converts them to [`LookupOutcome::NotFound`] after logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The upstream returned the product.
    Found(ProductRef),
    /// The upstream has no product for the code, or the lookup degraded to
    /// an empty result.
    NotFound,
}

impl LookupOutcome {
    /// Returns true if a product was found.
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }

    /// Returns the product, if found.
    pub fn product(&self) -> Option<&ProductRef> {
        match self {
            LookupOutcome::Found(product) => Some(product),
            LookupOutcome::NotFound => None,
        }
    }

    /// Consumes the outcome, returning the product if found.
    pub fn into_product(self) -> Option<ProductRef> {
        match self {
            LookupOutcome::Found(product) => Some(product),
            LookupOutcome::NotFound => None,
        }
    }
}

impl From<Option<ProductRef>> for LookupOutcome {
    fn from(value: Option<ProductRef>) -> Self {
        match value {
            Some(product) => LookupOutcome::Found(product),
            None => LookupOutcome::NotFound,
        }
    }
}
