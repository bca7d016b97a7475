use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("unknown product {0}")]
    UnknownProduct(Uuid),
    #[error("product {0} is not available for sale")]
    ProductUnavailable(Uuid),
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: Uuid, quantity: u32 },
    #[error("pricing backend error: {0}")]
    Backend(String),
    #[error("cart is empty")]
    EmptyCart,
    #[error("no pricing result available yet")]
    NoResult,
    #[error("a recalculation is still pending")]
    RecalculationPending,
}

impl PricingError {
    /// Whether the host should keep the last good result on screen and let the user retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PricingError::UnknownProduct(_)
            | PricingError::ProductUnavailable(_)
            | PricingError::Backend(_)
            | PricingError::NoResult
            | PricingError::RecalculationPending => true,
            PricingError::InvalidQuantity { .. } | PricingError::EmptyCart => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PricingError::UnknownProduct(_) => "unknown_product",
            PricingError::ProductUnavailable(_) => "product_unavailable",
            PricingError::InvalidQuantity { .. } => "invalid_quantity",
            PricingError::Backend(_) => "backend_error",
            PricingError::EmptyCart => "empty_cart",
            PricingError::NoResult => "no_result",
            PricingError::RecalculationPending => "recalculation_pending",
        }
    }
}
