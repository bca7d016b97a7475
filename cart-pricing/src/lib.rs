pub mod backend;
pub mod calculator;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod reconciliation;
pub mod session;

pub use backend::{LocalCalculator, PricingBackend};
pub use calculator::{
    allocate, calculate, resolve_final_price, AllocatedLine, CalculatedItem, CalculationItem, CalculationRequest,
    CalculationResponse, PricingResult,
};
pub use cart::{Cart, CartLine};
pub use catalog::{PriceBook, PriceLookup, PricingMode, ProductQuote};
pub use config::{load_pricing_config, PricingConfig};
pub use coordinator::{PricingSnapshot, RecalcCoordinator};
pub use error::PricingError;
pub use reconciliation::{EditOutcome, EditSource, EditState, LinkedValues, ReconciliationController};
pub use session::{SaleDraft, SaleSession};
