use async_trait::async_trait;

use crate::calculator::{calculate, CalculationRequest, PricingResult};
use crate::catalog::PriceLookup;
use crate::error::PricingError;

/// Where recalculations are sent. May be a network round-trip; the local
/// implementation simply mirrors the calculation in-process.
#[async_trait]
pub trait PricingBackend: Send + Sync {
    async fn calculate(&self, request: CalculationRequest) -> Result<PricingResult, PricingError>;
}

#[derive(Debug, Clone)]
pub struct LocalCalculator<L> {
    lookup: L,
}

impl<L: PriceLookup> LocalCalculator<L> {
    pub fn new(lookup: L) -> Self { Self { lookup } }

    pub fn lookup(&self) -> &L { &self.lookup }
}

#[async_trait]
impl<L: PriceLookup + Send + Sync> PricingBackend for LocalCalculator<L> {
    async fn calculate(&self, request: CalculationRequest) -> Result<PricingResult, PricingError> {
        calculate(&self.lookup, &request)
    }
}
