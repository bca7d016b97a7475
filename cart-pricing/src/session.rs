use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use common_observability::PricingMetrics;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{LocalCalculator, PricingBackend};
use crate::calculator::{CalculatedItem, CalculationItem, CalculationRequest, CalculationResponse};
use crate::cart::Cart;
use crate::catalog::{PriceLookup, PricingMode};
use crate::config::PricingConfig;
use crate::coordinator::{PricingSnapshot, RecalcCoordinator};
use crate::error::PricingError;
use crate::reconciliation::{EditOutcome, EditSource, LinkedValues, ReconciliationController};

/// A priced sale ready for the host to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub sale_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub mode: PricingMode,
    pub subtotal: BigDecimal,
    pub packaging_cost: BigDecimal,
    pub suggested_total: BigDecimal,
    pub final_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub allocated_packaging: BigDecimal,
    pub items: Vec<CalculatedItem>,
}

impl SaleDraft {
    fn new(mode: PricingMode, response: CalculationResponse) -> Self {
        SaleDraft {
            sale_id: Uuid::new_v4(),
            created_at: Utc::now(),
            mode,
            subtotal: response.subtotal,
            packaging_cost: response.packaging_cost,
            suggested_total: response.suggested_total,
            final_price: response.final_price,
            discount_amount: response.discount_amount,
            discount_percentage: response.discount_percentage,
            allocated_packaging: response.allocated_packaging,
            items: response.calculated_items,
        }
    }
}

/// One point-of-sale pricing session: the cart, the linked discount / final-price fields
/// and the debounced recalculation against `B`.
///
/// Any cart or mode change resets the linked fields to the new suggested total; committed
/// field edits and cart changes both schedule a recalculation.
pub struct SaleSession<L, B: PricingBackend + 'static> {
    lookup: L,
    cart: Cart,
    controller: ReconciliationController,
    coordinator: RecalcCoordinator<B>,
    metrics: Arc<PricingMetrics>,
    synced_revision: u64,
}

impl<L> SaleSession<Arc<L>, LocalCalculator<Arc<L>>>
where
    L: PriceLookup + Send + Sync + 'static,
{
    /// Session whose recalculations run in-process against the same price table.
    pub fn local(lookup: Arc<L>, config: &PricingConfig, metrics: Arc<PricingMetrics>) -> Self {
        let backend = Arc::new(LocalCalculator::new(lookup.clone()));
        SaleSession::new(lookup, backend, config, metrics)
    }
}

impl<L: PriceLookup, B: PricingBackend + 'static> SaleSession<L, B> {
    pub fn new(lookup: L, backend: Arc<B>, config: &PricingConfig, metrics: Arc<PricingMetrics>) -> Self {
        let coordinator = RecalcCoordinator::new(backend, config.settle_window, metrics.clone())
            .with_logging(config.log_recalculations);
        SaleSession {
            lookup,
            cart: Cart::new(PricingMode::Retail),
            controller: ReconciliationController::new(),
            coordinator,
            metrics,
            synced_revision: 0,
        }
    }

    pub fn cart(&self) -> &Cart { &self.cart }

    /// Exposed so the host can bind its fields with `subscribe`.
    pub fn controller(&self) -> &ReconciliationController { &self.controller }

    pub fn linked_values(&self) -> LinkedValues { self.controller.values() }

    pub fn snapshot(&self) -> PricingSnapshot { self.coordinator.snapshot() }

    pub fn subscribe(&self) -> watch::Receiver<PricingSnapshot> { self.coordinator.subscribe() }

    pub async fn settled(&self) -> PricingSnapshot { self.coordinator.settled().await }

    pub fn add_product(&mut self, product_id: Uuid, quantity: u32) -> Result<(), PricingError> {
        self.cart.add_product(&self.lookup, product_id, quantity)?;
        self.cart_changed();
        Ok(())
    }

    pub fn remove_product(&mut self, product_id: Uuid) -> bool {
        let removed = self.cart.remove_product(product_id);
        self.cart_changed();
        removed
    }

    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), PricingError> {
        self.cart.set_quantity(product_id, quantity)?;
        self.cart_changed();
        Ok(())
    }

    pub fn set_packaging_cost(&mut self, cost: &BigDecimal) {
        self.cart.set_packaging_cost(cost);
        self.cart_changed();
    }

    /// On failure the cart keeps its previous mode and prices.
    pub fn set_mode(&mut self, mode: PricingMode) -> Result<(), PricingError> {
        if let Err(err) = self.cart.switch_mode(&self.lookup, mode) {
            warn!(mode = mode.as_str(), error = %err, "Pricing mode switch refused");
            return Err(err);
        }
        self.cart_changed();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.cart_changed();
    }

    pub fn edit_final_price(&self, value: &BigDecimal) -> EditOutcome {
        let outcome = self.controller.set_final_price(value);
        self.after_edit(&outcome);
        outcome
    }

    pub fn edit_discount_percent(&self, value: &BigDecimal) -> EditOutcome {
        let outcome = self.controller.set_discount_percent(value);
        self.after_edit(&outcome);
        outcome
    }

    pub fn edit_final_price_input(&self, raw: &str) -> EditOutcome {
        let outcome = self.controller.set_final_price_input(raw);
        self.after_edit(&outcome);
        outcome
    }

    pub fn edit_discount_percent_input(&self, raw: &str) -> EditOutcome {
        let outcome = self.controller.set_discount_percent_input(raw);
        self.after_edit(&outcome);
        outcome
    }

    /// Re-issue the current request, e.g. after a backend error.
    pub fn retry(&self) -> u64 {
        self.coordinator.schedule(self.build_request())
    }

    /// Until the user edits a linked field both user values go out as zero ("unset"), so
    /// the backend charges its own freshly quoted suggested total.
    pub fn build_request(&self) -> CalculationRequest {
        let values = self.controller.values();
        let (user_final_price, user_discount_percentage) = match values.source {
            EditSource::Cart => (BigDecimal::zero(), BigDecimal::zero()),
            EditSource::FinalPrice | EditSource::DiscountPercent => (values.final_price, values.discount_percent),
        };
        CalculationRequest {
            items: self
                .cart
                .lines()
                .iter()
                .map(|line| CalculationItem { product_id: line.product_id, quantity: line.quantity })
                .collect(),
            is_wholesale: self.cart.mode().is_wholesale(),
            packaging_cost: self.cart.packaging_cost().clone(),
            user_final_price,
            user_discount_percentage,
        }
    }

    /// Freeze the latest settled result into a draft. Refuses while a recalculation is
    /// outstanding or when the newest request failed.
    pub fn finalize(&self) -> Result<SaleDraft, PricingError> {
        if self.cart.is_empty() {
            return Err(PricingError::EmptyCart);
        }
        let snapshot = self.coordinator.snapshot();
        if snapshot.pending {
            return Err(PricingError::RecalculationPending);
        }
        if let Some(err) = snapshot.error {
            return Err(err);
        }
        let result = match snapshot.result {
            Some(result) if snapshot.settled_generation == snapshot.generation => result,
            _ => return Err(PricingError::NoResult),
        };
        let draft = SaleDraft::new(self.cart.mode(), CalculationResponse::from(result));
        info!(
            sale_id = %draft.sale_id,
            mode = draft.mode.as_str(),
            final_price = %draft.final_price,
            discount_percentage = %draft.discount_percentage,
            items = draft.items.len(),
            "Sale draft finalized"
        );
        Ok(draft)
    }

    fn cart_changed(&mut self) {
        if self.cart.revision() == self.synced_revision {
            return;
        }
        self.synced_revision = self.cart.revision();
        self.controller.on_cart_or_mode_changed(&self.cart.suggested_total());
        self.coordinator.schedule(self.build_request());
    }

    fn after_edit(&self, outcome: &EditOutcome) {
        match outcome {
            EditOutcome::Committed(_) => {
                self.coordinator.schedule(self.build_request());
            }
            EditOutcome::Rejected { .. } => self.metrics.rejected_edits.inc(),
        }
    }
}
