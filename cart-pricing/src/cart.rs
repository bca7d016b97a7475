use bigdecimal::{BigDecimal, Zero};
use common_money::{clamp_non_negative, normalize_scale};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{PriceLookup, PricingMode, ProductQuote};
use crate::error::PricingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub product_code: Option<String>,
    pub quantity: u32,
    pub unit_price: BigDecimal,
}

impl CartLine {
    pub fn from_quote(quote: &ProductQuote, quantity: u32, mode: PricingMode) -> Self {
        CartLine {
            product_id: quote.product_id,
            product_name: quote.product_name.clone(),
            product_code: quote.product_code.clone(),
            quantity,
            unit_price: clamp_non_negative(quote.unit_price_for(mode)),
        }
    }

    pub fn line_subtotal(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }
}

pub fn lines_subtotal(lines: &[CartLine]) -> BigDecimal {
    lines.iter().fold(BigDecimal::zero(), |acc, line| acc + line.line_subtotal())
}

/// The host-owned cart. Every mutation bumps `revision`, which is what the
/// reconciliation layer watches to know the suggested total moved.
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    mode: PricingMode,
    packaging_cost: BigDecimal,
    revision: u64,
}

impl Cart {
    pub fn new(mode: PricingMode) -> Self {
        Cart { lines: Vec::new(), mode, packaging_cost: BigDecimal::zero(), revision: 0 }
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }

    pub fn mode(&self) -> PricingMode { self.mode }

    pub fn packaging_cost(&self) -> &BigDecimal { &self.packaging_cost }

    pub fn revision(&self) -> u64 { self.revision }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn item_count(&self) -> usize { self.lines.len() }

    pub fn subtotal(&self) -> BigDecimal { lines_subtotal(&self.lines) }

    /// Packaging alone is never priced: an empty cart suggests zero.
    pub fn suggested_total(&self) -> BigDecimal {
        if self.lines.is_empty() {
            return BigDecimal::zero();
        }
        self.subtotal() + &self.packaging_cost
    }

    /// Add `quantity` of a product, merging into an existing line. The unit price is
    /// quoted for the cart's current mode.
    pub fn add_product<L: PriceLookup + ?Sized>(&mut self, lookup: &L, product_id: Uuid, quantity: u32) -> Result<(), PricingError> {
        if quantity == 0 {
            return Err(PricingError::InvalidQuantity { product_id, quantity });
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            let quote = lookup.quote(product_id)?;
            self.lines.push(CartLine::from_quote(&quote, quantity, self.mode));
        }
        self.touch();
        Ok(())
    }

    /// Returns false when the product is not in the cart.
    pub fn remove_product(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        let removed = self.lines.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Quantity zero removes the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), PricingError> {
        if quantity == 0 {
            self.remove_product(product_id);
            return Ok(());
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(PricingError::UnknownProduct(product_id))?;
        if line.quantity != quantity {
            line.quantity = quantity;
            self.touch();
        }
        Ok(())
    }

    /// Host-entered amount: clamped, then rounded to cents with the configured mode.
    pub fn set_packaging_cost(&mut self, cost: &BigDecimal) {
        let cost = normalize_scale(&clamp_non_negative(cost));
        if cost != self.packaging_cost {
            self.packaging_cost = cost;
            self.touch();
        }
    }

    /// Re-quote every line for `mode`. Either all lines move to the new table or,
    /// on any lookup failure, the cart is left exactly as it was.
    pub fn switch_mode<L: PriceLookup + ?Sized>(&mut self, lookup: &L, mode: PricingMode) -> Result<(), PricingError> {
        if mode == self.mode {
            return Ok(());
        }
        let requoted = self
            .lines
            .iter()
            .map(|line| {
                let quote = lookup.quote(line.product_id)?;
                Ok(CartLine::from_quote(&quote, line.quantity, mode))
            })
            .collect::<Result<Vec<_>, PricingError>>()?;
        tracing::debug!(from = self.mode.as_str(), to = mode.as_str(), lines = requoted.len(), "Re-quoted cart for pricing mode");
        self.lines = requoted;
        self.mode = mode;
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        if !self.lines.is_empty() {
            self.lines.clear();
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl Default for Cart {
    fn default() -> Self { Cart::new(PricingMode::Retail) }
}
