//! Allocation of a global discount across cart lines.
//!
//! The final price the customer pays is resolved from the user's inputs, the discount
//! is expressed as one percentage of the suggested total, and that same multiplier is
//! applied to every line (and to the packaging cost, which is part of the suggested
//! total). Per-line figures are rounded half-up to cents independently, so their sum may
//! drift from the final price by at most half a cent per rounded figure.

use bigdecimal::{BigDecimal, Zero};
use common_money::{clamp_non_negative, round_half_up, MONEY_SCALE};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{lines_subtotal, CartLine};
use crate::catalog::{PriceLookup, PricingMode};
use crate::error::PricingError;

/// Scale of the discount percentage reported in results.
pub const PERCENT_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub items: Vec<CalculationItem>,
    #[serde(default)]
    pub is_wholesale: bool,
    #[serde(default = "zero")]
    pub packaging_cost: BigDecimal,
    /// Zero means "not set by the user".
    #[serde(default = "zero")]
    pub user_final_price: BigDecimal,
    #[serde(default = "zero")]
    pub user_discount_percentage: BigDecimal,
}

impl CalculationRequest {
    pub fn mode(&self) -> PricingMode {
        PricingMode::from_wholesale(self.is_wholesale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedLine {
    pub line: CartLine,
    pub line_subtotal: BigDecimal,
    pub allocated_final_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub subtotal: BigDecimal,
    pub packaging_cost: BigDecimal,
    pub suggested_total: BigDecimal,
    pub final_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub allocated_packaging: BigDecimal,
    pub lines: Vec<AllocatedLine>,
}

impl PricingResult {
    pub fn empty() -> Self {
        let zero = BigDecimal::zero().with_scale(MONEY_SCALE as i64);
        PricingResult {
            subtotal: zero.clone(),
            packaging_cost: zero.clone(),
            suggested_total: zero.clone(),
            final_price: zero.clone(),
            discount_amount: zero.clone(),
            discount_percentage: BigDecimal::zero().with_scale(PERCENT_SCALE as i64),
            allocated_packaging: zero,
            lines: Vec::new(),
        }
    }

    pub fn allocated_total(&self) -> BigDecimal {
        self.lines
            .iter()
            .fold(self.allocated_packaging.clone(), |acc, l| acc + &l.allocated_final_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_code: Option<String>,
    pub quantity: u32,
    pub suggested_price: BigDecimal,
    pub total_price: BigDecimal,
    pub final_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    pub subtotal: BigDecimal,
    pub packaging_cost: BigDecimal,
    pub suggested_total: BigDecimal,
    pub final_price: BigDecimal,
    pub discount_amount: BigDecimal,
    pub discount_percentage: BigDecimal,
    pub allocated_packaging: BigDecimal,
    pub calculated_items: Vec<CalculatedItem>,
}

impl From<PricingResult> for CalculationResponse {
    fn from(result: PricingResult) -> Self {
        let calculated_items = result
            .lines
            .into_iter()
            .map(|allocated| CalculatedItem {
                product_id: allocated.line.product_id,
                product_name: allocated.line.product_name,
                product_code: allocated.line.product_code,
                quantity: allocated.line.quantity,
                suggested_price: allocated.line.unit_price,
                total_price: allocated.line_subtotal,
                final_price: allocated.allocated_final_price,
            })
            .collect();
        CalculationResponse {
            subtotal: result.subtotal,
            packaging_cost: result.packaging_cost,
            suggested_total: result.suggested_total,
            final_price: result.final_price,
            discount_amount: result.discount_amount,
            discount_percentage: result.discount_percentage,
            allocated_packaging: result.allocated_packaging,
            calculated_items,
        }
    }
}

fn zero() -> BigDecimal { BigDecimal::zero() }

fn hundred() -> BigDecimal { BigDecimal::from(100) }

fn clamp_percent(value: &BigDecimal) -> BigDecimal {
    let value = clamp_non_negative(value);
    if value > hundred() { hundred() } else { value }
}

/// Resolve the amount actually charged.
///
/// Precedence: a nonzero user final price wins outright; otherwise a nonzero discount
/// percentage derives the price from the suggested total; otherwise the suggested total.
pub fn resolve_final_price(
    suggested_total: &BigDecimal,
    user_final_price: &BigDecimal,
    user_discount_percentage: &BigDecimal,
) -> BigDecimal {
    let user_final_price = clamp_non_negative(user_final_price);
    if !user_final_price.is_zero() {
        return round_half_up(&user_final_price, MONEY_SCALE);
    }
    let pct = clamp_percent(user_discount_percentage);
    if !pct.is_zero() {
        let discounted = suggested_total - &(suggested_total * &pct / hundred());
        return round_half_up(&discounted, MONEY_SCALE);
    }
    round_half_up(suggested_total, MONEY_SCALE)
}

/// Allocate the resolved discount over already-priced lines. Pure.
pub fn allocate(
    lines: &[CartLine],
    packaging_cost: &BigDecimal,
    user_final_price: &BigDecimal,
    user_discount_percentage: &BigDecimal,
) -> PricingResult {
    if lines.is_empty() {
        return PricingResult::empty();
    }
    let packaging_cost = clamp_non_negative(packaging_cost);
    let subtotal = lines_subtotal(lines);
    let suggested_total = &subtotal + &packaging_cost;
    let final_price = resolve_final_price(&suggested_total, user_final_price, user_discount_percentage);

    let discount_amount = clamp_non_negative(&(&suggested_total - &final_price));
    // Unrounded ratio drives the allocation; only the reported percentage is rounded.
    let discount_ratio = if suggested_total.is_zero() {
        BigDecimal::zero()
    } else {
        &discount_amount / &suggested_total
    };
    let multiplier = BigDecimal::from(1) - &discount_ratio;

    let allocated = lines
        .iter()
        .map(|line| {
            let line_subtotal = line.line_subtotal();
            let allocated_final_price = round_half_up(&(&line_subtotal * &multiplier), MONEY_SCALE);
            AllocatedLine {
                line: line.clone(),
                line_subtotal: round_half_up(&line_subtotal, MONEY_SCALE),
                allocated_final_price,
            }
        })
        .collect();

    PricingResult {
        subtotal: round_half_up(&subtotal, MONEY_SCALE),
        packaging_cost: round_half_up(&packaging_cost, MONEY_SCALE),
        suggested_total: round_half_up(&suggested_total, MONEY_SCALE),
        discount_amount: round_half_up(&discount_amount, MONEY_SCALE),
        discount_percentage: round_half_up(&(&discount_ratio * &hundred()), PERCENT_SCALE),
        allocated_packaging: round_half_up(&(&packaging_cost * &multiplier), MONEY_SCALE),
        final_price,
        lines: allocated,
    }
}

/// Re-price every requested item through `lookup` for the request's mode, then allocate.
/// Any item that cannot be priced fails the whole calculation.
pub fn calculate<L: PriceLookup + ?Sized>(lookup: &L, request: &CalculationRequest) -> Result<PricingResult, PricingError> {
    let mode = request.mode();
    let lines = request
        .items
        .iter()
        .map(|item| {
            if item.quantity == 0 {
                return Err(PricingError::InvalidQuantity { product_id: item.product_id, quantity: item.quantity });
            }
            let quote = lookup.quote(item.product_id)?;
            Ok(CartLine::from_quote(&quote, item.quantity, mode))
        })
        .collect::<Result<Vec<_>, PricingError>>()?;
    let result = allocate(&lines, &request.packaging_cost, &request.user_final_price, &request.user_discount_percentage);
    tracing::debug!(
        lines = lines.len(),
        mode = mode.as_str(),
        suggested_total = %result.suggested_total,
        final_price = %result.final_price,
        discount_percentage = %result.discount_percentage,
        "Calculated cart pricing"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_money::Money;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal { BigDecimal::from_str(s).unwrap() }

    fn line(qty: u32, price: &str) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            product_name: "Line".into(),
            product_code: None,
            quantity: qty,
            unit_price: dec(price),
        }
    }

    #[test]
    fn unset_final_price_defaults_to_suggested_total() {
        let result = allocate(&[line(2, "10")], &dec("5"), &BigDecimal::zero(), &BigDecimal::zero());
        assert_eq!(result.subtotal, dec("20"));
        assert_eq!(result.suggested_total, dec("25"));
        assert_eq!(result.final_price, dec("25"));
        assert_eq!(result.discount_amount, BigDecimal::zero());
        assert_eq!(result.discount_percentage, BigDecimal::zero());
        assert_eq!(result.lines[0].allocated_final_price, dec("20"));
    }

    #[test]
    fn final_price_drives_uniform_allocation() {
        let lines = [line(2, "10"), line(1, "30")];
        let result = allocate(&lines, &BigDecimal::zero(), &dec("40"), &BigDecimal::zero());
        assert_eq!(result.discount_amount, dec("10"));
        assert_eq!(result.discount_percentage, dec("20"));
        assert_eq!(result.lines[0].allocated_final_price, dec("16"));
        assert_eq!(result.lines[1].allocated_final_price, dec("24"));
        assert_eq!(result.allocated_total(), dec("40"));
    }

    #[test]
    fn packaging_shares_the_discount() {
        let result = allocate(&[line(2, "10")], &dec("5"), &dec("22.50"), &BigDecimal::zero());
        assert_eq!(result.discount_amount, dec("2.50"));
        assert_eq!(result.discount_percentage, dec("10"));
        assert_eq!(result.lines[0].allocated_final_price, dec("18"));
        assert_eq!(result.allocated_packaging, dec("4.50"));
        assert_eq!(result.allocated_total(), result.final_price);
    }

    #[test]
    fn user_final_price_takes_precedence_over_percentage() {
        let result = allocate(&[line(1, "100")], &BigDecimal::zero(), &dec("90"), &dec("50"));
        assert_eq!(result.final_price, dec("90"));
        assert_eq!(result.discount_percentage, dec("10"));
    }

    #[test]
    fn percentage_alone_derives_final_price() {
        let result = allocate(&[line(1, "100")], &BigDecimal::zero(), &BigDecimal::zero(), &dec("100"));
        assert_eq!(result.final_price, BigDecimal::zero());
        assert_eq!(result.discount_percentage, dec("100"));
        assert_eq!(result.lines[0].allocated_final_price, BigDecimal::zero());
    }

    #[test]
    fn markup_is_not_a_negative_discount() {
        let result = allocate(&[line(2, "10")], &dec("5"), &dec("30"), &BigDecimal::zero());
        assert_eq!(result.final_price, dec("30"));
        assert_eq!(result.discount_amount, BigDecimal::zero());
        assert_eq!(result.discount_percentage, BigDecimal::zero());
        assert_eq!(result.lines[0].allocated_final_price, dec("20"));
    }

    #[test]
    fn negative_inputs_clamp_to_zero() {
        let result = allocate(&[line(1, "10")], &dec("-3"), &dec("-1"), &dec("-20"));
        assert_eq!(result.packaging_cost, BigDecimal::zero());
        assert_eq!(result.final_price, dec("10"));
        assert_eq!(result.discount_percentage, BigDecimal::zero());
    }

    #[test]
    fn empty_cart_is_all_zero() {
        let result = allocate(&[], &dec("5"), &dec("10"), &dec("10"));
        assert!(result.lines.is_empty());
        assert_eq!(result.suggested_total, BigDecimal::zero());
        assert_eq!(result.final_price, BigDecimal::zero());
    }

    #[test]
    fn thirds_drift_stays_within_a_cent_per_line() {
        let lines = [line(1, "1"), line(1, "1"), line(1, "1")];
        let result = allocate(&lines, &BigDecimal::zero(), &dec("2"), &BigDecimal::zero());
        assert_eq!(result.discount_percentage, dec("33.33"));
        for l in &result.lines {
            assert_eq!(l.allocated_final_price, dec("0.67"));
        }
        let drift = Money::from_decimal(&result.allocated_total()).cents() - Money::from_decimal(&result.final_price).cents();
        assert!(drift.abs() <= lines.len() as i64);
    }

    #[test]
    fn response_shape_is_camel_case() {
        let result = allocate(&[line(2, "10")], &dec("5"), &BigDecimal::zero(), &dec("10"));
        let response = CalculationResponse::from(result);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["finalPrice"], "22.50");
        assert_eq!(json["discountAmount"], "2.50");
        assert_eq!(json["calculatedItems"][0]["suggestedPrice"], "10");
        assert_eq!(json["calculatedItems"][0]["totalPrice"], "20.00");
    }
}
