//! Two linked inputs (discount percentage and final price) over one baseline (the
//! suggested total). Editing either recomputes the other.
//!
//! Observers are notified while the controller is still in the editing state, so a bound
//! display field that writes its refreshed value back into the other setter is rejected
//! instead of bouncing between the two fields. Edits from the other field are rejected,
//! never queued. Two fields edited in the same tick is not supported: whichever edit
//! reaches the guard first wins.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bigdecimal::{BigDecimal, Zero};
use common_money::{clamp_non_negative, parse_amount_lenient, round_half_up, MONEY_SCALE};

/// Decimal places kept for a user-derived discount percentage.
pub const DISCOUNT_SCALE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    EditingDiscount,
    EditingPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSource {
    Cart,
    FinalPrice,
    DiscountPercent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedValues {
    pub suggested_total: BigDecimal,
    pub final_price: BigDecimal,
    pub discount_percent: BigDecimal,
    pub source: EditSource,
    pub revision: u64,
}

impl LinkedValues {
    /// `max(0, suggested_total - final_price)`.
    pub fn discount_amount(&self) -> BigDecimal {
        clamp_non_negative(&(&self.suggested_total - &self.final_price))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Committed(LinkedValues),
    Rejected { state: EditState },
}

impl EditOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, EditOutcome::Committed(_))
    }
}

pub type CommitObserver = Rc<dyn Fn(&ReconciliationController, &LinkedValues)>;

pub struct ReconciliationController {
    state: Cell<EditState>,
    values: RefCell<LinkedValues>,
    observers: RefCell<Vec<CommitObserver>>,
    rejected: Cell<u64>,
}

fn hundred() -> BigDecimal { BigDecimal::from(100) }

fn zero_percent() -> BigDecimal { BigDecimal::zero().with_scale(DISCOUNT_SCALE as i64) }

impl ReconciliationController {
    pub fn new() -> Self {
        ReconciliationController {
            state: Cell::new(EditState::Idle),
            values: RefCell::new(LinkedValues {
                suggested_total: BigDecimal::zero(),
                final_price: BigDecimal::zero(),
                discount_percent: zero_percent(),
                source: EditSource::Cart,
                revision: 0,
            }),
            observers: RefCell::new(Vec::new()),
            rejected: Cell::new(0),
        }
    }

    pub fn state(&self) -> EditState { self.state.get() }

    pub fn values(&self) -> LinkedValues { self.values.borrow().clone() }

    pub fn suggested_total(&self) -> BigDecimal { self.values.borrow().suggested_total.clone() }

    pub fn final_price(&self) -> BigDecimal { self.values.borrow().final_price.clone() }

    pub fn discount_percent(&self) -> BigDecimal { self.values.borrow().discount_percent.clone() }

    pub fn discount_amount(&self) -> BigDecimal { self.values.borrow().discount_amount() }

    pub fn revision(&self) -> u64 { self.values.borrow().revision }

    /// Number of edits turned away by the guard since construction.
    pub fn rejected_edits(&self) -> u64 { self.rejected.get() }

    pub fn subscribe(&self, observer: CommitObserver) {
        self.observers.borrow_mut().push(observer);
    }

    /// The cart or the pricing mode changed: any entered discount is discarded and the
    /// final price snaps back to the new suggested total.
    pub fn on_cart_or_mode_changed(&self, new_suggested_total: &BigDecimal) -> LinkedValues {
        let suggested_total = clamp_non_negative(new_suggested_total);
        let final_price = round_half_up(&suggested_total, MONEY_SCALE);
        tracing::debug!(suggested_total = %suggested_total, "Cart changed; discount reset");
        self.commit(suggested_total, final_price, zero_percent(), EditSource::Cart)
    }

    pub fn set_final_price(&self, value: &BigDecimal) -> EditOutcome {
        if self.state.get() == EditState::EditingDiscount {
            return self.reject("final_price");
        }
        let previous = self.state.replace(EditState::EditingPrice);
        let suggested_total = self.suggested_total();
        // Nothing to reconcile against: an empty cart stays at zero.
        let final_price = if suggested_total.is_zero() {
            BigDecimal::zero()
        } else {
            round_half_up(&clamp_non_negative(value), MONEY_SCALE)
        };
        let discount_percent = if suggested_total > BigDecimal::zero() && final_price < suggested_total {
            let raw = (&suggested_total - &final_price) / &suggested_total * hundred();
            round_half_up(&raw, DISCOUNT_SCALE)
        } else {
            zero_percent()
        };
        let committed = self.commit(suggested_total, final_price, discount_percent, EditSource::FinalPrice);
        self.state.set(previous);
        EditOutcome::Committed(committed)
    }

    pub fn set_discount_percent(&self, value: &BigDecimal) -> EditOutcome {
        if self.state.get() == EditState::EditingPrice {
            return self.reject("discount_percent");
        }
        let previous = self.state.replace(EditState::EditingDiscount);
        let suggested_total = self.suggested_total();
        let mut percent = clamp_non_negative(value);
        if percent > hundred() {
            percent = hundred();
        }
        let raw = &suggested_total - &(&suggested_total * &percent / hundred());
        let final_price = round_half_up(&raw, MONEY_SCALE);
        let discount_percent = if suggested_total > BigDecimal::zero() { percent } else { zero_percent() };
        let committed = self.commit(suggested_total, final_price, discount_percent, EditSource::DiscountPercent);
        self.state.set(previous);
        EditOutcome::Committed(committed)
    }

    /// Text-field entry point: non-numeric or negative input counts as zero.
    pub fn set_final_price_input(&self, raw: &str) -> EditOutcome {
        self.set_final_price(&parse_amount_lenient(raw))
    }

    pub fn set_discount_percent_input(&self, raw: &str) -> EditOutcome {
        self.set_discount_percent(&parse_amount_lenient(raw))
    }

    fn reject(&self, field: &'static str) -> EditOutcome {
        self.rejected.set(self.rejected.get() + 1);
        let state = self.state.get();
        tracing::trace!(field, ?state, "Linked edit rejected while the other field is committing");
        EditOutcome::Rejected { state }
    }

    fn commit(
        &self,
        suggested_total: BigDecimal,
        final_price: BigDecimal,
        discount_percent: BigDecimal,
        source: EditSource,
    ) -> LinkedValues {
        let snapshot = {
            let mut values = self.values.borrow_mut();
            values.suggested_total = suggested_total;
            values.final_price = final_price;
            values.discount_percent = discount_percent;
            values.source = source;
            values.revision += 1;
            values.clone()
        };
        let observers: Vec<CommitObserver> = self.observers.borrow().iter().cloned().collect();
        for observer in observers {
            observer(self, &snapshot);
        }
        snapshot
    }
}

impl Default for ReconciliationController {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for ReconciliationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationController")
            .field("state", &self.state.get())
            .field("values", &*self.values.borrow())
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}
