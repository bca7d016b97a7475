use bigdecimal::BigDecimal;
use bigdecimal::{Signed, ToPrimitive, Zero};
use std::str::FromStr;
use std::sync::OnceLock;

/// Scale used for every stored/displayed monetary amount.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    HalfUp,
    Bankers,
    Truncate,
}

impl RoundingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "half-up",
            RoundingMode::Bankers => "bankers",
            RoundingMode::Truncate => "truncate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "half-up" | "half_up" | "halfup" => Some(RoundingMode::HalfUp),
            "bankers" | "half-even" | "half_even" => Some(RoundingMode::Bankers),
            "truncate" | "trunc" => Some(RoundingMode::Truncate),
            _ => None,
        }
    }
}

static ROUNDING_MODE: OnceLock<RoundingMode> = OnceLock::new();
static ROUNDING_LOGGED: OnceLock<()> = OnceLock::new();

/// Resolve the process-wide rounding mode from `MONEY_ROUNDING` (first call wins).
/// Unknown values fall back to half-up.
pub fn init_rounding_mode_from_env() -> RoundingMode {
    *ROUNDING_MODE.get_or_init(|| {
        std::env::var("MONEY_ROUNDING")
            .ok()
            .and_then(|v| RoundingMode::parse(&v))
            .unwrap_or(RoundingMode::HalfUp)
    })
}

pub fn rounding_mode() -> RoundingMode {
    init_rounding_mode_from_env()
}

pub fn log_rounding_mode_once() {
    if ROUNDING_LOGGED.set(()).is_ok() {
        tracing::info!(mode = rounding_mode().as_str(), "Monetary rounding mode configured");
    }
}

/// `10^-dp` as an exact decimal.
fn unit(dp: u32) -> BigDecimal {
    (0..dp).fold(BigDecimal::from(1), |acc, _| acc / BigDecimal::from(10))
}

/// Round half away from zero at `dp` decimal places.
pub fn round_half_up(value: &BigDecimal, dp: u32) -> BigDecimal {
    let half = unit(dp + 1) * BigDecimal::from(5);
    let shifted = if value.is_negative() { value - half } else { value + half };
    shifted.with_scale(dp as i64)
}

fn round_bankers(value: &BigDecimal, dp: u32) -> BigDecimal {
    let truncated = value.with_scale(dp as i64);
    let remainder = (value - &truncated).abs();
    let half = unit(dp + 1) * BigDecimal::from(5);
    let step = if value.is_negative() { -unit(dp) } else { unit(dp) };
    if remainder > half {
        return truncated + step;
    }
    if remainder < half {
        return truncated;
    }
    // exact tie: move only when the last kept digit is odd
    let last_digit_odd = (&truncated / unit(dp))
        .to_i64()
        .map(|d| d % 2 != 0)
        .unwrap_or(false);
    if last_digit_odd { truncated + step } else { truncated }
}

pub fn round_with(mode: RoundingMode, value: &BigDecimal, dp: u32) -> BigDecimal {
    match mode {
        RoundingMode::HalfUp => round_half_up(value, dp),
        RoundingMode::Bankers => round_bankers(value, dp),
        RoundingMode::Truncate => value.with_scale(dp as i64),
    }
}

/// Normalize a monetary value to 2 decimal places using the configured rounding mode.
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    round_with(rounding_mode(), value, MONEY_SCALE)
}

/// Negative amounts collapse to zero.
pub fn clamp_non_negative(value: &BigDecimal) -> BigDecimal {
    if value.is_negative() { BigDecimal::zero() } else { value.clone() }
}

/// Lenient parse for user-typed amounts: blanks, garbage and negatives become zero.
pub fn parse_amount_lenient(raw: &str) -> BigDecimal {
    let trimmed = raw.trim().replace(',', ".");
    BigDecimal::from_str(&trimmed)
        .map(|v| clamp_non_negative(&v))
        .unwrap_or_else(|_| BigDecimal::zero())
}

/// Compare two monetary values allowing a tolerance (in cents) after normalization.
pub fn nearly_equal(a: &BigDecimal, b: &BigDecimal, cents_tolerance: i64) -> bool {
    let diff = Money::from_decimal(a).cents().saturating_sub(Money::from_decimal(b).cents());
    diff.saturating_abs() <= cents_tolerance
}

/// Integer cents, used where drift must be counted exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub fn from_cents(cents: i64) -> Self { Self(cents) }

    pub fn from_decimal(value: &BigDecimal) -> Self {
        let cents = round_half_up(value, MONEY_SCALE) * BigDecimal::from(100);
        // Out-of-range amounts saturate instead of collapsing to zero.
        let saturated = if cents.is_negative() { i64::MIN } else { i64::MAX };
        Self(cents.to_i64().unwrap_or(saturated))
    }

    pub fn cents(&self) -> i64 { self.0 }

    pub fn to_decimal(&self) -> BigDecimal {
        (BigDecimal::from(self.0) / BigDecimal::from(100)).with_scale(MONEY_SCALE as i64)
    }
}

impl From<Money> for BigDecimal {
    fn from(value: Money) -> Self { value.to_decimal() }
}
