use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Number of fractional digits kept for every amount (currency minor units).
pub const SCALE: u32 = 2;

/// One minor unit. Balances within this of zero are treated as settled.
pub const EPSILON: Decimal = dec!(0.01);

/// Round to minor units, halves away from zero, and pin the scale to two
/// digits so `50` is carried as `50.00`.
pub fn round(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

pub fn parse_amount(s: &str) -> Result<Decimal, rust_decimal::Error> {
    s.trim().parse::<Decimal>()
}

pub fn display_amount(amount: Decimal) -> String {
    format!("{:.2}", round(amount))
}

pub fn display_signed(amount: Decimal) -> String {
    let amount = round(amount);
    if amount > Decimal::ZERO {
        format!("+{:.2}", amount)
    } else if amount < Decimal::ZERO {
        format!("-{:.2}", amount.abs())
    } else {
        "0.00".to_string()
    }
}
