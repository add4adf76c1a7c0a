use rust_decimal::{Decimal, RoundingStrategy};

/// Currency stamped on orders when the deployment does not configure one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Scale of every stored monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to cents, half away from zero, always carrying two decimals.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Tax line for a subtotal at a fixed rate (0.08 = 8%).
pub fn tax_for(subtotal: Decimal, rate: Decimal) -> Decimal {
    round_money(subtotal * rate)
}

/// Extended price of a line: `unit_price * quantity`, rounded.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}
