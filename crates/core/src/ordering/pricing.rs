use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderLine, OrderTotals};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub shipping_fee: Decimal,
    pub currency: String,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(9, 2),
            free_shipping_threshold: Decimal::new(500, 0),
            shipping_fee: Decimal::new(50, 0),
            currency: "SGD".to_string(),
        }
    }
}

impl PricingPolicy {
    /// Tax rate as a whole-number percentage for display, e.g. `9` for `0.09`.
    pub fn tax_percent(&self) -> Decimal {
        (self.tax_rate * Decimal::ONE_HUNDRED).normalize()
    }
}

/// Two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Totals with no discount. Every component is rounded where it is computed and the
/// total is the sum of the rounded components.
pub fn compute_totals(lines: &[OrderLine], policy: &PricingPolicy) -> OrderTotals {
    let raw_subtotal = lines.iter().map(|line| line.line_total).sum::<Decimal>();
    let subtotal = round_money(raw_subtotal);
    let shipping = if raw_subtotal >= policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        round_money(policy.shipping_fee)
    };
    let tax = round_money(raw_subtotal * policy.tax_rate);

    OrderTotals {
        subtotal,
        discount: Decimal::ZERO,
        tax,
        shipping,
        total: subtotal + tax + shipping,
        currency: policy.currency.clone(),
    }
}

/// Re-prices `totals` for a percentage discount off the subtotal. Always derived from
/// the subtotal, so repeated calls replace rather than stack.
pub fn apply_discount(totals: &OrderTotals, percent: Decimal, policy: &PricingPolicy) -> OrderTotals {
    let raw_discount = totals.subtotal * percent / Decimal::ONE_HUNDRED;
    let discount = round_money(raw_discount);
    let tax = round_money((totals.subtotal - raw_discount) * policy.tax_rate);

    OrderTotals {
        subtotal: totals.subtotal,
        discount,
        tax,
        shipping: totals.shipping,
        total: totals.subtotal - discount + tax + totals.shipping,
        currency: totals.currency.clone(),
    }
}
