//! Currency display helpers

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as dollars with thousands separators.
///
/// Whole amounts print without cents (`$12,500`), fractional amounts keep two
/// places (`$1,234.50`), negatives carry a leading minus (`-$800`).
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();

    let whole = abs.trunc();
    let cents = ((abs - whole) * Decimal::from(100)).trunc();

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if cents.is_zero() {
        format!("{}${}", sign, grouped)
    } else {
        format!("{}${}.{:0>2}", sign, grouped, cents)
    }
}
