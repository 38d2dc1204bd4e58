use lottery_base_layer::U256;

use crate::config::PrizeDisplayConfig;

#[cfg(test)]
#[path = "prize_format_test.rs"]
mod prize_format_test;

/// Formats a base-unit amount as a decimal with exactly `prize_decimals` decimals, rounding half
/// up. Exact for any amount; no floating point is involved.
pub fn format_prize(base_units: U256, config: &PrizeDisplayConfig) -> String {
    let token_decimals = usize::from(config.token_decimals);
    let prize_decimals = usize::from(config.prize_decimals);

    let scaled = if prize_decimals >= token_decimals {
        base_units.saturating_mul(pow10(prize_decimals - token_decimals))
    } else {
        let divisor = pow10(token_decimals - prize_decimals);
        let half = divisor / U256::from(2);
        base_units.saturating_add(half) / divisor
    };

    if prize_decimals == 0 {
        return scaled.to_string();
    }
    let unit = pow10(prize_decimals);
    let integer_part = scaled / unit;
    let fractional_part = scaled % unit;
    format!("{integer_part}.{:0>width$}", fractional_part.to_string(), width = prize_decimals)
}

fn pow10(exponent: usize) -> U256 {
    U256::from(10).pow(U256::from(exponent))
}
