//! Conversion between decimal strings and 18-decimal fixed-point integers.
//!
//! Decimal strings are for display and user input only. Comparisons (allowance
//! checks) always operate on the raw [`U256`].

use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};

use crate::error::StakingError;

/// Decimals of the native asset and of the gm token.
pub const DECIMALS: u8 = 18;

/// Parse a user-entered amount into raw units. The amount must be strictly positive.
pub fn parse_amount(amount: &str) -> Result<U256, StakingError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(StakingError::InvalidAmount(amount.to_string()));
    }
    let is_decimal = trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.matches('.').count() <= 1;
    if !is_decimal {
        return Err(StakingError::InvalidAmount(format!(
            "{amount}: not a decimal number"
        )));
    }
    if let Some((_, frac)) = trimmed.split_once('.') {
        if frac.len() > DECIMALS as usize {
            return Err(StakingError::InvalidAmount(format!(
                "{amount}: more than {DECIMALS} decimal places"
            )));
        }
    }
    let raw: U256 = parse_units(trimmed, DECIMALS)
        .map_err(|e| StakingError::InvalidAmount(format!("{amount}: {e}")))?
        .into();
    if raw.is_zero() {
        return Err(StakingError::InvalidAmount(format!(
            "{amount}: must be greater than zero"
        )));
    }
    Ok(raw)
}

/// Render raw units as a decimal string with trailing zeros removed (`1.5`, `0.0`).
pub fn format_amount(raw: U256) -> String {
    let formatted = format_units(raw, DECIMALS).unwrap_or_else(|_| raw.to_string());
    match formatted.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => format!("{formatted}.0"),
    }
}
