//! Native value amounts
//!
//! Values are denominated in wei (10^-18 ether) and held as `u128`.

use thiserror::Error;

/// Amount of native value in wei
pub type Wei = u128;

/// Decimal places in one ether
pub const ETHER_DECIMALS: usize = 18;

/// Wei per ether
pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Amount parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Too many decimal places: at most 18 allowed")]
    TooPrecise,
    #[error("Amount overflows 128 bits")]
    Overflow,
}

/// Whole ether to wei
pub const fn ether(amount: u64) -> Wei {
    amount as Wei * WEI_PER_ETHER
}

/// Parse a decimal ether amount such as `"0.1"` or `"1000"` into wei
pub fn parse_ether(input: &str) -> Result<Wei, AmountError> {
    let input = input.trim();
    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(input.to_string()));
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(AmountError::TooPrecise);
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Wei>()
            .map_err(|_| AmountError::Overflow)?
            .checked_mul(WEI_PER_ETHER)
            .ok_or(AmountError::Overflow)?
    };

    let fraction_wei = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = ETHER_DECIMALS);
        padded
            .parse::<Wei>()
            .map_err(|_| AmountError::Invalid(input.to_string()))?
    };

    whole_wei
        .checked_add(fraction_wei)
        .ok_or(AmountError::Overflow)
}

/// Render wei as a decimal ether string without trailing zeros
pub fn format_ether(wei: Wei) -> String {
    let whole = wei / WEI_PER_ETHER;
    let fraction = wei % WEI_PER_ETHER;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction, width = ETHER_DECIMALS);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Serde adapter writing wei as a decimal string
pub mod wei_string {
    use super::Wei;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Wei, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Wei, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
