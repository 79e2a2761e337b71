//! Fixed-point token amounts
//!
//! Every quantity is stored in the token's smallest unit as a `U256`;
//! human-facing decimal strings are derived on demand. Arithmetic is only
//! defined between amounts with matching decimals.

use crate::error::{OrchResult, OrchestratorError};

use ethers::types::U256;
use std::cmp::Ordering;
use std::fmt;

/// A token quantity in smallest units, tagged with the token's decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

impl Amount {
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self {
            raw: U256::zero(),
            decimals,
        }
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Parse a decimal string like "12.5" into smallest units.
    ///
    /// Fractional digits beyond `decimals` are truncated: conversion floors
    /// toward zero, never rounds.
    pub fn from_decimal_str(text: &str, decimals: u8) -> OrchResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OrchestratorError::InvalidAmount("empty string".into()));
        }

        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(OrchestratorError::InvalidAmount(text.into()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(OrchestratorError::InvalidAmount(format!(
                "not a decimal number: {text}"
            )));
        }

        let scale = U256::from(10u64).pow(U256::from(decimals));
        let int_value = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part)
                .map_err(|e| OrchestratorError::InvalidAmount(e.to_string()))?
        };

        // Keep at most `decimals` fractional digits (floor toward zero),
        // then scale the kept digits up to smallest units.
        let kept: String = frac_part.chars().take(decimals as usize).collect();
        let frac_value = if kept.is_empty() {
            U256::zero()
        } else {
            let digits = U256::from_dec_str(&kept)
                .map_err(|e| OrchestratorError::InvalidAmount(e.to_string()))?;
            digits * U256::from(10u64).pow(U256::from(decimals as usize - kept.len()))
        };

        let raw = int_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| OrchestratorError::InvalidAmount(format!("overflow: {text}")))?;

        Ok(Self { raw, decimals })
    }

    /// Render as a decimal string, trailing fractional zeros trimmed
    pub fn to_decimal_string(&self) -> String {
        if self.decimals == 0 {
            return self.raw.to_string();
        }
        let scale = U256::from(10u64).pow(U256::from(self.decimals));
        let int_part = self.raw / scale;
        let frac_part = self.raw % scale;
        if frac_part.is_zero() {
            return int_part.to_string();
        }
        let digits = frac_part.to_string();
        let mut frac = "0".repeat(self.decimals as usize - digits.len());
        frac.push_str(&digits);
        format!("{}.{}", int_part, frac.trim_end_matches('0'))
    }

    pub fn checked_add(&self, other: &Amount) -> OrchResult<Amount> {
        self.require_same_units(other)?;
        let raw = self
            .raw
            .checked_add(other.raw)
            .ok_or_else(|| OrchestratorError::InvalidAmount("addition overflow".into()))?;
        Ok(Amount::from_raw(raw, self.decimals))
    }

    pub fn checked_sub(&self, other: &Amount) -> OrchResult<Amount> {
        self.require_same_units(other)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or_else(|| OrchestratorError::InvalidAmount("subtraction underflow".into()))?;
        Ok(Amount::from_raw(raw, self.decimals))
    }

    pub fn try_cmp(&self, other: &Amount) -> OrchResult<Ordering> {
        self.require_same_units(other)?;
        Ok(self.raw.cmp(&other.raw))
    }

    /// Scale by `bps` basis points, flooring toward zero.
    /// `apply_bps(9950)` keeps 99.5% of the amount (a 0.5% slippage floor).
    /// The raw value is untrusted (it may come straight from a contract
    /// read), so the intermediate product is overflow-checked.
    pub fn apply_bps(&self, bps: u64) -> OrchResult<Amount> {
        let raw = self
            .raw
            .checked_mul(U256::from(bps))
            .ok_or_else(|| {
                OrchestratorError::InvalidAmount(format!(
                    "basis-point scaling overflows: {} * {bps}",
                    self.raw
                ))
            })?
            / U256::from(10_000u64);
        Ok(Amount::from_raw(raw, self.decimals))
    }

    fn require_same_units(&self, other: &Amount) -> OrchResult<()> {
        if self.decimals != other.decimals {
            return Err(OrchestratorError::IncompatibleUnits {
                left: self.decimals,
                right: other.decimals,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_round_trip() {
        let a = Amount::from_decimal_str("12.5", 18).unwrap();
        assert_eq!(a.raw(), U256::from_dec_str("12500000000000000000").unwrap());
        assert_eq!(a.to_decimal_string(), "12.5");

        let b = Amount::from_raw(a.raw(), 18);
        assert_eq!(a, b);
    }

    #[test]
    fn parse_integer_and_fraction_only() {
        assert_eq!(
            Amount::from_decimal_str("10", 18).unwrap().raw(),
            U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            Amount::from_decimal_str(".5", 6).unwrap().raw(),
            U256::from(500_000u64)
        );
    }

    #[test]
    fn excess_fractional_digits_floor_toward_zero() {
        // 1.2345 at 2 decimals keeps 1.23, drops the rest
        let a = Amount::from_decimal_str("1.2345", 2).unwrap();
        assert_eq!(a.raw(), U256::from(123u64));
        // 0.9 at 0 decimals floors to 0
        let b = Amount::from_decimal_str("0.9", 0).unwrap();
        assert!(b.is_zero());
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(Amount::from_decimal_str("", 18).is_err());
        assert!(Amount::from_decimal_str(".", 18).is_err());
        assert!(Amount::from_decimal_str("1.2.3", 18).is_err());
        assert!(Amount::from_decimal_str("-5", 18).is_err());
        assert!(Amount::from_decimal_str("1e18", 18).is_err());
    }

    #[test]
    fn addition_is_commutative() {
        let a = Amount::from_decimal_str("1.25", 18).unwrap();
        let b = Amount::from_decimal_str("2.75", 18).unwrap();
        let ab = a.checked_add(&b).unwrap();
        let ba = b.checked_add(&a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.to_decimal_string(), "4");
    }

    #[test]
    fn mismatched_decimals_are_rejected() {
        let a = Amount::from_decimal_str("1", 18).unwrap();
        let b = Amount::from_decimal_str("1", 6).unwrap();
        assert!(matches!(
            a.checked_add(&b),
            Err(OrchestratorError::IncompatibleUnits { left: 18, right: 6 })
        ));
        assert!(a.try_cmp(&b).is_err());
    }

    #[test]
    fn subtraction_underflow_is_an_error() {
        let a = Amount::from_decimal_str("1", 18).unwrap();
        let b = Amount::from_decimal_str("2", 18).unwrap();
        assert!(a.checked_sub(&b).is_err());
        assert_eq!(b.checked_sub(&a).unwrap().to_decimal_string(), "1");
    }

    #[test]
    fn bps_floor() {
        let a = Amount::from_raw(U256::from(1000u64), 0);
        assert_eq!(a.apply_bps(9950).unwrap().raw(), U256::from(995u64));
        // floors: 999 * 9950 / 10000 = 994.005 -> 994
        let b = Amount::from_raw(U256::from(999u64), 0);
        assert_eq!(b.apply_bps(9950).unwrap().raw(), U256::from(994u64));
    }

    #[test]
    fn bps_scaling_near_the_word_limit_errors_instead_of_panicking() {
        // A hostile quote can return any 256-bit word; scaling it must
        // surface a typed error, not abort the process.
        let huge = Amount::from_raw(U256::MAX, 18);
        assert!(matches!(
            huge.apply_bps(9950),
            Err(OrchestratorError::InvalidAmount(_))
        ));
        // A word that still fits after scaling goes through.
        let edge = Amount::from_raw(U256::MAX / U256::from(10_000u64), 18);
        assert!(edge.apply_bps(9999).is_ok());
    }

    #[test]
    fn display_pads_fractional_zeros() {
        let a = Amount::from_raw(U256::from(1_000_001u64), 6);
        assert_eq!(a.to_decimal_string(), "1.000001");
        let b = Amount::from_raw(U256::from(10u64), 6);
        assert_eq!(b.to_decimal_string(), "0.00001");
    }
}
