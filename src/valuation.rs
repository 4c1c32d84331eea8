//! Fixed-point valuation of quantums in the quote currency.
//!
//! A position of `q` quantums at atomic resolution `r`, priced at
//! `p * 10^e`, is worth `q * p * 10^(r + e - quote_resolution)` quote
//! quantums. Everything is done on unbounded integers and any division
//! truncates toward zero. Margin fractions are applied in ppm as the very
//! last step so no rounding leaks into intermediate values.

use crate::types::{MarketPrice, Ppm, Quantums, QuoteAsset, ONE_MILLION};
use num_bigint::BigInt;
use num_traits::{Pow, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How to turn one asset's quantums into quote quantums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPricing {
    pub atomic_resolution: i32,
    pub price: MarketPrice,
}

impl AssetPricing {
    pub fn new(atomic_resolution: i32, price: MarketPrice) -> Self {
        Self {
            atomic_resolution,
            price,
        }
    }

    /// Identity pricing: one quote quantum is worth one quote quantum.
    pub fn quote(quote: &QuoteAsset) -> Self {
        Self {
            atomic_resolution: quote.atomic_resolution,
            price: MarketPrice::unit(),
        }
    }

    pub fn value(&self, quantums: &Quantums, quote_atomic_resolution: i32) -> Quantums {
        quote_quantums(
            quantums,
            self.atomic_resolution,
            &self.price,
            quote_atomic_resolution,
        )
    }
}

pub fn pow10(exponent: u64) -> BigInt {
    Pow::pow(BigInt::from(10u32), exponent)
}

/// Converts `quantums` to quote quantums. Negative combined exponents truncate toward zero.
pub fn quote_quantums(
    quantums: &Quantums,
    atomic_resolution: i32,
    price: &MarketPrice,
    quote_atomic_resolution: i32,
) -> Quantums {
    let raw = quantums.value() * BigInt::from(price.price);
    // i64 so the sum of three i32 exponents cannot wrap.
    let exponent =
        i64::from(atomic_resolution) + i64::from(price.exponent) - i64::from(quote_atomic_resolution);

    let scaled = match exponent.cmp(&0) {
        Ordering::Equal => raw,
        Ordering::Greater => raw * pow10(exponent.unsigned_abs()),
        Ordering::Less => truncating_shift(raw, exponent.unsigned_abs()),
    };
    Quantums::new(scaled)
}

// raw / 10^shift without building 10^shift when the quotient is already known to be zero.
fn truncating_shift(raw: BigInt, shift: u64) -> BigInt {
    // |raw| < 2^bits <= 2^(3 * shift) < 10^shift
    if raw.bits() <= shift.saturating_mul(3) {
        return BigInt::zero();
    }
    raw / pow10(shift)
}

/// `value * ppm / 1_000_000`, truncated toward zero.
pub fn mul_ppm(value: &BigInt, ppm: Ppm) -> BigInt {
    if ppm == 0 || value.is_zero() {
        return BigInt::zero();
    }
    value * BigInt::from(ppm) / BigInt::from(ONE_MILLION)
}

pub fn initial_margin(notional: &Quantums, initial_margin_ppm: Ppm) -> Quantums {
    Quantums::new(mul_ppm(&notional.value().abs(), initial_margin_ppm))
}

pub fn maintenance_margin(initial_margin: &Quantums, maintenance_fraction_ppm: Ppm) -> Quantums {
    Quantums::new(mul_ppm(initial_margin.value(), maintenance_fraction_ppm))
}
