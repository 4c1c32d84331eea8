// 1.0: all the primitives live here. ids, quantums, prices, ppm scale, quote asset.
// every amount is an exact integer. nothing in the risk path touches floats.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PerpetualId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

impl fmt::Display for PerpetualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "perp#{}", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Parts per million. margin fractions live on this scale.
pub type Ppm = u32;

pub const ONE_MILLION: Ppm = 1_000_000;

// 1.1: signed quantums. the smallest unit of an asset or a perpetual position.
// positive = long / credit, negative = short / debit. unbounded so no amount can overflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Quantums(BigInt);

impl Quantums {
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn value(&self) -> &BigInt {
        &self.0
    }

    pub fn into_inner(self) -> BigInt {
        self.0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

impl From<BigInt> for Quantums {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantums {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<u64> for Quantums {
    fn from(value: u64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<i128> for Quantums {
    fn from(value: i128) -> Self {
        Self(BigInt::from(value))
    }
}

impl fmt::Display for Quantums {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quantums {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantums {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantums {
    type Output = Quantums;

    fn add(self, rhs: Quantums) -> Quantums {
        Quantums(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Quantums> for &'a Quantums {
    type Output = Quantums;

    fn add(self, rhs: &'a Quantums) -> Quantums {
        Quantums(&self.0 + &rhs.0)
    }
}

impl Sub for Quantums {
    type Output = Quantums;

    fn sub(self, rhs: Quantums) -> Quantums {
        Quantums(self.0 - rhs.0)
    }
}

impl AddAssign<&Quantums> for Quantums {
    fn add_assign(&mut self, rhs: &Quantums) {
        self.0 += &rhs.0;
    }
}

impl AddAssign for Quantums {
    fn add_assign(&mut self, rhs: Quantums) {
        self.0 += rhs.0;
    }
}

impl Neg for Quantums {
    type Output = Quantums;

    fn neg(self) -> Quantums {
        Quantums(-self.0)
    }
}

impl Sum for Quantums {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc + q)
    }
}

impl<'a> Sum<&'a Quantums> for Quantums {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, q| {
            acc += q;
            acc
        })
    }
}

// serialized as a decimal string so JSON never loses precision.
// plain integers are accepted on input for hand written fixtures.
impl Serialize for Quantums {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Quantums {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(Self::from(v)),
            Repr::Str(s) => s
                .trim()
                .parse::<BigInt>()
                .map(Self)
                .map_err(|e| de::Error::custom(format!("invalid quantums {s:?}: {e}"))),
        }
    }
}

// 1.2: oracle price. price per standard unit = price * 10^exponent in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub id: MarketId,
    pub price: u64,
    pub exponent: i32,
}

impl MarketPrice {
    pub fn new(id: MarketId, price: u64, exponent: i32) -> Self {
        Self { id, price, exponent }
    }

    /// Price of exactly one standard unit, used to value the quote asset against itself.
    pub fn unit() -> Self {
        Self {
            id: MarketId(0),
            price: 1,
            exponent: 0,
        }
    }
}

impl fmt::Display for MarketPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.price, self.exponent)
    }
}

// 1.3: the asset every notional is denominated in. protocol wide, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAsset {
    pub id: AssetId,
    pub atomic_resolution: i32,
}

impl QuoteAsset {
    /// USDC: asset 0, six decimals.
    pub const USDC: QuoteAsset = QuoteAsset {
        id: AssetId(0),
        atomic_resolution: -6,
    };
}

impl Default for QuoteAsset {
    fn default() -> Self {
        Self::USDC
    }
}
