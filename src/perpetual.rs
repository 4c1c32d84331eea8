//! Perpetual market data the risk engine reads.
//!
//! A [`PerpInfo`] joins a perpetual's params with its oracle price and
//! liquidity tier. Callers hand the engine a [`PerpInfos`] snapshot holding
//! every perpetual an update can touch.

use crate::types::{MarketId, MarketPrice, PerpetualId, Ppm, Quantums, QuoteAsset, ONE_MILLION};
use crate::valuation::quote_quantums;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Margin parameters shared by a group of perpetuals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityTier {
    pub id: u32,
    pub name: String,
    /// Initial margin fraction of notional.
    pub initial_margin_ppm: Ppm,
    /// Maintenance margin as a fraction of initial margin.
    pub maintenance_fraction_ppm: Ppm,
    /// Open interest (quote quantums) where initial margin scaling starts.
    pub open_interest_lower_cap: u64,
    /// Open interest (quote quantums) where initial margin reaches 100%. 0 disables scaling.
    pub open_interest_upper_cap: u64,
}

impl LiquidityTier {
    pub fn new(id: u32, initial_margin_ppm: Ppm, maintenance_fraction_ppm: Ppm) -> Self {
        Self {
            id,
            name: format!("tier-{id}"),
            initial_margin_ppm,
            maintenance_fraction_ppm,
            open_interest_lower_cap: 0,
            open_interest_upper_cap: 0,
        }
    }

    pub fn with_open_interest_caps(mut self, lower: u64, upper: u64) -> Self {
        self.open_interest_lower_cap = lower;
        self.open_interest_upper_cap = upper;
        self
    }

    /// Maintenance margin fraction of notional.
    pub fn maintenance_margin_ppm(&self) -> Ppm {
        let scaled = u64::from(self.initial_margin_ppm) * u64::from(self.maintenance_fraction_ppm)
            / u64::from(ONE_MILLION);
        // both factors are at most 1e6, so the product over 1e6 fits
        Ppm::try_from(scaled).unwrap_or(ONE_MILLION)
    }

    /// Initial margin fraction after open interest scaling.
    ///
    /// Linear from `initial_margin_ppm` at the lower cap to 100% at the upper cap.
    pub fn adjusted_initial_margin_ppm(&self, open_interest_notional: &BigInt) -> Ppm {
        let base = self.initial_margin_ppm.min(ONE_MILLION);
        if self.open_interest_upper_cap == 0 {
            return base;
        }

        let lower = BigInt::from(self.open_interest_lower_cap);
        let upper = BigInt::from(self.open_interest_upper_cap);
        if *open_interest_notional <= lower {
            return base;
        }
        if *open_interest_notional >= upper {
            return ONE_MILLION;
        }

        let headroom = BigInt::from(ONE_MILLION - base);
        let scaled = headroom * (open_interest_notional - &lower) / (upper - lower);
        // scaled < headroom here, so the sum stays within 1e6
        base + Ppm::try_from(scaled).unwrap_or(ONE_MILLION - base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetualParams {
    pub id: PerpetualId,
    pub ticker: String,
    pub market_id: MarketId,
    pub atomic_resolution: i32,
    pub liquidity_tier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perpetual {
    pub params: PerpetualParams,
    pub funding_index: Quantums,
    /// Total open interest in base quantums.
    pub open_interest: Quantums,
}

impl Perpetual {
    pub fn new(params: PerpetualParams) -> Self {
        Self {
            params,
            funding_index: Quantums::zero(),
            open_interest: Quantums::zero(),
        }
    }

    pub fn id(&self) -> PerpetualId {
        self.params.id
    }
}

/// Everything needed to value and margin one perpetual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpInfo {
    pub perpetual: Perpetual,
    pub price: MarketPrice,
    pub liquidity_tier: LiquidityTier,
}

impl PerpInfo {
    pub fn new(perpetual: Perpetual, price: MarketPrice, liquidity_tier: LiquidityTier) -> Self {
        Self {
            perpetual,
            price,
            liquidity_tier,
        }
    }

    pub fn id(&self) -> PerpetualId {
        self.perpetual.id()
    }

    pub fn atomic_resolution(&self) -> i32 {
        self.perpetual.params.atomic_resolution
    }

    /// Quote value of `quantums` of this perpetual.
    pub fn notional(&self, quantums: &Quantums, quote: &QuoteAsset) -> Quantums {
        quote_quantums(
            quantums,
            self.atomic_resolution(),
            &self.price,
            quote.atomic_resolution,
        )
    }

    /// Quote value of the market's open interest. Drives initial margin scaling.
    pub fn open_interest_notional(&self, quote: &QuoteAsset) -> Quantums {
        self.notional(&self.perpetual.open_interest.abs(), quote)
    }
}

/// Immutable perpetual snapshot keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerpInfos(HashMap<PerpetualId, PerpInfo>);

impl PerpInfos {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, info: PerpInfo) -> Option<PerpInfo> {
        self.0.insert(info.id(), info)
    }

    pub fn get(&self, id: PerpetualId) -> Option<&PerpInfo> {
        self.0.get(&id)
    }

    pub fn contains(&self, id: PerpetualId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PerpetualId, &PerpInfo)> {
        self.0.iter()
    }
}

impl FromIterator<PerpInfo> for PerpInfos {
    fn from_iter<I: IntoIterator<Item = PerpInfo>>(iter: I) -> Self {
        Self(iter.into_iter().map(|info| (info.id(), info)).collect())
    }
}
