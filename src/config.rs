// 7.0 config.rs: protocol settings in one place. quote asset and liquidity tiers.
// 7.1 tiers are written as human fractions (0.05 = 5%) and converted to exact ppm.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::perpetual::LiquidityTier;
use crate::types::{PerpetualId, Ppm, QuoteAsset, ONE_MILLION};

/// Largest magnitude a market's atomic resolution or price exponent may have.
pub const MAX_MARKET_EXPONENT: i32 = 30;

/** 7.2: one liquidity tier as written in config files */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityTierConfig {
    pub id: u32,
    pub name: String,
    // Initial margin as a fraction of notional (0.05 = 20x max leverage)
    pub initial_margin_fraction: Decimal,
    // Maintenance margin as a fraction of initial margin
    pub maintenance_fraction: Decimal,
    // Open interest caps in quote quantums. upper = 0 disables scaling
    #[serde(default)]
    pub open_interest_lower_cap: u64,
    #[serde(default)]
    pub open_interest_upper_cap: u64,
}

impl LiquidityTierConfig {
    pub fn new(id: u32, name: &str, initial_margin_fraction: Decimal, maintenance_fraction: Decimal) -> Self {
        Self {
            id,
            name: name.to_string(),
            initial_margin_fraction,
            maintenance_fraction,
            open_interest_lower_cap: 0,
            open_interest_upper_cap: 0,
        }
    }

    pub fn with_open_interest_caps(mut self, lower: u64, upper: u64) -> Self {
        self.open_interest_lower_cap = lower;
        self.open_interest_upper_cap = upper;
        self
    }

    pub fn to_liquidity_tier(&self) -> Result<LiquidityTier, ConfigError> {
        let initial_margin_ppm = fraction_to_ppm(self.id, "initial_margin_fraction", self.initial_margin_fraction)?;
        let maintenance_fraction_ppm = fraction_to_ppm(self.id, "maintenance_fraction", self.maintenance_fraction)?;

        if initial_margin_ppm == 0 {
            return Err(ConfigError::InvalidTier {
                id: self.id,
                reason: "initial margin must be positive".to_string(),
            });
        }
        if self.open_interest_upper_cap != 0 && self.open_interest_lower_cap > self.open_interest_upper_cap {
            return Err(ConfigError::InvalidTier {
                id: self.id,
                reason: format!(
                    "open interest lower cap {} above upper cap {}",
                    self.open_interest_lower_cap, self.open_interest_upper_cap
                ),
            });
        }

        Ok(LiquidityTier {
            id: self.id,
            name: self.name.clone(),
            initial_margin_ppm,
            maintenance_fraction_ppm,
            open_interest_lower_cap: self.open_interest_lower_cap,
            open_interest_upper_cap: self.open_interest_upper_cap,
        })
    }
}

/// Converts a fraction in [0, 1] to ppm. Rejects anything finer than one ppm.
pub fn fraction_to_ppm(tier: u32, field: &'static str, fraction: Decimal) -> Result<Ppm, ConfigError> {
    if fraction < Decimal::ZERO || fraction > Decimal::ONE {
        return Err(ConfigError::FractionOutOfRange { tier, field, value: fraction });
    }
    let scaled = fraction * Decimal::from(ONE_MILLION);
    if scaled.fract() != Decimal::ZERO {
        return Err(ConfigError::FractionNotWholePpm { tier, field, value: fraction });
    }
    scaled
        .to_u32()
        .ok_or(ConfigError::FractionOutOfRange { tier, field, value: fraction })
}

/// Back to a human fraction, for logs and reports.
pub fn ppm_to_fraction(ppm: Ppm) -> Decimal {
    Decimal::from(ppm) / Decimal::from(ONE_MILLION)
}

// Complete risk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub environment: Environment,
    #[serde(default)]
    pub quote_asset: QuoteAsset,
    pub liquidity_tiers: Vec<LiquidityTierConfig>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            quote_asset: QuoteAsset::USDC,
            liquidity_tiers: standard_tiers(),
        }
    }
}

// Large-Cap, Mid-Cap, Long-Tail, Safety
fn standard_tiers() -> Vec<LiquidityTierConfig> {
    vec![
        LiquidityTierConfig::new(0, "Large-Cap", dec!(0.05), dec!(0.6)),
        LiquidityTierConfig::new(1, "Mid-Cap", dec!(0.1), dec!(0.5)),
        LiquidityTierConfig::new(2, "Long-Tail", dec!(0.2), dec!(0.5)),
        LiquidityTierConfig::new(3, "Safety", dec!(1), dec!(0.2)),
    ]
}

impl RiskConfig {
    // Testnet keeps the standard tiers with no open interest scaling
    pub fn testnet() -> Self {
        Self {
            environment: Environment::Testnet,
            ..Self::default()
        }
    }

    // Mainnet scales initial margin with open interest on every tradeable tier
    pub fn mainnet() -> Self {
        let mut config = Self {
            environment: Environment::Mainnet,
            ..Self::default()
        };
        // caps in USDC quote quantums: $20M-$50M, $5M-$10M, $500k-$1M
        let caps: [(u64, u64); 3] = [
            (20_000_000_000_000, 50_000_000_000_000),
            (5_000_000_000_000, 10_000_000_000_000),
            (500_000_000_000, 1_000_000_000_000),
        ];
        for (tier, (lower, upper)) in config.liquidity_tiers.iter_mut().zip(caps) {
            tier.open_interest_lower_cap = lower;
            tier.open_interest_upper_cap = upper;
        }
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RiskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liquidity_tiers.is_empty() {
            return Err(ConfigError::NoLiquidityTiers);
        }

        let mut seen = HashSet::new();
        for tier in &self.liquidity_tiers {
            if !seen.insert(tier.id) {
                return Err(ConfigError::DuplicateTier(tier.id));
            }
            tier.to_liquidity_tier()?;
        }

        // quote resolution enters every exponent; keep it in a sane range
        if !(-18..=0).contains(&self.quote_asset.atomic_resolution) {
            return Err(ConfigError::InvalidQuoteResolution(self.quote_asset.atomic_resolution));
        }

        Ok(())
    }

    // Market data enters valuation as powers of ten; reject scales no real market uses
    pub fn validate_market(
        &self,
        perpetual: PerpetualId,
        atomic_resolution: i32,
        price_exponent: i32,
    ) -> Result<(), ConfigError> {
        let range = -MAX_MARKET_EXPONENT..=MAX_MARKET_EXPONENT;
        for (field, value) in [("atomic_resolution", atomic_resolution), ("price_exponent", price_exponent)] {
            if !range.contains(&value) {
                return Err(ConfigError::ExponentOutOfRange { perpetual, field, value });
            }
        }
        Ok(())
    }

    pub fn liquidity_tiers(&self) -> Result<Vec<LiquidityTier>, ConfigError> {
        self.liquidity_tiers.iter().map(LiquidityTierConfig::to_liquidity_tier).collect()
    }

    pub fn liquidity_tier(&self, id: u32) -> Result<LiquidityTier, ConfigError> {
        self.liquidity_tiers
            .iter()
            .find(|t| t.id == id)
            .ok_or(ConfigError::UnknownTier(id))?
            .to_liquidity_tier()
    }
}

// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no liquidity tiers configured")]
    NoLiquidityTiers,

    #[error("liquidity tier {0} defined twice")]
    DuplicateTier(u32),

    #[error("liquidity tier {0} not configured")]
    UnknownTier(u32),

    #[error("tier {id}: {reason}")]
    InvalidTier { id: u32, reason: String },

    #[error("tier {tier}: {field} = {value} is outside [0, 1]")]
    FractionOutOfRange { tier: u32, field: &'static str, value: Decimal },

    #[error("tier {tier}: {field} = {value} is not a whole number of ppm")]
    FractionNotWholePpm { tier: u32, field: &'static str, value: Decimal },

    #[error("quote atomic resolution {0} outside [-18, 0]")]
    InvalidQuoteResolution(i32),

    #[error("{perpetual}: {field} = {value} outside [-{max}, {max}]", max = MAX_MARKET_EXPONENT)]
    ExponentOutOfRange { perpetual: PerpetualId, field: &'static str, value: i32 },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> RiskConfig {
        match self {
            Environment::Development => RiskConfig::default(),
            Environment::Testnet => RiskConfig::testnet(),
            Environment::Mainnet => RiskConfig::mainnet(),
        }
    }
}
