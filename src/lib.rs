// subaccount-risk: solvency gate for perpetual subaccounts.
// every balance changing update is valued here before it is committed.
// all computation is exact integer math with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ids, Quantums, MarketPrice, ppm, QuoteAsset
//   2.x  valuation.rs: quantums -> quote notional, ppm margin math
//   3.x  perpetual.rs: liquidity tiers, perpetual params, PerpInfo snapshots
//   4.x  subaccount.rs: subaccount snapshots, proposed deltas, SettledUpdate
//   5.x  margin.rs: Risk {NC, IMR, MMR} and collateralization predicates
//   6.x  risk.rs: risk aggregation over held positions + deltas
//   6.1  collateral.rs: undercollateralized transition gate, UpdateResult
//   7.x  config.rs: quote asset, liquidity tier presets, env presets

pub mod collateral;
pub mod config;
pub mod margin;
pub mod perpetual;
pub mod risk;
pub mod subaccount;
pub mod types;
pub mod valuation;

// re exports for convenience
pub use collateral::*;
pub use margin::*;
pub use perpetual::*;
pub use risk::*;
pub use subaccount::*;
pub use types::*;
pub use valuation::*;
pub use config::{ppm_to_fraction, ConfigError, Environment, LiquidityTierConfig, RiskConfig, MAX_MARKET_EXPONENT};
