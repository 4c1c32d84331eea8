//! Subaccount risk simulation.
//!
//! Runs the built-in scenarios, or evaluates a JSON scenario file when a
//! path is given: `risk-sim scenario.json`. Set `RUST_LOG=debug` to see
//! every risk computation and verdict.

use serde::Deserialize;
use std::error::Error;
use subaccount_risk::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(path) = std::env::args().nth(1) {
        return run_scenario_file(&path);
    }

    println!("Subaccount Risk Simulation");
    println!("Cross margin, USDC quote, exact integer valuation\n");

    let config = RiskConfig::default();
    config.validate()?;

    scenario_1_healthy_account(&config)?;
    scenario_2_delta_batch(&config)?;
    scenario_3_bad_debt_repayment(&config)?;
    scenario_4_curing_a_deficit(&config)?;
    scenario_5_open_interest_scaling()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

/// One perpetual market in a scenario.
#[derive(Debug, Deserialize)]
struct ScenarioMarket {
    id: u32,
    ticker: String,
    atomic_resolution: i32,
    price: u64,
    #[serde(default)]
    exponent: i32,
    liquidity_tier: u32,
    #[serde(default)]
    open_interest: Quantums,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: Option<RiskConfig>,
    markets: Vec<ScenarioMarket>,
    update: SettledUpdate,
}

fn build_perp_infos(config: &RiskConfig, markets: &[ScenarioMarket]) -> Result<PerpInfos, ConfigError> {
    let mut infos = PerpInfos::new();
    for market in markets {
        config.validate_market(PerpetualId(market.id), market.atomic_resolution, market.exponent)?;
        let mut perpetual = Perpetual::new(PerpetualParams {
            id: PerpetualId(market.id),
            ticker: market.ticker.clone(),
            market_id: MarketId(market.id),
            atomic_resolution: market.atomic_resolution,
            liquidity_tier: market.liquidity_tier,
        });
        perpetual.open_interest = market.open_interest.clone();
        infos.insert(PerpInfo::new(
            perpetual,
            MarketPrice::new(MarketId(market.id), market.price, market.exponent),
            config.liquidity_tier(market.liquidity_tier)?,
        ));
    }
    Ok(infos)
}

fn market(id: u32, ticker: &str, atomic_resolution: i32, price: u64, exponent: i32, tier: u32) -> ScenarioMarket {
    ScenarioMarket {
        id,
        ticker: ticker.to_string(),
        atomic_resolution,
        price,
        exponent,
        liquidity_tier: tier,
        open_interest: Quantums::zero(),
    }
}

fn run_scenario_file(path: &str) -> Result<(), Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&raw)?;
    let config = scenario.config.unwrap_or_default();
    config.validate()?;
    info!(path, environment = ?config.environment, markets = scenario.markets.len(), "loaded scenario");

    let infos = build_perp_infos(&config, &scenario.markets)?;
    report(&config, &scenario.update, &infos);
    Ok(())
}

fn report(config: &RiskConfig, update: &SettledUpdate, infos: &PerpInfos) -> UpdateResult {
    let quote = &config.quote_asset;
    let old = get_risk_for_subaccount_with(quote, &update.baseline(), infos);
    let new = get_risk_for_subaccount_with(quote, update, infos);
    let verdict = classify_transition(&old, &new);

    println!("  before: {old}");
    println!("  after:  {new}");
    println!("  free collateral: {} -> {}", old.free_collateral(), new.free_collateral());
    println!("  verdict: {verdict}\n");
    verdict
}

/// Spot account with one long and some USDC.
fn scenario_1_healthy_account(config: &RiskConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: Healthy Account\n");

    let infos = build_perp_infos(config, &[market(1, "BTC-USD", -10, 50_000_000, -3, 0)])?;
    // 0.1 BTC long at $50k with $1,000 USDC
    let account = Subaccount::new(SubaccountId::new("alice", 0))
        .with_perpetual(PerpetualPosition::new(PerpetualId(1), 1_000_000_000i64))
        .with_asset(AssetPosition::new(QuoteAsset::USDC.id, 1_000_000_000i64));

    let risk = get_risk_for_subaccount(&SettledUpdate::new(account), &infos);
    println!("  0.1 BTC long @ $50,000 with $1,000 USDC");
    println!("  {risk}");
    println!("  initial collateralized: {}\n", risk.is_initial_collateralized());
    Ok(())
}

/// A trade plus a deposit evaluated as one batch.
fn scenario_2_delta_batch(config: &RiskConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Trade and Deposit Batch\n");

    let infos = build_perp_infos(
        config,
        &[
            market(1, "BTC-USD", -10, 50_000_000, -3, 0),
            market(2, "ETH-USD", -9, 3_000_000, -3, 1),
        ],
    )?;
    let account = Subaccount::new(SubaccountId::new("bob", 0))
        .with_perpetual(PerpetualPosition::new(PerpetualId(1), 1_000_000_000i64))
        .with_asset(AssetPosition::new(QuoteAsset::USDC.id, 1_000_000_000i64));

    // short 2 ETH, deposit $200
    let update = SettledUpdate::new(account)
        .with_perpetual_update(PerpetualUpdate::new(PerpetualId(2), -2_000_000_000i64))
        .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 200_000_000i64));

    println!("  Bob shorts 2 ETH @ $3,000 and deposits $200");
    report(config, &update, &infos);
    Ok(())
}

/// An account left with bad debt and no positions.
fn scenario_3_bad_debt_repayment(config: &RiskConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Bad Debt Repayment\n");

    let infos = build_perp_infos(config, &[market(1, "BTC-USD", -10, 50_000_000, -3, 0)])?;
    let account = Subaccount::new(SubaccountId::new("carol", 0))
        .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -50_000_000i64));

    println!("  Carol owes $50 with no open positions");
    println!("  Deposit $10:");
    let repay = SettledUpdate::new(account.clone())
        .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 10_000_000i64));
    report(config, &repay, &infos);

    println!("  Deposit $1,000 and buy 0.001 BTC:");
    let reopen = SettledUpdate::new(account)
        .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 1_000_000_000i64))
        .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), 10_000_000i64));
    report(config, &reopen, &infos);
    Ok(())
}

/// A leveraged long after a crash: partial fixes are rejected, a full cure passes.
fn scenario_4_curing_a_deficit(config: &RiskConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: Curing a Deficit\n");

    // BTC crashed to $40k
    let infos = build_perp_infos(config, &[market(1, "BTC-USD", -10, 40_000_000, -3, 0)])?;
    // 1 BTC long, borrowed $41,000 of USDC to fund it
    let account = Subaccount::new(SubaccountId::new("dave", 0))
        .with_perpetual(PerpetualPosition::new(PerpetualId(1), 10_000_000_000i64))
        .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -41_000_000_000i64));

    println!("  Dave is 1 BTC long @ $40,000 with -$41,000 USDC");
    println!("  Deposit $500:");
    let partial = SettledUpdate::new(account.clone())
        .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 500_000_000i64));
    report(config, &partial, &infos);

    println!("  Deposit $1,000:");
    let cure = SettledUpdate::new(account)
        .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 1_000_000_000i64));
    report(config, &cure, &infos);
    Ok(())
}

/// Initial margin climbs as the market's open interest crosses its caps.
fn scenario_5_open_interest_scaling() -> Result<(), Box<dyn Error>> {
    println!("Scenario 5: Open Interest Scaling (mainnet tiers)\n");

    let config = Environment::Mainnet.config();
    config.validate()?;

    // $35M of open interest: halfway between the large-cap caps
    let mut btc = market(1, "BTC-USD", -10, 50_000_000, -3, 0);
    btc.open_interest = Quantums::from(7_000_000_000_000i64);
    let infos = build_perp_infos(&config, &[btc])?;
    let info = infos.get(PerpetualId(1)).ok_or("BTC-USD market missing")?;
    let tier = &info.liquidity_tier;
    let adjusted = tier.adjusted_initial_margin_ppm(info.open_interest_notional(&config.quote_asset).value());

    let account = Subaccount::new(SubaccountId::new("erin", 0))
        .with_perpetual(PerpetualPosition::new(PerpetualId(1), 10_000_000_000i64));
    let risk = get_risk_for_subaccount_with(&config.quote_asset, &SettledUpdate::new(account), &infos);

    println!("  1 BTC long with $35M market open interest");
    println!("  {risk}");
    println!(
        "  initial margin fraction {} -> {}",
        ppm_to_fraction(tier.initial_margin_ppm),
        ppm_to_fraction(adjusted)
    );
    println!(
        "  maintenance margin fraction stays {}\n",
        ppm_to_fraction(tier.maintenance_margin_ppm())
    );
    Ok(())
}
