//! Risk aggregation for a subaccount under a batch of proposed deltas.
//!
//! Every perpetual the subaccount holds or the batch touches is valued once
//! at its effective size (held + delta) and its margin added to the total.
//! The quote asset adds to net collateral one for one. The result only
//! depends on the inputs, never on update order.

use crate::margin::Risk;
use crate::perpetual::{PerpInfo, PerpInfos};
use crate::subaccount::SettledUpdate;
use crate::types::{PerpetualId, Quantums, QuoteAsset};
use crate::valuation::{initial_margin, maintenance_margin, AssetPricing};
use std::collections::BTreeMap;
use tracing::{debug, error, trace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiskError {
    /// The caller's perpetual snapshot is incomplete. This is a bug in the
    /// caller, never a condition to report to a user or retry.
    #[error("no perpetual info for {0}: every referenced perpetual must be supplied")]
    MissingPerpInfo(PerpetualId),
}

/// Risk of `update` with USDC as the quote asset.
///
/// # Panics
///
/// When `perp_infos` lacks a perpetual the subaccount holds or the update touches.
pub fn get_risk_for_subaccount(update: &SettledUpdate, perp_infos: &PerpInfos) -> Risk {
    get_risk_for_subaccount_with(&QuoteAsset::USDC, update, perp_infos)
}

/// # Panics
///
/// When `perp_infos` lacks a perpetual the subaccount holds or the update touches.
pub fn get_risk_for_subaccount_with(
    quote: &QuoteAsset,
    update: &SettledUpdate,
    perp_infos: &PerpInfos,
) -> Risk {
    match try_get_risk_for_subaccount_with(quote, update, perp_infos) {
        Ok(risk) => risk,
        Err(err) => {
            error!(error = %err, "aborting risk computation");
            panic!("{err}");
        }
    }
}

pub fn try_get_risk_for_subaccount(
    update: &SettledUpdate,
    perp_infos: &PerpInfos,
) -> Result<Risk, RiskError> {
    try_get_risk_for_subaccount_with(&QuoteAsset::USDC, update, perp_infos)
}

/// Non-panicking form. `Err` is only possible on a broken caller contract.
pub fn try_get_risk_for_subaccount_with(
    quote: &QuoteAsset,
    update: &SettledUpdate,
    perp_infos: &PerpInfos,
) -> Result<Risk, RiskError> {
    let mut risk = Risk::zero();

    for (id, quantums) in effective_perpetual_quantums(update) {
        let info = perp_infos.get(id).ok_or(RiskError::MissingPerpInfo(id))?;
        let position_risk = perpetual_risk(info, &quantums, quote);
        trace!(perpetual = %id, %quantums, risk = %position_risk, "valued perpetual");
        risk += position_risk;
    }

    risk.nc += quote_collateral(update, quote);

    debug!(
        subaccount = ?update.settled_subaccount.id,
        perpetual_updates = update.perpetual_updates.len(),
        asset_updates = update.asset_updates.len(),
        %risk,
        "computed subaccount risk"
    );
    Ok(risk)
}

/// Risk contributed by `quantums` of a single perpetual.
///
/// IMR uses the open-interest adjusted initial margin fraction. MMR always
/// derives from the unadjusted IMR, so scaling never loosens MMR <= IMR.
pub fn perpetual_risk(info: &PerpInfo, quantums: &Quantums, quote: &QuoteAsset) -> Risk {
    let tier = &info.liquidity_tier;
    let notional = info.notional(quantums, quote);

    let base_imr = initial_margin(&notional, tier.initial_margin_ppm);
    let mmr = maintenance_margin(&base_imr, tier.maintenance_fraction_ppm);

    let adjusted_ppm =
        tier.adjusted_initial_margin_ppm(info.open_interest_notional(quote).value());
    let imr = if adjusted_ppm == tier.initial_margin_ppm {
        base_imr
    } else {
        initial_margin(&notional, adjusted_ppm)
    };

    Risk {
        nc: notional,
        imr,
        mmr,
    }
}

/// held + delta for every perpetual in the subaccount or the batch, ordered by id.
pub fn effective_perpetual_quantums(update: &SettledUpdate) -> BTreeMap<PerpetualId, Quantums> {
    let mut effective: BTreeMap<PerpetualId, Quantums> = BTreeMap::new();

    for position in &update.settled_subaccount.perpetual_positions {
        *effective.entry(position.perpetual_id).or_default() += &position.quantums;
    }
    for delta in &update.perpetual_updates {
        *effective.entry(delta.perpetual_id).or_default() += &delta.quantums_delta;
    }

    effective
}

// quote balance after deltas, valued one for one. other assets are not collateral yet.
fn quote_collateral(update: &SettledUpdate, quote: &QuoteAsset) -> Quantums {
    let mut balance = Quantums::zero();

    for position in &update.settled_subaccount.asset_positions {
        if position.asset_id == quote.id {
            balance += &position.quantums;
        } else {
            trace!(asset = %position.asset_id, "skipping non-quote asset position");
        }
    }
    for delta in &update.asset_updates {
        if delta.asset_id == quote.id {
            balance += &delta.quantums_delta;
        } else {
            trace!(asset = %delta.asset_id, "skipping non-quote asset update");
        }
    }

    AssetPricing::quote(quote).value(&balance, quote.atomic_resolution)
}
