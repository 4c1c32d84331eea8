//! Collateralization verdicts for proposed subaccount updates.
//!
//! A subaccount below its maintenance requirement may only move to a state
//! that either repays bad debt without opening risk, or cures the deficit
//! outright. Everything else is rejected with `StillUndercollateralized`.

use crate::margin::Risk;
use crate::perpetual::PerpInfos;
use crate::risk::get_risk_for_subaccount_with;
use crate::subaccount::SettledUpdate;
use crate::types::QuoteAsset;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Outcome of a collateralization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum UpdateResult {
    Success,
    /// A collateralized subaccount would end up below its initial requirement.
    NewlyUndercollateralized,
    /// An undercollateralized subaccount would stay that way.
    StillUndercollateralized,
}

impl UpdateResult {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateResult::Success)
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateResult::Success => "Success",
            UpdateResult::NewlyUndercollateralized => "NewlyUndercollateralized",
            UpdateResult::StillUndercollateralized => "StillUndercollateralized",
        };
        f.write_str(s)
    }
}

/// Decides whether an undercollateralized subaccount may move from `old` to `new`.
///
/// The caller guarantees `old` is already below maintenance. `old.imr` is not read.
///
/// - `old.mmr == 0`: only bad debt is left. The move must keep `new.mmr == 0`
///   and strictly increase NC.
/// - `old.mmr > 0`: the move must bring NC back to zero or above.
pub fn is_valid_state_transition_for_undercollateralized_subaccount(
    old: &Risk,
    new: &Risk,
) -> UpdateResult {
    let valid = if old.mmr.is_zero() {
        new.mmr.is_zero() && new.nc > old.nc
    } else {
        !new.nc.is_negative()
    };

    let result = if valid {
        UpdateResult::Success
    } else {
        UpdateResult::StillUndercollateralized
    };
    debug!(old = %old, new = %new, %result, "undercollateralized transition");
    result
}

/// Full check of one settled update against USDC collateral.
///
/// # Panics
///
/// When `perp_infos` lacks a perpetual the update references.
pub fn check_update_collateralization(
    update: &SettledUpdate,
    perp_infos: &PerpInfos,
) -> UpdateResult {
    check_update_collateralization_with(&QuoteAsset::USDC, update, perp_infos)
}

/// # Panics
///
/// When `perp_infos` lacks a perpetual the update references.
pub fn check_update_collateralization_with(
    quote: &QuoteAsset,
    update: &SettledUpdate,
    perp_infos: &PerpInfos,
) -> UpdateResult {
    let old = get_risk_for_subaccount_with(quote, &update.baseline(), perp_infos);
    let new = get_risk_for_subaccount_with(quote, update, perp_infos);
    classify_transition(&old, &new)
}

/// Verdict for a transition between two already computed risks.
///
/// A subaccount between MMR and IMR may still shrink its risk: the move passes
/// when MMR does not grow and NC / MMR does not get worse.
pub fn classify_transition(old: &Risk, new: &Risk) -> UpdateResult {
    if !old.is_maintenance_collateralized() {
        return is_valid_state_transition_for_undercollateralized_subaccount(old, new);
    }
    if new.is_initial_collateralized() {
        return UpdateResult::Success;
    }

    let result = if old.is_initial_collateralized() {
        UpdateResult::NewlyUndercollateralized
    } else if reduces_risk(old, new) {
        UpdateResult::Success
    } else {
        UpdateResult::StillUndercollateralized
    };
    debug!(old = %old, new = %new, %result, "update fails initial margin");
    result
}

// new.nc / new.mmr >= old.nc / old.mmr, cross-multiplied so it stays exact
fn reduces_risk(old: &Risk, new: &Risk) -> bool {
    if new.mmr > old.mmr || !new.is_maintenance_collateralized() {
        return false;
    }
    if old.mmr.is_zero() {
        return new.nc >= old.nc;
    }
    new.nc.value() * old.mmr.value() >= old.nc.value() * new.mmr.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk(nc: i64, imr: i64, mmr: i64) -> Risk {
        Risk::new(nc, imr, mmr)
    }

    fn check(old: Risk, new: Risk) -> UpdateResult {
        is_valid_state_transition_for_undercollateralized_subaccount(&old, &new)
    }

    #[test]
    fn opening_risk_from_bad_debt_fails() {
        for new_nc in [-2, -1, 100] {
            assert_eq!(
                check(risk(-1, 0, 0), risk(new_nc, 0, 1)),
                UpdateResult::StillUndercollateralized,
                "new NC {new_nc}"
            );
        }
    }

    #[test]
    fn bad_debt_must_strictly_shrink() {
        assert_eq!(
            check(risk(-1, 0, 0), risk(-1, 0, 0)),
            UpdateResult::StillUndercollateralized
        );
        assert_eq!(
            check(risk(-1, 0, 0), risk(-2, 0, 0)),
            UpdateResult::StillUndercollateralized
        );
        assert_eq!(check(risk(-2, 0, 0), risk(-1, 0, 0)), UpdateResult::Success);
    }

    #[test]
    fn partial_cure_fails() {
        assert_eq!(
            check(risk(-2, 1, 1), risk(-1, 0, 0)),
            UpdateResult::StillUndercollateralized
        );
    }

    #[test]
    fn full_cure_succeeds() {
        assert_eq!(check(risk(-2, 1, 1), risk(0, 0, 0)), UpdateResult::Success);
        assert_eq!(check(risk(50, 200, 100), risk(10, 40, 20)), UpdateResult::Success);
    }

    #[test]
    fn old_imr_is_ignored() {
        for old_imr in [0, 1, 1_000_000] {
            assert_eq!(
                check(risk(-2, old_imr, 1), risk(-1, 0, 0)),
                UpdateResult::StillUndercollateralized
            );
            assert_eq!(
                check(risk(-2, old_imr, 0), risk(-1, 0, 0)),
                UpdateResult::Success
            );
        }
    }

    #[test]
    fn classify_routes_underwater_accounts_to_validator() {
        // old is below maintenance: even a fully margined new state must pass the validator
        assert_eq!(
            classify_transition(&risk(-1, 0, 0), &risk(999, 100, 50)),
            UpdateResult::StillUndercollateralized
        );
        assert_eq!(
            classify_transition(&risk(-5, 0, 0), &risk(0, 0, 0)),
            UpdateResult::Success
        );
    }

    #[test]
    fn classify_healthy_accounts_by_initial_margin() {
        assert_eq!(
            classify_transition(&risk(2_000, 1_000, 500), &risk(1_500, 1_500, 750)),
            UpdateResult::Success
        );
        assert_eq!(
            classify_transition(&risk(2_000, 1_000, 500), &risk(1_499, 1_500, 750)),
            UpdateResult::NewlyUndercollateralized
        );
        assert_eq!(
            classify_transition(&risk(700, 1_000, 500), &risk(700, 1_200, 600)),
            UpdateResult::StillUndercollateralized
        );
    }

    #[test]
    fn classify_lets_thin_accounts_reduce_risk() {
        let thin = risk(700, 1_000, 500);
        // partial close at the oracle price: NC unchanged, margin down
        assert_eq!(classify_transition(&thin, &risk(700, 800, 400)), UpdateResult::Success);
        // full close
        assert_eq!(classify_transition(&thin, &risk(700, 0, 0)), UpdateResult::Success);
        // closing at a loss that worsens NC / MMR
        assert_eq!(
            classify_transition(&thin, &risk(500, 800, 400)),
            UpdateResult::StillUndercollateralized
        );
        // withdrawing collateral without touching positions
        assert_eq!(
            classify_transition(&thin, &risk(600, 1_000, 500)),
            UpdateResult::StillUndercollateralized
        );
        // NC / MMR exactly preserved
        assert_eq!(classify_transition(&thin, &risk(560, 800, 400)), UpdateResult::Success);
    }

    #[test]
    fn classify_thin_account_without_maintenance_margin() {
        // zero maintenance fraction: IMR > 0 but MMR = 0, NC may only grow
        let thin = risk(100, 200, 0);
        assert_eq!(classify_transition(&thin, &risk(100, 150, 0)), UpdateResult::Success);
        assert_eq!(
            classify_transition(&thin, &risk(50, 150, 0)),
            UpdateResult::StillUndercollateralized
        );
    }

    #[test]
    fn verdict_display_and_success() {
        assert!(UpdateResult::Success.is_success());
        assert!(!UpdateResult::StillUndercollateralized.is_success());
        assert_eq!(
            UpdateResult::NewlyUndercollateralized.to_string(),
            "NewlyUndercollateralized"
        );
    }
}
