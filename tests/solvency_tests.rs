//! Solvency gate tests.
//!
//! End to end checks of risk aggregation and the undercollateralized
//! transition gate on concrete subaccounts.

use subaccount_risk::*;

fn perp_info(id: u32, atomic_resolution: i32, price: u64, exponent: i32) -> PerpInfo {
    PerpInfo::new(
        Perpetual::new(PerpetualParams {
            id: PerpetualId(id),
            ticker: "test ticker".to_string(),
            market_id: MarketId(id),
            atomic_resolution,
            liquidity_tier: id,
        }),
        MarketPrice::new(MarketId(id), price, exponent),
        LiquidityTier::new(id, 100_000, 500_000),
    )
}

fn test_infos() -> PerpInfos {
    [perp_info(1, -6, 100, 0), perp_info(2, -6, 200, 0)]
        .into_iter()
        .collect()
}

fn test_account() -> Subaccount {
    Subaccount::new(SubaccountId::new("test", 1))
        .with_perpetual(PerpetualPosition::new(PerpetualId(1), 100i64))
        .with_asset(AssetPosition::new(QuoteAsset::USDC.id, 100i64))
}

mod aggregation {
    use super::*;

    #[test]
    fn no_account() {
        let risk = get_risk_for_subaccount(&SettledUpdate::default(), &PerpInfos::new());
        assert_eq!(risk, Risk::zero());
    }

    #[test]
    fn no_updates() {
        let risk = get_risk_for_subaccount(&SettledUpdate::new(test_account()), &test_infos());
        assert_eq!(risk, Risk::new(10_100i64, 1_000i64, 500i64));
    }

    #[test]
    fn one_update() {
        let update = SettledUpdate::new(test_account())
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(2), -25i64))
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 10i64));
        let risk = get_risk_for_subaccount(&update, &test_infos());
        assert_eq!(risk, Risk::new(5_110i64, 1_500i64, 750i64));
    }

    #[test]
    #[should_panic(expected = "no perpetual info")]
    fn panics_on_missing_perp_info() {
        get_risk_for_subaccount(&SettledUpdate::new(test_account()), &PerpInfos::new());
    }

    #[test]
    fn try_variant_reports_the_missing_id() {
        let err = try_get_risk_for_subaccount(&SettledUpdate::new(test_account()), &PerpInfos::new())
            .unwrap_err();
        assert_eq!(err, RiskError::MissingPerpInfo(PerpetualId(1)));
    }

    #[test]
    fn price_exponent_shifts_notional() {
        // same position priced at 1e2 instead of 100e0
        let infos: PerpInfos = [perp_info(1, -6, 1, 2)].into_iter().collect();
        let risk = get_risk_for_subaccount(&SettledUpdate::new(test_account()), &infos);
        assert_eq!(risk, Risk::new(10_100i64, 1_000i64, 500i64));
    }

    #[test]
    fn settled_update_from_json_fixture() {
        let json = r#"{
            "settled_subaccount": {
                "id": { "owner": "test", "number": 1 },
                "perpetual_positions": [{ "perpetual_id": 1, "quantums": "100", "funding_index": "0" }],
                "asset_positions": [{ "asset_id": 0, "quantums": "100" }]
            },
            "perpetual_updates": [{ "perpetual_id": 2, "quantums_delta": "-25" }],
            "asset_updates": [{ "asset_id": 0, "quantums_delta": "10" }]
        }"#;
        let update: SettledUpdate = serde_json::from_str(json).unwrap();
        let risk = get_risk_for_subaccount(&update, &test_infos());
        assert_eq!(risk, Risk::new(5_110i64, 1_500i64, 750i64));

        let encoded = serde_json::to_string(&risk).unwrap();
        assert_eq!(encoded, r#"{"nc":"5110","imr":"1500","mmr":"750"}"#);
    }
}

mod undercollateralized_transitions {
    use super::*;

    fn check(old: (i64, i64, i64), new: (i64, i64)) -> UpdateResult {
        is_valid_state_transition_for_undercollateralized_subaccount(
            &Risk::new(old.0, old.1, old.2),
            &Risk::new(new.0, 0i64, new.1),
        )
    }

    #[test]
    fn fails_when_mmr_increases_and_nc_decreases() {
        assert_eq!(check((-1, 0, 0), (-2, 1)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn fails_when_mmr_increases_and_nc_stays_the_same() {
        assert_eq!(check((-1, 0, 0), (-1, 1)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn fails_when_mmr_increases_and_nc_increases() {
        assert_eq!(check((-1, 0, 0), (100, 1)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn fails_when_both_mmr_zero_and_nc_stays_the_same() {
        assert_eq!(check((-1, 0, 0), (-1, 0)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn fails_when_both_mmr_zero_and_nc_decreases() {
        assert_eq!(check((-1, 0, 0), (-2, 0)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn succeeds_when_both_mmr_zero_and_nc_increases() {
        assert_eq!(check((-2, 0, 0), (-1, 0)), UpdateResult::Success);
    }

    #[test]
    fn fails_when_mmr_drops_to_zero_but_nc_still_negative() {
        assert_eq!(check((-2, 1, 1), (-1, 0)), UpdateResult::StillUndercollateralized);
    }

    #[test]
    fn succeeds_when_deficit_fully_cured() {
        assert_eq!(check((-2, 1, 1), (0, 0)), UpdateResult::Success);
        assert_eq!(check((-2, 1, 1), (5, 3)), UpdateResult::Success);
    }
}

mod full_check {
    use super::*;

    #[test]
    fn healthy_account_trade_within_initial_margin() {
        let update = SettledUpdate::new(test_account())
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(2), -25i64));
        assert_eq!(check_update_collateralization(&update, &test_infos()), UpdateResult::Success);
    }

    #[test]
    fn healthy_account_overtrading_is_newly_undercollateralized() {
        // shorting 1_000 of perp 2 needs 20_000 IMR on top of 1_000
        let update = SettledUpdate::new(test_account())
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(2), -1_000i64));
        assert_eq!(
            check_update_collateralization(&update, &test_infos()),
            UpdateResult::NewlyUndercollateralized
        );
    }

    #[test]
    fn bad_debt_account_can_repay() {
        let account = Subaccount::new(SubaccountId::new("debt", 0))
            .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -50i64));
        let repay = SettledUpdate::new(account.clone())
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 10i64));
        assert_eq!(check_update_collateralization(&repay, &test_infos()), UpdateResult::Success);

        let reopen = SettledUpdate::new(account)
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 10_000i64))
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), 1i64));
        assert_eq!(
            check_update_collateralization(&reopen, &test_infos()),
            UpdateResult::StillUndercollateralized
        );
    }

    #[test]
    fn underwater_long_must_cure_fully() {
        // 100 long at 100 = 10_000 notional against -10_300 USDC => NC -300, MMR 500
        let account = Subaccount::new(SubaccountId::new("underwater", 0))
            .with_perpetual(PerpetualPosition::new(PerpetualId(1), 100i64))
            .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -10_300i64));

        // selling half at the oracle price only moves value from notional to USDC
        let partial = SettledUpdate::new(account.clone())
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), -50i64))
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 5_000i64));
        assert_eq!(
            check_update_collateralization(&partial, &test_infos()),
            UpdateResult::StillUndercollateralized
        );

        let cured = SettledUpdate::new(account)
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 300i64));
        assert_eq!(check_update_collateralization(&cured, &test_infos()), UpdateResult::Success);
    }

    #[test]
    fn between_maintenance_and_initial_stays_blocked() {
        // NC 700 between MMR 500 and IMR 1_000
        let account = Subaccount::new(SubaccountId::new("thin", 0))
            .with_perpetual(PerpetualPosition::new(PerpetualId(1), 100i64))
            .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -9_300i64));
        let adding = SettledUpdate::new(account)
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), 10i64))
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, -1_000i64));
        assert_eq!(
            check_update_collateralization(&adding, &test_infos()),
            UpdateResult::StillUndercollateralized
        );
    }

    #[test]
    fn between_maintenance_and_initial_can_reduce() {
        // NC 700, IMR 1_000, MMR 500
        let account = Subaccount::new(SubaccountId::new("thin", 0))
            .with_perpetual(PerpetualPosition::new(PerpetualId(1), 100i64))
            .with_asset(AssetPosition::new(QuoteAsset::USDC.id, -9_300i64));

        // selling 20 at the oracle price: NC 700, IMR 800, MMR 400
        let reduce = SettledUpdate::new(account.clone())
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), -20i64))
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 2_000i64));
        let infos = test_infos();
        assert_eq!(get_risk_for_subaccount(&reduce, &infos), Risk::new(700i64, 800i64, 400i64));
        assert_eq!(check_update_collateralization(&reduce, &infos), UpdateResult::Success);

        // the same sale far below the oracle price leaves NC 200 against MMR 400
        let dumped = SettledUpdate::new(account)
            .with_perpetual_update(PerpetualUpdate::new(PerpetualId(1), -20i64))
            .with_asset_update(AssetUpdate::new(QuoteAsset::USDC.id, 1_500i64));
        assert_eq!(
            check_update_collateralization(&dumped, &infos),
            UpdateResult::StillUndercollateralized
        );
    }
}
