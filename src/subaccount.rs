//! Subaccount snapshots and the proposed deltas applied on top of them.
//!
//! A [`SettledUpdate`] is the unit of work for risk computation: a subaccount
//! with funding already settled plus the perpetual and asset changes a
//! transaction wants to make. Nothing here is mutated in place.

use crate::types::{AssetId, PerpetualId, Quantums};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubaccountId {
    pub owner: String,
    pub number: u32,
}

impl SubaccountId {
    pub fn new(owner: impl Into<String>, number: u32) -> Self {
        Self {
            owner: owner.into(),
            number,
        }
    }
}

impl fmt::Display for SubaccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetualPosition {
    pub perpetual_id: PerpetualId,
    pub quantums: Quantums,
    /// Funding index the position was last settled at.
    #[serde(default)]
    pub funding_index: Quantums,
}

impl PerpetualPosition {
    pub fn new(perpetual_id: PerpetualId, quantums: impl Into<Quantums>) -> Self {
        Self {
            perpetual_id,
            quantums: quantums.into(),
            funding_index: Quantums::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPosition {
    pub asset_id: AssetId,
    pub quantums: Quantums,
}

impl AssetPosition {
    pub fn new(asset_id: AssetId, quantums: impl Into<Quantums>) -> Self {
        Self {
            asset_id,
            quantums: quantums.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subaccount {
    pub id: Option<SubaccountId>,
    #[serde(default)]
    pub perpetual_positions: Vec<PerpetualPosition>,
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
}

impl Subaccount {
    pub fn new(id: SubaccountId) -> Self {
        Self {
            id: Some(id),
            perpetual_positions: Vec::new(),
            asset_positions: Vec::new(),
        }
    }

    pub fn with_perpetual(mut self, position: PerpetualPosition) -> Self {
        self.perpetual_positions.push(position);
        self
    }

    pub fn with_asset(mut self, position: AssetPosition) -> Self {
        self.asset_positions.push(position);
        self
    }

    pub fn get_perpetual_position(&self, id: PerpetualId) -> Option<&PerpetualPosition> {
        self.perpetual_positions.iter().find(|p| p.perpetual_id == id)
    }

    pub fn get_asset_position(&self, id: AssetId) -> Option<&AssetPosition> {
        self.asset_positions.iter().find(|p| p.asset_id == id)
    }

    /// Held quantums of `id`, zero if no position.
    pub fn perpetual_quantums(&self, id: PerpetualId) -> Quantums {
        self.get_perpetual_position(id)
            .map(|p| p.quantums.clone())
            .unwrap_or_default()
    }

    pub fn asset_quantums(&self, id: AssetId) -> Quantums {
        self.get_asset_position(id)
            .map(|p| p.quantums.clone())
            .unwrap_or_default()
    }

    /// New snapshot with the deltas folded in. Positions that net to zero are dropped.
    pub fn apply_updates(
        &self,
        perpetual_updates: &[PerpetualUpdate],
        asset_updates: &[AssetUpdate],
    ) -> Subaccount {
        let mut perps: BTreeMap<PerpetualId, PerpetualPosition> = self
            .perpetual_positions
            .iter()
            .map(|p| (p.perpetual_id, p.clone()))
            .collect();
        for update in perpetual_updates {
            perps
                .entry(update.perpetual_id)
                .or_insert_with(|| PerpetualPosition::new(update.perpetual_id, Quantums::zero()))
                .quantums += &update.quantums_delta;
        }

        let mut assets: BTreeMap<AssetId, AssetPosition> = self
            .asset_positions
            .iter()
            .map(|p| (p.asset_id, p.clone()))
            .collect();
        for update in asset_updates {
            assets
                .entry(update.asset_id)
                .or_insert_with(|| AssetPosition::new(update.asset_id, Quantums::zero()))
                .quantums += &update.quantums_delta;
        }

        Subaccount {
            id: self.id.clone(),
            perpetual_positions: perps.into_values().filter(|p| !p.quantums.is_zero()).collect(),
            asset_positions: assets.into_values().filter(|p| !p.quantums.is_zero()).collect(),
        }
    }
}

/// Proposed change to one perpetual position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetualUpdate {
    pub perpetual_id: PerpetualId,
    pub quantums_delta: Quantums,
}

impl PerpetualUpdate {
    pub fn new(perpetual_id: PerpetualId, quantums_delta: impl Into<Quantums>) -> Self {
        Self {
            perpetual_id,
            quantums_delta: quantums_delta.into(),
        }
    }
}

/// Proposed change to one asset balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub asset_id: AssetId,
    pub quantums_delta: Quantums,
}

impl AssetUpdate {
    pub fn new(asset_id: AssetId, quantums_delta: impl Into<Quantums>) -> Self {
        Self {
            asset_id,
            quantums_delta: quantums_delta.into(),
        }
    }
}

/// A settled subaccount plus the deltas under evaluation.
///
/// At most one update per id per batch. Update order never changes the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledUpdate {
    pub settled_subaccount: Subaccount,
    #[serde(default)]
    pub perpetual_updates: Vec<PerpetualUpdate>,
    #[serde(default)]
    pub asset_updates: Vec<AssetUpdate>,
}

impl SettledUpdate {
    pub fn new(settled_subaccount: Subaccount) -> Self {
        Self {
            settled_subaccount,
            perpetual_updates: Vec::new(),
            asset_updates: Vec::new(),
        }
    }

    pub fn with_perpetual_update(mut self, update: PerpetualUpdate) -> Self {
        self.perpetual_updates.push(update);
        self
    }

    pub fn with_asset_update(mut self, update: AssetUpdate) -> Self {
        self.asset_updates.push(update);
        self
    }

    /// Same subaccount with no deltas: the "before" side of a transition.
    pub fn baseline(&self) -> SettledUpdate {
        SettledUpdate::new(self.settled_subaccount.clone())
    }

    /// The subaccount as it would look once every delta is applied.
    pub fn updated_subaccount(&self) -> Subaccount {
        self.settled_subaccount
            .apply_updates(&self.perpetual_updates, &self.asset_updates)
    }
}
