//! Aggregate collateral risk of a subaccount.
//!
//! Net collateral (NC) is collateral plus signed position notional. Initial
//! margin (IMR) is what a subaccount must hold to open risk, maintenance
//! margin (MMR) what it must hold to avoid liquidation. All three are quote
//! quantums and add up linearly across positions.

use crate::types::Quantums;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub nc: Quantums,
    pub imr: Quantums,
    pub mmr: Quantums,
}

impl Risk {
    pub fn new(nc: impl Into<Quantums>, imr: impl Into<Quantums>, mmr: impl Into<Quantums>) -> Self {
        Self {
            nc: nc.into(),
            imr: imr.into(),
            mmr: mmr.into(),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Collateral only, no margin requirement.
    pub fn collateral(nc: impl Into<Quantums>) -> Self {
        Self {
            nc: nc.into(),
            ..Self::default()
        }
    }

    /// NC covers IMR: the subaccount may open new risk.
    pub fn is_initial_collateralized(&self) -> bool {
        self.nc >= self.imr
    }

    /// NC covers MMR. below this the subaccount is undercollateralized.
    pub fn is_maintenance_collateralized(&self) -> bool {
        self.nc >= self.mmr
    }

    /// Open risk that NC no longer covers. a subaccount with MMR = 0 has
    /// nothing to liquidate, even with negative NC.
    pub fn is_liquidatable(&self) -> bool {
        self.mmr.is_positive() && self.nc < self.mmr
    }

    /// NC left over after IMR. negative when the subaccount cannot open risk.
    pub fn free_collateral(&self) -> Quantums {
        self.nc.clone() - self.imr.clone()
    }
}

impl AddAssign<&Risk> for Risk {
    fn add_assign(&mut self, rhs: &Risk) {
        self.nc += &rhs.nc;
        self.imr += &rhs.imr;
        self.mmr += &rhs.mmr;
    }
}

impl AddAssign for Risk {
    fn add_assign(&mut self, rhs: Risk) {
        self.nc += rhs.nc;
        self.imr += rhs.imr;
        self.mmr += rhs.mmr;
    }
}

impl Sum for Risk {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |mut acc, r| {
            acc += r;
            acc
        })
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NC={} IMR={} MMR={}", self.nc, self.imr, self.mmr)
    }
}
