// SPDX-License-Identifier: Apache-2.0

use crate::project::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Budget classification bands, in millions of currency units.
///
/// The four bands partition `[0, ∞)` with no gaps or overlaps, and the
/// boundary ownership is user-visible contract: 2 belongs to `2-5M`, 5 and
/// 10 belong to `5-10M`. Labels are displayed verbatim by the UI, so both
/// directions of the mapping must stay literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BudgetBand {
    #[serde(rename = "<2M")]
    Under2M,
    #[serde(rename = "2-5M")]
    From2MTo5M,
    #[serde(rename = "5-10M")]
    From5MTo10M,
    #[serde(rename = ">10M")]
    Over10M,
}

impl BudgetBand {
    pub const ALL: [BudgetBand; 4] = [
        BudgetBand::Under2M,
        BudgetBand::From2MTo5M,
        BudgetBand::From5MTo10M,
        BudgetBand::Over10M,
    ];

    /// Total classification over valid budgets. NaN and negative values are
    /// rejected; every `budget >= 0` maps to exactly one band.
    pub fn classify(budget: f64) -> Result<Self, ValidationError> {
        if budget.is_nan() {
            return Err(ValidationError("budget must be numeric".to_string()));
        }
        if budget < 0.0 {
            return Err(ValidationError(format!(
                "budget must be non-negative, got {budget}"
            )));
        }
        if budget < 2.0 {
            Ok(BudgetBand::Under2M)
        } else if budget < 5.0 {
            Ok(BudgetBand::From2MTo5M)
        } else if budget <= 10.0 {
            Ok(BudgetBand::From5MTo10M)
        } else {
            Ok(BudgetBand::Over10M)
        }
    }

    /// Inverse of the label direction: a recognized label yields the band
    /// whose range predicate matches exactly the budgets [`classify`]
    /// assigns to it. Unrecognized labels are `None`, never an error.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "<2M" => Some(BudgetBand::Under2M),
            "2-5M" => Some(BudgetBand::From2MTo5M),
            "5-10M" => Some(BudgetBand::From5MTo10M),
            ">10M" => Some(BudgetBand::Over10M),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BudgetBand::Under2M => "<2M",
            BudgetBand::From2MTo5M => "2-5M",
            BudgetBand::From5MTo10M => "5-10M",
            BudgetBand::Over10M => ">10M",
        }
    }

    /// Half-open/closed range bounds as `(lower, upper)`; `lower` is
    /// inclusive except for `>10M`, `upper` is exclusive except for `5-10M`
    /// and absent for the unbounded band.
    #[must_use]
    pub fn bounds(self) -> (f64, Option<f64>) {
        match self {
            BudgetBand::Under2M => (0.0, Some(2.0)),
            BudgetBand::From2MTo5M => (2.0, Some(5.0)),
            BudgetBand::From5MTo10M => (5.0, Some(10.0)),
            BudgetBand::Over10M => (10.0, None),
        }
    }

    /// Membership check consistent with [`BudgetBand::classify`].
    #[must_use]
    pub fn contains(self, budget: f64) -> bool {
        BudgetBand::classify(budget).is_ok_and(|band| band == self)
    }
}

impl Display for BudgetBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
