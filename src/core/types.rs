use serde::Serialize;

use super::solver::SolveIteration;

pub const DEFAULT_RETIREMENT_AGE: u32 = 67;
pub const DEFAULT_MAX_AGE: u32 = 95;
pub const DEFAULT_YEARS_IN_RETIREMENT: u32 = 30;

/// Raw calculator inputs. Rates are percentages (7.0 means 7 %).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub current_savings: f64,
    pub monthly_contribution: f64,
    pub secondary_monthly_contribution: f64,
    pub annual_return_rate: f64,
    pub annual_retirement_budget: f64,
    pub other_retirement_income: f64,
    pub withdrawal_rate: f64,
}

impl Default for ProjectionInput {
    fn default() -> Self {
        Self {
            current_age: 35,
            retirement_age: DEFAULT_RETIREMENT_AGE,
            current_savings: 30_000.0,
            monthly_contribution: 500.0,
            secondary_monthly_contribution: 200.0,
            annual_return_rate: 7.0,
            annual_retirement_budget: 40_000.0,
            other_retirement_income: 0.0,
            withdrawal_rate: 4.0,
        }
    }
}

impl ProjectionInput {
    pub fn years_until_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    pub fn total_months(&self) -> u32 {
        self.years_until_retirement() * 12
    }

    pub fn net_annual_need(&self) -> f64 {
        self.annual_retirement_budget - self.other_retirement_income
    }

    pub fn runout_horizon(&self, max_age: u32) -> RunoutHorizon {
        RunoutHorizon {
            retirement_age: self.retirement_age,
            max_age,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum NestEggRule {
    /// Annual need divided by the withdrawal rate.
    #[default]
    WithdrawalRate,
    /// The withdrawal-rate amount multiplied by an assumed number of retirement years.
    OverRetirement { years: u32 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum DecayKind {
    #[default]
    PowerLaw,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionSearch {
    pub search_min: f64,
    pub search_max: f64,
    pub max_iterations: u32,
}

impl Default for ContributionSearch {
    fn default() -> Self {
        Self {
            search_min: -1_000_000.0,
            search_max: 1_000_000.0,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub max_age: u32,
    pub nest_egg_rule: NestEggRule,
    pub search: ContributionSearch,
    pub decay: DecayKind,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            nest_egg_rule: NestEggRule::WithdrawalRate,
            search: ContributionSearch::default(),
            decay: DecayKind::PowerLaw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunoutHorizon {
    pub retirement_age: u32,
    pub max_age: u32,
}

impl Default for RunoutHorizon {
    fn default() -> Self {
        Self {
            retirement_age: DEFAULT_RETIREMENT_AGE,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Outcome of walking a retirement balance forward under withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunoutAge {
    /// Nothing to run out of, or the balance never declines.
    Never,
    /// Balance reached zero during the year the person is `age`.
    Depleted { age: u32 },
    /// Balance is shrinking but still positive at the horizon age.
    OutlastsHorizon { age: u32 },
}

impl RunoutAge {
    pub fn age(self) -> Option<u32> {
        match self {
            RunoutAge::Never => None,
            RunoutAge::Depleted { age } | RunoutAge::OutlastsHorizon { age } => Some(age),
        }
    }

    pub fn is_never(self) -> bool {
        self == RunoutAge::Never
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSnapshot {
    pub age: u32,
    pub own_balance: f64,
    pub secondary_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub age: u32,
    pub own_balance: f64,
    pub secondary_balance: f64,
    pub goal: f64,
}

impl TrajectoryPoint {
    /// Display boundary: snapshots are floored here and nowhere else.
    pub fn from_snapshot(snapshot: BalanceSnapshot, goal: f64) -> Self {
        Self {
            age: snapshot.age,
            own_balance: snapshot.own_balance.floor(),
            secondary_balance: snapshot.secondary_balance.floor(),
            goal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub years_until_retirement: u32,
    pub total_months: u32,
    pub own_future_value: f64,
    pub secondary_future_value: f64,
    pub total_future_value: f64,
    pub net_annual_need: f64,
    pub required_nest_egg: f64,
    pub annual_retirement_income: f64,
    pub on_track: bool,
    pub surplus: f64,
    pub secondary_share_percent: f64,
    pub current_runout: RunoutAge,
    pub target_monthly_contribution: f64,
    pub target_within_bounds: bool,
    pub target_own_future_value: f64,
    pub target_total_future_value: f64,
    pub target_runout: RunoutAge,
    pub suggested_contribution_increase: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub summary: ProjectionSummary,
    pub trajectory: Vec<TrajectoryPoint>,
    pub extended_trajectory: Vec<TrajectoryPoint>,
    pub solver_iterations: Vec<SolveIteration>,
}
