mod decay;
mod engine;
mod solver;
mod types;

pub use decay::{DecayCurve, LinearDecay, PowerLawDecay, extend_trajectory, point_at_age};
pub use engine::{
    balance_path, future_value, future_value_closed_form, required_nest_egg, run_projection,
    runout_age, trajectory,
};
pub use solver::{
    ContributionSolveResult, ContributionTarget, SolveIteration, solve_target_contribution,
    target_contribution,
};
pub use types::{
    BalanceSnapshot, ContributionSearch, DEFAULT_MAX_AGE, DEFAULT_RETIREMENT_AGE,
    DEFAULT_YEARS_IN_RETIREMENT, DecayKind, NestEggRule, Projection, ProjectionConfig,
    ProjectionInput, ProjectionSummary, RunoutAge, RunoutHorizon, TrajectoryPoint,
};
