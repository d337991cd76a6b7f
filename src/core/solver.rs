use serde::Serialize;

use super::engine::future_value;
use super::types::ContributionSearch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionTarget {
    pub current_savings: f64,
    pub annual_return_rate: f64,
    pub total_months: u32,
    pub required_nest_egg: f64,
    pub initial_guess: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub projected_balance: f64,
}

#[derive(Debug, Clone)]
pub struct ContributionSolveResult {
    pub contribution: f64,
    /// False when the search bracket does not straddle the target, in which case
    /// `contribution` sits next to one of the bracket edges.
    pub within_bounds: bool,
    pub iterations: Vec<SolveIteration>,
}

/// Bisects the monthly contribution that grows `current_savings` to the required nest egg.
///
/// The first candidate is the caller's guess (clamped into the bracket); every later
/// candidate is the midpoint of the current bracket. Runs a fixed number of iterations
/// and never fails.
pub fn solve_target_contribution(
    target: &ContributionTarget,
    search: ContributionSearch,
) -> ContributionSolveResult {
    let search_min = search.search_min.min(search.search_max);
    let search_max = search.search_max.max(search.search_min);
    let evaluate = |contribution: f64| {
        future_value(
            target.current_savings,
            contribution,
            target.annual_return_rate,
            target.total_months,
        )
    };

    let within_bounds = evaluate(search_min) <= target.required_nest_egg
        && evaluate(search_max) >= target.required_nest_egg;
    if !within_bounds {
        log::debug!(
            "required nest egg {} is outside the contribution bracket [{search_min}, {search_max}]",
            target.required_nest_egg
        );
    }

    let mut lo = search_min;
    let mut hi = search_max;
    let mut candidate = if target.initial_guess.is_finite() {
        target.initial_guess.clamp(lo, hi)
    } else {
        (lo + hi) * 0.5
    };
    let mut iterations = Vec::with_capacity(search.max_iterations as usize);
    for it in 1..=search.max_iterations {
        let projected_balance = evaluate(candidate);
        iterations.push(SolveIteration {
            iteration: it,
            lower_bound: lo,
            upper_bound: hi,
            candidate_value: candidate,
            projected_balance,
        });

        if projected_balance > target.required_nest_egg {
            hi = candidate;
        } else {
            lo = candidate;
        }
        candidate = (lo + hi) * 0.5;
    }

    ContributionSolveResult {
        contribution: candidate.floor(),
        within_bounds,
        iterations,
    }
}

pub fn target_contribution(
    current_savings: f64,
    annual_rate_percent: f64,
    total_months: u32,
    required_nest_egg: f64,
    initial_guess: f64,
) -> f64 {
    solve_target_contribution(
        &ContributionTarget {
            current_savings,
            annual_return_rate: annual_rate_percent,
            total_months,
            required_nest_egg,
            initial_guess,
        },
        ContributionSearch::default(),
    )
    .contribution
}
