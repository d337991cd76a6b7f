use super::decay::extend_trajectory;
use super::solver::{ContributionTarget, solve_target_contribution};
use super::types::{
    BalanceSnapshot, NestEggRule, Projection, ProjectionConfig, ProjectionInput,
    ProjectionSummary, RunoutAge, RunoutHorizon, TrajectoryPoint,
};

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    if annual_rate_percent <= 0.0 {
        0.0
    } else {
        annual_rate_percent / 100.0 / 12.0
    }
}

fn compound_month(balance: f64, monthly_rate: f64, contribution: f64) -> f64 {
    balance * (1.0 + monthly_rate) + contribution
}

pub fn future_value(
    initial_balance: f64,
    monthly_contribution: f64,
    annual_rate_percent: f64,
    total_months: u32,
) -> f64 {
    if total_months == 0 {
        return initial_balance;
    }
    if annual_rate_percent <= 0.0 {
        return initial_balance + monthly_contribution * total_months as f64;
    }

    let rate = monthly_rate(annual_rate_percent);
    (0..total_months).fold(initial_balance, |balance, _| {
        compound_month(balance, rate, monthly_contribution)
    })
}

pub fn future_value_closed_form(
    initial_balance: f64,
    monthly_contribution: f64,
    annual_rate_percent: f64,
    total_months: u32,
) -> f64 {
    if total_months == 0 {
        return initial_balance;
    }
    if annual_rate_percent <= 0.0 {
        return initial_balance + monthly_contribution * total_months as f64;
    }

    let rate = monthly_rate(annual_rate_percent);
    let growth = (1.0 + rate).powf(total_months as f64);
    initial_balance * growth + monthly_contribution * (growth - 1.0) / rate
}

pub fn required_nest_egg(
    net_annual_need: f64,
    withdrawal_rate_percent: f64,
    rule: NestEggRule,
) -> f64 {
    if net_annual_need <= 0.0 {
        return 0.0;
    }
    if withdrawal_rate_percent <= 0.0 {
        return f64::INFINITY;
    }

    let base = (net_annual_need / (withdrawal_rate_percent / 100.0)).ceil();
    match rule {
        NestEggRule::WithdrawalRate => base,
        NestEggRule::OverRetirement { years } => base * years as f64,
    }
}

/// Walks the combined balance month by month through the whole of the max-age year,
/// withdrawing `net_annual_need / 12` after each month's growth. A balance still positive
/// at the horizon is `Never` if it ended no lower than it started, else `OutlastsHorizon`.
pub fn runout_age(
    own_balance: f64,
    secondary_balance: f64,
    annual_rate_percent: f64,
    net_annual_need: f64,
    horizon: RunoutHorizon,
) -> RunoutAge {
    let starting_total = own_balance + secondary_balance;
    if starting_total <= 0.0 {
        return RunoutAge::Never;
    }

    let rate = monthly_rate(annual_rate_percent);
    let monthly_need = net_annual_need / 12.0;
    let span = horizon.max_age.saturating_sub(horizon.retirement_age);

    let mut total = starting_total;
    for year in 0..=span {
        for _ in 0..12 {
            total = compound_month(total, rate, -monthly_need);
            if total <= 0.0 {
                return RunoutAge::Depleted {
                    age: horizon.retirement_age + year,
                };
            }
        }
    }

    if total >= starting_total {
        RunoutAge::Never
    } else {
        RunoutAge::OutlastsHorizon {
            age: horizon.retirement_age + span,
        }
    }
}

pub fn balance_path(input: &ProjectionInput) -> Vec<BalanceSnapshot> {
    let years = input.years_until_retirement();
    let rate = monthly_rate(input.annual_return_rate);

    let mut own = input.current_savings;
    let mut secondary = 0.0;
    let mut path = Vec::with_capacity(years as usize + 1);
    for year in 0..=years {
        path.push(BalanceSnapshot {
            age: input.current_age + year,
            own_balance: own,
            secondary_balance: secondary,
        });
        if year < years {
            for _ in 0..12 {
                own = compound_month(own, rate, input.monthly_contribution);
                secondary = compound_month(secondary, rate, input.secondary_monthly_contribution);
            }
        }
    }
    path
}

pub fn trajectory(input: &ProjectionInput, required_nest_egg: f64) -> Vec<TrajectoryPoint> {
    balance_path(input)
        .into_iter()
        .map(|snapshot| TrajectoryPoint::from_snapshot(snapshot, required_nest_egg))
        .collect()
}

pub fn run_projection(input: &ProjectionInput, config: &ProjectionConfig) -> Projection {
    let total_months = input.total_months();
    let rate = input.annual_return_rate;
    let horizon = input.runout_horizon(config.max_age);

    let own_future_value = future_value(
        input.current_savings,
        input.monthly_contribution,
        rate,
        total_months,
    );
    let secondary_future_value =
        future_value(0.0, input.secondary_monthly_contribution, rate, total_months);
    let total_future_value = own_future_value + secondary_future_value;

    let net_annual_need = input.net_annual_need();
    let required =
        required_nest_egg(net_annual_need, input.withdrawal_rate, config.nest_egg_rule);
    let current_runout = runout_age(
        own_future_value,
        secondary_future_value,
        rate,
        net_annual_need,
        horizon,
    );

    let solve = solve_target_contribution(
        &ContributionTarget {
            current_savings: input.current_savings,
            annual_return_rate: rate,
            total_months,
            required_nest_egg: required,
            initial_guess: input.monthly_contribution,
        },
        config.search,
    );
    let target_own_future_value = future_value(
        input.current_savings,
        solve.contribution,
        rate,
        total_months,
    );
    let target_runout = runout_age(
        target_own_future_value,
        secondary_future_value,
        rate,
        net_annual_need,
        horizon,
    );

    let secondary_share_percent = if total_future_value > 0.0 {
        (secondary_future_value / total_future_value * 100.0).round()
    } else {
        0.0
    };

    let summary = ProjectionSummary {
        years_until_retirement: input.years_until_retirement(),
        total_months,
        own_future_value,
        secondary_future_value,
        total_future_value,
        net_annual_need,
        required_nest_egg: required,
        annual_retirement_income: (total_future_value * input.withdrawal_rate / 100.0).floor(),
        on_track: total_future_value >= required,
        surplus: total_future_value - required,
        secondary_share_percent,
        current_runout,
        target_monthly_contribution: solve.contribution,
        target_within_bounds: solve.within_bounds,
        target_own_future_value,
        target_total_future_value: target_own_future_value + secondary_future_value,
        target_runout,
        suggested_contribution_increase: (solve.contribution - input.monthly_contribution)
            .max(0.0),
    };

    let trajectory = trajectory(input, required);
    let extended_trajectory = extend_trajectory(&trajectory, config.max_age, &config.decay);

    Projection {
        summary,
        trajectory,
        extended_trajectory,
        solver_iterations: solve.iterations,
    }
}
