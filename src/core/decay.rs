//! Post-retirement extrapolation for charts and tooltips. Display only.

use super::types::{DecayKind, TrajectoryPoint};

pub trait DecayCurve {
    /// Share of the retirement-age balance still shown `years_past` years after retirement,
    /// where `horizon_years` is the distance from retirement to the max age.
    fn remaining_fraction(&self, years_past: u32, horizon_years: u32) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawDecay {
    pub exponent: f64,
    pub damping: f64,
}

impl Default for PowerLawDecay {
    fn default() -> Self {
        Self {
            exponent: 1.5,
            damping: 0.8,
        }
    }
}

impl DecayCurve for PowerLawDecay {
    fn remaining_fraction(&self, years_past: u32, horizon_years: u32) -> f64 {
        if horizon_years == 0 {
            return 0.0;
        }
        let progress = years_past as f64 / horizon_years as f64;
        (1.0 - progress.powf(self.exponent) * self.damping).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearDecay;

impl DecayCurve for LinearDecay {
    fn remaining_fraction(&self, years_past: u32, horizon_years: u32) -> f64 {
        if horizon_years == 0 {
            return 0.0;
        }
        (1.0 - years_past as f64 / horizon_years as f64).max(0.0)
    }
}

impl DecayCurve for DecayKind {
    fn remaining_fraction(&self, years_past: u32, horizon_years: u32) -> f64 {
        match self {
            DecayKind::PowerLaw => {
                PowerLawDecay::default().remaining_fraction(years_past, horizon_years)
            }
            DecayKind::Linear => LinearDecay.remaining_fraction(years_past, horizon_years),
        }
    }
}

fn decayed_point<C: DecayCurve + ?Sized>(
    anchor: &TrajectoryPoint,
    age: u32,
    max_age: u32,
    curve: &C,
) -> TrajectoryPoint {
    let years_past = age.saturating_sub(anchor.age);
    let horizon_years = max_age.saturating_sub(anchor.age);
    let fraction = curve.remaining_fraction(years_past, horizon_years);
    TrajectoryPoint {
        age,
        own_balance: (anchor.own_balance * fraction).floor().max(0.0),
        secondary_balance: (anchor.secondary_balance * fraction).floor().max(0.0),
        goal: anchor.goal,
    }
}

pub fn extend_trajectory<C: DecayCurve + ?Sized>(
    points: &[TrajectoryPoint],
    max_age: u32,
    curve: &C,
) -> Vec<TrajectoryPoint> {
    let mut extended = points.to_vec();
    let Some(anchor) = points.last().copied() else {
        return extended;
    };

    for age in anchor.age + 1..=max_age {
        extended.push(decayed_point(&anchor, age, max_age, curve));
    }
    extended
}

/// Tooltip lookup: the recorded point for `age`, a decayed point past the last recorded
/// age, or `None` before the first one.
pub fn point_at_age<C: DecayCurve + ?Sized>(
    points: &[TrajectoryPoint],
    age: u32,
    max_age: u32,
    curve: &C,
) -> Option<TrajectoryPoint> {
    if let Some(point) = points.iter().find(|p| p.age == age) {
        return Some(*point);
    }
    let anchor = points.last()?;
    (age > anchor.age).then(|| decayed_point(anchor, age, max_age, curve))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    /// Halves the balance every year past retirement.
    struct Halving;

    impl DecayCurve for Halving {
        fn remaining_fraction(&self, years_past: u32, _horizon_years: u32) -> f64 {
            0.5f64.powi(years_past as i32)
        }
    }

    fn retirement_points() -> Vec<TrajectoryPoint> {
        vec![
            TrajectoryPoint {
                age: 66,
                own_balance: 900_000.0,
                secondary_balance: 250_000.0,
                goal: 1_000_000.0,
            },
            TrajectoryPoint {
                age: 67,
                own_balance: 994_177.0,
                secondary_balance: 285_682.0,
                goal: 1_000_000.0,
            },
        ]
    }

    #[test]
    fn power_law_fraction_matches_hand_calculation() {
        let curve = PowerLawDecay::default();
        assert_approx(curve.remaining_fraction(0, 28), 1.0);
        // 1 - (14/28)^1.5 * 0.8 = 1 - 0.35355... * 0.8
        assert_approx(curve.remaining_fraction(14, 28), 0.717_157_287_525_380_9);
        assert_approx(curve.remaining_fraction(28, 28), 0.2);
        assert_approx(curve.remaining_fraction(5, 0), 0.0);
    }

    #[test]
    fn linear_fraction_reaches_zero_at_horizon() {
        assert_approx(LinearDecay.remaining_fraction(7, 28), 0.75);
        assert_approx(LinearDecay.remaining_fraction(28, 28), 0.0);
        assert_approx(LinearDecay.remaining_fraction(40, 28), 0.0);
    }

    #[test]
    fn decay_kind_dispatches_to_named_curves() {
        assert_approx(
            DecayKind::PowerLaw.remaining_fraction(14, 28),
            PowerLawDecay::default().remaining_fraction(14, 28),
        );
        assert_approx(DecayKind::Linear.remaining_fraction(14, 28), 0.5);
    }

    #[test]
    fn extend_trajectory_reaches_max_age_with_non_increasing_balances() {
        let points = retirement_points();
        let extended = extend_trajectory(&points, 95, &DecayKind::PowerLaw);

        assert_eq!(extended.len(), 2 + 28);
        assert_eq!(&extended[..2], &points[..]);
        assert_eq!(extended.last().map(|p| p.age), Some(95));
        assert_approx(extended[2].own_balance, 988_808.0);
        assert!(extended[1..].windows(2).all(|w| {
            w[1].own_balance <= w[0].own_balance
                && w[1].secondary_balance <= w[0].secondary_balance
        }));
        assert!(extended.iter().all(|p| p.goal == 1_000_000.0));
    }

    #[test]
    fn extend_trajectory_past_horizon_adds_nothing() {
        let points = retirement_points();
        assert_eq!(extend_trajectory(&points, 67, &LinearDecay).len(), 2);
        assert_eq!(extend_trajectory(&points, 60, &LinearDecay).len(), 2);
        assert!(extend_trajectory(&[], 95, &LinearDecay).is_empty());
    }

    #[test]
    fn point_at_age_resolves_recorded_and_synthetic_ages() {
        let points = retirement_points();

        assert_eq!(point_at_age(&points, 66, 95, &Halving), Some(points[0]));
        assert_eq!(point_at_age(&points, 50, 95, &Halving), None);

        let synthetic = point_at_age(&points, 69, 95, &Halving).expect("past retirement");
        assert_eq!(synthetic.age, 69);
        assert_approx(synthetic.own_balance, (994_177.0f64 / 4.0).floor());
        assert_approx(synthetic.secondary_balance, (285_682.0f64 / 4.0).floor());
        assert_approx(synthetic.goal, 1_000_000.0);
    }

    #[test]
    fn point_at_age_beyond_max_age_is_clamped_to_zero() {
        let points = retirement_points();
        let far = point_at_age(&points, 120, 95, &DecayKind::Linear).expect("defined");
        assert_approx(far.own_balance, 0.0);
        assert_approx(far.secondary_balance, 0.0);
    }

    #[test]
    fn empty_points_have_no_lookup() {
        assert_eq!(point_at_age(&[], 70, 95, &LinearDecay), None);
    }
}
