//! Conversion between cumulative experience points and `(level, progress)`.
//!
//! The host game levels players along a fixed piecewise-quadratic curve with
//! three regimes split at levels [`LOW_MAX`] and [`MID_MAX`]:
//!
//! | Level range | Points to reach level `L` | Points from `L` to `L + 1` |
//! |-------------|---------------------------|----------------------------|
//! | `L <= 16` | `L^2 + 6L` | `2L + 7` |
//! | `16 < L <= 31` | `2.5L^2 - 40.5L + 360` | `5L - 38` |
//! | `L > 31` | `4.5L^2 - 162.5L + 2220` | `9L - 158` |
//!
//! The inverse uses the closed-form root of each quadratic. The integer part
//! of the root is the level and its fractional part is the progress within
//! that level. Roots are computed with [`Decimal`] so repeated round trips do
//! not drift.
//!
//! Both half coefficients always pair up into whole numbers for integer
//! levels (`L(5L - 81)` and `L(9L - 325)` are even), so the forward curve is
//! evaluated exactly in integers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Highest level of the first (cheapest) regime.
pub const LOW_MAX: u32 = 16;

/// Highest level of the middle regime.
pub const MID_MAX: u32 = 31;

/// A level together with the fraction of the way to the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    /// Whole level.
    pub level: u32,
    /// Progress toward `level + 1`, in `[0, 1)`.
    pub progress: Decimal,
}

impl LevelProgress {
    /// Create a level/progress pair.
    pub const fn new(level: u32, progress: Decimal) -> Self {
        Self { level, progress }
    }
}

/// Total points a player must have accumulated to sit exactly at `level`.
///
/// Saturates at `u64::MAX` for levels whose cost does not fit.
#[allow(clippy::arithmetic_side_effects)] // i128 cannot overflow for u32 levels
pub fn points_to_reach_level(level: u32) -> u64 {
    let l = i128::from(level);
    let points = if level <= LOW_MAX {
        l * l + 6 * l
    } else if level <= MID_MAX {
        (5 * l * l - 81 * l + 720) / 2
    } else {
        (9 * l * l - 325 * l + 4440) / 2
    };
    u64::try_from(points).unwrap_or(u64::MAX)
}

/// Points needed for the single level-up that starts at `level`.
#[allow(clippy::arithmetic_side_effects)] // u64 cannot overflow for u32 levels
pub fn points_to_next_level(level: u32) -> u64 {
    let l = u64::from(level);
    if level < LOW_MAX {
        2 * l + 7
    } else if level < MID_MAX {
        5 * l - 38
    } else {
        9 * l - 158
    }
}

/// Split a cumulative point total into level and in-level progress.
///
/// The regime is picked by comparing `total` against the cost of levels
/// [`LOW_MAX`] and [`MID_MAX`]. The level is checked against the integer
/// curve afterwards, so a root that lands a hair below a whole number (for
/// example `16.99..` for exactly the cost of level 17) still yields the
/// right level with zero progress.
pub fn level_progress_from_total(total: u64) -> LevelProgress {
    let curve = curve_level(total);

    // The root is accurate to far less than one level; two steps either way
    // are enough and keep saturated totals near u64::MAX from walking.
    let mut level = curve.floor().to_u32().unwrap_or(0);
    for _ in 0..2 {
        if level > 0 && points_to_reach_level(level) > total {
            level = level.saturating_sub(1);
        }
    }
    for _ in 0..2 {
        if points_to_reach_level(level.saturating_add(1)) <= total {
            level = level.saturating_add(1);
        }
    }

    if points_to_reach_level(level) == total {
        return LevelProgress::new(level, Decimal::ZERO);
    }

    let fraction = curve.checked_sub(Decimal::from(level)).unwrap_or(Decimal::ZERO);
    let progress = if fraction >= Decimal::ZERO && fraction < Decimal::ONE {
        fraction
    } else {
        linear_progress(total, level)
    };

    LevelProgress { level, progress }
}

/// Cumulative point total for a level plus a fraction of the next level.
///
/// Negative progress is treated as zero. The partial level is rounded half
/// up to whole points.
pub fn total_from_level_progress(level: u32, progress: Decimal) -> u64 {
    let base = points_to_reach_level(level);
    let progress = progress.max(Decimal::ZERO);
    let partial = Decimal::from(points_to_next_level(level))
        .checked_mul(progress)
        .map(|p| p.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|p| p.to_u64())
        .unwrap_or(0);
    base.saturating_add(partial)
}

/// Evaluate the inverse curve for `total`, as a fractional level.
#[allow(clippy::arithmetic_side_effects)] // |72 * u64::MAX| is far below Decimal::MAX
fn curve_level(total: u64) -> Decimal {
    let t = Decimal::from(total);
    if total <= points_to_reach_level(LOW_MAX) {
        // L = sqrt(T + 9) - 3
        sqrt_or_zero(t + Decimal::from(9)) - Decimal::from(3)
    } else if total <= points_to_reach_level(MID_MAX) {
        // L = (81 + sqrt(40T - 7839)) / 10
        (Decimal::from(81) + sqrt_or_zero(t * Decimal::from(40) - Decimal::from(7839)))
            / Decimal::from(10)
    } else {
        // L = (325 + sqrt(72T - 54215)) / 18
        (Decimal::from(325) + sqrt_or_zero(t * Decimal::from(72) - Decimal::from(54_215)))
            / Decimal::from(18)
    }
}

fn sqrt_or_zero(value: Decimal) -> Decimal {
    value.sqrt().unwrap_or(Decimal::ZERO)
}

/// Straight-line share of the current level, used when the root disagrees
/// with the integer curve at a level boundary.
fn linear_progress(total: u64, level: u32) -> Decimal {
    let into_level = total.saturating_sub(points_to_reach_level(level));
    let span = points_to_next_level(level);
    if span == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(into_level)
        .checked_div(Decimal::from(span))
        .unwrap_or(Decimal::ZERO)
        .min(Decimal::ONE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// The published curve, evaluated literally with half-up rounding.
    fn published_curve(level: u32) -> u64 {
        let l = Decimal::from(level);
        let raw = if level <= LOW_MAX {
            l * l + dec!(6) * l
        } else if level <= MID_MAX {
            dec!(2.5) * l * l - dec!(40.5) * l + dec!(360)
        } else {
            dec!(4.5) * l * l - dec!(162.5) * l + dec!(2220)
        };
        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .unwrap()
    }

    #[test]
    fn known_curve_values() {
        assert_eq!(points_to_reach_level(0), 0);
        assert_eq!(points_to_reach_level(1), 7);
        assert_eq!(points_to_reach_level(16), 352);
        assert_eq!(points_to_reach_level(17), 394);
        assert_eq!(points_to_reach_level(30), 1395);
        assert_eq!(points_to_reach_level(31), 1507);
        assert_eq!(points_to_reach_level(32), 1628);
        assert_eq!(points_to_reach_level(100), 30_970);
    }

    #[test]
    fn integer_curve_matches_published_formula() {
        for level in 0..=500 {
            assert_eq!(points_to_reach_level(level), published_curve(level), "level {level}");
        }
    }

    #[test]
    fn next_level_cost_is_the_curve_difference() {
        for level in 0..=500 {
            let diff = points_to_reach_level(level + 1) - points_to_reach_level(level);
            assert_eq!(points_to_next_level(level), diff, "level {level}");
        }
    }

    #[test]
    fn next_level_cost_at_regime_edges() {
        assert_eq!(points_to_next_level(15), 37);
        assert_eq!(points_to_next_level(16), 42);
        assert_eq!(points_to_next_level(30), 112);
        assert_eq!(points_to_next_level(31), 121);
    }

    #[test]
    fn reach_level_is_strictly_increasing() {
        let mut previous = points_to_reach_level(0);
        for level in 1..=2000 {
            let current = points_to_reach_level(level);
            assert!(current > previous, "level {level}");
            previous = current;
        }
    }

    #[test]
    fn huge_levels_saturate() {
        assert_eq!(points_to_reach_level(u32::MAX), u64::MAX);
    }

    #[test]
    fn exact_level_totals_have_zero_progress() {
        for level in 0..=200 {
            let lp = level_progress_from_total(points_to_reach_level(level));
            assert_eq!(lp.level, level);
            assert_eq!(lp.progress, Decimal::ZERO, "level {level}");
        }
    }

    #[test]
    fn regime_switch_boundary_level_17() {
        let lp = level_progress_from_total(points_to_reach_level(17));
        assert_eq!(lp, LevelProgress::new(17, Decimal::ZERO));
    }

    #[test]
    fn one_point_below_a_level_stays_in_the_previous_level() {
        for level in 1..=100 {
            let lp = level_progress_from_total(points_to_reach_level(level) - 1);
            assert_eq!(lp.level, level - 1);
            assert!(lp.progress > Decimal::ZERO);
            assert!(lp.progress < Decimal::ONE);
        }
    }

    #[test]
    fn total_roundtrips_within_one_point() {
        let samples = (0..=20_000_u64).chain([
            100_000,
            1_000_000,
            123_456_789,
            9_876_543_210,
            1_000_000_000_000,
        ]);
        for total in samples {
            let lp = level_progress_from_total(total);
            let back = total_from_level_progress(lp.level, lp.progress);
            assert!(back.abs_diff(total) <= 1, "total {total} came back as {back}");
        }
    }

    #[test]
    fn level_progress_roundtrips() {
        for level in [0, 5, 15, 16, 17, 30, 31, 32, 64] {
            for progress in [dec!(0), dec!(0.25), dec!(0.5), dec!(0.75), dec!(0.9)] {
                let total = total_from_level_progress(level, progress);
                let lp = level_progress_from_total(total);
                assert_eq!(lp.level, level, "level {level} progress {progress}");
                let back = total_from_level_progress(lp.level, lp.progress);
                assert!(back.abs_diff(total) <= 1);
            }
        }
    }

    #[test]
    fn level_progress_is_monotonic_in_total() {
        let mut previous = level_progress_from_total(0);
        for total in 1..=5_000 {
            let current = level_progress_from_total(total);
            assert!(
                (current.level, current.progress) >= (previous.level, previous.progress),
                "total {total}"
            );
            previous = current;
        }
    }

    #[test]
    fn negative_progress_counts_as_zero() {
        assert_eq!(total_from_level_progress(10, dec!(-0.5)), points_to_reach_level(10));
    }

    #[test]
    fn max_total_does_not_panic() {
        let lp = level_progress_from_total(u64::MAX);
        assert!(lp.level > 2_000_000_000);
        assert!(lp.progress < Decimal::ONE);
    }
}
