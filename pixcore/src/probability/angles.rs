//! Wrapped Gaussian densities for reconstructed track angles.
//!
//! Azimuth angles come out of an arctangent during reconstruction, so every
//! azimuth density carries a second hypothesis rotated by 180 degrees with a
//! small fixed weight. Polar angles have no such ambiguity and wrap on a
//! half turn instead.

use std::f64::consts::PI;

/// Floor added to every angle density so log-ratio scoring never sees zero.
pub const DENSITY_FLOOR: f64 = 1e-20;

/// Below this polar angle the reported azimuth carries no information.
pub const STEEP_POLAR_REPORT: f64 = 0.15;

/// Below this polar angle the track azimuth itself is unconstrained.
pub const STEEP_POLAR_TRACK: f64 = 0.05;

/// Shifts `x` into `lo <= x < hi` by whole spans.
pub fn wrap_into(mut x: f64, lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    while x < lo {
        x += span;
    }
    while x >= hi {
        x -= span;
    }
    x
}

/// Density that the detector reports azimuth `reported` when the true track
/// azimuth is `actual`, for a track at the given polar angle.
pub fn azimuth_report_density(
    actual: f64,
    reported: f64,
    polar: f64,
    sd: f64,
    wrong_way_rate: f64,
) -> f64 {
    if polar < STEEP_POLAR_REPORT {
        return 1.0 / (2.0 * PI);
    }
    let k = 1.0 / (sd * PI.sqrt());
    let mut x = wrap_into(actual - reported, -PI, PI);
    x /= sd;
    let right_way = k * (-x * x).exp() * (1.0 - wrong_way_rate);
    let mut x = wrap_into(x * sd + PI, -PI, PI);
    x /= sd;
    let wrong_way = k * (-x * x).exp() * wrong_way_rate;
    right_way + wrong_way + DENSITY_FLOOR
}

/// Density that the detector reports polar angle `reported` when the true
/// value is `actual`. Also serves as the posterior density of the true value
/// given a report, the two directions being symmetric.
pub fn polar_report_density(actual: f64, reported: f64, sd: f64) -> f64 {
    let k = 1.0 / (sd * PI.sqrt());
    let x = wrap_into(actual - reported, -PI / 2.0, PI / 2.0) / sd;
    k * (-x * x).exp() + DENSITY_FLOOR
}

/// Density that the true track azimuth is `value` given the reported one.
///
/// The spread widens for shallow tracks: `sd = sd_scale * (sd_pivot - polar)`.
pub fn azimuth_track_density(
    value: f64,
    reported: f64,
    polar: f64,
    sd_scale: f64,
    sd_pivot: f64,
    wrong_way_rate: f64,
) -> f64 {
    if polar < STEEP_POLAR_TRACK {
        return 1.0 / (2.0 * PI);
    }
    let sd = sd_scale * (sd_pivot - polar);
    let k = 1.0 / (sd * PI.sqrt());
    let mut x = wrap_into(value - reported, -PI, PI);
    x /= sd;
    let right_way = k * (-x * x).exp() * (1.0 - wrong_way_rate);
    let mut x = wrap_into(x * sd + PI, -PI, PI);
    x /= sd;
    let wrong_way = k * (-x * x).exp() * wrong_way_rate;
    right_way + wrong_way + DENSITY_FLOOR
}

/// Density that the true polar angle is `value` given the reported one.
pub fn polar_track_density(value: f64, reported: f64, sd: f64) -> f64 {
    polar_report_density(value, reported, sd)
}
