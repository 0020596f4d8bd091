//! Directional, energy, and background densities for cluster pairs.
//!
//! The directional density models one cluster as the entry point of a track
//! and scores how well the other cluster fits the exit trajectory, after the
//! pair has been remapped into a canonical geometric case. Same-plane pairs
//! have density exactly zero by contract.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::geometry::plane::{DetectorGeometry, PlaneId};
use crate::geometry::transform::{map_to_canonical, CanonicalPair, HitView};
use crate::probability::angles::{
    azimuth_report_density, azimuth_track_density, polar_report_density, polar_track_density,
    wrap_into, DENSITY_FLOOR,
};

/// Tunable constants of the pairing likelihood model.
///
/// Spreads are in radians unless noted. Defaults come from fits to reference
/// captures; the energy spread is a deliberate overestimate.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LikelihoodParams {
    /// Spread of the reported azimuth around the predicted exit azimuth.
    pub azimuth_report_sd: f64,
    /// Spread of the reported polar angle around the predicted value.
    pub polar_sd: f64,
    /// Scale of the track-azimuth spread, `sd = scale * (pivot - polar)`.
    pub azimuth_track_sd_scale: f64,
    /// Pivot of the track-azimuth spread.
    pub azimuth_track_sd_pivot: f64,
    /// Probability that reconstruction reports an azimuth rotated 180 degrees.
    pub wrong_way_rate: f64,
    /// Spread of the mean-energy difference between the two ends of a track.
    pub energy_sd: f64,
    /// Spread of the radial separation in the opposite-plane case, in pixels.
    pub radial_sd: f64,
    /// Expected uncorrelated background hits per mm^2 per frame.
    pub hit_density: f64,
    /// Flat density of the mean energy of a background hit.
    pub rand_energy_density: f64,
    /// Probability that a true track crossing a plane left no cluster.
    pub miss_prob: f64,
}

impl Default for LikelihoodParams {
    fn default() -> Self {
        Self {
            azimuth_report_sd: 0.025,
            polar_sd: 0.05,
            azimuth_track_sd_scale: 0.05,
            azimuth_track_sd_pivot: 1.6,
            wrong_way_rate: 0.1,
            energy_sd: 10.0,
            radial_sd: 25.0,
            hit_density: 0.0028,
            rand_energy_density: 0.001,
            miss_prob: 0.1,
        }
    }
}

/// Density of observing hit `b` on the exit trajectory of a track entering
/// at hit `a`. Zero when both hits are on the same plane.
pub fn directional_density(
    geom: &DetectorGeometry,
    params: &LikelihoodParams,
    plane_a: PlaneId,
    a: HitView,
    plane_b: PlaneId,
    b: HitView,
) -> f64 {
    match map_to_canonical(geom, plane_a, a, plane_b, b) {
        CanonicalPair::SamePlane => 0.0,
        CanonicalPair::Adjacent { a, b, offset_a, offset_b } => {
            adjacent_density(geom, params, a, b, offset_a, offset_b)
        }
        CanonicalPair::Opposite { a, b, separation } => {
            opposite_density(geom, params, a, b, separation)
        }
    }
}

/// Directional density for the adjacent case.
///
/// The connecting line between the two hits fixes a predicted azimuth and
/// polar angle at each end; the position terms are the change-of-variable
/// factors from the entry angles to the exit position.
fn adjacent_density(
    geom: &DetectorGeometry,
    p: &LikelihoodParams,
    ea: HitView,
    eb: HitView,
    offset_a: f64,
    offset_b: f64,
) -> f64 {
    let pw = geom.pixel_pitch;
    let rise_a = ea.y * pw + offset_a;
    let rise_b = eb.y * pw + offset_b;
    let run = (ea.x - eb.x) * pw;

    let (a_azimuth, b_azimuth) = if ea.x == eb.x {
        (-FRAC_PI_2, -FRAC_PI_2)
    } else {
        (
            (rise_a / run).atan(),
            ((eb.y * pw + offset_a) / ((eb.x - ea.x) * pw)).atan(),
        )
    };
    let a_azimuth = wrap_into(a_azimuth, -PI, 0.0);
    let b_azimuth = wrap_into(b_azimuth, -PI, 0.0);

    let l = (rise_a * rise_a + run * run).sqrt();
    let a_polar = (l / rise_b).atan();
    let l2 = (rise_b * rise_b + run * run).sqrt();
    let b_polar = (l2 / rise_a).atan();

    let x_density = rise_a / (run * run + rise_a * rise_a)
        * azimuth_track_density(
            ea.azimuth,
            a_azimuth,
            a_polar,
            p.azimuth_track_sd_scale,
            p.azimuth_track_sd_pivot,
            p.wrong_way_rate,
        );
    let y_density_given_x =
        l / (l * l + rise_b * rise_b) * polar_track_density(a_polar, ea.polar, p.polar_sd);

    let azimuth_density = azimuth_report_density(
        b_azimuth,
        eb.azimuth,
        b_polar,
        p.azimuth_report_sd,
        p.wrong_way_rate,
    );
    let polar_density = polar_report_density(b_polar, eb.polar, p.polar_sd);

    x_density * y_density_given_x * azimuth_density * polar_density
}

/// Directional density for the opposite case.
///
/// The entry polar angle predicts the radial separation on the far plane,
/// `predicted r = tan(polar) * distance`, scored against the observed one.
fn opposite_density(
    geom: &DetectorGeometry,
    p: &LikelihoodParams,
    ea: HitView,
    eb: HitView,
    separation: f64,
) -> f64 {
    let dis = separation / geom.pixel_pitch;

    let azimuth = if ea.x == eb.x {
        FRAC_PI_2
    } else {
        ((ea.y - eb.y) / (ea.x - eb.x)).atan()
    };
    let (mut a_azimuth, mut b_azimuth) = if ea.x < eb.x {
        (azimuth, azimuth + PI)
    } else {
        (azimuth + PI, azimuth)
    };
    if ea.x == eb.x {
        if ea.y < eb.y {
            a_azimuth = FRAC_PI_2;
            b_azimuth = -FRAC_PI_2;
        } else {
            a_azimuth = -FRAC_PI_2;
            b_azimuth = FRAC_PI_2;
        }
    }

    let dx = ea.x - eb.x;
    let dy = ea.y - eb.y;
    let r = (dx * dx + dy * dy).sqrt();
    let polar = if r == 0.0 { 0.0 } else { (r / dis).atan() };

    let predicted_r = ea.polar.tan() * dis;
    let sdr = p.radial_sd;
    let pos_density = (-((r - predicted_r) / sdr) * ((r - predicted_r) / sdr)).exp()
        * azimuth_track_density(
            a_azimuth,
            ea.azimuth,
            polar,
            p.azimuth_track_sd_scale,
            p.azimuth_track_sd_pivot,
            p.wrong_way_rate,
        )
        / (sdr * PI.sqrt());
    let angle_density = azimuth_report_density(
        b_azimuth,
        eb.azimuth,
        polar,
        p.azimuth_report_sd,
        p.wrong_way_rate,
    ) * polar_report_density(polar, eb.polar, p.polar_sd);

    pos_density * angle_density
}

/// Gaussian density over the mean-energy difference of the two clusters.
pub fn energy_density(p: &LikelihoodParams, energy_a: f64, energy_b: f64) -> f64 {
    let k = 1.0 / (p.energy_sd * (2.0 * PI).sqrt());
    let x = (energy_a - energy_b) / p.energy_sd;
    k * (-x * x).exp() + DENSITY_FLOOR
}

/// Density of a cluster being an uncorrelated background hit.
///
/// Angles of background hits are assumed random: the azimuth is uniform and
/// the polar density `sin(2*polar)` combines foreshortening with the solid
/// angle shrinking towards the pole.
pub fn noise_density(p: &LikelihoodParams, polar: f64) -> f64 {
    let azimuth_density = 1.0 / (2.0 * PI);
    let polar_density = (2.0 * polar).sin() + 1e-5;
    azimuth_density * polar_density * p.rand_energy_density * p.hit_density
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{Continuous, Normal};

    fn hit(x: f64, y: f64, polar: f64, azimuth: f64) -> HitView {
        HitView { x, y, polar, azimuth }
    }

    #[test]
    fn test_same_plane_density_is_exactly_zero() {
        let geom = DetectorGeometry::default();
        let p = LikelihoodParams::default();
        let a = hit(10.0, 20.0, 0.5, 0.3);
        let b = hit(50.0, 60.0, 0.7, -1.1);
        assert_eq!(directional_density(&geom, &p, PlaneId::Side2, a, PlaneId::Side2, b), 0.0);
    }

    #[test]
    fn test_aligned_adjacent_pair_scores_high() {
        let geom = DetectorGeometry::default();
        let p = LikelihoodParams::default();
        // Track from the base plane out through side plane 2, angles matching
        // the connecting-line prediction at both ends.
        let a = hit(100.0, 50.0, 0.62276, -FRAC_PI_2);
        let b = hit(100.0, 50.0, 0.94805, FRAC_PI_2);
        let aligned = directional_density(&geom, &p, PlaneId::Base, a, PlaneId::Side2, b);
        assert!(aligned > 10.0);

        // Rotating the exit azimuth a quarter turn breaks the fit.
        let b_off = hit(100.0, 50.0, 0.94805, FRAC_PI_2 + 0.8);
        let misaligned = directional_density(&geom, &p, PlaneId::Base, a, PlaneId::Side2, b_off);
        assert!(misaligned < aligned / 1e3);
    }

    #[test]
    fn test_opposite_pair_prefers_predicted_radius() {
        let geom = DetectorGeometry::default();
        let p = LikelihoodParams::default();
        let dis = geom.stack_separation() / geom.pixel_pitch;
        // Entry polar chosen so the predicted radius across the stack is
        // 100 pixels; the exit hit sits exactly there, with both reported
        // angle sets matching the connecting-line prediction.
        let polar = (100.0_f64 / dis).atan();
        let a = hit(200.0, 128.0, polar, PI);
        let b = hit(156.0, 128.0, polar, -FRAC_PI_2);
        let d_near = directional_density(&geom, &p, PlaneId::Side1, a, PlaneId::Side2, b);
        assert!(d_near > 1.0);

        // 60 pixels beyond the predicted radius.
        let b_far = hit(216.0, 128.0, polar, -FRAC_PI_2);
        let d_far = directional_density(&geom, &p, PlaneId::Side1, a, PlaneId::Side2, b_far);
        assert!(d_far < d_near / 1e3);
    }

    #[test]
    fn test_energy_density_matches_reference_normal() {
        let p = LikelihoodParams::default();
        // The bespoke form k * exp(-(x/sd)^2) is a normal with sigma = sd/sqrt(2)
        // scaled down by sqrt(2).
        let reference = Normal::new(0.0, p.energy_sd / 2.0_f64.sqrt()).unwrap();
        for diff in [0.0, 1.5, 7.0, 23.0] {
            let ours = energy_density(&p, 40.0 + diff, 40.0);
            let theirs = reference.pdf(diff) / 2.0_f64.sqrt();
            assert!((ours - theirs).abs() < 1e-12, "diff {diff}: {ours} vs {theirs}");
        }
    }

    #[test]
    fn test_noise_density_default_scale() {
        let p = LikelihoodParams::default();
        let d = noise_density(&p, 0.9481);
        assert!((d - 4.22e-7).abs() < 5e-9);
    }
}
