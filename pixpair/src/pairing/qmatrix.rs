use itertools::Itertools;

use crate::data::frame::{Cluster, Frame};
use pixcore::geometry::plane::DetectorGeometry;
use pixcore::probability::density::{
    directional_density, energy_density, noise_density, LikelihoodParams,
};

/// Sentinel affinity marking a pair as forced non-pairable.
pub const NEVER_PAIR: f64 = -1.0;

/// Log-likelihood-ratio score for one ordered cluster pair.
///
/// The ratio weighs "b lies on the exit trajectory of a" against "b is
/// background and both tracks went undetected". A non-positive ratio maps to
/// the [`NEVER_PAIR`] sentinel, which is a normal outcome, not a fault.
pub fn affinity_score(
    geometry: &DetectorGeometry,
    model: &LikelihoodParams,
    a: &Cluster,
    b: &Cluster,
) -> f64 {
    let directional =
        directional_density(geometry, model, a.plane, a.hit_view(), b.plane, b.hit_view());
    let energy = energy_density(model, a.mean_energy, b.mean_energy);
    let background = noise_density(model, b.polar) * model.miss_prob * model.miss_prob;
    let ratio = directional * energy / background;
    if ratio > 0.0 {
        ratio.ln()
    } else {
        NEVER_PAIR
    }
}

/// Upper-triangular affinity table over one frame's clusters.
///
/// One entry is stored per unordered pair `a < b`; reads go through the
/// symmetric accessor. Built once per frame, mutated only by sentinel
/// overwrites when the pre-pass retires a cluster.
#[derive(Clone, Debug)]
pub struct QMatrix {
    n: usize,
    values: Vec<f64>,
}

impl QMatrix {
    /// Scores every unordered cluster pair of the frame.
    pub fn build(frame: &Frame, geometry: &DetectorGeometry, model: &LikelihoodParams) -> Self {
        Self::from_fn(frame.len(), |a, b| {
            affinity_score(geometry, model, frame.cluster(a), frame.cluster(b))
        })
    }

    /// Builds a matrix from precomputed scores, `score(a, b)` with `a < b`.
    pub fn from_fn(n: usize, mut score: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(n.saturating_sub(1) * n / 2);
        for (a, b) in (0..n).tuple_combinations() {
            values.push(score(a, b));
        }
        Self { n, values }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn index(&self, a: usize, b: usize) -> usize {
        debug_assert!(a < b && b < self.n);
        a * (2 * self.n - a - 1) / 2 + (b - a - 1)
    }

    /// Affinity between `a` and `b`, symmetric; the diagonal is the sentinel.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        if a == b {
            NEVER_PAIR
        } else if a < b {
            self.values[self.index(a, b)]
        } else {
            self.values[self.index(b, a)]
        }
    }

    /// Overwrites every entry touching `i` with the sentinel, excluding the
    /// cluster from all further pairing consideration.
    pub fn invalidate(&mut self, i: usize) {
        for j in 0..self.n {
            if j == i {
                continue;
            }
            let idx = if i < j { self.index(i, j) } else { self.index(j, i) };
            self.values[idx] = NEVER_PAIR;
        }
    }

    /// True if `i` has positive affinity to any other cluster.
    pub fn has_positive(&self, i: usize) -> bool {
        (0..self.n).any(|j| self.get(i, j) > 0.0)
    }
}
