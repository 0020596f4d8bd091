use serde::{Deserialize, Serialize};

use pixcore::geometry::plane::PlaneId;
use pixcore::geometry::transform::HitView;

/// Pairing outcome of one cluster.
///
/// `Paired` carries the partner's local index and is kept symmetric by the
/// frame accessors: whenever `a` is `Paired(b)`, `b` is `Paired(a)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    Unresolved,
    Missed,
    Paired(usize),
}

impl PairState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PairState::Unresolved)
    }

    /// Local index of the partner, `None` for unresolved or missed clusters.
    pub fn partner(&self) -> Option<usize> {
        match self {
            PairState::Paired(j) => Some(*j),
            _ => None,
        }
    }
}

/// One candidate hit on one detector plane within one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cluster {
    pub plane: PlaneId,
    /// Position in pixel units, plane-local.
    pub x: f64,
    pub y: f64,
    /// Track angles in radians; the azimuth pole is perpendicular to the
    /// plane with zero pointing towards positive x.
    pub polar: f64,
    pub azimuth: f64,
    /// Mean energy deposition estimate (LET).
    pub mean_energy: f64,
    /// Likelihood that this cluster is a gamma rather than a charged track.
    pub gamma_likelihood: f64,
    /// Dense per-frame index, the sole key into the affinity matrix.
    pub local_id: usize,
    pub state: PairState,
}

impl Cluster {
    pub fn new(
        plane: PlaneId,
        x: f64,
        y: f64,
        polar: f64,
        azimuth: f64,
        mean_energy: f64,
        gamma_likelihood: f64,
    ) -> Self {
        Self {
            plane,
            x,
            y,
            polar,
            azimuth,
            mean_energy,
            gamma_likelihood,
            local_id: 0,
            state: PairState::Unresolved,
        }
    }

    /// Position and angles as the geometry layer sees them.
    pub fn hit_view(&self) -> HitView {
        HitView {
            x: self.x,
            y: self.y,
            polar: self.polar,
            azimuth: self.azimuth,
        }
    }
}

/// All clusters recorded for one readout event, merged across planes.
///
/// Clusters live in an arena indexed by `local_id`; pairing state is only
/// written through `set_paired` / `set_missed` so the symmetry invariant
/// cannot be broken by a caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    pub event_id: u64,
    clusters: Vec<Cluster>,
}

impl Frame {
    /// Builds a frame, stamping dense local ids in the given order.
    pub fn new(event_id: u64, mut clusters: Vec<Cluster>) -> Self {
        for (i, c) in clusters.iter_mut().enumerate() {
            c.local_id = i;
            c.state = PairState::Unresolved;
        }
        Self { event_id, clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self, i: usize) -> &Cluster {
        &self.clusters[i]
    }

    pub fn is_unresolved(&self, i: usize) -> bool {
        self.clusters[i].state == PairState::Unresolved
    }

    /// Declares cluster `i` a miss: no plausible partner on any plane.
    pub fn set_missed(&mut self, i: usize) {
        self.clusters[i].state = PairState::Missed;
    }

    /// Commits `i` and `j` as the two ends of one track.
    pub fn set_paired(&mut self, i: usize, j: usize) {
        debug_assert_ne!(i, j);
        self.clusters[i].state = PairState::Paired(j);
        self.clusters[j].state = PairState::Paired(i);
    }

    /// Local ids still awaiting a pairing decision.
    pub fn unresolved(&self) -> Vec<usize> {
        (0..self.clusters.len()).filter(|&i| self.is_unresolved(i)).collect()
    }

    /// Committed pairs as `(a, b)` with `a < b`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.clusters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c.state {
                PairState::Paired(j) if i < j => Some((i, j)),
                _ => None,
            })
            .collect()
    }

    /// Local ids of clusters declared missed.
    pub fn missed(&self) -> Vec<usize> {
        self.clusters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| (c.state == PairState::Missed).then_some(i))
            .collect()
    }
}
