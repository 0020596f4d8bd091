//! Frame-level orchestration of the pairing pipeline.
//!
//! One frame flows through matrix build, pre-pass, group decomposition and
//! the matching solver, strictly in that order. Frames are independent of
//! each other, so batches fan out across the rayon pool with no shared
//! mutable state.

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

use crate::data::frame::Frame;
use crate::pairing::qmatrix::{affinity_score, QMatrix};
use crate::pairing::{groups, prepass, solver};
use pixcore::geometry::plane::DetectorGeometry;
use pixcore::probability::density::LikelihoodParams;

/// Process-wide tunables for one pairing run. Immutable once a run starts;
/// threaded explicitly into every stage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PairingConfig {
    pub geometry: DetectorGeometry,
    pub model: LikelihoodParams,
    /// Largest group size handed to the exhaustive matching search.
    pub max_exact_group: usize,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            geometry: DetectorGeometry::default(),
            model: LikelihoodParams::default(),
            max_exact_group: solver::DEFAULT_MAX_EXACT_GROUP,
        }
    }
}

/// One committed entry/exit pair, with the affinity it was chosen at.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairedTrack {
    pub entry: usize,
    pub exit: usize,
    pub affinity: f64,
}

/// Pairing result of one frame: tracks sorted best-first, plus the misses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FramePairing {
    pub event_id: u64,
    pub tracks: Vec<PairedTrack>,
    pub missed: Vec<usize>,
}

/// Pairs all clusters of one frame in place and reports the outcome.
pub fn pair_frame(frame: &mut Frame, config: &PairingConfig) -> FramePairing {
    let mut q = QMatrix::build(frame, &config.geometry, &config.model);
    prepass::resolve_obvious(frame, &mut q);
    let groups = groups::decompose(frame, &q);
    debug!(
        event_id = frame.event_id,
        clusters = frame.len(),
        resolved_early = frame.len() - groups.iter().map(Vec::len).sum::<usize>(),
        groups = groups.len(),
        "resolving frame"
    );
    for group in groups {
        solver::solve_group(frame, &q, group, config.max_exact_group);
    }
    summarize(frame, config)
}

/// Pairs a batch of frames, one rayon task per frame.
pub fn pair_frames(frames: &mut [Frame], config: &PairingConfig) -> Vec<FramePairing> {
    frames
        .par_iter_mut()
        .map(|frame| pair_frame(frame, config))
        .collect()
}

fn summarize(frame: &Frame, config: &PairingConfig) -> FramePairing {
    let mut tracks: Vec<PairedTrack> = frame
        .pairs()
        .into_iter()
        .map(|(a, b)| PairedTrack {
            entry: a,
            exit: b,
            affinity: affinity_score(
                &config.geometry,
                &config.model,
                frame.cluster(a),
                frame.cluster(b),
            ),
        })
        .collect();
    tracks.sort_by_key(|t| Reverse(OrderedFloat(t.affinity)));
    FramePairing {
        event_id: frame.event_id,
        tracks,
        missed: frame.missed(),
    }
}
