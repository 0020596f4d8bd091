//! Resolution pre-pass: retire the obvious outcomes before group search.
//!
//! Runs to a fixed point. Each sweep first declares misses (clusters with no
//! positive affinity left to anyone), then commits pairs whose affinity
//! margin makes them optimal regardless of how the rest of the frame
//! resolves. Every committed cluster has its matrix entries overwritten with
//! the sentinel, which can create new misses for the next sweep.

use tracing::trace;

use crate::data::frame::Frame;
use crate::pairing::qmatrix::QMatrix;

/// Resolves certain misses and unambiguous pairs in place.
///
/// Termination: every change retires at least one unresolved cluster, and a
/// sweep without changes exits the loop.
pub fn resolve_obvious(frame: &mut Frame, q: &mut QMatrix) {
    let n = frame.len();
    let mut changed = true;
    while changed {
        changed = false;
        let mut misses = 0usize;
        let mut pairs = 0usize;

        // Misses: nothing positive left means no partner can ever be chosen.
        // Their entries are already non-positive, no invalidation needed.
        for i in 0..n {
            if !frame.is_unresolved(i) {
                continue;
            }
            if !q.has_positive(i) {
                frame.set_missed(i);
                misses += 1;
                changed = true;
            }
        }

        // Definite pairs: commit (i, j) when i's best affinity beats its own
        // runner-up plus j's best alternative combined, so no other pairing
        // of the group can recover the difference.
        for i in 0..n {
            if !frame.is_unresolved(i) {
                continue;
            }
            let mut highest = 0.0;
            let mut second = 0.0;
            let mut best: Option<usize> = None;
            for j in 0..n {
                let value = q.get(i, j);
                if value > highest {
                    second = highest;
                    highest = value;
                    best = Some(j);
                } else if value > second {
                    second = value;
                }
            }
            // The miss sweep above retired every cluster without a positive
            // affinity, so `best` is present for all clusters reaching here.
            let Some(j) = best else {
                continue;
            };
            let mut second_j = 0.0;
            for k in 0..n {
                if k == i {
                    continue;
                }
                let value = q.get(j, k);
                if value > second_j {
                    second_j = value;
                }
            }
            if highest > second + second_j {
                q.invalidate(i);
                q.invalidate(j);
                frame.set_paired(i, j);
                pairs += 1;
                changed = true;
            }
        }

        if changed {
            trace!(event_id = frame.event_id, misses, pairs, "pre-pass sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{Cluster, PairState};
    use crate::pairing::qmatrix::NEVER_PAIR;
    use pixcore::geometry::plane::PlaneId;

    fn test_frame(n: usize) -> Frame {
        let planes = [PlaneId::Side0, PlaneId::Side1, PlaneId::Side2, PlaneId::Side3, PlaneId::Base];
        let clusters = (0..n)
            .map(|i| Cluster::new(planes[i % 5], i as f64, 0.0, 0.5, 0.1, 30.0, 0.01))
            .collect();
        Frame::new(1, clusters)
    }

    #[test]
    fn test_single_cluster_is_missed() {
        let mut frame = test_frame(1);
        let mut q = QMatrix::from_fn(1, |_, _| NEVER_PAIR);
        resolve_obvious(&mut frame, &mut q);
        assert_eq!(frame.cluster(0).state, PairState::Missed);
    }

    #[test]
    fn test_all_negative_cluster_is_missed() {
        let mut frame = test_frame(3);
        // 0 only relates negatively; 1 and 2 are a clear pair
        let mut q = QMatrix::from_fn(3, |a, b| match (a, b) {
            (1, 2) => 6.0,
            _ => -0.5,
        });
        resolve_obvious(&mut frame, &mut q);
        assert_eq!(frame.cluster(0).state, PairState::Missed);
        assert_eq!(frame.cluster(1).state, PairState::Paired(2));
        assert_eq!(frame.cluster(2).state, PairState::Paired(1));
    }

    #[test]
    fn test_two_positive_clusters_pair_up() {
        let mut frame = test_frame(2);
        let mut q = QMatrix::from_fn(2, |_, _| 0.3);
        resolve_obvious(&mut frame, &mut q);
        assert_eq!(frame.cluster(0).state, PairState::Paired(1));
        assert_eq!(frame.cluster(1).state, PairState::Paired(0));
    }

    #[test]
    fn test_margin_commit_cascades_to_misses() {
        let mut frame = test_frame(4);
        // 0-1 dominate: 10 > 2 (runner-up of 0) + 3 (1's best alternative).
        // After they retire, 2 and 3 have nothing positive left.
        let mut q = QMatrix::from_fn(4, |a, b| match (a, b) {
            (0, 1) => 10.0,
            (0, 2) => 2.0,
            (1, 3) => 3.0,
            _ => -1.0,
        });
        resolve_obvious(&mut frame, &mut q);
        assert_eq!(frame.cluster(0).state, PairState::Paired(1));
        assert_eq!(frame.cluster(1).state, PairState::Paired(0));
        assert_eq!(frame.cluster(2).state, PairState::Missed);
        assert_eq!(frame.cluster(3).state, PairState::Missed);
        assert_eq!(q.get(0, 2), NEVER_PAIR);
    }

    #[test]
    fn test_ambiguous_triangle_stays_unresolved() {
        let mut frame = test_frame(3);
        let mut q = QMatrix::from_fn(3, |_, _| 5.0);
        resolve_obvious(&mut frame, &mut q);
        // every margin test fails: 5 > 5 + 5 is false
        assert_eq!(frame.unresolved(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_frame_is_a_no_op() {
        let mut frame = test_frame(0);
        let mut q = QMatrix::from_fn(0, |_, _| 0.0);
        resolve_obvious(&mut frame, &mut q);
        assert!(frame.is_empty());
    }
}
