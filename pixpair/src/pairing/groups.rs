//! Decomposition of the unresolved clusters into independent groups.
//!
//! Two clusters belong to the same group if a chain of positive affinities
//! connects them. Groups never share a positive entry by construction, so
//! the matching solver can treat each one in isolation.

use crate::data::frame::Frame;
use crate::pairing::qmatrix::QMatrix;

/// Partitions the frame's unresolved clusters into affinity-connected groups.
///
/// Built incrementally: each cluster joins the group it has a positive
/// affinity into, merging groups when it links several. Merge order is not
/// significant, only the transitive closure is. Each group comes back sorted
/// by local id, the canonical order the solver enumerates in.
pub fn decompose(frame: &Frame, q: &QMatrix) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in 0..frame.len() {
        if !frame.is_unresolved(i) {
            continue;
        }
        let mut linked: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.iter().any(|&k| q.get(i, k) > 0.0))
            .map(|(gi, _)| gi)
            .collect();
        if let Some(&home) = linked.first() {
            // fold later groups into the first match, back to front so the
            // remaining indices stay valid
            for gi in linked.drain(1..).rev() {
                let absorbed = groups.remove(gi);
                groups[home].extend(absorbed);
            }
            groups[home].push(i);
        } else {
            groups.push(vec![i]);
        }
    }
    for group in &mut groups {
        group.sort_unstable();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::Cluster;
    use crate::pairing::qmatrix::NEVER_PAIR;
    use pixcore::geometry::plane::PlaneId;

    fn test_frame(n: usize) -> Frame {
        let planes = [PlaneId::Side0, PlaneId::Side1, PlaneId::Side2, PlaneId::Side3, PlaneId::Base];
        let clusters = (0..n)
            .map(|i| Cluster::new(planes[i % 5], i as f64, 0.0, 0.5, 0.1, 30.0, 0.01))
            .collect();
        Frame::new(1, clusters)
    }

    fn q_from_edges(n: usize, edges: &[(usize, usize)]) -> QMatrix {
        QMatrix::from_fn(n, |a, b| {
            if edges.contains(&(a, b)) {
                1.0
            } else {
                NEVER_PAIR
            }
        })
    }

    #[test]
    fn test_chain_forms_one_group() {
        let frame = test_frame(4);
        let q = q_from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let groups = decompose(&frame, &q);
        assert_eq!(groups, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_disjoint_components_stay_separate() {
        let frame = test_frame(5);
        let q = q_from_edges(5, &[(0, 2), (1, 3)]);
        let groups = decompose(&frame, &q);
        assert_eq!(groups.len(), 3);
        assert!(groups.contains(&vec![0, 2]));
        assert!(groups.contains(&vec![1, 3]));
        assert!(groups.contains(&vec![4]));
    }

    #[test]
    fn test_late_cluster_merges_two_groups() {
        let frame = test_frame(5);
        // 0-1 and 2-3 form first; 4 links into both
        let q = q_from_edges(5, &[(0, 1), (2, 3), (0, 4), (3, 4)]);
        let groups = decompose(&frame, &q);
        assert_eq!(groups, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_resolved_clusters_are_skipped() {
        let mut frame = test_frame(4);
        frame.set_paired(0, 1);
        let q = q_from_edges(4, &[(0, 1), (2, 3)]);
        let groups = decompose(&frame, &q);
        assert_eq!(groups, vec![vec![2, 3]]);
    }
}
