//! Matching solver: maximum-affinity pairing within one group.
//!
//! Small groups are solved exhaustively. Larger groups are first reduced by
//! greedily committing the single best pair until the exhaustive search
//! becomes affordable; the greedy step is an approximation and is never
//! undone.

use tracing::trace;

use crate::data::frame::Frame;
use crate::pairing::qmatrix::{QMatrix, NEVER_PAIR};

/// Largest group handed to the exhaustive matching search.
pub const DEFAULT_MAX_EXACT_GROUP: usize = 7;

/// Resolves every member of `group`, writing pair state into the frame.
pub fn solve_group(frame: &mut Frame, q: &QMatrix, group: Vec<usize>, max_exact: usize) {
    let mut members = group;
    while members.len() > max_exact {
        if !reduce_greedy_once(frame, q, &mut members) {
            // Every remaining edge is the never-pair sentinel; no matching
            // can score above the empty one, so the rest are misses.
            for &i in &members {
                frame.set_missed(i);
            }
            return;
        }
    }
    solve_exact(frame, q, &members);
}

/// Commits the highest-affinity pair of the group and removes both members.
///
/// Scans ordered pairs in ascending index order; the first maximum wins.
/// Returns false if no pair scores above the sentinel.
fn reduce_greedy_once(frame: &mut Frame, q: &QMatrix, members: &mut Vec<usize>) -> bool {
    let mut best = NEVER_PAIR;
    let mut pick: Option<(usize, usize)> = None;
    for bi in 1..members.len() {
        for ai in 0..bi {
            let value = q.get(members[ai], members[bi]);
            if value > best {
                best = value;
                pick = Some((ai, bi));
            }
        }
    }
    let Some((ai, bi)) = pick else {
        return false;
    };
    trace!(a = members[ai], b = members[bi], affinity = best, "greedy reduction");
    frame.set_paired(members[ai], members[bi]);
    members.remove(bi);
    members.remove(ai);
    true
}

/// Exhaustive search over every set of disjoint pairs within the group.
///
/// Backtracking enumeration in a fixed canonical order: the lowest undecided
/// member either stays unmatched or pairs with each higher undecided member
/// in turn. The empty matching (score zero) is the baseline, strictly higher
/// sums win, and a tie keeps the first matching found. Branches that cannot
/// strictly beat the incumbent are pruned with an admissible bound.
fn solve_exact(frame: &mut Frame, q: &QMatrix, members: &[usize]) {
    let m = members.len();
    if m == 0 {
        return;
    }
    // Best positive affinity each member can still contribute; half-sums of
    // these bound any remaining score from above.
    let gain: Vec<f64> = (0..m)
        .map(|i| {
            members
                .iter()
                .map(|&k| q.get(members[i], k))
                .fold(0.0, f64::max)
        })
        .collect();

    let mut search = MatchSearch {
        q,
        members,
        gain: &gain,
        partner: vec![None; m],
        best_partner: vec![None; m],
        best_score: 0.0,
    };
    search.descend(0, 0.0);

    let best_partner = search.best_partner;
    for (i, partner) in best_partner.iter().enumerate() {
        match partner {
            Some(j) if *j > i => frame.set_paired(members[i], members[*j]),
            Some(_) => {} // written when the lower end was visited
            None => frame.set_missed(members[i]),
        }
    }
}

struct MatchSearch<'a> {
    q: &'a QMatrix,
    members: &'a [usize],
    gain: &'a [f64],
    partner: Vec<Option<usize>>,
    best_partner: Vec<Option<usize>>,
    best_score: f64,
}

impl MatchSearch<'_> {
    fn bound_from(&self, from: usize) -> f64 {
        (from..self.partner.len())
            .filter(|&i| self.partner[i].is_none())
            .map(|i| self.gain[i])
            .sum::<f64>()
            / 2.0
    }

    fn descend(&mut self, from: usize, score: f64) {
        let next = (from..self.partner.len()).find(|&i| self.partner[i].is_none());
        let Some(i) = next else {
            if score > self.best_score {
                self.best_score = score;
                self.best_partner.copy_from_slice(&self.partner);
            }
            return;
        };
        if score + self.bound_from(i) <= self.best_score {
            return;
        }
        // leave i unmatched
        self.descend(i + 1, score);
        // or pair it with each later undecided member
        for j in (i + 1)..self.partner.len() {
            if self.partner[j].is_some() {
                continue;
            }
            self.partner[i] = Some(j);
            self.partner[j] = Some(i);
            let value = self.q.get(self.members[i], self.members[j]);
            self.descend(i + 1, score + value);
            self.partner[i] = None;
            self.partner[j] = None;
        }
    }
}
