// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Level assignment from access sets (spec.md §4.3): longest-path-to-root on
//! the conflict DAG, with a monotonicity step that preserves flattened
//! tx-index order.

use crate::access_set::AccessSet;

/// An execution level: an ordered batch of tx indices that can run
/// concurrently because they are pairwise non-conflicting (spec.md §3).
pub type Level = Vec<usize>;

/// Partitions `access_sets` (one per transaction, in tx-index order) into an
/// ordered list of conflict-free levels. Flattening the result in order
/// yields the original tx-index sequence (spec.md §4.3).
pub fn build_levels(access_sets: &[AccessSet]) -> Vec<Level> {
    let n = access_sets.len();
    if n == 0 {
        return Vec::new();
    }

    let mut level_of = vec![0usize; n];
    for i in 1..n {
        let mut level = 0usize;
        for j in 0..i {
            if access_sets[i].conflicts(&access_sets[j]) {
                level = level.max(level_of[j] + 1);
            }
        }
        // Monotonicity step: guarantees that flattening levels in order
        // yields an ascending tx-index sequence even when tx `i` itself has
        // no conflicts (spec.md §4.3, scenario D).
        level = level.max(level_of[i - 1]);
        level_of[i] = level;
    }

    let num_levels = level_of[n - 1] + 1;
    let mut levels: Vec<Level> = vec![Vec::new(); num_levels];
    for (idx, &lvl) in level_of.iter().enumerate() {
        levels[lvl].push(idx);
    }
    levels
}
