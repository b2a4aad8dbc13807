use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("pattern row index out of range: {row} (n = {n})")]
    RowOutOfRange { row: usize, n: usize },

    #[error("invalid pattern pointers at column {column}")]
    InvalidPointers { column: usize },
}

/// Which fill-reducing ordering to apply before the symbolic analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingKind {
    /// Greedy minimum-degree elimination.
    #[default]
    MinimumDegree,
    /// Identity permutation. Mostly useful for tests and debugging, where a
    /// reproducible elimination order matters more than fill.
    Natural,
}

/// Compute a fill-reducing ordering of the symmetric matrix whose lower
/// triangle is given by (ptr, row). Returns (perm, invperm) where `perm[k]`
/// is the original index eliminated at step k.
pub fn order(
    n: usize,
    ptr: &[usize],
    row: &[usize],
    kind: OrderingKind,
) -> Result<(Vec<usize>, Vec<usize>), OrderingError> {
    validate(n, ptr, row)?;
    match kind {
        OrderingKind::Natural => {
            let perm: Vec<usize> = (0..n).collect();
            Ok((perm.clone(), perm))
        }
        OrderingKind::MinimumDegree => minimum_degree(n, ptr, row),
    }
}

fn validate(n: usize, ptr: &[usize], row: &[usize]) -> Result<(), OrderingError> {
    if ptr.len() != n + 1 || ptr[0] != 0 || ptr[n] != row.len() {
        return Err(OrderingError::InvalidPointers { column: 0 });
    }
    for j in 0..n {
        if ptr[j] > ptr[j + 1] {
            return Err(OrderingError::InvalidPointers { column: j });
        }
        for &r in &row[ptr[j]..ptr[j + 1]] {
            if r >= n {
                return Err(OrderingError::RowOutOfRange { row: r, n });
            }
        }
    }
    Ok(())
}

/// Greedy minimum-degree on the elimination graph: repeatedly eliminate a
/// vertex of minimum degree (ties broken by lowest index) and connect its
/// remaining neighbours into a clique. No supervariable detection; this is
/// the straightforward quadratic variant, adequate because the ordering is a
/// one-off analysis cost.
fn minimum_degree(
    n: usize,
    ptr: &[usize],
    row: &[usize],
) -> Result<(Vec<usize>, Vec<usize>), OrderingError> {
    let mut adj: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for j in 0..n {
        for &i in &row[ptr[j]..ptr[j + 1]] {
            if i != j {
                adj[i].insert(j);
                adj[j].insert(i);
            }
        }
    }

    let mut eliminated = vec![false; n];
    let mut perm = Vec::with_capacity(n);
    for _ in 0..n {
        let mut best = usize::MAX;
        let mut best_deg = usize::MAX;
        for v in 0..n {
            if !eliminated[v] && adj[v].len() < best_deg {
                best = v;
                best_deg = adj[v].len();
            }
        }
        let v = best;
        eliminated[v] = true;
        perm.push(v);

        // clique the remaining neighbours, then detach v
        let neighbours: Vec<usize> = adj[v].iter().copied().collect();
        for (a, &u) in neighbours.iter().enumerate() {
            for &w in &neighbours[a + 1..] {
                adj[u].insert(w);
                adj[w].insert(u);
            }
        }
        for &u in &neighbours {
            adj[u].remove(&v);
        }
        adj[v].clear();
    }

    let mut invperm = vec![0usize; n];
    for (k, &v) in perm.iter().enumerate() {
        invperm[v] = k;
    }
    Ok((perm, invperm))
}
