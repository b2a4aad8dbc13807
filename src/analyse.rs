//! Symbolic elimination analysis: elimination tree, postorder, supernode
//! detection, amalgamation and per-node row patterns.
//!
//! Operates on the full (symmetrized) pattern. The permutation is normalized
//! to a postorder of the elimination tree in place, so callers must treat
//! `perm` as an output of this pass.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyseError {
    #[error("permutation is not a bijection (index {index})")]
    PermutationNotBijective { index: usize },

    #[error("pattern row index out of range: {row} (n = {n})")]
    RowOutOfRange { row: usize, n: usize },
}

/// Output of the analysis. All arrays are indexed by supernode, in postorder:
/// every node's children have smaller indices. A `sparent` entry equal to
/// `nnodes` marks a root.
#[derive(Debug, Clone)]
pub struct AnalyseResult {
    pub nnodes: usize,
    /// Column ranges, len = nnodes + 1: node s owns columns sptr[s]..sptr[s+1].
    pub sptr: Vec<usize>,
    /// Parent node of each node, len = nnodes; == nnodes for roots.
    pub sparent: Vec<usize>,
    /// Row list ranges, len = nnodes + 1.
    pub rptr: Vec<usize>,
    /// Row lists (permuted indices, ascending; a node's own columns lead).
    pub rlist: Vec<usize>,
    /// Predicted factor nonzero count.
    pub nfact: u64,
    /// Predicted floating-point operation count.
    pub nflop: u64,
    /// Structural singularity was detected (missing diagonal entry).
    pub singular: bool,
}

pub fn analyse(
    n: usize,
    full_ptr: &[usize],
    full_row: &[usize],
    perm: &mut [usize],
    nemin: usize,
) -> Result<AnalyseResult, AnalyseError> {
    if n == 0 {
        return Ok(AnalyseResult {
            nnodes: 0,
            sptr: vec![0],
            sparent: vec![],
            rptr: vec![0],
            rlist: vec![],
            nfact: 0,
            nflop: 0,
            singular: false,
        });
    }

    let mut iperm = vec![usize::MAX; n];
    for (k, &v) in perm.iter().enumerate() {
        if v >= n {
            return Err(AnalyseError::RowOutOfRange { row: v, n });
        }
        if iperm[v] != usize::MAX {
            return Err(AnalyseError::PermutationNotBijective { index: v });
        }
        iperm[v] = k;
    }
    for &r in full_row {
        if r >= n {
            return Err(AnalyseError::RowOutOfRange { row: r, n });
        }
    }

    // Structural singularity: some column has no diagonal entry. The factor
    // structure below stays well defined (the diagonal block of a supernode
    // is dense by construction); the numeric phase will hit a zero pivot.
    let mut singular = false;
    for c in 0..n {
        if !full_row[full_ptr[c]..full_ptr[c + 1]].contains(&c) {
            singular = true;
            break;
        }
    }

    // Elimination tree over permuted columns (Liu's algorithm with path
    // compression through the ancestor array). Sentinel n = no parent.
    let mut parent = vec![n; n];
    let mut ancestor = vec![n; n];
    for j in 0..n {
        let oj = perm[j];
        for p in full_ptr[oj]..full_ptr[oj + 1] {
            let mut i = iperm[full_row[p]];
            if i >= j {
                continue;
            }
            while ancestor[i] != n && ancestor[i] != j {
                let next = ancestor[i];
                ancestor[i] = j;
                i = next;
            }
            if ancestor[i] == n {
                ancestor[i] = j;
                parent[i] = j;
            }
        }
    }

    // Postorder the forest, children visited in ascending order.
    let mut head = vec![n; n];
    let mut next_sib = vec![n; n];
    for j in (0..n).rev() {
        let p = parent[j];
        if p != n {
            next_sib[j] = head[p];
            head[p] = j;
        }
    }
    let mut post = Vec::with_capacity(n);
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for r in 0..n {
        if parent[r] != n {
            continue;
        }
        stack.push((r, head[r]));
        while let Some((v, c)) = stack.pop() {
            if c == n {
                post.push(v);
            } else {
                stack.push((v, next_sib[c]));
                stack.push((c, head[c]));
            }
        }
    }
    debug_assert_eq!(post.len(), n);

    // Relabel columns by postorder; perm is rewritten in place.
    let mut inv_post = vec![0usize; n];
    for (k, &v) in post.iter().enumerate() {
        inv_post[v] = k;
    }
    {
        let old = perm.to_vec();
        for k in 0..n {
            perm[k] = old[post[k]];
        }
    }
    for (k, &v) in perm.iter().enumerate() {
        iperm[v] = k;
    }
    {
        let mut relabeled = vec![n; n];
        for j in 0..n {
            if parent[j] != n {
                relabeled[inv_post[j]] = inv_post[parent[j]];
            }
        }
        parent = relabeled;
    }

    // Column counts of L via row subtrees: for each row i, every column in
    // the subtree walk below gains one entry.
    let mut colcnt = vec![1usize; n];
    let mut mark = vec![n; n];
    for i in 0..n {
        mark[i] = i;
        let oi = perm[i];
        for p in full_ptr[oi]..full_ptr[oi + 1] {
            let j = iperm[full_row[p]];
            if j >= i {
                continue;
            }
            let mut k = j;
            while k != n && mark[k] != i {
                mark[k] = i;
                colcnt[k] += 1;
                k = parent[k];
            }
        }
    }

    let mut nchild = vec![0usize; n];
    for j in 0..n {
        if parent[j] != n {
            nchild[parent[j]] += 1;
        }
    }

    // Fundamental supernodes: column j extends the supernode of j-1 only if
    // j is the sole child continuation with a nested pattern.
    let mut starts = Vec::new();
    let mut col2node = vec![0usize; n];
    for j in 0..n {
        let fresh =
            j == 0 || parent[j - 1] != j || nchild[j] != 1 || colcnt[j] + 1 != colcnt[j - 1];
        if fresh {
            starts.push(j);
        }
        col2node[j] = starts.len() - 1;
    }
    let nsup = starts.len();
    starts.push(n);

    let mut sparent0 = vec![usize::MAX; nsup];
    for s in 0..nsup {
        let pc = parent[starts[s + 1] - 1];
        if pc != n {
            sparent0[s] = col2node[pc];
        }
    }

    // Amalgamation: absorb a node's last child while both sides are smaller
    // than nemin. Only last-child merges happen, so column ranges stay
    // contiguous and the postorder permutation needs no second rewrite.
    let mut merged_into = vec![usize::MAX; nsup];
    fn find(merged: &[usize], mut s: usize) -> usize {
        while merged[s] != usize::MAX {
            s = merged[s];
        }
        s
    }
    let mut start: Vec<usize> = starts[..nsup].to_vec();
    let end: Vec<usize> = starts[1..].to_vec();
    for s in 0..nsup {
        if merged_into[s] != usize::MAX {
            continue;
        }
        loop {
            let a = start[s];
            if a == 0 {
                break;
            }
            // live node ending exactly at column a
            let c = find(&merged_into, col2node[a - 1]);
            let cp = match sparent0[c] {
                usize::MAX => usize::MAX,
                p => find(&merged_into, p),
            };
            if cp != s {
                break;
            }
            let child_cols = end[c] - start[c];
            let own_cols = end[s] - a;
            if child_cols >= nemin && own_cols >= nemin {
                break;
            }
            merged_into[c] = s;
            start[s] = start[c];
        }
    }

    // Compact live nodes; original id order is already ascending-by-column.
    let mut newid = vec![usize::MAX; nsup];
    let mut nnodes = 0;
    for s in 0..nsup {
        if merged_into[s] == usize::MAX {
            newid[s] = nnodes;
            nnodes += 1;
        }
    }
    let mut sptr = vec![0usize; nnodes + 1];
    let mut sparent = vec![nnodes; nnodes];
    for s in 0..nsup {
        if merged_into[s] != usize::MAX {
            continue;
        }
        let id = newid[s];
        sptr[id] = start[s];
        sptr[id + 1] = end[s];
        if sparent0[s] != usize::MAX {
            sparent[id] = newid[find(&merged_into, sparent0[s])];
        }
    }

    // Row lists, bottom-up: own below-diagonal pattern rows plus the tails
    // of the children, deduplicated with a marker and sorted.
    let mut child_head = vec![nnodes; nnodes];
    let mut child_next = vec![nnodes; nnodes];
    for s in (0..nnodes).rev() {
        if sparent[s] != nnodes {
            child_next[s] = child_head[sparent[s]];
            child_head[sparent[s]] = s;
        }
    }
    let mut tails: Vec<Vec<usize>> = vec![Vec::new(); nnodes];
    let mut marker = vec![usize::MAX; n];
    let mut nfact = 0u64;
    let mut nflop = 0u64;
    for s in 0..nnodes {
        let (a, b) = (sptr[s], sptr[s + 1]);
        let mut tail = Vec::new();
        for j in a..b {
            let oj = perm[j];
            for p in full_ptr[oj]..full_ptr[oj + 1] {
                let i = iperm[full_row[p]];
                if i >= b && marker[i] != s {
                    marker[i] = s;
                    tail.push(i);
                }
            }
        }
        let mut c = child_head[s];
        while c != nnodes {
            for &r in &tails[c] {
                if r >= b && marker[r] != s {
                    marker[r] = s;
                    tail.push(r);
                }
            }
            c = child_next[c];
        }
        tail.sort_unstable();

        let m = (b - a) + tail.len();
        for i in 0..(b - a) {
            nfact += (m - i) as u64;
            nflop += ((m - i) * (m - i)) as u64;
        }
        tails[s] = tail;
    }

    let mut rptr = vec![0usize; nnodes + 1];
    let mut rlist = Vec::with_capacity(nfact as usize);
    for s in 0..nnodes {
        rlist.extend(sptr[s]..sptr[s + 1]);
        rlist.extend_from_slice(&tails[s]);
        rptr[s + 1] = rlist.len();
    }

    Ok(AnalyseResult {
        nnodes,
        sptr,
        sparent,
        rptr,
        rlist,
        nfact,
        nflop,
        singular,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::csc::expand_to_full_with_sources;

    /// tridiagonal lower pattern of order n
    fn tridiag(n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut ptr = vec![0usize];
        let mut row = Vec::new();
        for j in 0..n {
            row.push(j);
            if j + 1 < n {
                row.push(j + 1);
            }
            ptr.push(row.len());
        }
        (ptr, row)
    }

    fn analyse_tridiag(n: usize, nemin: usize) -> (AnalyseResult, Vec<usize>) {
        let (ptr, row) = tridiag(n);
        let (fptr, frow, _) = expand_to_full_with_sources(n, &ptr, &row);
        let mut perm: Vec<usize> = (0..n).collect();
        let res = analyse(n, &fptr, &frow, &mut perm, nemin).unwrap();
        (res, perm)
    }

    #[test]
    fn tridiagonal_without_amalgamation() {
        let (res, perm) = analyse_tridiag(4, 1);
        assert_eq!(perm, vec![0, 1, 2, 3]);
        // fundamental supernodes: {0}, {1}, {2,3}
        assert_eq!(res.nnodes, 3);
        assert_eq!(res.sptr, vec![0, 1, 2, 4]);
        assert_eq!(res.sparent, vec![1, 2, 3]);
        assert_eq!(res.rptr, vec![0, 2, 4, 6]);
        assert_eq!(res.rlist, vec![0, 1, 1, 2, 2, 3]);
        assert_eq!(res.nfact, 7);
        assert_eq!(res.nflop, 13);
        assert!(!res.singular);
    }

    #[test]
    fn tridiagonal_amalgamates_small_nodes() {
        let (res, _) = analyse_tridiag(4, 2);
        assert_eq!(res.nnodes, 2);
        assert_eq!(res.sptr, vec![0, 2, 4]);
        assert_eq!(res.sparent, vec![1, 2]);
        // node 0 gains an explicit-zero tail row into node 1
        assert_eq!(res.rptr, vec![0, 3, 5]);
        assert_eq!(res.rlist, vec![0, 1, 2, 2, 3]);
    }

    #[test]
    fn postorder_and_monotonicity_hold_for_every_nemin() {
        for nemin in [1, 2, 4, 8] {
            let (res, _) = analyse_tridiag(9, nemin);
            for s in 0..res.nnodes {
                let p = res.sparent[s];
                assert!(p > s, "child {s} must precede parent {p}");
                if p == res.nnodes {
                    continue;
                }
                // tail rows of s all appear in the parent's row list
                let tail = &res.rlist[res.rptr[s] + (res.sptr[s + 1] - res.sptr[s])..res.rptr[s + 1]];
                let plist = &res.rlist[res.rptr[p]..res.rptr[p + 1]];
                for r in tail {
                    assert!(plist.contains(r));
                }
            }
        }
    }

    #[test]
    fn diagonal_matrix_is_a_forest_of_roots() {
        let n = 3;
        let ptr = vec![0, 1, 2, 3];
        let row = vec![0, 1, 2];
        let (fptr, frow, _) = expand_to_full_with_sources(n, &ptr, &row);
        let mut perm: Vec<usize> = (0..n).collect();
        let res = analyse(n, &fptr, &frow, &mut perm, 8).unwrap();
        assert_eq!(res.nnodes, 3);
        assert!(res.sparent.iter().all(|&p| p == res.nnodes));
        assert_eq!(res.nfact, 3);
    }

    #[test]
    fn missing_diagonal_reports_singularity() {
        // column 1 is empty
        let n = 3;
        let ptr = vec![0, 1, 1, 2];
        let row = vec![0, 2];
        let (fptr, frow, _) = expand_to_full_with_sources(n, &ptr, &row);
        let mut perm: Vec<usize> = (0..n).collect();
        let res = analyse(n, &fptr, &frow, &mut perm, 8).unwrap();
        assert!(res.singular);
        assert_eq!(res.nnodes, 3);
    }

    #[test]
    fn rejects_bad_permutation() {
        let (ptr, row) = tridiag(3);
        let (fptr, frow, _) = expand_to_full_with_sources(3, &ptr, &row);
        let mut perm = vec![0, 0, 2];
        assert!(matches!(
            analyse(3, &fptr, &frow, &mut perm, 1),
            Err(AnalyseError::PermutationNotBijective { .. })
        ));
    }
}
