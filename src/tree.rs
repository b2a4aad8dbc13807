//! Supernodal assembly tree: owned analysis outputs, the original-matrix to
//! factor scatter map, and the leaf-first traversal order.

use crate::analyse::{AnalyseError, analyse};
use crate::matrix::csc::expand_to_full_with_sources;

/// Maps a single entry of A to a (row, col) offset within a node's dense
/// factor block.
#[derive(Debug, Clone, Copy)]
pub struct AlMap {
    /// Position of the source value in the lower-triangle input arrays.
    pub src: usize,
    /// Row offset within the node's block.
    pub dest_row: usize,
    /// Column offset within the node's block.
    pub dest_col: usize,
}

/// The supernode forest in postorder: every node's children occupy lower
/// indices, and a parent entry equal to `nnodes` marks a root. Built once
/// from the permuted pattern; immutable afterwards.
#[derive(Debug)]
pub struct AssemblyTree {
    n: usize,
    nnodes: usize,
    sptr: Vec<usize>,
    sparent: Vec<usize>,
    rptr: Vec<usize>,
    rlist: Vec<usize>,

    a_to_l_ptr: Vec<usize>,
    a_to_l_map: Vec<AlMap>,

    /// Nodes concatenated level by level, leaves first. A valid topological
    /// order of the dependency DAG (children before parents).
    leaf_first_order: Vec<usize>,
    /// Position in `leaf_first_order` of each node's last-processed child,
    /// if it has children.
    leaf_prereq: Vec<Option<usize>>,

    nfact: u64,
    nflop: u64,
    singular: bool,
}

impl AssemblyTree {
    /// Build the tree from a lower-triangle pattern. `perm` is normalized to
    /// a postorder of the elimination tree in place (treat it as an output).
    pub fn construct(
        n: usize,
        ptr: &[usize],
        row: &[usize],
        perm: &mut [usize],
        nemin: usize,
    ) -> Result<Self, AnalyseError> {
        let (full_ptr, full_row, full_src) = expand_to_full_with_sources(n, ptr, row);
        let res = analyse(n, &full_ptr, &full_row, perm, nemin)?;

        let mut iperm = vec![0usize; n];
        for (k, &v) in perm.iter().enumerate() {
            iperm[v] = k;
        }

        // A -> L scatter list: for every column of every node, the entries of
        // the full pattern that land on or below the diagonal of that column.
        let mut a_to_l_ptr = Vec::with_capacity(res.nnodes + 1);
        let mut a_to_l_map = Vec::new();
        let mut rowmap = vec![0usize; n];
        a_to_l_ptr.push(0);
        for s in 0..res.nnodes {
            let (a, b) = (res.sptr[s], res.sptr[s + 1]);
            for (pos, &r) in res.rlist[res.rptr[s]..res.rptr[s + 1]].iter().enumerate() {
                rowmap[r] = pos;
            }
            for j in a..b {
                let oj = perm[j];
                for p in full_ptr[oj]..full_ptr[oj + 1] {
                    let pi = iperm[full_row[p]];
                    if pi >= j {
                        a_to_l_map.push(AlMap {
                            src: full_src[p],
                            dest_row: rowmap[pi],
                            dest_col: j - a,
                        });
                    }
                }
            }
            a_to_l_ptr.push(a_to_l_map.len());
        }

        let (leaf_first_order, leaf_prereq) =
            build_leaf_first_order(res.nnodes, &res.sparent);

        Ok(Self {
            n,
            nnodes: res.nnodes,
            sptr: res.sptr,
            sparent: res.sparent,
            rptr: res.rptr,
            rlist: res.rlist,
            a_to_l_ptr,
            a_to_l_map,
            leaf_first_order,
            leaf_prereq,
            nfact: res.nfact,
            nflop: res.nflop,
            singular: res.singular,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nnodes(&self) -> usize {
        self.nnodes
    }

    pub fn nfact(&self) -> u64 {
        self.nfact
    }

    pub fn nflop(&self) -> u64 {
        self.nflop
    }

    pub fn is_structurally_singular(&self) -> bool {
        self.singular
    }

    /// Number of rows in node s's factor block.
    pub fn nrow(&self, s: usize) -> usize {
        self.rptr[s + 1] - self.rptr[s]
    }

    /// Number of columns (eliminated variables) of node s.
    pub fn ncol(&self, s: usize) -> usize {
        self.sptr[s + 1] - self.sptr[s]
    }

    /// First eliminated column of node s (also its first row).
    pub fn first_col(&self, s: usize) -> usize {
        self.sptr[s]
    }

    pub fn contains_column(&self, s: usize, col: usize) -> bool {
        col >= self.sptr[s] && col < self.sptr[s + 1]
    }

    pub fn parent(&self, s: usize) -> Option<usize> {
        let p = self.sparent[s];
        (p < self.nnodes).then_some(p)
    }

    /// True if `anc` lies on the path from `desc` to its root (proper
    /// ancestor). Postorder makes the climb cheap: ancestors always carry
    /// larger indices.
    pub fn is_ancestor_of(&self, anc: usize, desc: usize) -> bool {
        let mut s = desc;
        while let Some(p) = self.parent(s) {
            if p > anc {
                return false;
            }
            if p == anc {
                return true;
            }
            s = p;
        }
        false
    }

    /// Full row list of node s (own columns first, then ancestor rows).
    pub fn row_list(&self, s: usize) -> &[usize] {
        &self.rlist[self.rptr[s]..self.rptr[s + 1]]
    }

    /// Rows beyond the node's own columns (the generated-element rows).
    pub fn row_tail(&self, s: usize) -> &[usize] {
        &self.rlist[self.rptr[s] + self.ncol(s)..self.rptr[s + 1]]
    }

    /// Fill `map` so that `map[r]` is the offset of permuted row r within
    /// node s's block. Entries for absent rows are left untouched.
    pub fn construct_row_map(&self, s: usize, map: &mut [usize]) {
        for (pos, &r) in self.row_list(s).iter().enumerate() {
            map[r] = pos;
        }
    }

    pub fn a_to_l(&self, s: usize) -> &[AlMap] {
        &self.a_to_l_map[self.a_to_l_ptr[s]..self.a_to_l_ptr[s + 1]]
    }

    pub fn leaf_first_order(&self) -> &[usize] {
        &self.leaf_first_order
    }

    /// Position within the leaf-first order of the last child scheduled
    /// before node s; `None` for leaves. A scheduler may treat this as the
    /// node's prerequisite marker.
    pub fn leaf_prereq(&self, s: usize) -> Option<usize> {
        self.leaf_prereq[s]
    }
}

/// Level numbers from the bottom (leaves are level 0), exploiting the
/// postorder guarantee that children precede parents; nodes are then
/// concatenated level by level.
fn build_leaf_first_order(
    nnodes: usize,
    sparent: &[usize],
) -> (Vec<usize>, Vec<Option<usize>>) {
    let mut level = vec![0usize; nnodes];
    let mut nlevels = 0;
    for s in 0..nnodes {
        let p = sparent[s];
        if p >= nnodes {
            continue;
        }
        if level[p] < level[s] + 1 {
            level[p] = level[s] + 1;
        }
        nlevels = nlevels.max(level[p] + 1);
    }

    let mut order = Vec::with_capacity(nnodes);
    for l in 0..nlevels.max(1) {
        for s in 0..nnodes {
            if level[s] == l {
                order.push(s);
            }
        }
    }
    debug_assert_eq!(order.len(), nnodes);

    let mut inverse = vec![0usize; nnodes];
    for (pos, &s) in order.iter().enumerate() {
        inverse[s] = pos;
    }
    let mut prereq = vec![None; nnodes];
    for s in 0..nnodes {
        let p = sparent[s];
        if p >= nnodes {
            continue;
        }
        let pos = inverse[s];
        match prereq[p] {
            Some(q) if q >= pos => {}
            _ => prereq[p] = Some(pos),
        }
    }
    (order, prereq)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn scatter_map_covers_every_lower_entry_once() {
        let (ptr, row) = tridiag(5);
        let mut perm: Vec<usize> = (0..5).collect();
        let tree = AssemblyTree::construct(5, &ptr, &row, &mut perm, 1).unwrap();

        let mut hits = vec![0usize; row.len()];
        for s in 0..tree.nnodes() {
            for al in tree.a_to_l(s) {
                hits[al.src] += 1;
                assert!(al.dest_row < tree.nrow(s));
                assert!(al.dest_col < tree.ncol(s));
                // scatter lands on or below the block diagonal
                assert!(al.dest_row >= al.dest_col);
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn leaf_first_order_is_topological() {
        let (ptr, row) = tridiag(9);
        let mut perm: Vec<usize> = (0..9).collect();
        let tree = AssemblyTree::construct(9, &ptr, &row, &mut perm, 2).unwrap();

        let order = tree.leaf_first_order();
        let mut pos = vec![0usize; tree.nnodes()];
        for (k, &s) in order.iter().enumerate() {
            pos[s] = k;
        }
        for s in 0..tree.nnodes() {
            if let Some(p) = tree.parent(s) {
                assert!(pos[s] < pos[p]);
            }
        }
    }

    #[test]
    fn leaf_prereq_points_at_latest_child() {
        let (ptr, row) = tridiag(9);
        let mut perm: Vec<usize> = (0..9).collect();
        let tree = AssemblyTree::construct(9, &ptr, &row, &mut perm, 1).unwrap();

        let order = tree.leaf_first_order();
        let mut pos = vec![0usize; tree.nnodes()];
        for (k, &s) in order.iter().enumerate() {
            pos[s] = k;
        }
        for s in 0..tree.nnodes() {
            let latest = (0..tree.nnodes())
                .filter(|&c| tree.parent(c) == Some(s))
                .map(|c| pos[c])
                .max();
            assert_eq!(tree.leaf_prereq(s), latest);
        }
    }

    #[test]
    fn ancestor_queries_follow_the_parent_chain() {
        let (ptr, row) = tridiag(6);
        let mut perm: Vec<usize> = (0..6).collect();
        let tree = AssemblyTree::construct(6, &ptr, &row, &mut perm, 1).unwrap();

        // tridiagonal tree is a single chain
        for s in 0..tree.nnodes() {
            for t in (s + 1)..tree.nnodes() {
                assert!(tree.is_ancestor_of(t, s));
                assert!(!tree.is_ancestor_of(s, t));
            }
        }
    }
}
