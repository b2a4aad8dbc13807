//! Precomputed scatter maps from a descendant's generated element into an
//! ancestor's factor block.

use crate::node::NodeLayout;
use crate::tree::AssemblyTree;

/// Map from one node's generated element to one ancestor's block. Ancestors
/// are referenced by index into the flat layout table, never by pointer.
///
/// The generated-element rows of a node are partitioned contiguously by
/// destination: rows below the ancestor's first column belong to earlier
/// ancestors, and the map consumes columns only while they fall inside the
/// ancestor's column range.
#[derive(Debug, Clone)]
pub struct NodeToNodeMap {
    from: usize,
    ancestor: usize,
    /// Generated-element rows to skip before this ancestor's region starts.
    skip: usize,
}

/// Build the map from descendant `from` to ancestor `to`, or `None` if the
/// two share no rows (the descendant's pattern interval for `to` is empty).
pub fn node_to_node_map(tree: &AssemblyTree, from: usize, to: usize) -> Option<NodeToNodeMap> {
    if !tree.is_ancestor_of(to, from) {
        return None;
    }
    let afirst = tree.first_col(to);
    let tail = tree.row_tail(from);
    let skip = tail.iter().take_while(|&&r| r < afirst).count();
    if skip == tail.len() {
        return None;
    }
    if !tree.contains_column(to, tail[skip]) {
        return None;
    }
    Some(NodeToNodeMap {
        from,
        ancestor: to,
        skip,
    })
}

impl NodeToNodeMap {
    pub fn ancestor(&self) -> usize {
        self.ancestor
    }

    /// Scatter-accumulate the relevant columns of `contrib` (the descendant's
    /// generated element, lower triangle, leading dimension `ldcontrib`) into
    /// the ancestor's factor block. `rowmap` is scratch of length n.
    pub fn apply(
        &self,
        tree: &AssemblyTree,
        layouts: &[NodeLayout],
        lval: &mut [f64],
        contrib: &[f64],
        ldcontrib: usize,
        rowmap: &mut [usize],
    ) {
        let anc = &layouts[self.ancestor];
        tree.construct_row_map(self.ancestor, rowmap);
        let tail = tree.row_tail(self.from);
        let lptr = &mut lval[anc.loffset..];
        for cidx in self.skip..tail.len() {
            let col = tail[cidx];
            if !tree.contains_column(self.ancestor, col) {
                return; // done: later rows belong to higher ancestors
            }
            let dest_col = rowmap[col];
            for ridx in cidx..tail.len() {
                let dest_row = rowmap[tail[ridx]];
                lptr[dest_col * anc.ldl + dest_row] += contrib[cidx * ldcontrib + ridx];
            }
        }
    }
}

/// One member's map within a batched chunk: the member's contribution block
/// lives at `coffset` within the chunk's aggregated workspace.
#[derive(Debug, Clone)]
pub struct MemberMap {
    pub coffset: usize,
    pub ldcontrib: usize,
    pub map: NodeToNodeMap,
}
