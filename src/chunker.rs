//! Groups independent similarly-shaped nodes into chunks.
//!
//! Nodes become ready once all their children's chunks are closed, so the
//! members of any chunk are pairwise independent: none is an ancestor of
//! another, and all of their children were fully assigned earlier. A chunk
//! closes when it collects `NUM_PER_CHUNK` members of the same shape band, or
//! when a partial bucket must be flushed to unblock the earliest pending node.

use std::collections::{HashMap, VecDeque};

use crate::tree::AssemblyTree;

const ROW_CHUNK_SIZE: usize = 4;
const COL_CHUNK_SIZE: usize = 1;
const MAX_ROW_BAND: usize = 20;
const MAX_COL_BAND: usize = 8;
const NUM_PER_CHUNK: usize = 4;

fn shape_band(tree: &AssemblyTree, s: usize) -> (usize, usize) {
    let rband = ((tree.nrow(s) - 1) / ROW_CHUNK_SIZE).min(MAX_ROW_BAND);
    let cband = ((tree.ncol(s) - 1) / COL_CHUNK_SIZE).min(MAX_COL_BAND);
    (rband, cband)
}

#[derive(Debug)]
pub struct Chunker {
    node_to_chunk: Vec<usize>,
    chunks: Vec<Vec<usize>>,
}

impl Chunker {
    pub fn new(tree: &AssemblyTree) -> Self {
        let nnodes = tree.nnodes();
        let mut nchild = vec![0usize; nnodes];
        for s in 0..nnodes {
            if let Some(p) = tree.parent(s) {
                nchild[p] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..nnodes).filter(|&s| nchild[s] == 0).collect();
        let mut buckets: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        let mut node_to_chunk = vec![usize::MAX; nnodes];
        let mut chunks: Vec<Vec<usize>> = Vec::new();
        let mut assigned = 0usize;
        let mut cursor = 0usize;

        while assigned < nnodes {
            // drain the ready queue into shape buckets, closing full ones
            while let Some(s) = ready.pop_front() {
                let key = shape_band(tree, s);
                let bucket = buckets.entry(key).or_default();
                bucket.push(s);
                if bucket.len() >= NUM_PER_CHUNK {
                    if let Some(members) = buckets.remove(&key) {
                        close_chunk(
                            members,
                            tree,
                            &mut node_to_chunk,
                            &mut nchild,
                            &mut ready,
                            &mut chunks,
                            &mut assigned,
                        );
                    }
                }
            }
            if assigned == nnodes {
                break;
            }

            // flush the partial bucket holding the earliest unassigned node;
            // every node before it in the leaf-first order is already placed,
            // so that node must be sitting in a bucket
            let order = tree.leaf_first_order();
            while node_to_chunk[order[cursor]] != usize::MAX {
                cursor += 1;
            }
            let stuck = order[cursor];
            if let Some(members) = buckets.remove(&shape_band(tree, stuck)) {
                close_chunk(
                    members,
                    tree,
                    &mut node_to_chunk,
                    &mut nchild,
                    &mut ready,
                    &mut chunks,
                    &mut assigned,
                );
            } else {
                debug_assert!(false, "pending node missing from its shape bucket");
                break;
            }
        }

        Self {
            node_to_chunk,
            chunks,
        }
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk id assigned to node s.
    pub fn node_chunk(&self, s: usize) -> usize {
        self.node_to_chunk[s]
    }

    /// Member node lists, in the order chunks must be factored.
    pub fn chunks(&self) -> &[Vec<usize>] {
        &self.chunks
    }
}

fn close_chunk(
    members: Vec<usize>,
    tree: &AssemblyTree,
    node_to_chunk: &mut [usize],
    nchild: &mut [usize],
    ready: &mut VecDeque<usize>,
    chunks: &mut Vec<Vec<usize>>,
    assigned: &mut usize,
) {
    let id = chunks.len();
    for &s in &members {
        node_to_chunk[s] = id;
        *assigned += 1;
        if let Some(p) = tree.parent(s) {
            nchild[p] -= 1;
            if nchild[p] == 0 {
                ready.push_back(p);
            }
        }
    }
    chunks.push(members);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag_pattern(n: usize) -> (Vec<usize>, Vec<usize>) {
        ((0..=n).collect(), (0..n).collect())
    }

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
    fn independent_same_shape_nodes_batch_in_fours() {
        let (ptr, row) = diag_pattern(10);
        let mut perm: Vec<usize> = (0..10).collect();
        let tree = AssemblyTree::construct(10, &ptr, &row, &mut perm, 1).unwrap();
        assert_eq!(tree.nnodes(), 10);

        let chunker = Chunker::new(&tree);
        assert_eq!(chunker.nchunks(), 3);
        assert_eq!(chunker.chunks()[0].len(), 4);
        assert_eq!(chunker.chunks()[1].len(), 4);
        assert_eq!(chunker.chunks()[2].len(), 2);
    }

    #[test]
    fn dependent_chain_stays_sequential() {
        // tridiagonal tree is a chain: only one node is ever ready
        let (ptr, row) = tridiag(6);
        let mut perm: Vec<usize> = (0..6).collect();
        let tree = AssemblyTree::construct(6, &ptr, &row, &mut perm, 1).unwrap();

        let chunker = Chunker::new(&tree);
        assert_eq!(chunker.nchunks(), tree.nnodes());
        for members in chunker.chunks() {
            assert_eq!(members.len(), 1);
        }
    }

    #[test]
    fn chunk_order_respects_dependencies() {
        let (ptr, row) = tridiag(9);
        let mut perm: Vec<usize> = (0..9).collect();
        let tree = AssemblyTree::construct(9, &ptr, &row, &mut perm, 3).unwrap();

        let chunker = Chunker::new(&tree);
        for s in 0..tree.nnodes() {
            assert_ne!(chunker.node_chunk(s), usize::MAX);
            if let Some(p) = tree.parent(s) {
                assert!(chunker.node_chunk(s) < chunker.node_chunk(p));
            }
        }
    }

    #[test]
    fn chunk_members_are_mutually_independent() {
        let (ptr, row) = diag_pattern(8);
        let mut perm: Vec<usize> = (0..8).collect();
        let tree = AssemblyTree::construct(8, &ptr, &row, &mut perm, 1).unwrap();

        let chunker = Chunker::new(&tree);
        for members in chunker.chunks() {
            for &a in members {
                for &b in members {
                    if a != b {
                        assert!(!tree.is_ancestor_of(a, b));
                    }
                }
            }
        }
    }
}
