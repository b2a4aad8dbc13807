//! Symbolic phase: ordering, assembly-tree construction, chunking, factor
//! layout and workspace sizing. The result is immutable and can back any
//! number of numeric factorizations of matrices with the same pattern.

use crate::Options;
use crate::chunk::Chunk;
use crate::chunker::Chunker;
use crate::error::SolverError;
use crate::node::{MultiNode, NodeLayout, SingleNode};
use crate::order::order;
use crate::tree::AssemblyTree;

#[derive(Debug)]
pub struct SymbolicFactor {
    n: usize,
    nnz: usize,
    perm: Vec<usize>,
    iperm: Vec<usize>,
    tree: AssemblyTree,
    layouts: Vec<NodeLayout>,
    chunks: Vec<Chunk>,
    chunk_members: Vec<Vec<usize>>,
    chunk_parents: Vec<Vec<usize>>,
    node_chunk: Vec<usize>,
    factor_size: usize,
    workspace_reals: usize,
    max_contrib_dim: usize,
}

impl SymbolicFactor {
    /// Analyse the lower-triangle pattern (ptr, row) of an n-by-n symmetric
    /// matrix.
    pub fn new(
        n: usize,
        ptr: &[usize],
        row: &[usize],
        options: &Options,
    ) -> Result<Self, SolverError> {
        let (mut perm, _) = order(n, ptr, row, options.ordering)?;
        let tree = AssemblyTree::construct(n, ptr, row, &mut perm, options.nemin)?;
        let mut iperm = vec![0usize; n];
        for (k, &v) in perm.iter().enumerate() {
            iperm[v] = k;
        }

        let chunker = Chunker::new(&tree);

        // block placement follows chunk order, members contiguous; the peak
        // real workspace is the largest aggregated generated element
        let mut layouts = vec![NodeLayout::default(); tree.nnodes()];
        let mut factor_size = 0usize;
        let mut workspace_reals = 0usize;
        let mut max_contrib_dim = 0usize;
        for members in chunker.chunks() {
            let mut chunk_contrib = 0usize;
            for &s in members {
                let (m, nc) = (tree.nrow(s), tree.ncol(s));
                layouts[s] = NodeLayout {
                    loffset: factor_size,
                    ldl: m,
                };
                factor_size += m * nc;
                let ngen = m - nc;
                chunk_contrib += ngen * ngen;
                max_contrib_dim = max_contrib_dim.max(ngen);
            }
            workspace_reals = workspace_reals.max(chunk_contrib);
        }

        let mut chunks: Vec<Chunk> = chunker
            .chunks()
            .iter()
            .map(|members| {
                if members.len() == 1 {
                    Chunk::Single(SingleNode::new(&tree, members[0], layouts[members[0]]))
                } else {
                    Chunk::Multi(MultiNode::new(&tree, members, &layouts))
                }
            })
            .collect();

        // deduplicated parent edges between chunks
        let nchunks = chunks.len();
        let mut chunk_parents: Vec<Vec<usize>> = vec![Vec::new(); nchunks];
        for s in 0..tree.nnodes() {
            if let Some(p) = tree.parent(s) {
                let (c, pc) = (chunker.node_chunk(s), chunker.node_chunk(p));
                if c != pc && !chunk_parents[c].contains(&pc) {
                    chunk_parents[c].push(pc);
                }
            }
        }

        // each chunk gets maps into every transitive ancestor chunk its
        // members' patterns can reach
        let mut seen = vec![usize::MAX; nchunks];
        for ci in 0..nchunks {
            let mut stack = chunk_parents[ci].clone();
            for &p in &stack {
                seen[p] = ci;
            }
            while let Some(a) = stack.pop() {
                chunks[ci].add_contribution_maps(&tree, &chunker.chunks()[a]);
                for &p in &chunk_parents[a] {
                    if seen[p] != ci {
                        seen[p] = ci;
                        stack.push(p);
                    }
                }
            }
        }

        let node_chunk = (0..tree.nnodes()).map(|s| chunker.node_chunk(s)).collect();
        let chunk_members = chunker.chunks().to_vec();

        Ok(Self {
            n,
            nnz: ptr[n],
            perm,
            iperm,
            tree,
            layouts,
            chunks,
            chunk_members,
            chunk_parents,
            node_chunk,
            factor_size,
            workspace_reals,
            max_contrib_dim,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Entries in the lower-triangle input this symbolic phase was built for.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Total reals in the factor storage.
    pub fn factor_size(&self) -> usize {
        self.factor_size
    }

    /// Predicted factor entries (block lower triangles only).
    pub fn nfact(&self) -> u64 {
        self.tree.nfact()
    }

    /// Predicted floating-point operations for one numeric factorization.
    pub fn nflop(&self) -> u64 {
        self.tree.nflop()
    }

    pub fn nnodes(&self) -> usize {
        self.tree.nnodes()
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    /// True if some diagonal entry is absent from the pattern. Factorization
    /// of such a matrix will fail unless assembly makes the pivot positive.
    pub fn is_structurally_singular(&self) -> bool {
        self.tree.is_structurally_singular()
    }

    /// Elimination order: `perm()[k]` is the original index eliminated at
    /// step k.
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn inverse_perm(&self) -> &[usize] {
        &self.iperm
    }

    pub fn tree(&self) -> &AssemblyTree {
        &self.tree
    }

    pub fn layouts(&self) -> &[NodeLayout] {
        &self.layouts
    }

    pub fn node_layout(&self, s: usize) -> NodeLayout {
        self.layouts[s]
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk_members(&self, ci: usize) -> &[usize] {
        &self.chunk_members[ci]
    }

    pub fn chunk_parents(&self, ci: usize) -> &[usize] {
        &self.chunk_parents[ci]
    }

    pub fn node_chunk(&self, s: usize) -> usize {
        self.node_chunk[s]
    }

    /// Peak real workspace one factorization needs.
    pub fn workspace_reals(&self) -> usize {
        self.workspace_reals
    }

    /// Largest generated-element dimension over all nodes; sizes the solve
    /// workspace per right-hand side.
    pub fn max_contrib_dim(&self) -> usize {
        self.max_contrib_dim
    }
}
