//! Per-node numeric kernels: assemble, factor, form the generated element,
//! scatter it to ancestors, and the two substitution passes.

use crate::dense;
use crate::maps::{MemberMap, NodeToNodeMap, node_to_node_map};
use crate::numeric::FactorError;
use crate::tree::AssemblyTree;
use crate::workspace::WorkspaceManager;

/// Placement of one node's dense block inside the flat factor vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeLayout {
    pub loffset: usize,
    pub ldl: usize,
}

/// One supernode processed on its own. Holds its block placement and the
/// precomputed maps into every ancestor its generated element touches.
#[derive(Debug)]
pub struct SingleNode {
    idx: usize,
    m: usize,
    n: usize,
    first_col: usize,
    loffset: usize,
    ldl: usize,
    maps: Vec<NodeToNodeMap>,
}

impl SingleNode {
    pub fn new(tree: &AssemblyTree, idx: usize, layout: NodeLayout) -> Self {
        Self {
            idx,
            m: tree.nrow(idx),
            n: tree.ncol(idx),
            first_col: tree.first_col(idx),
            loffset: layout.loffset,
            ldl: layout.ldl,
            maps: Vec::new(),
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Rows of the generated element, zero for a root-like node whose block
    /// is square.
    pub fn contrib_dim(&self) -> usize {
        self.m - self.n
    }

    /// Record a scatter map into `ancestor` if this node's pattern reaches
    /// its column range.
    pub fn add_contribution_map(&mut self, tree: &AssemblyTree, ancestor: usize) {
        if let Some(map) = node_to_node_map(tree, self.idx, ancestor) {
            self.maps.push(map);
        }
    }

    /// Assemble A into the block, factor the diagonal part, update the
    /// sub-diagonal rows and write the generated element into `contrib`
    /// (lower triangle, leading dimension `ldcontrib`). Does not scatter.
    pub fn factor_local(
        &self,
        tree: &AssemblyTree,
        aval: &[f64],
        lval: &mut [f64],
        contrib: &mut [f64],
        ldcontrib: usize,
    ) -> Result<(), FactorError> {
        let block = &mut lval[self.loffset..self.loffset + self.ldl * self.n];
        for al in tree.a_to_l(self.idx) {
            block[al.dest_col * self.ldl + al.dest_row] += aval[al.src];
        }

        dense::potrf_lower(self.n, block, self.ldl).map_err(|k| {
            FactorError::NotPositiveDefinite {
                column: self.first_col + k,
            }
        })?;

        let ngen = self.m - self.n;
        if ngen > 0 {
            dense::trsm_right_lower_trans_in_block(block, self.ldl, self.n, self.n, ngen);
            dense::syrk_lower_in_block(
                block,
                self.ldl,
                self.n,
                ngen,
                self.n,
                -1.0,
                contrib,
                ldcontrib,
            );
        }
        Ok(())
    }

    /// Factor the node and scatter its generated element through the
    /// precomputed maps, using a transient workspace extent.
    pub fn factor(
        &self,
        tree: &AssemblyTree,
        layouts: &[NodeLayout],
        aval: &[f64],
        lval: &mut [f64],
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        let ngen = self.m - self.n;
        if ngen == 0 {
            return self.factor_local(tree, aval, lval, &mut [], 0);
        }
        let reals = ws.acquire_reals(ngen * ngen)?;
        let ints = ws.acquire_ints(tree.n())?;
        {
            let (contrib, rowmap) = ws.split_mut(&reals, &ints);
            self.factor_local(tree, aval, lval, contrib, ngen)?;
            for map in &self.maps {
                map.apply(tree, layouts, lval, contrib, ngen, rowmap);
            }
        }
        ws.release_ints(ints)?;
        ws.release_reals(reals)?;
        Ok(())
    }

    /// Forward substitution through this node: solve with the diagonal block,
    /// then push updates into the ancestor rows of `x`. `x` holds `nrhs`
    /// permuted right-hand sides with leading dimension `ldx`.
    pub fn forward_solve(
        &self,
        tree: &AssemblyTree,
        lval: &[f64],
        nrhs: usize,
        x: &mut [f64],
        ldx: usize,
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        let block = &lval[self.loffset..self.loffset + self.ldl * self.n];
        dense::trsm_left_lower_notrans(
            self.n,
            nrhs,
            block,
            self.ldl,
            &mut x[self.first_col..],
            ldx,
        );

        let ngen = self.m - self.n;
        if ngen == 0 {
            return Ok(());
        }
        let reals = ws.acquire_reals(ngen * nrhs)?;
        {
            let xlocal = ws.reals_mut(&reals);
            dense::gemm_notrans(
                ngen,
                nrhs,
                self.n,
                -1.0,
                &block[self.n..],
                self.ldl,
                &x[self.first_col..],
                ldx,
                0.0,
                xlocal,
                ngen,
            );
            for (i, &r) in tree.row_tail(self.idx).iter().enumerate() {
                for rh in 0..nrhs {
                    x[rh * ldx + r] += xlocal[rh * ngen + i];
                }
            }
        }
        ws.release_reals(reals)?;
        Ok(())
    }

    /// Backward substitution: gather the ancestor rows, apply the transposed
    /// rectangular part, then solve with the transposed diagonal block.
    pub fn backward_solve(
        &self,
        tree: &AssemblyTree,
        lval: &[f64],
        nrhs: usize,
        x: &mut [f64],
        ldx: usize,
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        let block = &lval[self.loffset..self.loffset + self.ldl * self.n];
        let ngen = self.m - self.n;
        if ngen > 0 {
            let reals = ws.acquire_reals(ngen * nrhs)?;
            {
                let xlocal = ws.reals_mut(&reals);
                for (i, &r) in tree.row_tail(self.idx).iter().enumerate() {
                    for rh in 0..nrhs {
                        xlocal[rh * ngen + i] = x[rh * ldx + r];
                    }
                }
                dense::gemm_trans(
                    self.n,
                    nrhs,
                    ngen,
                    -1.0,
                    &block[self.n..],
                    self.ldl,
                    xlocal,
                    ngen,
                    1.0,
                    &mut x[self.first_col..],
                    ldx,
                );
            }
            ws.release_reals(reals)?;
        }
        dense::trsm_left_lower_trans(
            self.n,
            nrhs,
            block,
            self.ldl,
            &mut x[self.first_col..],
            ldx,
        );
        Ok(())
    }
}

/// A batch of independent nodes factored back to back with one aggregated
/// workspace extent: all members form their generated elements first, then
/// every scatter runs.
#[derive(Debug)]
pub struct MultiNode {
    matrix_n: usize,
    members: Vec<SingleNode>,
    coffset: Vec<usize>,
    ldcontrib: Vec<usize>,
    contrib_size: usize,
    maps: Vec<MemberMap>,
}

impl MultiNode {
    pub fn new(tree: &AssemblyTree, members: &[usize], layouts: &[NodeLayout]) -> Self {
        let mut nodes = Vec::with_capacity(members.len());
        let mut coffset = Vec::with_capacity(members.len());
        let mut ldcontrib = Vec::with_capacity(members.len());
        let mut contrib_size = 0usize;
        for &s in members {
            let node = SingleNode::new(tree, s, layouts[s]);
            let ngen = node.contrib_dim();
            coffset.push(contrib_size);
            ldcontrib.push(ngen);
            contrib_size += ngen * ngen;
            nodes.push(node);
        }
        Self {
            matrix_n: tree.n(),
            members: nodes,
            coffset,
            ldcontrib,
            contrib_size,
            maps: Vec::new(),
        }
    }

    pub fn member_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(SingleNode::idx)
    }

    /// Record scatter maps from every member into `ancestor` where the
    /// member's pattern reaches it.
    pub fn add_contribution_map(&mut self, tree: &AssemblyTree, ancestor: usize) {
        for (i, node) in self.members.iter().enumerate() {
            if let Some(map) = node_to_node_map(tree, node.idx(), ancestor) {
                self.maps.push(MemberMap {
                    coffset: self.coffset[i],
                    ldcontrib: self.ldcontrib[i],
                    map,
                });
            }
        }
    }

    pub fn factor(
        &self,
        tree: &AssemblyTree,
        layouts: &[NodeLayout],
        aval: &[f64],
        lval: &mut [f64],
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        let reals = ws.acquire_reals(self.contrib_size)?;
        let ints = ws.acquire_ints(self.matrix_n)?;
        {
            let (contrib, rowmap) = ws.split_mut(&reals, &ints);
            for (i, node) in self.members.iter().enumerate() {
                let ngen = self.ldcontrib[i];
                let sub = &mut contrib[self.coffset[i]..self.coffset[i] + ngen * ngen];
                node.factor_local(tree, aval, lval, sub, ngen)?;
            }
            for mm in &self.maps {
                mm.map
                    .apply(tree, layouts, lval, &contrib[mm.coffset..], mm.ldcontrib, rowmap);
            }
        }
        ws.release_ints(ints)?;
        ws.release_reals(reals)?;
        Ok(())
    }

    pub fn forward_solve(
        &self,
        tree: &AssemblyTree,
        lval: &[f64],
        nrhs: usize,
        x: &mut [f64],
        ldx: usize,
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        for node in &self.members {
            node.forward_solve(tree, lval, nrhs, x, ldx, ws)?;
        }
        Ok(())
    }

    pub fn backward_solve(
        &self,
        tree: &AssemblyTree,
        lval: &[f64],
        nrhs: usize,
        x: &mut [f64],
        ldx: usize,
        ws: &mut WorkspaceManager,
    ) -> Result<(), FactorError> {
        for node in self.members.iter().rev() {
            node.backward_solve(tree, lval, nrhs, x, ldx, ws)?;
        }
        Ok(())
    }
}
