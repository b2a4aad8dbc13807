//! A schedulable unit of factorization work: either one node or a batch of
//! independent nodes.

use crate::node::{MultiNode, NodeLayout, SingleNode};
use crate::numeric::FactorError;
use crate::tree::AssemblyTree;
use crate::workspace::WorkspaceManager;

#[derive(Debug)]
pub enum Chunk {
    Single(SingleNode),
    Multi(MultiNode),
}

impl Chunk {
    /// Record scatter maps from this chunk's nodes into the nodes of an
    /// ancestor chunk.
    pub fn add_contribution_maps(&mut self, tree: &AssemblyTree, ancestor_members: &[usize]) {
        match self {
            Chunk::Single(node) => {
                for &a in ancestor_members {
                    node.add_contribution_map(tree, a);
                }
            }
            Chunk::Multi(batch) => {
                for &a in ancestor_members {
                    batch.add_contribution_map(tree, a);
                }
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
        match self {
            Chunk::Single(node) => node.factor(tree, layouts, aval, lval, ws),
            Chunk::Multi(batch) => batch.factor(tree, layouts, aval, lval, ws),
        }
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
        match self {
            Chunk::Single(node) => node.forward_solve(tree, lval, nrhs, x, ldx, ws),
            Chunk::Multi(batch) => batch.forward_solve(tree, lval, nrhs, x, ldx, ws),
        }
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
        match self {
            Chunk::Single(node) => node.backward_solve(tree, lval, nrhs, x, ldx, ws),
            Chunk::Multi(batch) => batch.backward_solve(tree, lval, nrhs, x, ldx, ws),
        }
    }
}
