use itertools::Itertools;

use crate::error::{ModelError, ModelResult};

/// Rod node (vertex) definition
#[derive(Clone, Debug)]
pub struct Node {
    pub id: usize,
    /// Initial position
    pub x: [f64; 3],
}

pub struct NodeBuilder<'a> {
    pub(crate) node: &'a mut Node,
}

impl NodeBuilder<'_> {
    pub fn position(self, x: f64, y: f64, z: f64) -> Self {
        self.node.x = [x, y, z];
        self
    }

    pub fn build(self) -> usize {
        self.node.id
    }
}

//------------------------------------------------------------------------------
// Degrees of freedom
//------------------------------------------------------------------------------

/// Layout of the global degree-of-freedom vector.
///
/// Node `i` owns the three position entries starting at `4 * i`; edge `j`
/// (joining nodes `j` and `j + 1`) owns the twist angle at `4 * j + 3`.
/// The vector has `4 * n_nodes - 1` entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DofMap {
    pub n_nodes: usize,
}

impl DofMap {
    pub fn new(n_nodes: usize) -> Self {
        Self { n_nodes }
    }

    pub fn n_dofs(&self) -> usize {
        4 * self.n_nodes - 1
    }

    pub fn n_edges(&self) -> usize {
        self.n_nodes - 1
    }

    /// Index of the first position entry of node `i`
    pub fn node(&self, i: usize) -> usize {
        debug_assert!(i < self.n_nodes);
        4 * i
    }

    /// Index of the twist angle of edge `j`
    pub fn edge_twist(&self, j: usize) -> usize {
        debug_assert!(j < self.n_edges());
        4 * j + 3
    }

    /// Position DOFs of both end nodes of edge `j`
    pub fn edge_block(&self, j: usize) -> DofBlock {
        debug_assert!(j < self.n_edges());
        DofBlock::Edge { start: 4 * j }
    }

    /// DOFs of interior node `i` and its two neighbors: x_{i-1}, θ_{i-1}, x_i, θ_i, x_{i+1}
    pub fn hinge_block(&self, i: usize) -> DofBlock {
        debug_assert!(i >= 1 && i + 1 < self.n_nodes);
        DofBlock::Hinge { start: 4 * (i - 1) }
    }

    /// Iterator over the interior node indices
    pub fn interior_nodes(&self) -> std::ops::Range<usize> {
        1..self.n_edges()
    }
}

/// Named local-to-global index map for an element stencil
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DofBlock {
    /// 6 position DOFs of an edge's end nodes; the twist between them is skipped
    Edge { start: usize },
    /// 11 contiguous DOFs centered on an interior node
    Hinge { start: usize },
}

impl DofBlock {
    pub const EDGE_LEN: usize = 6;
    pub const HINGE_LEN: usize = 11;

    pub fn len(&self) -> usize {
        match self {
            DofBlock::Edge { .. } => Self::EDGE_LEN,
            DofBlock::Hinge { .. } => Self::HINGE_LEN,
        }
    }

    /// Global index of local DOF `k`
    pub fn global(&self, k: usize) -> usize {
        debug_assert!(k < self.len());
        match *self {
            DofBlock::Edge { start } if k < 3 => start + k,
            DofBlock::Edge { start } => start + k + 1,
            DofBlock::Hinge { start } => start + k,
        }
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |k| self.global(k))
    }
}

//------------------------------------------------------------------------------
// Boundary conditions
//------------------------------------------------------------------------------

/// Partition of the DOF vector into prescribed (fixed) and solved (free) entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundaryConditions {
    free: Vec<usize>,
    fixed: Vec<usize>,
}

impl BoundaryConditions {
    /// Creates a partition from a list of fixed DOF indices
    pub fn new(dofs: &DofMap, fixed: &[usize]) -> ModelResult<Self> {
        let n_dofs = dofs.n_dofs();
        if let Some(&dof) = fixed.iter().find(|&&i| i >= n_dofs) {
            return Err(ModelError::InvalidDof { dof, n_dofs });
        }
        let fixed = fixed.iter().copied().sorted_unstable().dedup().collect_vec();
        let free = (0..n_dofs)
            .filter(|i| fixed.binary_search(i).is_err())
            .collect_vec();
        Ok(Self { free, fixed })
    }

    /// All DOFs free
    pub fn free_all(dofs: &DofMap) -> Self {
        Self {
            free: (0..dofs.n_dofs()).collect_vec(),
            fixed: vec![],
        }
    }

    /// Clamps the first `n_edges` edges: their end node positions and twist angles
    pub fn clamp_first_edges(dofs: &DofMap, n_edges: usize) -> ModelResult<Self> {
        if n_edges == 0 {
            return Ok(Self::free_all(dofs));
        }
        // Positions of nodes 0..=n_edges and twists of edges 0..n_edges
        let fixed = (0..4 * n_edges + 3).collect_vec();
        Self::new(dofs, &fixed)
    }

    pub fn free(&self) -> &[usize] {
        &self.free
    }

    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------
