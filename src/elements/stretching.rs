use faer::prelude::*;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::kernels::{grad_hess_stretch, stretch_energy};
use super::{scatter, ElementTerms};
use crate::frames::node_position;
use crate::node::DofMap;

/// Axial stretching of every edge
pub struct Stretching {
    dofs: DofMap,
    /// Axial stiffness
    pub ea: f64,
    /// Rest length `[n_edges]`
    pub ref_len: Col<f64>,
}

impl Stretching {
    pub fn new(dofs: DofMap, ea: f64, ref_len: Col<f64>) -> Self {
        debug_assert_eq!(ref_len.nrows(), dofs.n_edges());
        Self { dofs, ea, ref_len }
    }

    /// Gradient and Hessian of each edge, evaluated in parallel
    pub fn element_terms(&self, q: ColRef<f64>) -> Vec<ElementTerms> {
        (0..self.dofs.n_edges())
            .into_par_iter()
            .map(|j| {
                let (grad, hess) = grad_hess_stretch(
                    node_position(q, j),
                    node_position(q, j + 1),
                    self.ref_len[j],
                    self.ea,
                );
                ElementTerms {
                    block: self.dofs.edge_block(j),
                    grad,
                    hess,
                }
            })
            .collect()
    }

    /// Stretching force vector and Jacobian over the full DOF vector
    pub fn forces(&self, q: ColRef<f64>) -> (Col<f64>, Mat<f64>) {
        let n = self.dofs.n_dofs();
        let mut force = Col::<f64>::zeros(n);
        let mut jac = Mat::<f64>::zeros(n, n);
        scatter(&self.element_terms(q), force.as_mut(), jac.as_mut());
        (force, jac)
    }

    pub fn energy(&self, q: ColRef<f64>) -> f64 {
        (0..self.dofs.n_edges())
            .map(|j| {
                stretch_energy(
                    node_position(q, j),
                    node_position(q, j + 1),
                    self.ref_len[j],
                    self.ea,
                )
            })
            .sum()
    }
}
