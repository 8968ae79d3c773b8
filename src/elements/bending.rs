use faer::prelude::*;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::kernels::{bend_energy, grad_hess_bend};
use super::{scatter, ElementTerms};
use crate::curvature::compute_kappa;
use crate::frames::{node_position, Directors};
use crate::node::DofMap;

/// Bending at every interior node
pub struct Bending {
    dofs: DofMap,
    /// Bending stiffness about `m1`
    pub ei1: f64,
    /// Bending stiffness about `m2`; `None` for an isotropic section
    pub ei2: Option<f64>,
    /// Natural curvature `[2][n_nodes]`
    pub kappa_bar: Mat<f64>,
    /// Voronoi length `[n_nodes]`
    pub voronoi_len: Col<f64>,
}

impl Bending {
    pub fn new(
        dofs: DofMap,
        ei1: f64,
        ei2: Option<f64>,
        kappa_bar: Mat<f64>,
        voronoi_len: Col<f64>,
    ) -> Self {
        debug_assert_eq!(kappa_bar.ncols(), dofs.n_nodes);
        debug_assert_eq!(voronoi_len.nrows(), dofs.n_nodes);
        Self {
            dofs,
            ei1,
            ei2,
            kappa_bar,
            voronoi_len,
        }
    }

    /// Gradient and Hessian at each interior node, evaluated in parallel
    pub fn element_terms(&self, q: ColRef<f64>, material: &Directors) -> Vec<ElementTerms> {
        self.dofs
            .interior_nodes()
            .into_par_iter()
            .map(|i| {
                let (grad, hess) = grad_hess_bend(
                    node_position(q, i - 1),
                    node_position(q, i),
                    node_position(q, i + 1),
                    material.d1.col(i - 1),
                    material.d2.col(i - 1),
                    material.d1.col(i),
                    material.d2.col(i),
                    [self.kappa_bar[(0, i)], self.kappa_bar[(1, i)]],
                    self.voronoi_len[i],
                    self.ei1,
                    self.ei2,
                );
                ElementTerms {
                    block: self.dofs.hinge_block(i),
                    grad,
                    hess,
                }
            })
            .collect()
    }

    /// Bending force vector and Jacobian over the full DOF vector
    pub fn forces(&self, q: ColRef<f64>, material: &Directors) -> (Col<f64>, Mat<f64>) {
        let n = self.dofs.n_dofs();
        let mut force = Col::<f64>::zeros(n);
        let mut jac = Mat::<f64>::zeros(n, n);
        scatter(&self.element_terms(q, material), force.as_mut(), jac.as_mut());
        (force, jac)
    }

    pub fn energy(&self, q: ColRef<f64>, material: &Directors) -> f64 {
        self.dofs
            .interior_nodes()
            .map(|i| {
                let kappa = compute_kappa(
                    node_position(q, i - 1),
                    node_position(q, i),
                    node_position(q, i + 1),
                    material.d1.col(i - 1),
                    material.d2.col(i - 1),
                    material.d1.col(i),
                    material.d2.col(i),
                );
                bend_energy(
                    kappa,
                    [self.kappa_bar[(0, i)], self.kappa_bar[(1, i)]],
                    self.voronoi_len[i],
                    self.ei1,
                    self.ei2,
                )
            })
            .sum()
    }
}
