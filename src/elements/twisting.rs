use faer::prelude::*;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::kernels::{grad_hess_twist, integrated_twist, twist_energy};
use super::{scatter, ElementTerms};
use crate::frames::node_position;
use crate::node::DofMap;

/// Twisting at every interior node
pub struct Twisting {
    dofs: DofMap,
    /// Torsional stiffness
    pub gj: f64,
    /// Natural twist `[n_nodes]`
    pub twist_bar: Col<f64>,
    /// Voronoi length `[n_nodes]`
    pub voronoi_len: Col<f64>,
}

impl Twisting {
    pub fn new(dofs: DofMap, gj: f64, twist_bar: Col<f64>, voronoi_len: Col<f64>) -> Self {
        debug_assert_eq!(twist_bar.nrows(), dofs.n_nodes);
        Self {
            dofs,
            gj,
            twist_bar,
            voronoi_len,
        }
    }

    fn edge_angles(&self, q: ColRef<f64>, i: usize) -> (f64, f64) {
        (
            q[self.dofs.edge_twist(i - 1)],
            q[self.dofs.edge_twist(i)],
        )
    }

    /// Gradient and Hessian at each interior node, evaluated in parallel
    pub fn element_terms(&self, q: ColRef<f64>, ref_twist: ColRef<f64>) -> Vec<ElementTerms> {
        self.dofs
            .interior_nodes()
            .into_par_iter()
            .map(|i| {
                let (theta_e, theta_f) = self.edge_angles(q, i);
                let (grad, hess) = grad_hess_twist(
                    node_position(q, i - 1),
                    node_position(q, i),
                    node_position(q, i + 1),
                    theta_e,
                    theta_f,
                    ref_twist[i],
                    self.twist_bar[i],
                    self.voronoi_len[i],
                    self.gj,
                );
                ElementTerms {
                    block: self.dofs.hinge_block(i),
                    grad,
                    hess,
                }
            })
            .collect()
    }

    /// Twisting force vector and Jacobian over the full DOF vector
    pub fn forces(&self, q: ColRef<f64>, ref_twist: ColRef<f64>) -> (Col<f64>, Mat<f64>) {
        let n = self.dofs.n_dofs();
        let mut force = Col::<f64>::zeros(n);
        let mut jac = Mat::<f64>::zeros(n, n);
        scatter(&self.element_terms(q, ref_twist), force.as_mut(), jac.as_mut());
        (force, jac)
    }

    pub fn energy(&self, q: ColRef<f64>, ref_twist: ColRef<f64>) -> f64 {
        self.dofs
            .interior_nodes()
            .map(|i| {
                let (theta_e, theta_f) = self.edge_angles(q, i);
                let tau = integrated_twist(theta_e, theta_f, ref_twist[i], self.twist_bar[i]);
                twist_energy(tau, self.voronoi_len[i], self.gj)
            })
            .sum()
    }
}
