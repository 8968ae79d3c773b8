pub mod bending;
pub mod kernels;
pub mod masses;
pub mod stretching;
pub mod twisting;

use faer::prelude::*;

use crate::frames::Directors;
use crate::node::DofBlock;
use bending::Bending;
use stretching::Stretching;
use twisting::Twisting;

/// Local gradient and Hessian of one element energy together with the
/// global DOFs they belong to
pub struct ElementTerms {
    pub block: DofBlock,
    pub grad: Col<f64>,
    pub hess: Mat<f64>,
}

/// Subtracts each element's gradient and Hessian from the global force
/// vector and Jacobian (`force -= grad`, `jac -= hess`).
pub fn scatter(terms: &[ElementTerms], mut force: ColMut<f64>, mut jac: MatMut<f64>) {
    terms.iter().for_each(|t| {
        t.block.indices().enumerate().for_each(|(a, ga)| {
            force[ga] -= t.grad[a];
            t.block.indices().enumerate().for_each(|(b, gb)| {
                jac[(ga, gb)] -= t.hess[(a, b)];
            });
        });
    });
}

/// Elastic energy split by mode
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Energy {
    pub stretching: f64,
    pub bending: f64,
    pub twisting: f64,
}

impl Energy {
    pub fn total(&self) -> f64 {
        self.stretching + self.bending + self.twisting
    }
}

/// All elastic contributions of a rod
pub struct Elements {
    pub stretching: Stretching,
    pub bending: Bending,
    pub twisting: Twisting,
}

impl Elements {
    pub fn new(stretching: Stretching, bending: Bending, twisting: Twisting) -> Self {
        Self {
            stretching,
            bending,
            twisting,
        }
    }

    /// Elastic force vector and its Jacobian summed over stretching, bending
    /// and twisting.
    pub fn assemble(
        &self,
        q: ColRef<f64>,
        material: &Directors,
        ref_twist: ColRef<f64>,
    ) -> (Col<f64>, Mat<f64>) {
        let (mut force, mut jac) = self.stretching.forces(q);

        let (fb, jb) = self.bending.forces(q, material);
        force += &fb;
        jac += &jb;

        let (ft, jt) = self.twisting.forces(q, ref_twist);
        force += &ft;
        jac += &jt;

        (force, jac)
    }

    pub fn energy(&self, q: ColRef<f64>, material: &Directors, ref_twist: ColRef<f64>) -> Energy {
        Energy {
            stretching: self.stretching.energy(q),
            bending: self.bending.energy(q, material),
            twisting: self.twisting.energy(q, ref_twist),
        }
    }
}
