use faer::prelude::*;

use crate::curvature::get_kappa;
use crate::frames::{compute_material_frame, compute_tangent, node_position, twist_angles, Directors};

/// Rod configuration at one instant.
///
/// A state is never modified by the solver; each step returns a new one
/// that the caller passes back in for the next step.
#[derive(Clone, Debug)]
pub struct RodState {
    /// Node positions and edge twist angles `[4 * n_nodes - 1]`
    pub q: Col<f64>,
    /// DOF velocity `[4 * n_nodes - 1]`
    pub u: Col<f64>,
    /// Reference frame (a1, a2) `[3][n_edges]`
    pub frame: Directors,
    /// Reference twist `[n_nodes]`
    pub ref_twist: Col<f64>,
    /// Simulation time
    pub time: f64,
}

impl RodState {
    pub fn n_nodes(&self) -> usize {
        (self.q.nrows() + 1) / 4
    }

    pub fn n_edges(&self) -> usize {
        self.n_nodes() - 1
    }

    /// Node positions `[3][n_nodes]`
    pub fn positions(&self) -> Mat<f64> {
        Mat::from_fn(3, self.n_nodes(), |i, j| self.q[4 * j + i])
    }

    pub fn node_position(&self, i: usize) -> ColRef<f64> {
        node_position(self.q.as_ref(), i)
    }

    /// Edge twist angles `[n_edges]`
    pub fn twist_angles(&self) -> Col<f64> {
        twist_angles(self.q.as_ref())
    }

    /// Unit edge tangents `[3][n_edges]`
    pub fn tangents(&self) -> Mat<f64> {
        compute_tangent(self.q.as_ref())
    }

    /// Reference frame rotated by the edge twist angles
    pub fn material_frame(&self) -> Directors {
        compute_material_frame(&self.frame, self.twist_angles().as_ref())
    }

    /// Curvature `[2][n_nodes]` in the material frame
    pub fn curvature(&self) -> Mat<f64> {
        get_kappa(self.q.as_ref(), &self.material_frame())
    }
}
