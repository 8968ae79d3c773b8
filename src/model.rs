use std::f64::consts::PI;

use faer::prelude::*;
use itertools::Itertools;
use tracing::info;

use crate::curvature::get_kappa;
use crate::elements::bending::Bending;
use crate::elements::masses::Masses;
use crate::elements::stretching::Stretching;
use crate::elements::twisting::Twisting;
use crate::elements::Elements;
use crate::error::{ModelError, ModelResult};
use crate::frames::{compute_space_parallel, compute_tangent, get_ref_twist, seed_director};
use crate::node::{BoundaryConditions, DofMap, Node, NodeBuilder};
use crate::solver::{Solver, StepParameters};
use crate::state::RodState;
use crate::util::dot_product;

/// Isotropic elastic material and circular cross section
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub density: f64,
    /// Cross-section radius
    pub radius: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            youngs_modulus: 10e6,
            poisson_ratio: 0.5,
            density: 1000.,
            radius: 0.001,
        }
    }
}

impl Material {
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2. * (1. + self.poisson_ratio))
    }

    /// Stiffnesses of a solid circular section
    pub fn stiffness(&self) -> Stiffness {
        let r2 = self.radius * self.radius;
        Stiffness {
            ea: self.youngs_modulus * PI * r2,
            ei1: self.youngs_modulus * PI * r2 * r2 / 4.,
            ei2: None,
            gj: self.shear_modulus() * PI * r2 * r2 / 2.,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        [
            ("youngs_modulus", self.youngs_modulus),
            ("density", self.density),
            ("radius", self.radius),
        ]
        .into_iter()
        .try_for_each(|(name, value)| positive(name, value))?;
        if !(self.poisson_ratio > -1.) {
            return Err(ModelError::InvalidParameter {
                name: "poisson_ratio",
                value: self.poisson_ratio,
            });
        }
        Ok(())
    }
}

/// Section stiffnesses
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stiffness {
    /// Axial
    pub ea: f64,
    /// Bending about the first material director
    pub ei1: f64,
    /// Bending about the second material director; same as `ei1` when `None`
    pub ei2: Option<f64>,
    /// Torsional
    pub gj: f64,
}

fn positive(name: &'static str, value: f64) -> ModelResult<()> {
    if value > 0. && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

#[derive(Debug)]
pub struct Model {
    gravity: [f64; 3],
    dt: f64,
    max_iter: usize,
    tol: Option<f64>,
    material: Material,
    stiffness: Option<Stiffness>,
    seed: Option<[f64; 3]>,
    clamped_edges: usize,
    fixed_dofs: Vec<usize>,
    pub nodes: Vec<Node>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates and initializes a model
    pub fn new() -> Model {
        Model {
            gravity: [0., 0., 0.],
            dt: 0.01,
            max_iter: 50,
            tol: None,
            material: Material::default(),
            stiffness: None,
            seed: None,
            clamped_edges: 0,
            fixed_dofs: vec![],
            nodes: vec![],
        }
    }

    /// Creates and returns a node builder for adding a new node to the rod.
    /// Nodes are connected in the order they are added.
    pub fn add_node(&mut self) -> NodeBuilder {
        let id = self.nodes.len();
        self.nodes.push(Node { id, x: [0., 0., 0.] });
        NodeBuilder {
            node: &mut self.nodes[id],
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn dof_map(&self) -> DofMap {
        DofMap::new(self.nodes.len())
    }

    /// Set the gravity acceleration in each direction
    pub fn set_gravity(&mut self, x: f64, y: f64, z: f64) {
        self.gravity = [x, y, z];
    }

    pub fn set_time_step(&mut self, dt: f64) {
        self.dt = dt;
    }

    pub fn set_max_iter(&mut self, max_iter: usize) {
        self.max_iter = max_iter;
    }

    /// Newton tolerance on the sum of absolute free residuals. Defaults to
    /// `EI / L² · 1e-3` for rod length `L`.
    pub fn set_solver_tolerance(&mut self, tol: f64) {
        self.tol = Some(tol);
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Overrides the stiffnesses derived from the material
    pub fn set_stiffness(&mut self, stiffness: Stiffness) {
        self.stiffness = Some(stiffness);
    }

    /// Director used to start the space-parallel reference frame on the first
    /// edge. Defaults to [`seed_director`] of the first tangent.
    pub fn set_seed_director(&mut self, x: f64, y: f64, z: f64) {
        self.seed = Some([x, y, z]);
    }

    /// Fixes the positions and twist angles of the first `n_edges` edges
    pub fn clamp_edges(&mut self, n_edges: usize) {
        self.clamped_edges = n_edges;
    }

    /// Fixes individual DOFs
    pub fn fix_dofs(&mut self, dofs: &[usize]) {
        self.fixed_dofs.extend_from_slice(dofs);
    }

    pub fn stiffness(&self) -> Stiffness {
        self.stiffness.unwrap_or_else(|| self.material.stiffness())
    }

    /// Initial DOF vector with zero twist angles
    fn initial_dofs(&self) -> ModelResult<Col<f64>> {
        let n_nodes = self.nodes.len();
        if n_nodes < 2 {
            return Err(ModelError::TooFewNodes(n_nodes));
        }
        if let Some(edge) = self
            .nodes
            .iter()
            .tuple_windows()
            .position(|(a, b)| a.x == b.x)
        {
            return Err(ModelError::ZeroLengthEdge { edge });
        }
        let dofs = self.dof_map();
        let mut q = Col::<f64>::zeros(dofs.n_dofs());
        self.nodes.iter().for_each(|node| {
            let k = dofs.node(node.id);
            (0..3).for_each(|d| q[k + d] = node.x[d]);
        });
        Ok(q)
    }

    /// Rest length of every edge `[n_edges]`
    fn ref_lengths(&self) -> Col<f64> {
        Col::from_fn(self.nodes.len() - 1, |j| {
            let (a, b) = (&self.nodes[j].x, &self.nodes[j + 1].x);
            ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2)).sqrt()
        })
    }

    /// Creates the initial state: nodes at rest with a space-parallel
    /// reference frame
    pub fn create_state(&self) -> ModelResult<RodState> {
        let q = self.initial_dofs()?;
        let tangents = compute_tangent(q.as_ref());
        let t0 = tangents.col(0);

        let seed = match self.seed {
            Some([x, y, z]) => {
                let seed = col![x, y, z];
                let normal = seed.norm_l2();
                let axial = dot_product(seed.as_ref(), t0);
                if !(normal > 0.) || (normal * normal - axial * axial).sqrt() < 1e-10 * normal {
                    return Err(ModelError::DegenerateSeed);
                }
                seed
            }
            None => seed_director(t0),
        };

        let frame = compute_space_parallel(seed.as_ref(), q.as_ref());
        let ref_twist = get_ref_twist(
            frame.d1.as_ref(),
            tangents.as_ref(),
            Col::<f64>::zeros(self.nodes.len()).as_ref(),
        );

        Ok(RodState {
            u: Col::zeros(q.nrows()),
            q,
            frame,
            ref_twist,
            time: 0.,
        })
    }

    /// Creates the solver with rest lengths, natural curvature and lumped
    /// masses computed from the initial configuration
    pub fn create_solver(&self) -> ModelResult<Solver> {
        self.material.validate()?;
        positive("dt", self.dt)?;
        if self.max_iter == 0 {
            return Err(ModelError::InvalidParameter {
                name: "max_iter",
                value: 0.,
            });
        }
        let stiffness = self.stiffness();
        [
            ("ea", stiffness.ea),
            ("ei1", stiffness.ei1),
            ("ei2", stiffness.ei2.unwrap_or(stiffness.ei1)),
            ("gj", stiffness.gj),
        ]
        .into_iter()
        .try_for_each(|(name, value)| positive(name, value))?;

        let state = self.create_state()?;
        let dofs = self.dof_map();
        let n_nodes = dofs.n_nodes;

        let ref_len = self.ref_lengths();
        let voronoi_len = Col::<f64>::from_fn(n_nodes, |i| {
            let before = if i > 0 { ref_len[i - 1] } else { 0. };
            let after = if i + 1 < n_nodes { ref_len[i] } else { 0. };
            0.5 * (before + after)
        });

        // The initial configuration is the stress-free shape
        let kappa_bar = get_kappa(state.q.as_ref(), &state.material_frame());
        let twist_bar = Col::<f64>::zeros(n_nodes);

        let masses = Masses::new(
            &dofs,
            ref_len.as_ref(),
            self.material.density,
            self.material.radius,
            &self.gravity,
        );

        let elements = Elements::new(
            Stretching::new(dofs, stiffness.ea, ref_len.clone()),
            Bending::new(
                dofs,
                stiffness.ei1,
                stiffness.ei2,
                kappa_bar,
                voronoi_len.clone(),
            ),
            Twisting::new(dofs, stiffness.gj, twist_bar, voronoi_len),
        );

        let fixed = BoundaryConditions::clamp_first_edges(&dofs, self.clamped_edges.min(dofs.n_edges()))?
            .fixed()
            .iter()
            .chain(self.fixed_dofs.iter())
            .copied()
            .collect_vec();
        let bc = BoundaryConditions::new(&dofs, &fixed)?;

        let tol = match self.tol {
            Some(tol) => tol,
            None => {
                let length = ref_len.iter().sum::<f64>();
                let tol = stiffness.ei1 / (length * length) * 1e-3;
                info!(tol, length, "derived Newton tolerance from bending stiffness");
                tol
            }
        };

        Ok(Solver::new(
            StepParameters::new(self.dt, self.max_iter, tol),
            dofs,
            elements,
            masses,
            bc,
        ))
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    fn straight_model(n: usize) -> Model {
        let mut model = Model::new();
        (0..n).for_each(|i| {
            model.add_node().position(0.1 * i as f64, 0., 0.).build();
        });
        model
    }

    #[test]
    fn test_material_stiffness() {
        let material = Material {
            youngs_modulus: 2.,
            poisson_ratio: 0.,
            density: 1.,
            radius: 1.,
        };
        let k = material.stiffness();
        assert_relative_eq!(k.ea, 2. * PI);
        assert_relative_eq!(k.ei1, PI / 2.);
        assert_relative_eq!(k.gj, PI / 2.);
        assert!(k.ei2.is_none());
    }

    #[test]
    fn test_create_state() {
        let model = straight_model(4);
        let state = model.create_state().unwrap();
        assert_eq!(state.q.nrows(), 15);
        assert_eq!(state.q[8], 0.2);
        assert_eq!(state.time, 0.);
        // Default seed for a rod along x is +y
        assert_relative_eq!(state.frame.d1[(1, 0)], 1.);
        state.ref_twist.iter().for_each(|&r| assert_eq!(r, 0.));
    }

    #[test]
    fn test_create_state_errors() {
        let model = straight_model(1);
        assert!(matches!(model.create_state(), Err(ModelError::TooFewNodes(1))));

        let mut model = straight_model(2);
        model.add_node().position(0.1, 0., 0.).build();
        assert!(matches!(
            model.create_state(),
            Err(ModelError::ZeroLengthEdge { edge: 1 })
        ));

        let mut model = straight_model(3);
        model.set_seed_director(2., 0., 0.);
        assert!(matches!(model.create_state(), Err(ModelError::DegenerateSeed)));
    }

    #[test]
    fn test_create_solver() {
        let mut model = straight_model(3);
        model.clamp_edges(1);
        model.fix_dofs(&[10]);
        let solver = model.create_solver().unwrap();
        assert_eq!(solver.bc.fixed(), &[0, 1, 2, 3, 4, 5, 6, 10]);
        assert_relative_eq!(solver.elements.bending.voronoi_len[0], 0.05);
        assert_relative_eq!(solver.elements.bending.voronoi_len[1], 0.1);

        // Default tolerance EI / L² · 1e-3
        let ei = model.stiffness().ei1;
        assert_relative_eq!(solver.p.tol, ei / 0.04 * 1e-3, max_relative = 1e-12);
    }

    #[test]
    fn test_create_solver_invalid_parameters() {
        let mut model = straight_model(3);
        model.set_time_step(0.);
        assert!(matches!(
            model.create_solver(),
            Err(ModelError::InvalidParameter { name: "dt", .. })
        ));

        let mut model = straight_model(3);
        model.fix_dofs(&[11]);
        assert!(matches!(
            model.create_solver(),
            Err(ModelError::InvalidDof { dof: 11, .. })
        ));
    }
}
