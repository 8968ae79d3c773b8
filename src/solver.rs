use faer::prelude::*;
use itertools::izip;
use tracing::{debug, warn};

use crate::elements::masses::Masses;
use crate::elements::{Elements, Energy};
use crate::error::{SolverError, SolverResult};
use crate::frames::{
    compute_material_frame, compute_tangent, compute_time_parallel, get_ref_twist, twist_angles,
    Directors,
};
use crate::node::{BoundaryConditions, DofMap};
use crate::state::RodState;

/// Smallest accepted ratio between the smallest and largest LU pivot of the
/// free-DOF Newton matrix
pub const MIN_PIVOT_RATIO: f64 = 1e-12;

pub struct StepParameters {
    pub dt: f64, // time step
    pub max_iter: usize,
    /// Convergence threshold on the sum of absolute free residuals
    pub tol: f64,
}

impl StepParameters {
    pub fn new(dt: f64, max_iter: usize, tol: f64) -> Self {
        Self { dt, max_iter, tol }
    }
}

/// Implicit Euler integrator with a Newton-Raphson solve per step
pub struct Solver {
    pub p: StepParameters,
    pub dofs: DofMap,
    pub elements: Elements,
    pub masses: Masses,
    pub bc: BoundaryConditions,
    /// Constant external force `[n_dofs]`
    pub f_ext: Col<f64>,
}

#[derive(Clone, Debug)]
pub struct StepResults {
    /// Final residual norm
    pub err: f64,
    pub iter: usize,
    /// Residual norm of every Newton iteration
    pub residuals: Vec<f64>,
}

/// Converged configuration and convergence history of one step
#[derive(Clone, Debug)]
pub struct StepOutput {
    pub state: RodState,
    pub results: StepResults,
}

/// Residual of the discrete equations of motion and its Jacobian
struct Residual {
    f: Col<f64>,
    jac: Mat<f64>,
}

impl Solver {
    pub fn new(
        step_parameters: StepParameters,
        dofs: DofMap,
        elements: Elements,
        masses: Masses,
        bc: BoundaryConditions,
    ) -> Self {
        let f_ext = masses.fg.clone();
        Self {
            p: step_parameters,
            dofs,
            elements,
            masses,
            bc,
            f_ext,
        }
    }

    /// Advances `state` by one time step.
    ///
    /// The input state is left untouched; on success the returned state holds
    /// the converged DOFs, the time-parallel reference frame and the
    /// reference twist at those DOFs, the velocity `(q - q0) / dt` and the
    /// advanced time.
    pub fn step(&self, state: &RodState) -> SolverResult<StepOutput> {
        let free = self.bc.free();
        let mut q = state.q.clone();
        let mut residuals = Vec::with_capacity(self.p.max_iter);

        for iter in 1..=self.p.max_iter {
            let Residual { f, jac } = self.residual(state, q.as_ref());

            // Restrict to free DOFs
            let f_free = Col::<f64>::from_fn(free.len(), |a| f[free[a]]);
            let jac_free = Mat::<f64>::from_fn(free.len(), free.len(), |a, b| jac[(free[a], free[b])]);

            if !f_free.iter().all(|f| f.is_finite()) {
                warn!(iter, "non-finite residual");
                return Err(SolverError::NonFinite { iteration: iter });
            }

            if !free.is_empty() {
                let lu = jac_free.partial_piv_lu();
                let ratio = pivot_ratio(lu.U());
                let dq = lu.solve(&f_free);
                if ratio.is_nan() || ratio < MIN_PIVOT_RATIO || !dq.iter().all(|dq| dq.is_finite()) {
                    warn!(iter, ratio, "singular Newton system");
                    return Err(SolverError::SingularSystem { iteration: iter });
                }
                izip!(free.iter(), dq.iter()).for_each(|(&k, &dq)| q[k] -= dq);
            }

            let err = f_free.iter().map(|f| f.abs()).sum::<f64>();
            residuals.push(err);
            debug!(iter, err, "Newton iteration");

            if err < self.p.tol {
                debug!(iter, err, time = state.time + self.p.dt, "step converged");
                return Ok(StepOutput {
                    state: self.finish_step(state, q),
                    results: StepResults {
                        err,
                        iter,
                        residuals,
                    },
                });
            }
        }

        let residual = residuals.last().copied().unwrap_or(f64::INFINITY);
        warn!(
            iterations = self.p.max_iter,
            residual, "Newton iteration budget exhausted"
        );
        Err(SolverError::MaxIterations {
            iterations: self.p.max_iter,
            residual,
        })
    }

    /// Elastic energy of a state split by mode
    pub fn energy(&self, state: &RodState) -> Energy {
        self.elements.energy(
            state.q.as_ref(),
            &state.material_frame(),
            state.ref_twist.as_ref(),
        )
    }

    /// Reference frame and reference twist at `q`, transported from the
    /// previous state
    fn kinematics(&self, state: &RodState, q: ColRef<f64>) -> (Directors, Col<f64>) {
        let frame = compute_time_parallel(state.frame.d1.as_ref(), state.q.as_ref(), q);
        let tangents = compute_tangent(q);
        let ref_twist = get_ref_twist(frame.d1.as_ref(), tangents.as_ref(), state.ref_twist.as_ref());
        (frame, ref_twist)
    }

    /// `f = m/dt ((q - q0)/dt - u) - F` and `J = diag(m)/dt² - ∂F/∂q`
    fn residual(&self, state: &RodState, q: ColRef<f64>) -> Residual {
        let dt = self.p.dt;
        let (frame, ref_twist) = self.kinematics(state, q);
        let material = compute_material_frame(&frame, twist_angles(q).as_ref());

        let (force, j_force) = self
            .elements
            .assemble(q, &material, ref_twist.as_ref());

        let m = &self.masses.m;
        let f = Col::<f64>::from_fn(self.dofs.n_dofs(), |k| {
            m[k] / dt * ((q[k] - state.q[k]) / dt - state.u[k]) - (force[k] + self.f_ext[k])
        });
        let jac = Mat::<f64>::from_fn(self.dofs.n_dofs(), self.dofs.n_dofs(), |i, j| {
            let inertia = if i == j { m[i] / (dt * dt) } else { 0. };
            inertia - j_force[(i, j)]
        });

        Residual { f, jac }
    }

    fn finish_step(&self, state: &RodState, q: Col<f64>) -> RodState {
        let (frame, ref_twist) = self.kinematics(state, q.as_ref());
        let u = Col::<f64>::from_fn(q.nrows(), |k| (q[k] - state.q[k]) / self.p.dt);
        RodState {
            q,
            u,
            frame,
            ref_twist,
            time: state.time + self.p.dt,
        }
    }
}

/// Ratio of the smallest to the largest absolute diagonal entry of an upper
/// triangular factor; NaN when every pivot is zero
fn pivot_ratio(u: MatRef<f64>) -> f64 {
    let (min, max) = (0..u.nrows().min(u.ncols()))
        .map(|i| u[(i, i)].abs())
        .fold((f64::INFINITY, 0_f64), |(min, max), p| (min.min(p), max.max(p)));
    min / max
}
