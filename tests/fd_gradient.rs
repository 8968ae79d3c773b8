//! Finite-difference checks of the assembled elastic forces.
//!
//! The energy at a perturbed configuration is evaluated with the reference
//! frame time-parallel transported from the base configuration, so the
//! numerical derivative sees the same frame evolution as the solver.

use dersim::frames::{compute_tangent, compute_time_parallel, get_ref_twist};
use dersim::model::{Model, Stiffness};
use dersim::solver::Solver;
use dersim::state::RodState;
use equator::assert;
use faer::prelude::*;

/// Slightly twisted helix with non-uniform edge angles, deformed away from
/// its natural shape
fn deformed_rod() -> (Solver, RodState) {
    let mut model = Model::new();
    (0..6).for_each(|i| {
        let s = 0.35 * i as f64;
        model
            .add_node()
            .position(s.cos(), s.sin(), 0.15 * s)
            .build();
    });
    model.set_stiffness(Stiffness {
        ea: 3.,
        ei1: 1.,
        ei2: Some(1.7),
        gj: 0.6,
    });
    let rest = model.create_state().unwrap();
    let solver = model.create_solver().unwrap();

    let mut q = rest.q.clone();
    (0..6).for_each(|i| {
        let s = i as f64;
        q[4 * i] += 0.04 * (1.3 * s).sin();
        q[4 * i + 1] += 0.03 * (0.7 * s).cos();
        q[4 * i + 2] -= 0.05 * (0.9 * s).sin();
    });
    (0..5).for_each(|j| q[4 * j + 3] = 0.2 * j as f64 - 0.3 * (j as f64).sin());

    (solver, transported(&rest, q))
}

/// State at `q` with frame and reference twist carried over from `base`
fn transported(base: &RodState, q: Col<f64>) -> RodState {
    let frame = compute_time_parallel(base.frame.d1.as_ref(), base.q.as_ref(), q.as_ref());
    let tangents = compute_tangent(q.as_ref());
    let ref_twist = get_ref_twist(frame.d1.as_ref(), tangents.as_ref(), base.ref_twist.as_ref());
    RodState {
        u: Col::zeros(q.nrows()),
        q,
        frame,
        ref_twist,
        time: base.time,
    }
}

/// Central difference of `energy` with respect to every DOF
fn numerical_gradient(state: &RodState, energy: impl Fn(&RodState) -> f64) -> Col<f64> {
    let h = 1e-6;
    Col::from_fn(state.q.nrows(), |k| {
        let mut qp = state.q.clone();
        let mut qm = state.q.clone();
        qp[k] += h;
        qm[k] -= h;
        (energy(&transported(state, qp)) - energy(&transported(state, qm))) / (2. * h)
    })
}

fn assert_gradient_matches(force: &Col<f64>, numerical: &Col<f64>) {
    let scale = force.iter().fold(0_f64, |m, f| m.max(f.abs()));
    assert!(scale > 1e-3);
    force.iter().zip(numerical.iter()).for_each(|(&f, &g)| {
        // force = -gradient
        assert!((f + g).abs() <= 1e-6 * scale);
    });
}

#[test]
fn test_stretching_gradient() {
    let (solver, state) = deformed_rod();
    let (force, _) = solver.elements.stretching.forces(state.q.as_ref());
    let numerical = numerical_gradient(&state, |s| solver.energy(s).stretching);
    assert_gradient_matches(&force, &numerical);
}

#[test]
fn test_bending_gradient() {
    let (solver, state) = deformed_rod();
    let (force, _) = solver
        .elements
        .bending
        .forces(state.q.as_ref(), &state.material_frame());
    let numerical = numerical_gradient(&state, |s| solver.energy(s).bending);
    assert_gradient_matches(&force, &numerical);
}

#[test]
fn test_twisting_gradient() {
    let (solver, state) = deformed_rod();
    let (force, _) = solver
        .elements
        .twisting
        .forces(state.q.as_ref(), state.ref_twist.as_ref());
    let numerical = numerical_gradient(&state, |s| solver.energy(s).twisting);
    assert_gradient_matches(&force, &numerical);
}

#[test]
fn test_assembled_jacobian_symmetric() {
    let (solver, state) = deformed_rod();
    let (_, jac) = solver.elements.assemble(
        state.q.as_ref(),
        &state.material_frame(),
        state.ref_twist.as_ref(),
    );
    let n = jac.nrows();
    let scale = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .fold(0_f64, |m, (i, j)| m.max(jac[(i, j)].abs()));
    (0..n).for_each(|i| {
        (0..n).for_each(|j| assert!((jac[(i, j)] - jac[(j, i)]).abs() <= 1e-10 * scale));
    });
}
