use dersim::error::SolverError;
use dersim::model::Model;
use faer::prelude::*;

fn straight_rod() -> Model {
    let mut model = Model::new();
    (0..4).for_each(|i| {
        model.add_node().position(0.1 * i as f64, 0., 0.).build();
    });
    model.set_gravity(0., 0., -9.81);
    model.clamp_edges(1);
    model
}

#[test]
fn test_iteration_budget_exhausted() {
    let mut model = straight_rod();
    model.set_max_iter(3);
    model.set_solver_tolerance(0.);
    let state = model.create_state().unwrap();
    let solver = model.create_solver().unwrap();

    match solver.step(&state) {
        Err(SolverError::MaxIterations {
            iterations,
            residual,
        }) => {
            assert_eq!(iterations, 3);
            assert!(residual.is_finite());
        }
        other => panic!("expected MaxIterations, got {other:?}"),
    }
}

#[test]
fn test_singular_system() {
    let model = straight_rod();
    let state = model.create_state().unwrap();
    let mut solver = model.create_solver().unwrap();

    // No inertia and no stiffness: the Newton matrix is identically zero
    solver.masses.m.fill(0.);
    solver.elements.stretching.ea = 0.;
    solver.elements.bending.ei1 = 0.;
    solver.elements.bending.ei2 = None;
    solver.elements.twisting.gj = 0.;
    solver.f_ext = Col::from_fn(solver.dofs.n_dofs(), |_| 1.);

    assert!(matches!(
        solver.step(&state),
        Err(SolverError::SingularSystem { iteration: 1 })
    ));
}

#[test]
fn test_ill_conditioned_system() {
    let model = straight_rod();
    let state = model.create_state().unwrap();
    let mut solver = model.create_solver().unwrap();

    // Axial stiffness only and almost no inertia: the transverse and twist
    // pivots fall far below the axial ones while the update stays finite
    solver.masses.m = 1e-20 * &solver.masses.m;
    solver.elements.bending.ei1 = 0.;
    solver.elements.bending.ei2 = None;
    solver.elements.twisting.gj = 0.;

    assert!(matches!(
        solver.step(&state),
        Err(SolverError::SingularSystem { iteration: 1 })
    ));
}

#[test]
fn test_non_finite_residual() {
    let model = straight_rod();
    let mut state = model.create_state().unwrap();
    let solver = model.create_solver().unwrap();
    state.u[8] = f64::NAN;

    assert!(matches!(
        solver.step(&state),
        Err(SolverError::NonFinite { iteration: 1 })
    ));
}
