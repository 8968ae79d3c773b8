//! Error types for model construction, time stepping and configuration.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for a solver step.
pub type SolverResult<T> = Result<T, SolverError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a rod model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A rod needs at least one edge.
    #[error("rod needs at least 2 nodes, got {0}")]
    TooFewNodes(usize),

    /// Two consecutive nodes coincide.
    #[error("edge {edge} has zero length")]
    ZeroLengthEdge {
        /// Index of the degenerate edge.
        edge: usize,
    },

    /// The seed director has no component orthogonal to the first tangent.
    #[error("seed director is parallel to the first edge tangent")]
    DegenerateSeed,

    /// A boundary condition references a DOF outside the state vector.
    #[error("invalid DOF index {dof} (rod has {n_dofs} DOFs)")]
    InvalidDof {
        /// The invalid index.
        dof: usize,
        /// Length of the DOF vector.
        n_dofs: usize,
    },

    /// A material or stepping parameter is out of range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Errors that terminate a time step.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Newton iteration did not reach the tolerance within the budget.
    #[error("Newton iteration did not converge after {iterations} iterations (residual: {residual:.3e})")]
    MaxIterations {
        /// Iterations performed.
        iterations: usize,
        /// Residual of the last iteration.
        residual: f64,
    },

    /// The free-DOF Jacobian is singular or too ill-conditioned to solve.
    #[error("Newton matrix singular or ill-conditioned at iteration {iteration}")]
    SingularSystem {
        /// Iteration at which the solve failed.
        iteration: usize,
    },

    /// The residual contains NaN or infinite entries.
    #[error("non-finite residual at iteration {iteration}")]
    NonFinite {
        /// Iteration at which the residual was evaluated.
        iteration: usize,
    },
}

/// Errors raised while reading a scenario description.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The scenario is not a valid model.
    #[error("invalid model: {0}")]
    Model(#[from] ModelError),
}
