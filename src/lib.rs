//! Discrete elastic rod simulation.
//!
//! A rod is a chain of nodes joined by edges; each edge carries a twist
//! angle relative to a reference frame that is parallel transported in time.
//! Stretching, bending and twisting energies are integrated implicitly with
//! a Newton-Raphson solve per time step.

pub mod config;
pub mod curvature;
pub mod elements;
pub mod error;
pub mod frames;
pub mod model;
pub mod node;
pub mod solver;
pub mod state;
pub mod util;
