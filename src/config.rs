use serde::Deserialize;

use crate::error::ConfigResult;
use crate::model::{Material, Model};
use crate::state::RodState;

pub fn read_config_from_file(file_path: &str) -> ConfigResult<RodConfig> {
    let yaml_file = std::fs::read_to_string(file_path)?;
    RodConfig::from_yaml_str(&yaml_file)
}

/// Rod simulation scenario
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RodConfig {
    pub geometry: Geometry,
    pub material: MaterialConfig,
    pub time: TimeConfig,
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],
    /// Number of edges clamped at the start of the rod
    #[serde(default = "default_clamped_edges")]
    pub clamped_edges: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Geometry {
    pub n_nodes: usize,
    /// Arc length of the rod
    pub length: f64,
    /// Radius of the initial circular arc; zero for a straight rod along x
    #[serde(default)]
    pub natural_radius: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MaterialConfig {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub density: f64,
    /// Cross-section radius
    pub radius: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TimeConfig {
    pub total_time: f64,
    pub dt: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Newton tolerance; derived from the bending stiffness when omitted
    #[serde(default)]
    pub tolerance: Option<f64>,
}

fn default_gravity() -> [f64; 3] {
    [0., 0., -9.81]
}

fn default_clamped_edges() -> usize {
    1
}

fn default_max_iter() -> usize {
    50
}

impl RodConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Ring segment of 20 nodes, 0.2 m long on a 0.02 m radius, hanging
    /// under gravity from its first edge
    pub fn ring() -> Self {
        Self {
            geometry: Geometry {
                n_nodes: 20,
                length: 0.2,
                natural_radius: 0.02,
            },
            material: MaterialConfig {
                youngs_modulus: 10e6,
                poisson_ratio: 0.5,
                density: 1000.,
                radius: 0.001,
            },
            time: TimeConfig {
                total_time: 5.,
                dt: 0.01,
                max_iter: default_max_iter(),
                tolerance: None,
            },
            gravity: default_gravity(),
            clamped_edges: default_clamped_edges(),
        }
    }

    /// Initial node positions `[n_nodes]`: evenly spaced along x, or along a
    /// circular arc in the xy-plane when `natural_radius` is nonzero
    pub fn node_positions(&self) -> Vec<[f64; 3]> {
        let Geometry {
            n_nodes,
            length,
            natural_radius,
        } = self.geometry;
        let n_edges = n_nodes.saturating_sub(1).max(1) as f64;
        (0..n_nodes)
            .map(|i| {
                let s = i as f64 / n_edges;
                if natural_radius == 0. {
                    [s * length, 0., 0.]
                } else {
                    let phi = s * length / natural_radius;
                    [natural_radius * phi.cos(), natural_radius * phi.sin(), 0.]
                }
            })
            .collect()
    }

    /// Builds the model described by this scenario together with its
    /// initial state
    pub fn build_model(&self) -> ConfigResult<(Model, RodState)> {
        let mut model = Model::new();
        self.node_positions().into_iter().for_each(|[x, y, z]| {
            model.add_node().position(x, y, z).build();
        });
        model.set_material(Material {
            youngs_modulus: self.material.youngs_modulus,
            poisson_ratio: self.material.poisson_ratio,
            density: self.material.density,
            radius: self.material.radius,
        });
        model.set_gravity(self.gravity[0], self.gravity[1], self.gravity[2]);
        model.set_time_step(self.time.dt);
        model.set_max_iter(self.time.max_iter);
        if let Some(tol) = self.time.tolerance {
            model.set_solver_tolerance(tol);
        }
        model.clamp_edges(self.clamped_edges);

        let state = model.create_state()?;
        Ok((model, state))
    }

    /// Number of time steps covering `total_time`
    pub fn n_steps(&self) -> usize {
        (self.time.total_time / self.time.dt).round() as usize
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::{ConfigError, ModelError};
    use approx::assert_relative_eq;

    const STRAIGHT: &str = "
geometry:
  n_nodes: 3
  length: 0.2
material:
  youngs_modulus: 1.0e9
  poisson_ratio: 0.5
  density: 1000.0
  radius: 0.001
time:
  total_time: 1.0
  dt: 0.05
  tolerance: 1.0e-6
";

    #[test]
    fn test_parse_defaults() {
        let config = RodConfig::from_yaml_str(STRAIGHT).unwrap();
        assert_eq!(config.geometry.n_nodes, 3);
        assert_eq!(config.geometry.natural_radius, 0.);
        assert_eq!(config.gravity, [0., 0., -9.81]);
        assert_eq!(config.clamped_edges, 1);
        assert_eq!(config.time.max_iter, 50);
        assert_eq!(config.time.tolerance, Some(1e-6));
        assert_eq!(config.n_steps(), 20);

        let x = config.node_positions();
        assert_relative_eq!(x[1][0], 0.1);
        assert_relative_eq!(x[2][0], 0.2);
    }

    #[test]
    fn test_ring_positions() {
        let config = RodConfig::ring();
        let x = config.node_positions();
        assert_eq!(x.len(), 20);
        x.iter().for_each(|p| {
            assert_relative_eq!((p[0] * p[0] + p[1] * p[1]).sqrt(), 0.02, epsilon = 1e-15);
        });
        assert_relative_eq!(x[0][0], 0.02);
        assert_eq!(config.n_steps(), 500);
    }

    #[test]
    fn test_build_model() {
        let config = RodConfig::from_yaml_str(STRAIGHT).unwrap();
        let (model, state) = config.build_model().unwrap();
        assert_eq!(model.n_nodes(), 3);
        assert_eq!(state.n_nodes(), 3);
        assert_eq!(state.q[8], 0.2);
        let solver = model.create_solver().unwrap();
        assert_eq!(solver.p.tol, 1e-6);
        assert_eq!(solver.bc.n_free(), 4);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = RodConfig::from_yaml_str("geometry: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let yaml = STRAIGHT.replace("n_nodes: 3", "n_nodes: 1");
        let err = RodConfig::from_yaml_str(&yaml).unwrap().build_model().unwrap_err();
        assert!(matches!(err, ConfigError::Model(ModelError::TooFewNodes(1))));
    }
}
