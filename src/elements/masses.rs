use std::f64::consts::PI;

use faer::prelude::*;

use crate::node::DofMap;

/// Lumped (diagonal) inertia of the rod
pub struct Masses {
    /// Mass of each DOF `[n_dofs]`
    pub m: Col<f64>,
    /// Gravity force on each DOF `[n_dofs]`
    pub fg: Col<f64>,
}

impl Masses {
    /// Lumps the mass of each edge `rho π r0² l_e` half onto each end node and
    /// gives each twist DOF the rotational inertia `½ dm_e r0²`.
    pub fn new(dofs: &DofMap, ref_len: ColRef<f64>, density: f64, radius: f64, gravity: &[f64; 3]) -> Self {
        let mut m = Col::<f64>::zeros(dofs.n_dofs());
        ref_len.iter().enumerate().for_each(|(j, &l)| {
            let dm = density * PI * radius * radius * l;
            [dofs.node(j), dofs.node(j + 1)].into_iter().for_each(|k| {
                (0..3).for_each(|d| m[k + d] += 0.5 * dm);
            });
            m[dofs.edge_twist(j)] = 0.5 * dm * radius * radius;
        });

        let mut fg = Col::<f64>::zeros(dofs.n_dofs());
        (0..dofs.n_nodes).for_each(|i| {
            let k = dofs.node(i);
            (0..3).for_each(|d| fg[k + d] = m[k + d] * gravity[d]);
        });

        Self { m, fg }
    }

    pub fn total_mass(&self, dofs: &DofMap) -> f64 {
        (0..dofs.n_nodes).map(|i| self.m[dofs.node(i)]).sum()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lumped_masses() {
        let dofs = DofMap::new(3);
        let (rho, r0) = (1000., 0.01);
        let masses = Masses::new(&dofs, col![0.1, 0.1].as_ref(), rho, r0, &[0., 0., -9.81]);
        let dm = rho * PI * r0 * r0 * 0.1;

        // Half an edge at the ends, a full edge in the middle
        assert_relative_eq!(masses.m[0], 0.5 * dm);
        assert_relative_eq!(masses.m[5], dm);
        assert_relative_eq!(masses.m[10], 0.5 * dm);
        assert_relative_eq!(masses.m[3], 0.5 * dm * r0 * r0);
        assert_relative_eq!(masses.total_mass(&dofs), 2. * dm);

        // Gravity acts on positions only
        assert_relative_eq!(masses.fg[6], -9.81 * dm);
        assert_eq!(masses.fg[4], 0.);
        assert_eq!(masses.fg[7], 0.);
    }
}
