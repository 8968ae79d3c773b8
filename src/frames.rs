use faer::prelude::*;
use itertools::izip;

use crate::util::{
    cross_product_alloc, normalize, orthonormalize, parallel_transport, rotate_axis_angle,
    signed_angle,
};

/// Pair of unit directors per edge, stored column-wise `[3][n_edges]`.
///
/// Used for both the reference frame `(a1, a2)` and the material frame
/// `(m1, m2)`. In both cases `d2 = t × d1` for the edge tangent `t`.
#[derive(Clone, Debug, PartialEq)]
pub struct Directors {
    pub d1: Mat<f64>,
    pub d2: Mat<f64>,
}

impl Directors {
    pub fn zeros(n_edges: usize) -> Self {
        Self {
            d1: Mat::zeros(3, n_edges),
            d2: Mat::zeros(3, n_edges),
        }
    }

    pub fn n_edges(&self) -> usize {
        self.d1.ncols()
    }
}

/// Position of node `i` within the DOF vector
#[inline]
pub fn node_position(q: ColRef<f64>, i: usize) -> ColRef<f64> {
    q.subrows(4 * i, 3)
}

/// Twist angle of every edge `[n_edges]`
pub fn twist_angles(q: ColRef<f64>) -> Col<f64> {
    let n_edges = (q.nrows() + 1) / 4 - 1;
    Col::from_fn(n_edges, |j| q[4 * j + 3])
}

/// Unit tangent of every edge `[3][n_edges]`.
///
/// Consecutive nodes must not coincide; a zero-length edge yields NaN.
pub fn compute_tangent(q: ColRef<f64>) -> Mat<f64> {
    let n_edges = (q.nrows() + 1) / 4 - 1;
    let mut tangents = Mat::<f64>::zeros(3, n_edges);
    tangents
        .col_iter_mut()
        .enumerate()
        .for_each(|(j, mut t)| {
            let x0 = node_position(q, j);
            let x1 = node_position(q, j + 1);
            let dx = Col::<f64>::from_fn(3, |i| x1[i] - x0[i]);
            t.copy_from(normalize(dx.as_ref()));
        });
    tangents
}

/// Default seed director for the first edge: `t0 × (0, 0, -1)`, or
/// `t0 × (0, 1, 0)` when the tangent is (nearly) vertical.
pub fn seed_director(t0: ColRef<f64>) -> Col<f64> {
    let d = cross_product_alloc(t0, col![0., 0., -1.].as_ref());
    if d.norm_l2() < 1e-6 {
        normalize(cross_product_alloc(t0, col![0., 1., 0.].as_ref()).as_ref())
    } else {
        normalize(d.as_ref())
    }
}

/// Builds the initial reference frame by transporting `seed` along the rod.
///
/// The seed is first made orthonormal to the first tangent. After each
/// transport the director is re-orthonormalized against the local tangent.
pub fn compute_space_parallel(seed: ColRef<f64>, q: ColRef<f64>) -> Directors {
    let tangents = compute_tangent(q);
    let mut frame = Directors::zeros(tangents.ncols());

    let mut d1 = orthonormalize(seed, tangents.col(0));
    let mut t_prev = tangents.col(0);
    izip!(
        tangents.col_iter(),
        frame.d1.col_iter_mut(),
        frame.d2.col_iter_mut()
    )
    .enumerate()
    .for_each(|(j, (t, mut a1, mut a2))| {
        if j > 0 {
            let d = parallel_transport(d1.as_ref(), t_prev, t);
            d1 = orthonormalize(d.as_ref(), t);
        }
        a1.copy_from(&d1);
        a2.copy_from(cross_product_alloc(t, d1.as_ref()));
        t_prev = t;
    });

    frame
}

/// Advances the reference frame in time by transporting each edge's
/// director from its tangent in `q_old` to its tangent in `q_new`.
pub fn compute_time_parallel(d1_old: MatRef<f64>, q_old: ColRef<f64>, q_new: ColRef<f64>) -> Directors {
    let tangents_old = compute_tangent(q_old);
    let tangents = compute_tangent(q_new);
    let mut frame = Directors::zeros(tangents.ncols());

    izip!(
        d1_old.col_iter(),
        tangents_old.col_iter(),
        tangents.col_iter(),
        frame.d1.col_iter_mut(),
        frame.d2.col_iter_mut()
    )
    .for_each(|(d1_old, t_old, t, mut a1, mut a2)| {
        let d = parallel_transport(d1_old, t_old, t);
        let d1 = orthonormalize(d.as_ref(), t);
        a2.copy_from(cross_product_alloc(t, d1.as_ref()));
        a1.copy_from(&d1);
    });

    frame
}

/// Rotates the reference frame about each tangent by the edge twist angle
pub fn compute_material_frame(reference: &Directors, theta: ColRef<f64>) -> Directors {
    let mut material = Directors::zeros(reference.n_edges());
    izip!(
        reference.d1.col_iter(),
        reference.d2.col_iter(),
        theta.iter(),
        material.d1.col_iter_mut(),
        material.d2.col_iter_mut()
    )
    .for_each(|(a1, a2, &theta, mut m1, mut m2)| {
        let (s, c) = theta.sin_cos();
        zip!(&mut m1, &mut m2, &a1, &a2).for_each(|unzip!(m1, m2, a1, a2)| {
            *m1 = c * *a1 + s * *a2;
            *m2 = -s * *a1 + c * *a2;
        });
    });
    material
}

/// Reference twist between two consecutive edges.
///
/// `u1` is transported from `t1` to `t2`, rotated about `t2` by the previous
/// value and compared against `u2`; the residual signed angle is added to
/// the previous value. Seeding with the last known value keeps the result
/// continuous in time instead of wrapping at ±π.
pub fn compute_reference_twist(
    u1: ColRef<f64>,
    u2: ColRef<f64>,
    t1: ColRef<f64>,
    t2: ColRef<f64>,
    previous: f64,
) -> f64 {
    let ut = parallel_transport(u1, t1, t2);
    let ut = rotate_axis_angle(ut.as_ref(), t2, previous);
    previous + signed_angle(ut.as_ref(), u2, t2)
}

/// Reference twist at every interior node `[n_nodes]`, seeded by `previous`.
/// The entries for the two end nodes are carried over unchanged.
pub fn get_ref_twist(d1: MatRef<f64>, tangents: MatRef<f64>, previous: ColRef<f64>) -> Col<f64> {
    let mut ref_twist = previous.to_owned();
    (1..d1.ncols()).for_each(|i| {
        ref_twist[i] = compute_reference_twist(
            d1.col(i - 1),
            d1.col(i),
            tangents.col(i - 1),
            tangents.col(i),
            previous[i],
        );
    });
    ref_twist
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use crate::util::dot_product;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// DOF vector for a list of node positions with zero twist
    fn dofs_from_nodes(nodes: &[[f64; 3]]) -> Col<f64> {
        let mut q = Col::<f64>::zeros(4 * nodes.len() - 1);
        nodes.iter().enumerate().for_each(|(i, x)| {
            q.subrows_mut(4 * i, 3).copy_from(col![x[0], x[1], x[2]]);
        });
        q
    }

    fn helix(n: usize) -> Col<f64> {
        let nodes = (0..n)
            .map(|i| {
                let s = i as f64 * 0.4;
                [s.cos(), s.sin(), 0.2 * s]
            })
            .collect::<Vec<_>>();
        dofs_from_nodes(&nodes)
    }

    fn assert_orthonormal(frame: &Directors, tangents: MatRef<f64>) {
        izip!(frame.d1.col_iter(), frame.d2.col_iter(), tangents.col_iter()).for_each(
            |(d1, d2, t)| {
                assert_relative_eq!(d1.norm_l2(), 1., epsilon = 1e-12);
                assert_relative_eq!(d2.norm_l2(), 1., epsilon = 1e-12);
                assert_relative_eq!(dot_product(d1, t), 0., epsilon = 1e-12);
                assert_relative_eq!(dot_product(d2, t), 0., epsilon = 1e-12);
                assert_relative_eq!(dot_product(d1, d2), 0., epsilon = 1e-12);
            },
        );
    }

    #[test]
    fn test_compute_tangent() {
        let q = dofs_from_nodes(&[[0., 0., 0.], [2., 0., 0.], [2., 3., 0.]]);
        let t = compute_tangent(q.as_ref());
        assert_eq!(t.ncols(), 2);
        assert_relative_eq!(t[(0, 0)], 1.);
        assert_relative_eq!(t[(1, 1)], 1.);
        assert_relative_eq!(t[(0, 1)], 0.);
    }

    #[test]
    fn test_seed_director() {
        let d = seed_director(col![1., 0., 0.].as_ref());
        assert_relative_eq!(d[1], 1.);

        // Vertical tangent falls back to the second axis
        let d = seed_director(col![0., 0., 1.].as_ref());
        assert_relative_eq!(d.norm_l2(), 1.);
        assert_relative_eq!(d[0], -1.);
    }

    #[test]
    fn test_space_parallel_orthonormal() {
        let q = helix(8);
        let tangents = compute_tangent(q.as_ref());
        let seed = seed_director(tangents.col(0));
        let frame = compute_space_parallel(seed.as_ref(), q.as_ref());
        assert_eq!(frame.n_edges(), 7);
        assert_orthonormal(&frame, tangents.as_ref());

        // Space parallel frame has zero reference twist
        let ref_twist = get_ref_twist(frame.d1.as_ref(), tangents.as_ref(), Col::zeros(8).as_ref());
        ref_twist
            .iter()
            .for_each(|&r| assert_relative_eq!(r, 0., epsilon = 1e-12));
    }

    #[test]
    fn test_time_parallel_unchanged_configuration() {
        let q = helix(6);
        let tangents = compute_tangent(q.as_ref());
        let frame = compute_space_parallel(seed_director(tangents.col(0)).as_ref(), q.as_ref());
        let next = compute_time_parallel(frame.d1.as_ref(), q.as_ref(), q.as_ref());
        izip!(frame.d1.col_iter(), next.d1.col_iter()).for_each(|(a, b)| {
            (0..3).for_each(|i| assert_relative_eq!(a[i], b[i], epsilon = 1e-14));
        });
    }

    #[test]
    fn test_time_parallel_follows_rotation() {
        let q0 = helix(6);
        let mut q1 = q0.clone();
        // Perturb one interior node
        q1[8] += 0.05;
        q1[10] -= 0.03;
        let tangents0 = compute_tangent(q0.as_ref());
        let tangents1 = compute_tangent(q1.as_ref());
        let frame0 = compute_space_parallel(seed_director(tangents0.col(0)).as_ref(), q0.as_ref());
        let frame1 = compute_time_parallel(frame0.d1.as_ref(), q0.as_ref(), q1.as_ref());
        assert_orthonormal(&frame1, tangents1.as_ref());
    }

    #[test]
    fn test_material_frame() {
        let reference = Directors {
            d1: mat![[1.], [0.], [0.]],
            d2: mat![[0.], [1.], [0.]],
        };
        let material = compute_material_frame(&reference, col![PI / 2.].as_ref());
        assert_relative_eq!(material.d1[(1, 0)], 1., epsilon = 1e-15);
        assert_relative_eq!(material.d1[(0, 0)], 0., epsilon = 1e-15);
        assert_relative_eq!(material.d2[(0, 0)], -1., epsilon = 1e-15);
    }

    #[test]
    fn test_reference_twist_accumulates() {
        // Second director twisted by 0.3 about a common tangent
        let t = col![0., 0., 1.];
        let u1 = col![1., 0., 0.];
        let u2 = rotate_axis_angle(u1.as_ref(), t.as_ref(), 0.3);
        let r = compute_reference_twist(u1.as_ref(), u2.as_ref(), t.as_ref(), t.as_ref(), 0.);
        assert_relative_eq!(r, 0.3, epsilon = 1e-14);

        // Seeding with a value one full turn away stays on that branch
        let r = compute_reference_twist(u1.as_ref(), u2.as_ref(), t.as_ref(), t.as_ref(), 2. * PI);
        assert_relative_eq!(r, 2. * PI + 0.3, epsilon = 1e-12);
    }
}
