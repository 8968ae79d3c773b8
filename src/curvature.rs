use faer::prelude::*;

use crate::frames::{node_position, Directors};
use crate::util::{cross_product_alloc, dot_product, normalize};

/// Discrete curvature binormal `2 (t0 × t1) / (1 + t0 · t1)` of two unit tangents.
///
/// Singular when the tangents are antiparallel (`1 + t0 · t1 → 0`).
pub fn curvature_binormal(t0: ColRef<f64>, t1: ColRef<f64>) -> Col<f64> {
    let chi = 1. + dot_product(t0, t1);
    let c = cross_product_alloc(t0, t1);
    Col::from_fn(3, |i| 2. * c[i] / chi)
}

/// Curvature `[kappa1, kappa2]` at `node1` from the material directors of the
/// edge before (`e`) and after (`f`) the node.
pub fn compute_kappa(
    node0: ColRef<f64>,
    node1: ColRef<f64>,
    node2: ColRef<f64>,
    m1e: ColRef<f64>,
    m2e: ColRef<f64>,
    m1f: ColRef<f64>,
    m2f: ColRef<f64>,
) -> [f64; 2] {
    let t0 = normalize(Col::<f64>::from_fn(3, |i| node1[i] - node0[i]).as_ref());
    let t1 = normalize(Col::<f64>::from_fn(3, |i| node2[i] - node1[i]).as_ref());
    let kb = curvature_binormal(t0.as_ref(), t1.as_ref());
    let kb = kb.as_ref();
    [
        0.5 * (dot_product(kb, m2e) + dot_product(kb, m2f)),
        -0.5 * (dot_product(kb, m1e) + dot_product(kb, m1f)),
    ]
}

/// Curvature at every node `[2][n_nodes]`; the end nodes are zero
pub fn get_kappa(q: ColRef<f64>, material: &Directors) -> Mat<f64> {
    let n_edges = material.n_edges();
    let mut kappa = Mat::<f64>::zeros(2, n_edges + 1);
    (1..n_edges).for_each(|i| {
        let [k1, k2] = compute_kappa(
            node_position(q, i - 1),
            node_position(q, i),
            node_position(q, i + 1),
            material.d1.col(i - 1),
            material.d2.col(i - 1),
            material.d1.col(i),
            material.d2.col(i),
        );
        kappa[(0, i)] = k1;
        kappa[(1, i)] = k2;
    });
    kappa
}
