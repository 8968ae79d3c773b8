use faer::prelude::*;

use crate::curvature::curvature_binormal;
use crate::util::{
    cross_product_alloc, dot_product, normalize, outer_product, sym_outer_product,
    vec_tilde_alloc,
};

//------------------------------------------------------------------------------
// Hinge geometry
//------------------------------------------------------------------------------

/// Geometry of the edges `e = x1 - x0` and `f = x2 - x1` meeting at an interior node
pub struct Hinge {
    pub te: Col<f64>,
    pub tf: Col<f64>,
    pub norm_e: f64,
    pub norm_f: f64,
    /// `1 + te · tf`, vanishes for antiparallel edges
    pub chi: f64,
    /// Curvature binormal
    pub kb: Col<f64>,
    /// `(te + tf) / chi`
    pub tilde_t: Col<f64>,
}

impl Hinge {
    pub fn new(node0: ColRef<f64>, node1: ColRef<f64>, node2: ColRef<f64>) -> Self {
        let ee = Col::<f64>::from_fn(3, |i| node1[i] - node0[i]);
        let ef = Col::<f64>::from_fn(3, |i| node2[i] - node1[i]);
        let te = normalize(ee.as_ref());
        let tf = normalize(ef.as_ref());
        let chi = 1. + dot_product(te.as_ref(), tf.as_ref());
        let kb = curvature_binormal(te.as_ref(), tf.as_ref());
        let tilde_t = (1. / chi) * (&te + &tf);
        Self {
            norm_e: ee.norm_l2(),
            norm_f: ef.norm_l2(),
            te,
            tf,
            chi,
            kb,
            tilde_t,
        }
    }
}

/// Writes derivatives with respect to the edge vectors `e` and `f` into the
/// position slots (0, 4, 8) of an 11-entry hinge gradient.
fn expand_edge_gradient(mut g: ColMut<f64>, de: &Col<f64>, df: &Col<f64>) {
    (0..3).for_each(|i| {
        g[i] = -de[i];
        g[4 + i] = de[i] - df[i];
        g[8 + i] = df[i];
    });
}

/// Writes second derivatives with respect to the edge vectors into the
/// position blocks of an 11x11 hinge Hessian. `de_df` holds `∂²/∂e∂f`.
fn expand_edge_hessian(mut h: MatMut<f64>, de2: &Mat<f64>, df2: &Mat<f64>, de_df: &Mat<f64>) {
    let df_de = de_df.transpose().to_owned();
    let blocks = [
        (0, 0, de2.clone()),
        (0, 4, de_df - de2),
        (0, 8, -1. * de_df),
        (4, 0, &df_de - de2),
        (4, 4, de2 - de_df - &df_de + df2),
        (4, 8, de_df - df2),
        (8, 0, -1. * &df_de),
        (8, 4, &df_de - df2),
        (8, 8, df2.clone()),
    ];
    blocks.iter().for_each(|(r, c, block)| {
        h.as_mut().submatrix_mut(*r, *c, 3, 3).copy_from(block);
    });
}

/// Writes the mixed derivatives between the position DOFs and the twist
/// angle at local index `k` (3 or 7), keeping the Hessian symmetric.
fn expand_twist_coupling(mut h: MatMut<f64>, k: usize, de_dtheta: &Col<f64>, df_dtheta: &Col<f64>) {
    (0..3).for_each(|i| {
        [
            (i, -de_dtheta[i]),
            (4 + i, de_dtheta[i] - df_dtheta[i]),
            (8 + i, df_dtheta[i]),
        ]
        .into_iter()
        .for_each(|(row, v)| {
            h[(row, k)] = v;
            h[(k, row)] = v;
        });
    });
}

//------------------------------------------------------------------------------
// Stretching
//------------------------------------------------------------------------------

/// Axial strain `|x1 - x0| / l_k - 1` of an edge
#[inline]
pub fn axial_strain(node0: ColRef<f64>, node1: ColRef<f64>, l_k: f64) -> f64 {
    let edge = Col::<f64>::from_fn(3, |i| node1[i] - node0[i]);
    edge.norm_l2() / l_k - 1.
}

/// Stretching energy `½ EA ε² l_k` of one edge
pub fn stretch_energy(node0: ColRef<f64>, node1: ColRef<f64>, l_k: f64, ea: f64) -> f64 {
    let eps = axial_strain(node0, node1, l_k);
    0.5 * ea * eps * eps * l_k
}

/// Gradient `[6]` and Hessian `[6][6]` of the stretching energy of the edge
/// from `node0` to `node1` with respect to both node positions.
pub fn grad_hess_stretch(
    node0: ColRef<f64>,
    node1: ColRef<f64>,
    l_k: f64,
    ea: f64,
) -> (Col<f64>, Mat<f64>) {
    let edge = Col::<f64>::from_fn(3, |i| node1[i] - node0[i]);
    let edge_len = edge.norm_l2();
    let tangent = (1. / edge_len) * &edge;
    let eps = edge_len / l_k - 1.;

    let mut grad = Col::<f64>::zeros(6);
    (0..3).for_each(|i| {
        grad[i] = -ea * eps * tangent[i];
        grad[3 + i] = ea * eps * tangent[i];
    });

    // M = EA [(1/l_k - 1/|e|) I + t⊗t / |e|]
    let m = Mat::<f64>::from_fn(3, 3, |i, j| {
        let diag = if i == j { 1. / l_k - 1. / edge_len } else { 0. };
        ea * (diag + tangent[i] * tangent[j] / edge_len)
    });

    let hess = Mat::<f64>::from_fn(6, 6, |i, j| {
        let sign = if (i < 3) == (j < 3) { 1. } else { -1. };
        sign * m[(i % 3, j % 3)]
    });

    (grad, hess)
}

//------------------------------------------------------------------------------
// Bending
//------------------------------------------------------------------------------

/// First and second derivatives of one curvature component.
///
/// `sign` is +1 for `kappa1` (projected on the averaged `m2`) and -1 for
/// `kappa2` (projected on the averaged `m1`). `tilde_d` is the averaged
/// director the component is measured against, `m_e`/`m_f` the matching
/// edge directors, and `p_e`/`p_f` the conjugate directors whose
/// projection gives the twist-angle derivatives.
#[allow(clippy::too_many_arguments)]
fn curvature_grad_hess(
    hinge: &Hinge,
    kappa: f64,
    sign: f64,
    tilde_d: &Col<f64>,
    m_e: ColRef<f64>,
    m_f: ColRef<f64>,
    p_e: ColRef<f64>,
    p_f: ColRef<f64>,
) -> (Col<f64>, Mat<f64>) {
    let Hinge {
        te,
        tf,
        norm_e,
        norm_f,
        chi,
        kb,
        tilde_t,
    } = hinge;
    let (norm_e, norm_f, chi) = (*norm_e, *norm_f, *chi);
    let norm2_e = norm_e * norm_e;
    let norm2_f = norm_f * norm_f;
    let id3 = Mat::<f64>::identity(3, 3);

    let tf_c_d = cross_product_alloc(tf.as_ref(), tilde_d.as_ref());
    let te_c_d = cross_product_alloc(te.as_ref(), tilde_d.as_ref());

    //--------------------------------------------------------------------------
    // Gradient
    //--------------------------------------------------------------------------

    let dk_de = (1. / norm_e) * (-kappa * tilde_t + sign * &tf_c_d);
    let dk_df = (1. / norm_f) * (-kappa * tilde_t - sign * &te_c_d);

    let mut grad = Col::<f64>::zeros(11);
    expand_edge_gradient(grad.as_mut(), &dk_de, &dk_df);
    grad[3] = -0.5 * dot_product(kb.as_ref(), p_e);
    grad[7] = -0.5 * dot_product(kb.as_ref(), p_f);

    //--------------------------------------------------------------------------
    // Hessian
    //--------------------------------------------------------------------------

    let tt_o_tt = outer_product(tilde_t.as_ref(), tilde_t.as_ref());
    let te_o_te = outer_product(te.as_ref(), te.as_ref());
    let tf_o_tf = outer_product(tf.as_ref(), tf.as_ref());
    let te_o_tf = outer_product(te.as_ref(), tf.as_ref());

    let d2k_de2 = (1. / norm2_e)
        * (2. * kappa * &tt_o_tt - sign * sym_outer_product(tf_c_d.as_ref(), tilde_t.as_ref()))
        - (kappa / (chi * norm2_e)) * (&id3 - &te_o_te)
        + (sign / (4. * norm2_e)) * sym_outer_product(kb.as_ref(), m_e);

    let d2k_df2 = (1. / norm2_f)
        * (2. * kappa * &tt_o_tt + sign * sym_outer_product(te_c_d.as_ref(), tilde_t.as_ref()))
        - (kappa / (chi * norm2_f)) * (&id3 - &tf_o_tf)
        + (sign / (4. * norm2_f)) * sym_outer_product(kb.as_ref(), m_f);

    let d2k_de_df = -(kappa / (chi * norm_e * norm_f)) * (&id3 + &te_o_tf)
        + (1. / (norm_e * norm_f))
            * (2. * kappa * &tt_o_tt
                - sign * outer_product(tf_c_d.as_ref(), tilde_t.as_ref())
                + sign * outer_product(tilde_t.as_ref(), te_c_d.as_ref())
                - sign * vec_tilde_alloc(tilde_d.as_ref()));

    let mut hess = Mat::<f64>::zeros(11, 11);
    expand_edge_hessian(hess.as_mut(), &d2k_de2, &d2k_df2, &d2k_de_df);

    hess[(3, 3)] = -0.5 * sign * dot_product(kb.as_ref(), m_e);
    hess[(7, 7)] = -0.5 * sign * dot_product(kb.as_ref(), m_f);

    [(3, p_e), (7, p_f)].into_iter().for_each(|(k, p)| {
        let kb_p = 0.5 * dot_product(kb.as_ref(), p);
        let de_dtheta = (1. / norm_e)
            * (kb_p * tilde_t - (1. / chi) * cross_product_alloc(tf.as_ref(), p));
        let df_dtheta = (1. / norm_f)
            * (kb_p * tilde_t + (1. / chi) * cross_product_alloc(te.as_ref(), p));
        expand_twist_coupling(hess.as_mut(), k, &de_dtheta, &df_dtheta);
    });

    (grad, hess)
}

/// Bending energy `½ Σ EIi / l_k (κi - κ̄i)²` at one interior node
pub fn bend_energy(kappa: [f64; 2], kappa_bar: [f64; 2], l_k: f64, ei1: f64, ei2: Option<f64>) -> f64 {
    let ei2 = ei2.unwrap_or(ei1);
    let dk1 = kappa[0] - kappa_bar[0];
    let dk2 = kappa[1] - kappa_bar[1];
    0.5 * (ei1 * dk1 * dk1 + ei2 * dk2 * dk2) / l_k
}

/// Gradient `[11]` and Hessian `[11][11]` of the bending energy at `node1`.
///
/// Local DOF order is `x0, θe, x1, θf, x2`, where `e` is the edge ending and
/// `f` the edge starting at `node1`. `m1e, m2e` and `m1f, m2f` are the
/// material directors of those edges. When `ei2` is `None` the cross section
/// is isotropic and `ei1` is used for both directions.
#[allow(clippy::too_many_arguments)]
pub fn grad_hess_bend(
    node0: ColRef<f64>,
    node1: ColRef<f64>,
    node2: ColRef<f64>,
    m1e: ColRef<f64>,
    m2e: ColRef<f64>,
    m1f: ColRef<f64>,
    m2f: ColRef<f64>,
    kappa_bar: [f64; 2],
    l_k: f64,
    ei1: f64,
    ei2: Option<f64>,
) -> (Col<f64>, Mat<f64>) {
    let ei2 = ei2.unwrap_or(ei1);
    let hinge = Hinge::new(node0, node1, node2);
    let kb = hinge.kb.as_ref();

    let tilde_d1 = (1. / hinge.chi) * (m1e + m1f);
    let tilde_d2 = (1. / hinge.chi) * (m2e + m2f);

    let kappa1 = 0.5 * (dot_product(kb, m2e) + dot_product(kb, m2f));
    let kappa2 = -0.5 * (dot_product(kb, m1e) + dot_product(kb, m1f));

    let (grad1, hess1) = curvature_grad_hess(&hinge, kappa1, 1., &tilde_d2, m2e, m2f, m1e, m1f);
    let (grad2, hess2) = curvature_grad_hess(&hinge, kappa2, -1., &tilde_d1, m1e, m1f, m2e, m2f);

    // dE/dκi and d²E/dκi²
    let de_dk1 = ei1 / l_k * (kappa1 - kappa_bar[0]);
    let de_dk2 = ei2 / l_k * (kappa2 - kappa_bar[1]);
    let d2e_dk11 = ei1 / l_k;
    let d2e_dk22 = ei2 / l_k;

    let grad = de_dk1 * &grad1 + de_dk2 * &grad2;
    let hess = de_dk1 * &hess1
        + de_dk2 * &hess2
        + d2e_dk11 * outer_product(grad1.as_ref(), grad1.as_ref())
        + d2e_dk22 * outer_product(grad2.as_ref(), grad2.as_ref());

    (grad, hess)
}

//------------------------------------------------------------------------------
// Twisting
//------------------------------------------------------------------------------

/// Integrated twist `θf - θe + refTwist - twistBar` at one interior node
#[inline]
pub fn integrated_twist(theta_e: f64, theta_f: f64, ref_twist: f64, twist_bar: f64) -> f64 {
    theta_f - theta_e + ref_twist - twist_bar
}

/// Twisting energy `½ GJ / l_k τ²` at one interior node
pub fn twist_energy(tau: f64, l_k: f64, gj: f64) -> f64 {
    0.5 * gj * tau * tau / l_k
}

/// Gradient `[11]` and Hessian `[11][11]` of the twisting energy at `node1`,
/// with the same local DOF order as [`grad_hess_bend`].
#[allow(clippy::too_many_arguments)]
pub fn grad_hess_twist(
    node0: ColRef<f64>,
    node1: ColRef<f64>,
    node2: ColRef<f64>,
    theta_e: f64,
    theta_f: f64,
    ref_twist: f64,
    twist_bar: f64,
    l_k: f64,
    gj: f64,
) -> (Col<f64>, Mat<f64>) {
    let hinge = Hinge::new(node0, node1, node2);
    let Hinge {
        te,
        tf,
        norm_e,
        norm_f,
        chi,
        kb,
        tilde_t,
    } = &hinge;
    let (norm_e, norm_f, chi) = (*norm_e, *norm_f, *chi);

    // Gradient of the twist
    let dtau_de = (0.5 / norm_e) * kb;
    let dtau_df = (0.5 / norm_f) * kb;
    let mut grad_tau = Col::<f64>::zeros(11);
    expand_edge_gradient(grad_tau.as_mut(), &dtau_de, &dtau_df);
    grad_tau[3] = -1.;
    grad_tau[7] = 1.;

    // Hessian of the twist; zero in the twist angles
    let te_plus_tt = te + tilde_t;
    let tf_plus_tt = tf + tilde_t;
    let d2tau_de2 = (-0.25 / (norm_e * norm_e)) * sym_outer_product(kb.as_ref(), te_plus_tt.as_ref());
    let d2tau_df2 = (-0.25 / (norm_f * norm_f)) * sym_outer_product(kb.as_ref(), tf_plus_tt.as_ref());
    let d2tau_de_df = (0.5 / (norm_e * norm_f))
        * ((2. / chi) * vec_tilde_alloc(te.as_ref()) - outer_product(kb.as_ref(), tilde_t.as_ref()));

    let mut hess_tau = Mat::<f64>::zeros(11, 11);
    expand_edge_hessian(hess_tau.as_mut(), &d2tau_de2, &d2tau_df2, &d2tau_de_df);

    let tau = integrated_twist(theta_e, theta_f, ref_twist, twist_bar);
    let de_dtau = gj / l_k * tau;
    let d2e_dtau2 = gj / l_k;

    let grad = de_dtau * &grad_tau;
    let hess = de_dtau * &hess_tau + d2e_dtau2 * outer_product(grad_tau.as_ref(), grad_tau.as_ref());

    (grad, hess)
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------
