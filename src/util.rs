use faer::prelude::*;

//------------------------------------------------------------------------------
// Vector products
//------------------------------------------------------------------------------

/// Cross product of two 3-vectors written into `c`
#[inline]
pub fn cross_product(a: ColRef<f64>, b: ColRef<f64>, mut c: ColMut<f64>) {
    c[0] = a[1] * b[2] - a[2] * b[1];
    c[1] = a[2] * b[0] - a[0] * b[2];
    c[2] = a[0] * b[1] - a[1] * b[0];
}

#[inline]
pub fn cross_product_alloc(a: ColRef<f64>, b: ColRef<f64>) -> Col<f64> {
    let mut c = Col::<f64>::zeros(3);
    cross_product(a, b, c.as_mut());
    c
}

#[inline]
pub fn dot_product(a: ColRef<f64>, b: ColRef<f64>) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Outer product `a ⊗ b` of two vectors
#[inline]
pub fn outer_product(a: ColRef<f64>, b: ColRef<f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), b.nrows(), |i, j| a[i] * b[j])
}

/// Symmetric outer product `a ⊗ b + b ⊗ a`
#[inline]
pub fn sym_outer_product(a: ColRef<f64>, b: ColRef<f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), b.nrows(), |i, j| a[i] * b[j] + b[i] * a[j])
}

/// Skew-symmetric cross product matrix, `vec_tilde(a) * b == a × b`
pub fn vec_tilde(v: ColRef<f64>, mut m: MatMut<f64>) {
    // [0., -v[2], v[1]]
    // [v[2], 0., -v[0]]
    // [-v[1], v[0], 0.]
    m[(0, 0)] = 0.;
    m[(1, 0)] = v[2];
    m[(2, 0)] = -v[1];
    m[(0, 1)] = -v[2];
    m[(1, 1)] = 0.;
    m[(2, 1)] = v[0];
    m[(0, 2)] = v[1];
    m[(1, 2)] = -v[0];
    m[(2, 2)] = 0.;
}

pub fn vec_tilde_alloc(v: ColRef<f64>) -> Mat<f64> {
    let mut m = Mat::<f64>::zeros(3, 3);
    vec_tilde(v, m.as_mut());
    m
}

/// Returns `v / |v|`
#[inline]
pub fn normalize(v: ColRef<f64>) -> Col<f64> {
    let n = v.norm_l2();
    Col::from_fn(v.nrows(), |i| v[i] / n)
}

/// Removes the component of `v` along the unit vector `t` and normalizes the result
#[inline]
pub fn orthonormalize(v: ColRef<f64>, t: ColRef<f64>) -> Col<f64> {
    let vt = dot_product(v, t);
    let w = Col::<f64>::from_fn(3, |i| v[i] - vt * t[i]);
    normalize(w.as_ref())
}

//------------------------------------------------------------------------------
// Rotations
//------------------------------------------------------------------------------

/// Angle required to rotate `u` onto `v` about `axis`, in `(-π, π]`.
///
/// Magnitude `atan2(|u×v|, u·v)`, signed by `axis · (u×v)`.
pub fn signed_angle(u: ColRef<f64>, v: ColRef<f64>, axis: ColRef<f64>) -> f64 {
    let w = cross_product_alloc(u, v);
    let angle = w.norm_l2().atan2(dot_product(u, v));
    if dot_product(axis, w.as_ref()) < 0. {
        -angle
    } else {
        angle
    }
}

/// Rotates `v` about the unit vector `axis` by `theta` (Rodrigues formula).
///
/// A zero angle returns `v` unchanged bit for bit.
pub fn rotate_axis_angle(v: ColRef<f64>, axis: ColRef<f64>, theta: f64) -> Col<f64> {
    if theta == 0. {
        return v.to_owned();
    }
    let (s, c) = theta.sin_cos();
    let axv = cross_product_alloc(axis, v);
    let a_dot_v = dot_product(axis, v);
    Col::from_fn(3, |i| c * v[i] + s * axv[i] + a_dot_v * (1. - c) * axis[i])
}

/// Parallel transports `u` from unit tangent `t1` to unit tangent `t2`.
///
/// The component of `u` along `t1` maps onto `t2`, and the orthogonal part
/// is rotated about the shared binormal `t1 × t2`. The normalized binormal
/// is re-orthogonalized against `t1` and then `t2` before use.
///
/// # Degenerate tangents
///
/// When `t1 × t2` is exactly zero `u` is returned unchanged. This is exact
/// for parallel tangents and a first order approximation for tangents that
/// are nearly parallel. It is wrong for antiparallel tangents, where no
/// unique binormal exists; callers must keep per-step tangent rotations well
/// below 180°.
pub fn parallel_transport(u: ColRef<f64>, t1: ColRef<f64>, t2: ColRef<f64>) -> Col<f64> {
    let b = cross_product_alloc(t1, t2);
    if b.norm_l2() == 0. {
        return u.to_owned();
    }

    let b = normalize(b.as_ref());
    let b = orthonormalize(b.as_ref(), t1);
    let b = orthonormalize(b.as_ref(), t2);

    let n1 = cross_product_alloc(t1, b.as_ref());
    let n2 = cross_product_alloc(t2, b.as_ref());

    let (u_t1, u_n1, u_b) = (
        dot_product(u, t1),
        dot_product(u, n1.as_ref()),
        dot_product(u, b.as_ref()),
    );
    Col::from_fn(3, |i| u_t1 * t2[i] + u_n1 * n2[i] + u_b * b[i])
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------
