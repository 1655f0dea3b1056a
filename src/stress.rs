use nalgebra::{SMatrix, SVector, Vector3};

/// Tolerance used by the compression cutoff ratio.
pub const CUTOFF_TOLERANCE: f64 = 1.0e-16;

pub fn tensor_to_mandel(tensor: SMatrix<f64, 3, 3>) -> SVector<f64, 6> {
    const SQRT: f64 = 1.4142135623730951;
    SVector::<f64, 6>::new(
        tensor.m11,
        tensor.m22,
        tensor.m33,
        SQRT * tensor.m23,
        SQRT * tensor.m13,
        SQRT * tensor.m12,
    )
}

pub fn mandel_to_tensor(mandel: SVector<f64, 6>) -> SMatrix<f64, 3, 3> {
    const FACTOR: f64 = 0.7071067811865475; // 1/sqrt(2)
    SMatrix::<f64, 3, 3>::new(
        mandel.x,
        FACTOR * mandel.b,
        FACTOR * mandel.a,
        FACTOR * mandel.b,
        mandel.y,
        FACTOR * mandel.w,
        FACTOR * mandel.a,
        FACTOR * mandel.w,
        mandel.z,
    )
}

/// Principal stresses of a symmetric stress tensor, sorted descending.
pub fn principal_stresses(tensor: &SMatrix<f64, 3, 3>) -> [f64; 3] {
    let eig = tensor.symmetric_eigen();
    let mut p = [eig.eigenvalues[0], eig.eigenvalues[1], eig.eigenvalues[2]];
    p.sort_by(|a, b| b.partial_cmp(a).unwrap());
    p
}

/// In-plane principal stresses of a 2x2 symmetric tensor, sorted descending.
pub fn principal_stresses_2d(tensor: &SMatrix<f64, 2, 2>) -> [f64; 2] {
    let mean = 0.5 * (tensor.m11 + tensor.m22);
    let radius = (0.25 * (tensor.m11 - tensor.m22).powi(2) + tensor.m12.powi(2)).sqrt();
    [mean + radius, mean - radius]
}

/// Compression cutoff: a state dominated by compression
/// (|sigma_min / sigma_max| > 3) carries no flaw risk and is zeroed.
pub fn compression_cutoff(p: &mut [f64]) {
    let pmax = p.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pmin = p.iter().cloned().fold(f64::INFINITY, f64::min);
    if (pmin / (pmax + CUTOFF_TOLERANCE)).abs() > 3.0 {
        p.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Clamp negative principal stresses to zero. Compressive directions never
/// contribute flaw risk, including through the resolved shear.
pub fn clamp_tensile(p: &mut [f64]) {
    p.iter_mut().for_each(|v| *v = v.max(0.0));
}

/// Resolve the traction acting on a facet with unit normal `n`: the normal
/// component `sigma_n = n . sigma . n` and the shear magnitude
/// `tau = |sigma . n - sigma_n n|`.
///
/// The shear is taken from the residual traction vector rather than from
/// `|t|^2 - sigma_n^2`, which cancels catastrophically when the traction is
/// nearly normal.
pub fn resolve_traction(tensor: &SMatrix<f64, 3, 3>, n: &Vector3<f64>) -> (f64, f64) {
    let t = tensor * n;
    let sigma_n = t.dot(n);
    let tau = (t - sigma_n * n).norm();
    (sigma_n, tau)
}

/// [`resolve_traction`] specialized to the principal frame, where the tensor
/// is diagonal. `d` holds the direction cosines of the facet normal. Also
/// covers the in-plane (2-D) case with `p[2] == 0` and `d.z == 0`.
pub fn principal_traction(p: &[f64; 3], d: &Vector3<f64>) -> (f64, f64) {
    let t = Vector3::new(p[0] * d.x, p[1] * d.y, p[2] * d.z);
    let sigma_n = t.dot(d);
    let tau = (t - sigma_n * d).norm();
    (sigma_n, tau)
}

/// An orthonormal basis for the plane orthogonal to the unit vector `n`.
pub fn tangent_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let e1 = n.cross(&helper).normalize();
    let e2 = n.cross(&e1);
    (e1, e2)
}

/// Project a stress tensor onto the plane orthogonal to the unit normal `n`,
/// expressed as a 2x2 tensor in the tangent basis of [`tangent_basis`].
///
/// At a free surface the out-of-plane traction is physically zero; projecting
/// discards whatever residual the solver left there.
pub fn project_in_plane(tensor: &SMatrix<f64, 3, 3>, n: &Vector3<f64>) -> SMatrix<f64, 2, 2> {
    let (e1, e2) = tangent_basis(n);
    let t1 = tensor * e1;
    let t2 = tensor * e2;
    SMatrix::<f64, 2, 2>::new(e1.dot(&t1), e1.dot(&t2), e2.dot(&t1), e2.dot(&t2))
}
