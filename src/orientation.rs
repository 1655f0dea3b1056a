use std::f64::consts::PI;
use std::sync::{Arc, OnceLock};

use nalgebra::Vector3;

use crate::stress::principal_traction;

/// Default polar / azimuthal resolution of the hemisphere grid.
pub const DEFAULT_NALPHA: usize = 61;
pub const DEFAULT_NBETA: usize = 121;
/// Default resolution of the in-plane semicircle grid.
pub const DEFAULT_NPSI: usize = 181;

static GLOBAL_HEMISPHERE: OnceLock<Arc<OrientationGrid>> = OnceLock::new();
static GLOBAL_SEMICIRCLE: OnceLock<Arc<OrientationGrid>> = OnceLock::new();

/// Fixed quadrature over crack-plane orientations.
///
/// Constructed once and reused across all stress states; directions and
/// weights never change after construction. A crack plane is identified by
/// its unit normal up to sign, so the volume domain is the upper hemisphere
/// (measure 2 pi) and the surface domain is the in-plane semicircle
/// (measure pi).
#[derive(Debug)]
pub struct OrientationGrid {
    directions: Vec<Vector3<f64>>,
    weights: Vec<f64>,
    total_weight: f64,
    measure: f64,
}

impl OrientationGrid {
    /// Product grid over the upper hemisphere: polar angle `alpha` uniform on
    /// `[0, pi/2]` (endpoints included), azimuth `beta` uniform on `[0, 2 pi)`
    /// (no duplicated endpoint), weight `sin(alpha) dalpha dbeta`.
    pub fn hemisphere(nalpha: usize, nbeta: usize) -> Self {
        assert!(nalpha >= 2, "hemisphere grid needs at least 2 polar points");
        assert!(nbeta >= 1);
        let dalpha = (PI / 2.0) / (nalpha - 1) as f64;
        let dbeta = (2.0 * PI) / nbeta as f64;

        let npts = nalpha * nbeta;
        let mut directions = Vec::with_capacity(npts);
        let mut weights = Vec::with_capacity(npts);
        for ia in 0..nalpha {
            let alpha = ia as f64 * dalpha;
            let (sin_a, cos_a) = alpha.sin_cos();
            let w = sin_a * dalpha * dbeta;
            for ib in 0..nbeta {
                let beta = ib as f64 * dbeta;
                let (sin_b, cos_b) = beta.sin_cos();
                directions.push(Vector3::new(cos_a, sin_a * cos_b, sin_a * sin_b));
                weights.push(w);
            }
        }
        let total_weight = weights.iter().sum();
        Self {
            directions,
            weights,
            total_weight,
            measure: 2.0 * PI,
        }
    }

    /// Midpoint grid over the in-plane semicircle `psi` in `[0, pi)`.
    /// Directions live in the canonical x-y plane and are interpreted in the
    /// principal (or tangent) basis of the surface stress state.
    pub fn semicircle(npsi: usize) -> Self {
        assert!(npsi >= 1);
        let dpsi = PI / npsi as f64;
        let mut directions = Vec::with_capacity(npsi);
        for k in 0..npsi {
            let psi = (k as f64 + 0.5) * dpsi;
            let (sin_p, cos_p) = psi.sin_cos();
            directions.push(Vector3::new(cos_p, sin_p, 0.0));
        }
        let weights = vec![dpsi; npsi];
        Self {
            directions,
            weights,
            total_weight: PI,
            measure: PI,
        }
    }

    /// Process-wide default hemisphere grid, built once on first use and
    /// shared read-only afterwards.
    pub fn global_hemisphere() -> Arc<OrientationGrid> {
        GLOBAL_HEMISPHERE
            .get_or_init(|| Arc::new(Self::hemisphere(DEFAULT_NALPHA, DEFAULT_NBETA)))
            .clone()
    }

    /// Process-wide default semicircle grid.
    pub fn global_semicircle() -> Arc<OrientationGrid> {
        GLOBAL_SEMICIRCLE
            .get_or_init(|| Arc::new(Self::semicircle(DEFAULT_NPSI)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of the quadrature weights; approximates [`Self::measure`].
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Measure of the underlying integration domain (2 pi or pi).
    pub fn measure(&self) -> f64 {
        self.measure
    }

    /// Weight-normalized average of a risk kernel over the grid, for a stress
    /// state given by its principal values. The kernel receives the facet
    /// normal (in the principal frame) and the resolved normal/shear
    /// components, and must be non-negative.
    pub fn average<F>(&self, principals: &[f64; 3], kernel: F) -> f64
    where
        F: Fn(&Vector3<f64>, f64, f64) -> f64,
    {
        let mut acc = 0.0;
        for (d, w) in self.directions.iter().zip(&self.weights) {
            let (sigma_n, tau) = principal_traction(principals, d);
            acc += w * kernel(d, sigma_n, tau);
        }
        acc / self.total_weight
    }
}
