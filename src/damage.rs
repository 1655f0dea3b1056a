use std::sync::Arc;

use nalgebra::{SMatrix, SVector, Vector3};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::error::{DamageError, Result};
use crate::material::{
    averaged_element_parameters, CeramicMaterial, ElementParameters, FlawPopulation,
};
use crate::orientation::OrientationGrid;
use crate::stress::{
    clamp_tensile, compression_cutoff, mandel_to_tensor, principal_stresses,
    principal_stresses_2d, principal_traction, project_in_plane,
};

const TOLERANCE: f64 = 1.0e-16;

/// Time history of element stresses and temperatures describing one load
/// cycle.
///
/// Stress is stored in Mandel convention,
/// `[s11, s22, s33, sqrt2*s23, sqrt2*s13, sqrt2*s12]`, shaped
/// `(ntime, nelem, 6)`; temperatures are `(ntime, nelem)`; the time axis is
/// strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressHistory {
    time: Array1<f64>,
    stress: Array3<f64>,
    temperature: Array2<f64>,
}

impl StressHistory {
    pub fn new(time: Array1<f64>, stress: Array3<f64>, temperature: Array2<f64>) -> Result<Self> {
        let (ntime, nelem, ncomp) = stress.dim();
        if time.len() != ntime {
            return Err(DamageError::shape(
                "time",
                format!("{ntime} (stress leading axis)"),
                time.len(),
            ));
        }
        if time.is_empty() {
            return Err(DamageError::shape("time", "at least 1 sample", 0));
        }
        if ncomp != 6 {
            return Err(DamageError::shape(
                "stress",
                "(ntime, nelem, 6) Mandel components",
                format!("(.., .., {ncomp})"),
            ));
        }
        if temperature.dim() != (ntime, nelem) {
            return Err(DamageError::shape(
                "temperature",
                format!("({ntime}, {nelem})"),
                format!("{:?}", temperature.dim()),
            ));
        }
        // normalize layout so the evaluation loops can take plain slices
        let time = time.as_standard_layout().into_owned();
        let stress = stress.as_standard_layout().into_owned();
        let temperature = temperature.as_standard_layout().into_owned();
        crate::interp::check_strictly_increasing("time", time.as_slice().unwrap())?;
        Ok(Self {
            time,
            stress,
            temperature,
        })
    }

    pub fn ntime(&self) -> usize {
        self.time.len()
    }

    pub fn nelem(&self) -> usize {
        self.stress.dim().1
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    pub fn stress(&self) -> ArrayView3<'_, f64> {
        self.stress.view()
    }

    pub fn temperature(&self) -> ArrayView2<'_, f64> {
        self.temperature.view()
    }

    /// Decode the stress tensor for one (time, element) sample.
    pub fn tensor_at(&self, t: usize, e: usize) -> SMatrix<f64, 3, 3> {
        let m = SVector::<f64, 6>::new(
            self.stress[[t, e, 0]],
            self.stress[[t, e, 1]],
            self.stress[[t, e, 2]],
            self.stress[[t, e, 3]],
            self.stress[[t, e, 4]],
            self.stress[[t, e, 5]],
        );
        mandel_to_tensor(m)
    }
}

/// One exposed facet of a surface element: outward unit normal and facet
/// area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceFacet {
    pub normal: Vector3<f64>,
    pub area: f64,
}

/// Surface-flaw geometry for an element population: per element, the list of
/// exposed facets. Elements with no facets are not surface-flaw candidates.
///
/// Normals must be unit length; zero-length or badly scaled normals are a
/// [`DamageError::DegenerateGeometry`], never silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    facets: Vec<Vec<SurfaceFacet>>,
}

impl SurfaceGeometry {
    pub fn new(facets: Vec<Vec<SurfaceFacet>>) -> Result<Self> {
        for (e, elem) in facets.iter().enumerate() {
            for facet in elem {
                let norm = facet.normal.norm();
                if (norm - 1.0).abs() > 1.0e-6 {
                    return Err(DamageError::DegenerateGeometry(format!(
                        "element {e}: facet normal has length {norm}, expected unit"
                    )));
                }
                if !(facet.area >= 0.0) {
                    return Err(DamageError::DegenerateGeometry(format!(
                        "element {e}: facet area {} is negative",
                        facet.area
                    )));
                }
            }
        }
        Ok(Self { facets })
    }

    /// Interior-only geometry: no element carries surface flaws.
    pub fn none(nelem: usize) -> Self {
        Self {
            facets: vec![Vec::new(); nelem],
        }
    }

    pub fn nelem(&self) -> usize {
        self.facets.len()
    }

    pub fn facets(&self, e: usize) -> &[SurfaceFacet] {
        &self.facets[e]
    }

    pub fn is_surface(&self, e: usize) -> bool {
        !self.facets[e].is_empty()
    }

    pub fn total_area(&self) -> f64 {
        self.facets
            .iter()
            .flat_map(|f| f.iter().map(|facet| facet.area))
            .sum()
    }
}

/// Evaluation options shared by all damage models.
#[derive(Clone)]
pub struct ModelOptions {
    /// Zero out compression-dominated principal states
    /// (`|sigma_min / sigma_max| > 3`).
    pub cares_cutoff: bool,
    /// Normalize the crack density against the full mixed-mode kernel; when
    /// false the normal-stress-only closed form `2m + 1` is used instead.
    pub shear_sensitive: bool,
    /// Quadrature over volume crack orientations.
    pub hemisphere: Arc<OrientationGrid>,
    /// Quadrature over in-plane surface crack orientations.
    pub semicircle: Arc<OrientationGrid>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            cares_cutoff: true,
            shear_sensitive: true,
            hemisphere: OrientationGrid::global_hemisphere(),
            semicircle: OrientationGrid::global_semicircle(),
        }
    }
}

impl std::fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelOptions")
            .field("cares_cutoff", &self.cares_cutoff)
            .field("shear_sensitive", &self.shear_sensitive)
            .field("hemisphere", &self.hemisphere.len())
            .field("semicircle", &self.semicircle.len())
            .finish()
    }
}

/// A statistical flaw failure model.
///
/// Both operations return one log-reliability per element, `<= 0`, cumulative
/// over `target_time` worth of load cycles described by the history. Surface
/// and volume flaw populations are independent failure modes; the caller
/// combines them.
pub trait DamageModel: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether the variant has a volume-flaw kernel. Callers may consult this
    /// to skip the volume path; asking anyway fails with
    /// [`DamageError::UnsupportedEvaluation`].
    fn supports_volume(&self) -> bool {
        true
    }

    fn calculate_surface_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        surface: &SurfaceGeometry,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>>;

    fn calculate_volume_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        volumes: &Array1<f64>,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>>;
}

/// Closed enumeration of the implemented model variants. Unknown names fail
/// with [`DamageError::UnknownFormatTag`] via [`model_from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
pub enum ModelKind {
    #[strum(serialize = "pia")]
    Pia,
    #[strum(serialize = "cse_griffith")]
    CseGriffithFlaw,
    #[strum(serialize = "smm_griffith")]
    SmmGriffithFlaw,
    #[strum(serialize = "smm_semi_circular")]
    SmmSemiCircularCrack,
}

impl ModelKind {
    pub fn build(self, options: ModelOptions) -> Box<dyn DamageModel> {
        match self {
            ModelKind::Pia => Box::new(PIAModel::new(options)),
            ModelKind::CseGriffithFlaw => Box::new(CSEModelGriffithFlaw::new(options)),
            ModelKind::SmmGriffithFlaw => Box::new(SMMModelGriffithFlaw::new(options)),
            ModelKind::SmmSemiCircularCrack => Box::new(SMMModelSemiCircularCrack::new(options)),
        }
    }
}

/// Build a model from its registry name.
pub fn model_from_name(name: &str, options: ModelOptions) -> Result<Box<dyn DamageModel>> {
    let kind: ModelKind = name
        .parse()
        .map_err(|_| DamageError::UnknownFormatTag(name.to_string()))?;
    Ok(kind.build(options))
}

/// Collapse one load cycle of (equivalent) stress into the stress level that,
/// held statically, produces the same failure risk over `target_time`.
///
/// Slow-crack-growth convention: with `s_max` the cycle peak and
/// `g = trapz((s/s_max)^N, time) / time_last` the normalized cycle average,
/// the collapsed stress is
/// `(s_max^N g target_time / B + s_max^(N-2))^(1/(N-2))`.
///
/// Static path: a single-sample history (or one ending at time zero) skips
/// the transform and uses the peak directly, so a one-shot evaluation at the
/// sole sample reduces to the time-independent Weibull result.
fn cycle_collapsed_stress(
    series: &[f64],
    time: &[f64],
    target_time: f64,
    params: &ElementParameters,
) -> f64 {
    let s_max = series.iter().cloned().fold(0.0_f64, f64::max);
    if s_max <= 0.0 {
        return 0.0;
    }
    let t_last = *time.last().unwrap();
    if time.len() < 2 || t_last <= 0.0 {
        return s_max;
    }
    let mut g = 0.0;
    for i in 1..time.len() {
        let f0 = (series[i - 1] / (s_max + TOLERANCE)).powf(params.n);
        let f1 = (series[i] / (s_max + TOLERANCE)).powf(params.n);
        g += 0.5 * (f0 + f1) * (time[i] - time[i - 1]);
    }
    g /= t_last;

    (s_max.powf(params.n) * g * target_time / params.b + s_max.powf(params.n - 2.0))
        .powf(1.0 / (params.n - 2.0))
}

/// The cyclic path needs `N > 2`; reject the evaluation up front instead of
/// producing NaN inside the transform.
fn check_cyclic_exponents(history: &StressHistory, params: &[ElementParameters]) -> Result<()> {
    let t_last = history.time[history.ntime() - 1];
    if history.ntime() < 2 || t_last <= 0.0 {
        return Ok(());
    }
    if params.iter().any(|p| p.n <= 2.0) {
        return Err(DamageError::InvalidParameter {
            name: "N",
            reason: "cyclic evaluation requires fatigue exponent N > 2".into(),
        });
    }
    Ok(())
}

fn check_volumes(nelem: usize, volumes: &Array1<f64>) -> Result<()> {
    if volumes.len() != nelem {
        return Err(DamageError::shape("volumes", nelem, volumes.len()));
    }
    for (e, &v) in volumes.iter().enumerate() {
        if !(v >= 0.0) {
            return Err(DamageError::DegenerateGeometry(format!(
                "element {e}: volume {v} is negative"
            )));
        }
    }
    Ok(())
}

fn check_surface(nelem: usize, surface: &SurfaceGeometry) -> Result<()> {
    if surface.nelem() != nelem {
        return Err(DamageError::shape("surface geometry", nelem, surface.nelem()));
    }
    Ok(())
}

/// Principal-stress time series for one element, with the tensile clamp and
/// the optional compression cutoff applied per sample.
fn principal_series(
    history: &StressHistory,
    e: usize,
    cares_cutoff: bool,
    out: &mut Vec<[f64; 3]>,
) {
    out.clear();
    for t in 0..history.ntime() {
        let tensor = history.tensor_at(t, e);
        let mut p = principal_stresses(&tensor);
        if cares_cutoff {
            compression_cutoff(&mut p);
        }
        clamp_tensile(&mut p);
        out.push(p);
    }
}

/// In-plane principal series on one facet, same clamping conventions in 2-D.
fn in_plane_principal_series(
    history: &StressHistory,
    e: usize,
    normal: &Vector3<f64>,
    cares_cutoff: bool,
    out: &mut Vec<[f64; 2]>,
) {
    out.clear();
    for t in 0..history.ntime() {
        let tensor = history.tensor_at(t, e);
        let plane = project_in_plane(&tensor, normal);
        let mut p = principal_stresses_2d(&plane);
        if cares_cutoff {
            compression_cutoff(&mut p);
        }
        clamp_tensile(&mut p);
        out.push(p);
    }
}

/// Reconcile per-element short-circuiting with the degenerate-total check: a
/// zero total weight combined with any positive risk is reported, not masked.
fn check_degenerate_total(total_weight: f64, risks: &[f64], what: &'static str) -> Result<()> {
    if total_weight <= 0.0 && risks.iter().any(|&r| r > 0.0) {
        return Err(DamageError::DegenerateGeometry(format!(
            "total {what} is zero but elements carry non-zero failure risk"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PIA
// ---------------------------------------------------------------------------

/// Principle of independent action: the principal stresses act as independent
/// uniaxial loads, `risk = sum_i max(sigma_i, 0)^m / s0^m`. No orientation
/// averaging.
#[derive(Debug, Default)]
pub struct PIAModel {
    options: ModelOptions,
}

impl PIAModel {
    pub fn new(options: ModelOptions) -> Self {
        Self { options }
    }
}

impl DamageModel for PIAModel {
    fn name(&self) -> &'static str {
        "PIAModel"
    }

    fn calculate_volume_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        volumes: &Array1<f64>,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>> {
        let nelem = history.nelem();
        check_volumes(nelem, volumes)?;
        let params =
            averaged_element_parameters(material, FlawPopulation::Volume, history.temperature())?;
        check_cyclic_exponents(history, &params)?;
        debug!(model = self.name(), nelem, ntime = history.ntime(), "volume flaw evaluation");

        let time = history.time.as_slice().unwrap();
        let cutoff = self.options.cares_cutoff;
        let per_elem: Vec<(f64, f64)> = (0..nelem)
            .into_par_iter()
            .map(|e| {
                let p = &params[e];
                let mut pseries = Vec::new();
                principal_series(history, e, cutoff, &mut pseries);
                let mut series = vec![0.0; history.ntime()];
                let mut risk = 0.0;
                for j in 0..3 {
                    for (t, pt) in pseries.iter().enumerate() {
                        series[t] = pt[j];
                    }
                    let s0c = cycle_collapsed_stress(&series, time, target_time, p);
                    risk += ((s0c - p.su).max(0.0) / p.s0).powf(p.m);
                }
                (risk, -risk * volumes[e])
            })
            .collect();

        let risks: Vec<f64> = per_elem.iter().map(|r| r.0).collect();
        check_degenerate_total(volumes.sum(), &risks, "volume")?;
        Ok(Array1::from_iter(per_elem.iter().map(|r| r.1)))
    }

    fn calculate_surface_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        surface: &SurfaceGeometry,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>> {
        let nelem = history.nelem();
        check_surface(nelem, surface)?;
        let params =
            averaged_element_parameters(material, FlawPopulation::Surface, history.temperature())?;
        check_cyclic_exponents(history, &params)?;
        debug!(model = self.name(), nelem, ntime = history.ntime(), "surface flaw evaluation");

        let time = history.time.as_slice().unwrap();
        let cutoff = self.options.cares_cutoff;
        let per_elem: Vec<(f64, f64)> = (0..nelem)
            .into_par_iter()
            .map(|e| {
                let p = &params[e];
                let mut pseries = Vec::new();
                let mut series = vec![0.0; history.ntime()];
                let mut risk = 0.0;
                let mut log_rel = 0.0;
                for facet in surface.facets(e) {
                    in_plane_principal_series(history, e, &facet.normal, cutoff, &mut pseries);
                    let mut facet_risk = 0.0;
                    for j in 0..2 {
                        for (t, pt) in pseries.iter().enumerate() {
                            series[t] = pt[j];
                        }
                        let s0c = cycle_collapsed_stress(&series, time, target_time, p);
                        facet_risk += ((s0c - p.su).max(0.0) / p.s0).powf(p.m);
                    }
                    risk += facet_risk;
                    log_rel -= facet_risk * facet.area;
                }
                (risk, log_rel)
            })
            .collect();

        let risks: Vec<f64> = per_elem.iter().map(|r| r.0).collect();
        check_degenerate_total(surface.total_area(), &risks, "surface area")?;
        Ok(Array1::from_iter(per_elem.iter().map(|r| r.1)))
    }
}

// ---------------------------------------------------------------------------
// Orientation-averaged (Batdorf) models
// ---------------------------------------------------------------------------

/// Mixed-mode equivalent stress acting on a crack of a particular shape.
pub trait EquivalentStressKernel: Send + Sync + Default + 'static + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn equivalent_stress(&self, sigma_n: f64, tau: f64, c_bar: f64, nu: f64) -> f64;

    /// Whether the crack geometry has a volume-flaw analogue.
    fn supports_volume(&self) -> bool {
        true
    }
}

/// Coplanar strain energy release rate criterion, Griffith crack.
#[derive(Debug, Default, Clone, Copy)]
pub struct CSEGriffithFlaw;

impl EquivalentStressKernel for CSEGriffithFlaw {
    fn name(&self) -> &'static str {
        "CSEModelGriffithFlaw"
    }

    fn equivalent_stress(&self, sigma_n: f64, tau: f64, _c_bar: f64, _nu: f64) -> f64 {
        (sigma_n * sigma_n + tau * tau).sqrt()
    }
}

/// Shetty mixed-mode criterion, Griffith crack.
#[derive(Debug, Default, Clone, Copy)]
pub struct SMMGriffithFlaw;

impl EquivalentStressKernel for SMMGriffithFlaw {
    fn name(&self) -> &'static str {
        "SMMModelGriffithFlaw"
    }

    fn equivalent_stress(&self, sigma_n: f64, tau: f64, c_bar: f64, _nu: f64) -> f64 {
        0.5 * (sigma_n + (sigma_n * sigma_n + (2.0 * tau / c_bar).powi(2)).sqrt())
    }
}

/// Shetty mixed-mode criterion, semicircular surface crack. The shear term
/// carries the half-penny mode-II/mode-I coefficient ratio `4 / (2 - nu)`;
/// there is no volume-flaw analogue for this crack geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SMMSemiCircularCrack;

impl EquivalentStressKernel for SMMSemiCircularCrack {
    fn name(&self) -> &'static str {
        "SMMModelSemiCircularCrack"
    }

    fn equivalent_stress(&self, sigma_n: f64, tau: f64, c_bar: f64, nu: f64) -> f64 {
        0.5 * (sigma_n + (sigma_n * sigma_n + (4.0 * tau / (c_bar * (2.0 - nu))).powi(2)).sqrt())
    }

    fn supports_volume(&self) -> bool {
        false
    }
}

/// Shared scaffolding for the crack-shape-dependent models: resolve the
/// principal stresses onto every quadrature orientation, collapse each
/// orientation's cycle, average the resulting risk over the grid and scale by
/// the Batdorf crack-density normalization.
#[derive(Debug, Default)]
pub struct OrientationAveragedModel<K: EquivalentStressKernel> {
    kernel: K,
    options: ModelOptions,
}

pub type CSEModelGriffithFlaw = OrientationAveragedModel<CSEGriffithFlaw>;
pub type SMMModelGriffithFlaw = OrientationAveragedModel<SMMGriffithFlaw>;
pub type SMMModelSemiCircularCrack = OrientationAveragedModel<SMMSemiCircularCrack>;

impl<K: EquivalentStressKernel> OrientationAveragedModel<K> {
    pub fn new(options: ModelOptions) -> Self {
        Self {
            kernel: K::default(),
            options,
        }
    }

    /// Normalized crack-density coefficient: the reciprocal of the
    /// orientation-averaged kernel response to a unit uniaxial tension, so
    /// that uniform uniaxial tension reproduces the uniaxial Weibull risk.
    fn kbar(&self, grid: &OrientationGrid, m: f64, c_bar: f64, nu: f64) -> f64 {
        if self.options.shear_sensitive {
            let avg = grid.average(&[1.0, 0.0, 0.0], |_, sn, tau| {
                self.kernel
                    .equivalent_stress(sn.max(0.0), tau, c_bar, nu)
                    .powf(m)
            });
            1.0 / avg
        } else {
            2.0 * m + 1.0
        }
    }

    /// Orientation-averaged risk for one element from its principal series.
    /// `pseries` rows are padded to 3 components (third is zero for the
    /// in-plane case).
    fn element_risk(
        &self,
        grid: &OrientationGrid,
        pseries: &[[f64; 3]],
        series: &mut [f64],
        time: &[f64],
        target_time: f64,
        p: &ElementParameters,
        c_bar: f64,
        nu: f64,
    ) -> f64 {
        let mut acc = 0.0;
        for (d, w) in grid.directions().iter().zip(grid.weights()) {
            for (t, pt) in pseries.iter().enumerate() {
                let (sigma_n, tau) = principal_traction(pt, d);
                series[t] = self.kernel.equivalent_stress(sigma_n, tau, c_bar, nu);
            }
            let s0c = cycle_collapsed_stress(series, time, target_time, p);
            acc += w * ((s0c - p.su).max(0.0) / p.s0).powf(p.m);
        }
        let avg = acc / grid.total_weight();
        self.kbar(grid, p.m, c_bar, nu) * avg
    }
}

impl<K: EquivalentStressKernel> DamageModel for OrientationAveragedModel<K> {
    fn name(&self) -> &'static str {
        self.kernel.name()
    }

    fn supports_volume(&self) -> bool {
        self.kernel.supports_volume()
    }

    fn calculate_volume_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        volumes: &Array1<f64>,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>> {
        if !self.kernel.supports_volume() {
            return Err(DamageError::UnsupportedEvaluation {
                model: self.kernel.name(),
                operation: "volume flaw evaluation",
            });
        }
        let nelem = history.nelem();
        check_volumes(nelem, volumes)?;
        let params =
            averaged_element_parameters(material, FlawPopulation::Volume, history.temperature())?;
        check_cyclic_exponents(history, &params)?;
        debug!(model = self.name(), nelem, ntime = history.ntime(), "volume flaw evaluation");

        let time = history.time.as_slice().unwrap();
        let grid = self.options.hemisphere.clone();
        let (c_bar, nu) = (material.c_bar(), material.nu());
        let cutoff = self.options.cares_cutoff;

        let per_elem: Vec<(f64, f64)> = (0..nelem)
            .into_par_iter()
            .map(|e| {
                let p = &params[e];
                let mut pseries = Vec::new();
                principal_series(history, e, cutoff, &mut pseries);
                let mut series = vec![0.0; history.ntime()];
                let risk = self.element_risk(
                    &grid,
                    &pseries,
                    &mut series,
                    time,
                    target_time,
                    p,
                    c_bar,
                    nu,
                );
                (risk, -risk * volumes[e])
            })
            .collect();

        let risks: Vec<f64> = per_elem.iter().map(|r| r.0).collect();
        check_degenerate_total(volumes.sum(), &risks, "volume")?;
        Ok(Array1::from_iter(per_elem.iter().map(|r| r.1)))
    }

    fn calculate_surface_flaw_element_log_reliability(
        &self,
        history: &StressHistory,
        surface: &SurfaceGeometry,
        material: &CeramicMaterial,
        target_time: f64,
    ) -> Result<Array1<f64>> {
        let nelem = history.nelem();
        check_surface(nelem, surface)?;
        let params =
            averaged_element_parameters(material, FlawPopulation::Surface, history.temperature())?;
        check_cyclic_exponents(history, &params)?;
        debug!(model = self.name(), nelem, ntime = history.ntime(), "surface flaw evaluation");

        let time = history.time.as_slice().unwrap();
        let grid = self.options.semicircle.clone();
        let (c_bar, nu) = (material.c_bar(), material.nu());
        let cutoff = self.options.cares_cutoff;

        let per_elem: Vec<(f64, f64)> = (0..nelem)
            .into_par_iter()
            .map(|e| {
                let p = &params[e];
                let mut pseries2 = Vec::new();
                let mut pseries = Vec::new();
                let mut series = vec![0.0; history.ntime()];
                let mut risk = 0.0;
                let mut log_rel = 0.0;
                for facet in surface.facets(e) {
                    in_plane_principal_series(history, e, &facet.normal, cutoff, &mut pseries2);
                    pseries.clear();
                    pseries.extend(pseries2.iter().map(|p2| [p2[0], p2[1], 0.0]));
                    let facet_risk = self.element_risk(
                        &grid,
                        &pseries,
                        &mut series,
                        time,
                        target_time,
                        p,
                        c_bar,
                        nu,
                    );
                    risk += facet_risk;
                    log_rel -= facet_risk * facet.area;
                }
                (risk, log_rel)
            })
            .collect();

        let risks: Vec<f64> = per_elem.iter().map(|r| r.0).collect();
        check_degenerate_total(surface.total_area(), &risks, "surface area")?;
        Ok(Array1::from_iter(per_elem.iter().map(|r| r.1)))
    }
}
