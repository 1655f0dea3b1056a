use std::f64::consts::PI;
use std::path::Path;

use nalgebra::Vector3;
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::bcs::{PressureBC, ThermalBC};
use crate::damage::{SurfaceFacet, SurfaceGeometry};
use crate::error::{DamageError, Result};

fn isclose(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1.0e-8 + 1.0e-5 * b.abs()
}

fn allclose(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| isclose(*x, *y))
}

/// Spring stiffness connecting panels to the structure or tubes to the
/// manifold. A closed set of kinds; the legacy float-or-magic-string encoding
/// is not reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Stiffness {
    Rigid,
    Disconnect,
    Spring(f64),
}

impl Stiffness {
    pub fn close(&self, other: &Stiffness) -> bool {
        match (self, other) {
            (Stiffness::Rigid, Stiffness::Rigid) => true,
            (Stiffness::Disconnect, Stiffness::Disconnect) => true,
            (Stiffness::Spring(a), Stiffness::Spring(b)) => isclose(*a, *b),
            _ => false,
        }
    }
}

/// Determine the next numeric string name based on the existing names.
fn next_name<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let max = names.filter_map(|n| n.parse::<i64>().ok()).max();
    match max {
        Some(m) => (m + 1).to_string(),
        None => "0".to_string(),
    }
}

/// Flow path metadata: panel ordering plus mass flow and inlet temperature
/// histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPath {
    pub panels: Vec<String>,
    pub times: Array1<f64>,
    pub mass_flow: Array1<f64>,
    pub inlet_temp: Array1<f64>,
}

/// Basic definition of the tubular receiver: a collection of panels linked
/// by an elastic stiffness, plus the daily cycle period and the number of
/// days represented in the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub period: f64,
    pub days: usize,
    pub stiffness: Stiffness,
    panels: Vec<(String, Panel)>,
    flowpaths: Vec<(String, FlowPath)>,
}

impl Receiver {
    pub fn new(period: f64, days: usize, stiffness: Stiffness) -> Self {
        Self {
            period,
            days,
            stiffness,
            panels: Vec::new(),
            flowpaths: Vec::new(),
        }
    }

    /// Service life horizon implied by the stored metadata.
    pub fn service_life(&self) -> f64 {
        self.days as f64 * self.period
    }

    /// Add a panel, optionally named; unnamed panels follow the sequential
    /// numeric scheme.
    pub fn add_panel(&mut self, panel: Panel, name: Option<&str>) -> String {
        let name = match name {
            Some(n) => n.to_string(),
            None => next_name(self.panels.iter().map(|(n, _)| n.as_str())),
        };
        self.panels.push((name.clone(), panel));
        name
    }

    pub fn add_flowpath(
        &mut self,
        panels_in_path: Vec<String>,
        times: Array1<f64>,
        mass_flow: Array1<f64>,
        inlet_temp: Array1<f64>,
        name: Option<&str>,
    ) -> Result<String> {
        for n in &panels_in_path {
            if self.panel(n).is_none() {
                return Err(DamageError::MissingField(format!(
                    "panel {n} does not exist in the receiver"
                )));
            }
        }
        let name = match name {
            Some(n) => n.to_string(),
            None => next_name(self.flowpaths.iter().map(|(n, _)| n.as_str())),
        };
        self.flowpaths.push((
            name.clone(),
            FlowPath {
                panels: panels_in_path,
                times,
                mass_flow,
                inlet_temp,
            },
        ));
        Ok(name)
    }

    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn panels(&self) -> impl Iterator<Item = (&str, &Panel)> {
        self.panels.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn flowpaths(&self) -> impl Iterator<Item = (&str, &FlowPath)> {
        self.flowpaths.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn npanels(&self) -> usize {
        self.panels.len()
    }

    /// Iterator over all tubes in all panels, with their panel/tube names.
    pub fn tubes(&self) -> impl Iterator<Item = (&str, &str, &Tube)> {
        self.panels.iter().flat_map(|(pname, panel)| {
            panel
                .tubes()
                .map(move |(tname, tube)| (pname.as_str(), tname, tube))
        })
    }

    pub fn ntubes(&self) -> usize {
        self.tubes().count()
    }

    /// Approximate structural equality, used by round-trip tests.
    pub fn close(&self, other: &Receiver) -> bool {
        if !(isclose(self.period, other.period)
            && self.days == other.days
            && self.stiffness.close(&other.stiffness)
            && self.panels.len() == other.panels.len())
        {
            return false;
        }
        for (name, panel) in &self.panels {
            match other.panel(name) {
                Some(o) => {
                    if !panel.close(o) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    pub fn save_json<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load_json<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_json(std::io::BufWriter::new(std::fs::File::create(path)?))
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_json(std::io::BufReader::new(std::fs::File::open(path)?))
    }
}

/// A panel: a collection of tubes linked by a manifold stiffness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub stiffness: Stiffness,
    tubes: Vec<(String, Tube)>,
}

impl Panel {
    pub fn new(stiffness: Stiffness) -> Self {
        Self {
            stiffness,
            tubes: Vec::new(),
        }
    }

    pub fn add_tube(&mut self, tube: Tube, name: Option<&str>) -> String {
        let name = match name {
            Some(n) => n.to_string(),
            None => next_name(self.tubes.iter().map(|(n, _)| n.as_str())),
        };
        self.tubes.push((name.clone(), tube));
        name
    }

    pub fn tube(&self, name: &str) -> Option<&Tube> {
        self.tubes.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn tubes(&self) -> impl Iterator<Item = (&str, &Tube)> {
        self.tubes.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn ntubes(&self) -> usize {
        self.tubes.len()
    }

    /// Number of physical tubes represented, accounting for multipliers.
    pub fn ntubes_actual(&self) -> usize {
        self.tubes.iter().map(|(_, t)| t.multiplier).sum()
    }

    pub fn close(&self, other: &Panel) -> bool {
        if !(self.stiffness.close(&other.stiffness) && self.tubes.len() == other.tubes.len()) {
            return false;
        }
        for (name, tube) in &self.tubes {
            match other.tube(name) {
                Some(o) => {
                    if !tube.close(o) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// Geometry, boundary conditions, and results for a single tube.
///
/// The tube is a regular polar grid: `nr` radial points between
/// `r - t` and `r`, `nt` circumferential increments over `[0, 2 pi)`, and
/// `nz` axial points over `[0, h]`. Element fields are stored flattened in
/// `(r, theta, z)` row-major order with `(nr-1) * nt * (nz-1)` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tube {
    pub r: f64,
    pub t: f64,
    pub h: f64,
    pub nr: usize,
    pub nt: usize,
    pub nz: usize,
    pub t0: f64,
    pub multiplier: usize,
    times: Array1<f64>,
    results: Vec<(String, Array2<f64>)>,
    quadrature_results: Vec<(String, Array3<f64>)>,
    outer_bc: Option<ThermalBC>,
    inner_bc: Option<ThermalBC>,
    pressure_bc: Option<PressureBC>,
}

impl Tube {
    pub fn new(
        outer_radius: f64,
        thickness: f64,
        height: f64,
        nr: usize,
        nt: usize,
        nz: usize,
    ) -> Result<Self> {
        if !(outer_radius > 0.0 && thickness > 0.0 && thickness < outer_radius && height > 0.0) {
            return Err(DamageError::InvalidParameter {
                name: "tube geometry",
                reason: format!("r = {outer_radius}, t = {thickness}, h = {height}"),
            });
        }
        if nr < 2 || nt < 1 || nz < 2 {
            return Err(DamageError::InvalidParameter {
                name: "tube discretization",
                reason: format!("nr = {nr}, nt = {nt}, nz = {nz}"),
            });
        }
        Ok(Self {
            r: outer_radius,
            t: thickness,
            h: height,
            nr,
            nt,
            nz,
            t0: 0.0,
            multiplier: 1,
            times: Array1::zeros(0),
            results: Vec::new(),
            quadrature_results: Vec::new(),
            outer_bc: None,
            inner_bc: None,
            pressure_bc: None,
        })
    }

    pub fn with_multiplier(mut self, multiplier: usize) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn nelem(&self) -> usize {
        (self.nr - 1) * self.nt * (self.nz - 1)
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Set the times at which result data is provided; existing results must
    /// stay compatible.
    pub fn set_times(&mut self, times: Array1<f64>) -> Result<()> {
        let n = times.len();
        let ok = self.results.iter().all(|(_, a)| a.dim().0 == n)
            && self.quadrature_results.iter().all(|(_, a)| a.dim().0 == n);
        if !ok {
            return Err(DamageError::shape(
                "times",
                "length compatible with stored results",
                n,
            ));
        }
        self.times = times;
        Ok(())
    }

    /// Add a per-element scalar result field, shaped `(ntime, nelem)`.
    pub fn add_results(&mut self, name: &str, data: Array2<f64>) -> Result<()> {
        if data.dim() != (self.ntime(), self.nelem()) {
            return Err(DamageError::shape(
                "result field",
                format!("({}, {})", self.ntime(), self.nelem()),
                format!("{:?}", data.dim()),
            ));
        }
        self.results.retain(|(n, _)| n != name);
        self.results.push((name.to_string(), data));
        Ok(())
    }

    pub fn result(&self, name: &str) -> Option<&Array2<f64>> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Add a per-element vector result field, shaped `(ntime, nelem, k)`.
    pub fn add_quadrature_results(&mut self, name: &str, data: Array3<f64>) -> Result<()> {
        let (ntime, nelem, _) = data.dim();
        if (ntime, nelem) != (self.ntime(), self.nelem()) {
            return Err(DamageError::shape(
                "quadrature result field",
                format!("({}, {}, ..)", self.ntime(), self.nelem()),
                format!("{:?}", data.dim()),
            ));
        }
        self.quadrature_results.retain(|(n, _)| n != name);
        self.quadrature_results.push((name.to_string(), data));
        Ok(())
    }

    pub fn quadrature_result(&self, name: &str) -> Option<&Array3<f64>> {
        self.quadrature_results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Set the inner or outer thermal BC, checking consistency with the tube
    /// geometry.
    pub fn set_bc(&mut self, bc: ThermalBC, loc: &str) -> Result<()> {
        match loc {
            "inner" => {
                if !isclose(bc.radius(), self.r - self.t) || !isclose(bc.height(), self.h) {
                    return Err(DamageError::InvalidParameter {
                        name: "inner_bc",
                        reason: "BC radius/height must match the inner tube surface".into(),
                    });
                }
                self.inner_bc = Some(bc);
            }
            "outer" => {
                if !isclose(bc.radius(), self.r) || !isclose(bc.height(), self.h) {
                    return Err(DamageError::InvalidParameter {
                        name: "outer_bc",
                        reason: "BC radius/height must match the outer tube surface".into(),
                    });
                }
                self.outer_bc = Some(bc);
            }
            other => {
                return Err(DamageError::InvalidParameter {
                    name: "bc location",
                    reason: format!("must be inner or outer, got {other}"),
                })
            }
        }
        Ok(())
    }

    pub fn inner_bc(&self) -> Option<&ThermalBC> {
        self.inner_bc.as_ref()
    }

    pub fn outer_bc(&self) -> Option<&ThermalBC> {
        self.outer_bc.as_ref()
    }

    pub fn set_pressure_bc(&mut self, bc: PressureBC) {
        self.pressure_bc = Some(bc);
    }

    pub fn pressure_bc(&self) -> Option<&PressureBC> {
        self.pressure_bc.as_ref()
    }

    fn radial_grid(&self) -> Vec<f64> {
        let dr = self.t / (self.nr - 1) as f64;
        (0..self.nr).map(|i| self.r - self.t + i as f64 * dr).collect()
    }

    /// Element volumes on the polar grid. The cross section of each element
    /// is the trapezoid spanned by the chords at the two radii.
    pub fn element_volumes(&self) -> Array1<f64> {
        let r = self.radial_grid();
        let dtheta = 2.0 * PI / self.nt as f64;
        let dz = self.h / (self.nz - 1) as f64;
        let half = (dtheta / 2.0).sin();

        let mut out = Vec::with_capacity(self.nelem());
        for ir in 0..self.nr - 1 {
            let a = 2.0 * r[ir] * half;
            let b = 2.0 * r[ir + 1] * half;
            let edge = r[ir + 1] - r[ir];
            let height = (edge * edge - ((b - a) / 2.0).powi(2)).sqrt();
            let base = 0.5 * (a + b) * height;
            for _it in 0..self.nt {
                for _iz in 0..self.nz - 1 {
                    out.push(base * dz);
                }
            }
        }
        Array1::from_vec(out)
    }

    /// Exposed area per element: inner- and outer-wall elements carry the arc
    /// patch of their surface, interior elements zero.
    pub fn element_surface_areas(&self) -> Array1<f64> {
        let r = self.radial_grid();
        let dtheta = 2.0 * PI / self.nt as f64;
        let dz = self.h / (self.nz - 1) as f64;

        // with nr == 2 both walls land on the same element ring and the
        // contributions accumulate
        let mut out = vec![0.0; self.nelem()];
        let ring = self.nt * (self.nz - 1);
        for i in 0..ring {
            out[i] += dtheta * r[0] * dz;
            out[(self.nr - 2) * ring + i] += dtheta * r[self.nr - 1] * dz;
        }
        Array1::from_vec(out)
    }

    /// Surface-flaw geometry: inner-wall elements get the inward radial
    /// normal, outer-wall elements the outward one, evaluated at the element
    /// centroid angle; interior elements carry no facets.
    pub fn surface_elements(&self) -> Result<SurfaceGeometry> {
        let r = self.radial_grid();
        let dtheta = 2.0 * PI / self.nt as f64;
        let dz = self.h / (self.nz - 1) as f64;

        let mut facets = vec![Vec::new(); self.nelem()];
        let ring = self.nt * (self.nz - 1);
        for it in 0..self.nt {
            let theta = (it as f64 + 0.5) * dtheta;
            let normal = Vector3::new(theta.cos(), theta.sin(), 0.0);
            for iz in 0..self.nz - 1 {
                let i = it * (self.nz - 1) + iz;
                facets[i].push(SurfaceFacet {
                    normal: -normal,
                    area: dtheta * r[0] * dz,
                });
                facets[(self.nr - 2) * ring + i].push(SurfaceFacet {
                    normal,
                    area: dtheta * r[self.nr - 1] * dz,
                });
            }
        }
        SurfaceGeometry::new(facets)
    }

    pub fn close(&self, other: &Tube) -> bool {
        let base = isclose(self.r, other.r)
            && isclose(self.t, other.t)
            && isclose(self.h, other.h)
            && self.nr == other.nr
            && self.nt == other.nt
            && self.nz == other.nz
            && isclose(self.t0, other.t0)
            && self.multiplier == other.multiplier
            && allclose(
                self.times.as_slice().unwrap(),
                other.times.as_slice().unwrap(),
            );
        if !base {
            return false;
        }
        for (name, data) in &self.results {
            match other.result(name) {
                Some(o) => {
                    if !allclose(data.as_slice().unwrap(), o.as_slice().unwrap()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        for (name, data) in &self.quadrature_results {
            match other.quadrature_result(name) {
                Some(o) => {
                    if !allclose(data.as_slice().unwrap(), o.as_slice().unwrap()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        for (mine, theirs) in [
            (&self.outer_bc, &other.outer_bc),
            (&self.inner_bc, &other.inner_bc),
        ] {
            match (mine, theirs) {
                (Some(a), Some(b)) => {
                    if !a.close(b) {
                        return false;
                    }
                }
                (None, None) => {}
                _ => return false,
            }
        }
        match (&self.pressure_bc, &other.pressure_bc) {
            (Some(a), Some(b)) => a.close(b),
            (None, None) => true,
            _ => false,
        }
    }
}
