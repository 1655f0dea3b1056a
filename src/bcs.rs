use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{DamageError, Result};

fn allclose(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= 1.0e-8 + 1.0e-5 * y.abs())
}

/// Bracketing indices and blend factor for a query on an increasing grid,
/// clamped to the grid range.
fn bracket(grid: &[f64], x: f64) -> (usize, usize, f64) {
    let n = grid.len();
    if n == 1 {
        return (0, 0, 0.0);
    }
    let i = grid.partition_point(|&g| g <= x).clamp(1, n - 1);
    let (x0, x1) = (grid[i - 1], grid[i]);
    let frac = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
    (i - 1, i, frac)
}

/// Same for a uniform grid described by its start, step and point count.
fn bracket_uniform(x0: f64, dx: f64, n: usize, x: f64) -> (usize, usize, f64) {
    if n == 1 {
        return (0, 0, 0.0);
    }
    let fr = ((x - x0) / dx).clamp(0.0, (n - 1) as f64);
    let i0 = (fr.floor() as usize).min(n - 2);
    (i0, i0 + 1, (fr - i0 as f64).clamp(0.0, 1.0))
}

/// Tube internal pressure, constant in space, varying over the load cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureBC {
    times: Array1<f64>,
    data: Array1<f64>,
}

impl PressureBC {
    pub fn new(times: Array1<f64>, data: Array1<f64>) -> Result<Self> {
        if times.len() != data.len() {
            return Err(DamageError::shape("pressure data", times.len(), data.len()));
        }
        crate::interp::check_strictly_increasing("pressure times", times.as_slice().unwrap())?;
        Ok(Self { times, data })
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    /// Pressure at a time, clamped to the cycle endpoints.
    pub fn pressure(&self, t: f64) -> f64 {
        let (i0, i1, f) = bracket(self.times.as_slice().unwrap(), t);
        self.data[i0] * (1.0 - f) + self.data[i1] * f
    }

    pub fn close(&self, other: &PressureBC) -> bool {
        allclose(self.times.as_slice().unwrap(), other.times.as_slice().unwrap())
            && allclose(self.data.as_slice().unwrap(), other.data.as_slice().unwrap())
    }
}

/// Net heat flux over a tube surface, given on a regular (theta, z) grid at
/// fixed times. The radius is not used in evaluating the BC but checks
/// consistency against the tube it is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatFluxBC {
    pub r: f64,
    pub h: f64,
    pub nt: usize,
    pub nz: usize,
    times: Array1<f64>,
    data: Array3<f64>,
}

/// Fixed surface temperature on the same grid layout as [`HeatFluxBC`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedTempBC {
    pub r: f64,
    pub h: f64,
    pub nt: usize,
    pub nz: usize,
    times: Array1<f64>,
    data: Array3<f64>,
}

fn check_surface_grid(
    name: &'static str,
    times: &Array1<f64>,
    data: &Array3<f64>,
    nt: usize,
    nz: usize,
) -> Result<()> {
    if data.dim() != (times.len(), nt, nz) {
        return Err(DamageError::shape(
            name,
            format!("({}, {nt}, {nz})", times.len()),
            format!("{:?}", data.dim()),
        ));
    }
    crate::interp::check_strictly_increasing(name, times.as_slice().unwrap())
}

/// Trilinear lookup on the (times, theta, z) grid shared by the surface BCs.
/// Queries clamp to the grid; theta is laid out on `[0, 2 pi)` without the
/// duplicated endpoint.
fn surface_lookup(
    times: &Array1<f64>,
    data: &Array3<f64>,
    h: f64,
    nt: usize,
    nz: usize,
    t: f64,
    theta: f64,
    z: f64,
) -> f64 {
    let dtheta = 2.0 * std::f64::consts::PI / nt as f64;
    let dz = if nz > 1 { h / (nz - 1) as f64 } else { h };
    let (t0, t1, ft) = bracket(times.as_slice().unwrap(), t);
    let (a0, a1, fa) = bracket_uniform(0.0, dtheta, nt, theta);
    let (z0, z1, fz) = bracket_uniform(0.0, dz, nz, z);

    let mut acc = 0.0;
    for (ti, wt) in [(t0, 1.0 - ft), (t1, ft)] {
        for (ai, wa) in [(a0, 1.0 - fa), (a1, fa)] {
            for (zi, wz) in [(z0, 1.0 - fz), (z1, fz)] {
                acc += wt * wa * wz * data[[ti, ai, zi]];
            }
        }
    }
    acc
}

impl HeatFluxBC {
    pub fn new(
        radius: f64,
        height: f64,
        nt: usize,
        nz: usize,
        times: Array1<f64>,
        data: Array3<f64>,
    ) -> Result<Self> {
        check_surface_grid("heat flux data", &times, &data, nt, nz)?;
        Ok(Self {
            r: radius,
            h: height,
            nt,
            nz,
            times,
            data,
        })
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    /// Flux as a function of time, angle, and height.
    pub fn flux(&self, t: f64, theta: f64, z: f64) -> f64 {
        surface_lookup(&self.times, &self.data, self.h, self.nt, self.nz, t, theta, z)
    }

    pub fn close(&self, other: &Self) -> bool {
        (self.r - other.r).abs() < 1.0e-8
            && (self.h - other.h).abs() < 1.0e-8
            && self.nt == other.nt
            && self.nz == other.nz
            && allclose(self.times.as_slice().unwrap(), other.times.as_slice().unwrap())
            && allclose(
                self.data.as_slice().unwrap(),
                other.data.as_slice().unwrap(),
            )
    }
}

impl FixedTempBC {
    pub fn new(
        radius: f64,
        height: f64,
        nt: usize,
        nz: usize,
        times: Array1<f64>,
        data: Array3<f64>,
    ) -> Result<Self> {
        check_surface_grid("fixed temperature data", &times, &data, nt, nz)?;
        Ok(Self {
            r: radius,
            h: height,
            nt,
            nz,
            times,
            data,
        })
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    /// Temperature at a given time and position.
    pub fn temperature(&self, t: f64, theta: f64, z: f64) -> f64 {
        surface_lookup(&self.times, &self.data, self.h, self.nt, self.nz, t, theta, z)
    }

    pub fn close(&self, other: &Self) -> bool {
        (self.r - other.r).abs() < 1.0e-8
            && (self.h - other.h).abs() < 1.0e-8
            && self.nt == other.nt
            && self.nz == other.nz
            && allclose(self.times.as_slice().unwrap(), other.times.as_slice().unwrap())
            && allclose(
                self.data.as_slice().unwrap(),
                other.data.as_slice().unwrap(),
            )
    }
}

/// Convective condition defined by an axial fluid temperature history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvectiveBC {
    pub r: f64,
    pub h: f64,
    pub nz: usize,
    times: Array1<f64>,
    data: Array2<f64>,
}

impl ConvectiveBC {
    pub fn new(
        radius: f64,
        height: f64,
        nz: usize,
        times: Array1<f64>,
        data: Array2<f64>,
    ) -> Result<Self> {
        if data.dim() != (times.len(), nz) {
            return Err(DamageError::shape(
                "fluid temperature data",
                format!("({}, {nz})", times.len()),
                format!("{:?}", data.dim()),
            ));
        }
        crate::interp::check_strictly_increasing("convective times", times.as_slice().unwrap())?;
        Ok(Self {
            r: radius,
            h: height,
            nz,
            times,
            data,
        })
    }

    pub fn ntime(&self) -> usize {
        self.times.len()
    }

    /// Fluid temperature at a given time and height.
    pub fn fluid_temperature(&self, t: f64, z: f64) -> f64 {
        let dz = if self.nz > 1 {
            self.h / (self.nz - 1) as f64
        } else {
            self.h
        };
        let (t0, t1, ft) = bracket(self.times.as_slice().unwrap(), t);
        let (z0, z1, fz) = bracket_uniform(0.0, dz, self.nz, z);
        let mut acc = 0.0;
        for (ti, wt) in [(t0, 1.0 - ft), (t1, ft)] {
            for (zi, wz) in [(z0, 1.0 - fz), (z1, fz)] {
                acc += wt * wz * self.data[[ti, zi]];
            }
        }
        acc
    }

    pub fn close(&self, other: &Self) -> bool {
        (self.r - other.r).abs() < 1.0e-8
            && (self.h - other.h).abs() < 1.0e-8
            && self.nz == other.nz
            && allclose(self.times.as_slice().unwrap(), other.times.as_slice().unwrap())
            && allclose(
                self.data.as_slice().unwrap(),
                other.data.as_slice().unwrap(),
            )
    }
}

/// Convective condition on the tube inner surface with the film coefficient
/// supplied directly, constant over the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmCoefficientBC {
    pub r: f64,
    pub h: f64,
    pub nz: usize,
    fluid_temperature: Array1<f64>,
    film: Array1<f64>,
}

impl FilmCoefficientBC {
    pub fn new(
        radius: f64,
        height: f64,
        nz: usize,
        fluid_temperature: Array1<f64>,
        film: Array1<f64>,
    ) -> Result<Self> {
        if fluid_temperature.len() != nz || film.len() != nz {
            return Err(DamageError::shape(
                "film coefficient data",
                format!("({nz},)"),
                format!("({}, {})", fluid_temperature.len(), film.len()),
            ));
        }
        Ok(Self {
            r: radius,
            h: height,
            nz,
            fluid_temperature,
            film,
        })
    }

    fn axial(&self, values: &Array1<f64>, z: f64) -> f64 {
        let dz = if self.nz > 1 {
            self.h / (self.nz - 1) as f64
        } else {
            self.h
        };
        let (z0, z1, fz) = bracket_uniform(0.0, dz, self.nz, z);
        values[z0] * (1.0 - fz) + values[z1] * fz
    }

    pub fn fluid_temperature(&self, _t: f64, z: f64) -> f64 {
        self.axial(&self.fluid_temperature, z)
    }

    pub fn film_coefficient(&self, _t: f64, z: f64) -> f64 {
        self.axial(&self.film, z)
    }

    pub fn close(&self, other: &Self) -> bool {
        (self.r - other.r).abs() < 1.0e-8
            && (self.h - other.h).abs() < 1.0e-8
            && self.nz == other.nz
            && allclose(
                self.fluid_temperature.as_slice().unwrap(),
                other.fluid_temperature.as_slice().unwrap(),
            )
            && allclose(self.film.as_slice().unwrap(), other.film.as_slice().unwrap())
    }
}

/// Closed enumeration of thermal boundary conditions. The serialized form
/// carries the discriminating `type` tag; unknown tags fail with
/// [`DamageError::UnknownFormatTag`] through [`ThermalBC::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThermalBC {
    HeatFlux(HeatFluxBC),
    FixedTemp(FixedTempBC),
    Convective(ConvectiveBC),
    FilmCoefficientConvective(FilmCoefficientBC),
}

impl ThermalBC {
    pub fn radius(&self) -> f64 {
        match self {
            ThermalBC::HeatFlux(bc) => bc.r,
            ThermalBC::FixedTemp(bc) => bc.r,
            ThermalBC::Convective(bc) => bc.r,
            ThermalBC::FilmCoefficientConvective(bc) => bc.r,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            ThermalBC::HeatFlux(bc) => bc.h,
            ThermalBC::FixedTemp(bc) => bc.h,
            ThermalBC::Convective(bc) => bc.h,
            ThermalBC::FilmCoefficientConvective(bc) => bc.h,
        }
    }

    pub fn close(&self, other: &ThermalBC) -> bool {
        match (self, other) {
            (ThermalBC::HeatFlux(a), ThermalBC::HeatFlux(b)) => a.close(b),
            (ThermalBC::FixedTemp(a), ThermalBC::FixedTemp(b)) => a.close(b),
            (ThermalBC::Convective(a), ThermalBC::Convective(b)) => a.close(b),
            (ThermalBC::FilmCoefficientConvective(a), ThermalBC::FilmCoefficientConvective(b)) => {
                a.close(b)
            }
            _ => false,
        }
    }

    /// Deserialize a thermal BC, reporting an unknown `type` tag explicitly.
    pub fn from_json(s: &str) -> Result<Self> {
        match serde_json::from_str::<ThermalBC>(s) {
            Ok(bc) => Ok(bc),
            Err(err) => {
                let tag = serde_json::from_str::<serde_json::Value>(s)
                    .ok()
                    .and_then(|v| {
                        v.get("type")
                            .and_then(|t| t.as_str())
                            .map(|t| t.to_string())
                    });
                match tag {
                    Some(tag)
                        if !matches!(
                            tag.as_str(),
                            "HeatFlux" | "FixedTemp" | "Convective" | "FilmCoefficientConvective"
                        ) =>
                    {
                        Err(DamageError::UnknownFormatTag(tag))
                    }
                    _ => Err(err.into()),
                }
            }
        }
    }
}
