use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{DamageError, Result};
use crate::interp::{check_strictly_increasing, interp1d, RangePolicy};

/// Which flaw population a parameter lookup refers to. Ceramics fail either
/// from a surface-originated or an internal flaw; the two populations carry
/// independent statistical parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlawPopulation {
    Surface,
    Volume,
}

/// Weibull and static-fatigue parameters for one flaw population, tabulated
/// on the material's temperature grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlawParameters {
    /// Weibull scale parameter s0
    pub s0: Array1<f64>,
    /// Weibull modulus m
    pub m: Array1<f64>,
    /// Fatigue parameter B
    pub b: Array1<f64>,
    /// Fatigue exponent N
    pub n: Array1<f64>,
    /// Threshold stress su
    pub su: Array1<f64>,
}

impl FlawParameters {
    /// Temperature-independent parameters, repeated over `npts` grid points.
    pub fn constant(npts: usize, s0: f64, m: f64, b: f64, n: f64, su: f64) -> Self {
        Self {
            s0: Array1::from_elem(npts, s0),
            m: Array1::from_elem(npts, m),
            b: Array1::from_elem(npts, b),
            n: Array1::from_elem(npts, n),
            su: Array1::from_elem(npts, su),
        }
    }

    fn validate(&self, npts: usize, which: &'static str) -> Result<()> {
        for (name, arr) in [
            ("s0", &self.s0),
            ("m", &self.m),
            ("B", &self.b),
            ("N", &self.n),
            ("su", &self.su),
        ] {
            if arr.len() != npts {
                return Err(DamageError::shape(
                    "material parameter array",
                    format!("{npts} ({which} {name})"),
                    arr.len(),
                ));
            }
        }
        let positive = |name, arr: &Array1<f64>| -> Result<()> {
            if arr.iter().any(|&v| !(v > 0.0)) {
                return Err(DamageError::InvalidParameter {
                    name,
                    reason: format!("{which} values must be positive"),
                });
            }
            Ok(())
        };
        positive("s0", &self.s0)?;
        positive("m", &self.m)?;
        positive("B", &self.b)?;
        // the cyclic path additionally needs N > 2; that is checked where the
        // cycle-collapse transform actually runs
        positive("N", &self.n)?;
        if self.su.iter().any(|&v| !(v >= 0.0)) {
            return Err(DamageError::InvalidParameter {
                name: "su",
                reason: format!("{which} threshold must be non-negative"),
            });
        }
        Ok(())
    }
}

/// Temperature-dependent statistical strength model for a ceramic.
///
/// Constructed once from calibration data, immutable afterwards, shared
/// read-only by every damage evaluation. Parameter values are interpolated
/// piecewise-linearly at a query temperature; queries outside the tabulated
/// range follow the configured [`RangePolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeramicMaterial {
    temperatures: Array1<f64>,
    volume: FlawParameters,
    surface: FlawParameters,
    c_bar: f64,
    nu: f64,
    #[serde(default)]
    policy: RangePolicy,
}

impl CeramicMaterial {
    pub fn new(
        temperatures: Array1<f64>,
        volume: FlawParameters,
        surface: FlawParameters,
        c_bar: f64,
        nu: f64,
    ) -> Result<Self> {
        if temperatures.is_empty() {
            return Err(DamageError::InvalidParameter {
                name: "temperatures",
                reason: "temperature grid must not be empty".into(),
            });
        }
        check_strictly_increasing("temperatures", temperatures.as_slice().unwrap())?;
        volume.validate(temperatures.len(), "volume")?;
        surface.validate(temperatures.len(), "surface")?;
        if !(c_bar > 0.0) {
            return Err(DamageError::InvalidParameter {
                name: "c_bar",
                reason: "Batdorf constant must be positive".into(),
            });
        }
        if !(nu > -1.0 && nu < 0.5) {
            return Err(DamageError::InvalidParameter {
                name: "nu",
                reason: "Poisson ratio must lie in (-1, 0.5)".into(),
            });
        }
        Ok(Self {
            temperatures,
            volume,
            surface,
            c_bar,
            nu,
            policy: RangePolicy::default(),
        })
    }

    /// Replace the default `Fail` out-of-range policy.
    pub fn with_range_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn params(&self, population: FlawPopulation) -> &FlawParameters {
        match population {
            FlawPopulation::Surface => &self.surface,
            FlawPopulation::Volume => &self.volume,
        }
    }

    fn lookup(&self, values: &Array1<f64>, temperature: f64) -> Result<f64> {
        interp1d(
            self.temperatures.as_slice().unwrap(),
            values.as_slice().unwrap(),
            temperature,
            self.policy,
        )
    }

    /// Weibull scale parameter s0 at a temperature.
    pub fn strength(&self, population: FlawPopulation, temperature: f64) -> Result<f64> {
        self.lookup(&self.params(population).s0, temperature)
    }

    /// Weibull modulus m at a temperature.
    pub fn modulus(&self, population: FlawPopulation, temperature: f64) -> Result<f64> {
        self.lookup(&self.params(population).m, temperature)
    }

    /// Fatigue parameter B at a temperature.
    pub fn fatigue_parameter(&self, population: FlawPopulation, temperature: f64) -> Result<f64> {
        self.lookup(&self.params(population).b, temperature)
    }

    /// Fatigue exponent N at a temperature.
    pub fn fatigue_exponent(&self, population: FlawPopulation, temperature: f64) -> Result<f64> {
        self.lookup(&self.params(population).n, temperature)
    }

    /// Threshold stress su at a temperature.
    pub fn threshold(&self, population: FlawPopulation, temperature: f64) -> Result<f64> {
        self.lookup(&self.params(population).su, temperature)
    }

    /// Batdorf multiaxiality constant.
    pub fn c_bar(&self) -> f64 {
        self.c_bar
    }

    /// Poisson ratio.
    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn temperature_range(&self) -> (f64, f64) {
        (
            self.temperatures[0],
            self.temperatures[self.temperatures.len() - 1],
        )
    }
}

/// Per-element material parameters, reduced over the time axis.
///
/// The cycle-collapse transform needs a single (m, s0, B, N, su) per element,
/// so parameters are interpolated at every (time, element) temperature sample
/// and then averaged over time. For a single-sample history this is the
/// instantaneous lookup.
#[derive(Debug, Clone, Copy)]
pub struct ElementParameters {
    pub s0: f64,
    pub m: f64,
    pub b: f64,
    pub n: f64,
    pub su: f64,
}

pub(crate) fn averaged_element_parameters(
    material: &CeramicMaterial,
    population: FlawPopulation,
    temperatures: ArrayView2<'_, f64>,
) -> Result<Vec<ElementParameters>> {
    let (ntime, nelem) = temperatures.dim();
    let mut out = Vec::with_capacity(nelem);
    for e in 0..nelem {
        let mut acc = ElementParameters {
            s0: 0.0,
            m: 0.0,
            b: 0.0,
            n: 0.0,
            su: 0.0,
        };
        for t in 0..ntime {
            let temp = temperatures[[t, e]];
            acc.s0 += material.strength(population, temp)?;
            acc.m += material.modulus(population, temp)?;
            acc.b += material.fatigue_parameter(population, temp)?;
            acc.n += material.fatigue_exponent(population, temp)?;
            acc.su += material.threshold(population, temp)?;
        }
        let f = 1.0 / ntime as f64;
        out.push(ElementParameters {
            s0: acc.s0 * f,
            m: acc.m * f,
            b: acc.b * f,
            n: acc.n * f,
            su: acc.su * f,
        });
    }
    Ok(out)
}
