use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::damage::{DamageModel, StressHistory};
use crate::error::{DamageError, Result};
use crate::material::CeramicMaterial;
use crate::receiver::Receiver;
use crate::reliability::ReliabilitySummary;

/// Result field names the driver pulls from each tube.
pub const STRESS_FIELD: &str = "stress";
pub const TEMPERATURE_FIELD: &str = "temperature";

/// Per-tube evaluation output: the raw per-element log-reliability arrays for
/// both flaw populations plus the tube-level summary (scaled by the tube
/// multiplier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TubeReliability {
    pub panel: String,
    pub tube: String,
    pub surface: Array1<f64>,
    pub volume: Array1<f64>,
    pub summary: ReliabilitySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverReliability {
    pub tubes: Vec<TubeReliability>,
    pub overall: ReliabilitySummary,
}

/// Evaluate a damage model over every tube of a receiver and aggregate to a
/// structure-level reliability.
///
/// Each tube must carry a `stress` quadrature field, shaped
/// `(ntime, nelem, 6)` in Mandel convention, and a `temperature` element
/// field; geometric weights are derived from the tube grid. Tubes evaluate in
/// parallel; the first failing tube aborts the computation and partial
/// results are discarded. Models without a volume kernel contribute the
/// surface population only.
pub fn determine_reliability(
    receiver: &Receiver,
    model: &dyn DamageModel,
    material: &CeramicMaterial,
    target_time: f64,
) -> Result<ReceiverReliability> {
    let tubes: Vec<_> = receiver.tubes().collect();
    info!(
        model = model.name(),
        ntubes = tubes.len(),
        target_time,
        "evaluating receiver reliability"
    );

    let per_tube: Vec<TubeReliability> = tubes
        .par_iter()
        .map(|(panel, name, tube)| -> Result<TubeReliability> {
            let stress = tube
                .quadrature_result(STRESS_FIELD)
                .ok_or_else(|| DamageError::MissingField(format!("{panel}/{name}: stress")))?;
            let temperature = tube
                .result(TEMPERATURE_FIELD)
                .ok_or_else(|| DamageError::MissingField(format!("{panel}/{name}: temperature")))?;
            let history =
                StressHistory::new(tube.times().clone(), stress.clone(), temperature.clone())?;

            let surface_geometry = tube.surface_elements()?;
            let surface = model.calculate_surface_flaw_element_log_reliability(
                &history,
                &surface_geometry,
                material,
                target_time,
            )?;
            let volume = if model.supports_volume() {
                model.calculate_volume_flaw_element_log_reliability(
                    &history,
                    &tube.element_volumes(),
                    material,
                    target_time,
                )?
            } else {
                Array1::zeros(history.nelem())
            };

            let log = (surface.sum() + volume.sum()) * tube.multiplier as f64;
            Ok(TubeReliability {
                panel: panel.to_string(),
                tube: name.to_string(),
                surface,
                volume,
                summary: ReliabilitySummary::from_log_reliability(log),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let overall = ReliabilitySummary::from_log_reliability(
        per_tube.iter().map(|t| t.summary.log_reliability).sum(),
    );
    Ok(ReceiverReliability {
        tubes: per_tube,
        overall,
    })
}
