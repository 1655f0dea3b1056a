//! Probabilistic failure models for ceramic tubular solar receivers.
//!
//! The core is the damage/reliability engine: given a time history of element
//! stress tensors and temperatures plus a ceramic's statistical strength
//! parameters, it computes per-element cumulative log-reliabilities under
//! several competing flaw models (PIA, CSE with Griffith flaw, Shetty
//! mixed-mode with Griffith or semicircular cracks) and aggregates them into
//! a structure-level probability of failure. The [`receiver`] module holds
//! the tube/panel/receiver data model that carries solver results into the
//! engine.

pub mod bcs;
pub mod damage;
pub mod error;
pub mod interp;
pub mod life;
pub mod material;
pub mod orientation;
pub mod receiver;
pub mod reliability;
pub mod stress;

pub use damage::{
    CSEModelGriffithFlaw, DamageModel, ModelKind, ModelOptions, PIAModel,
    SMMModelGriffithFlaw, SMMModelSemiCircularCrack, StressHistory, SurfaceFacet,
    SurfaceGeometry,
};
pub use error::{DamageError, Result};
pub use life::determine_reliability;
pub use material::{CeramicMaterial, FlawParameters, FlawPopulation};
pub use orientation::OrientationGrid;
pub use receiver::{Panel, Receiver, Stiffness, Tube};
pub use reliability::{aggregate, ReliabilitySummary};
