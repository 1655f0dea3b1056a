//! Property-based tests for the damage engine invariants.

use std::sync::Arc;

use ndarray::{array, Array2, Array3};
use proptest::prelude::*;

use ceralife::interp::{interp1d, RangePolicy};
use ceralife::orientation::OrientationGrid;
use ceralife::{
    aggregate, CeramicMaterial, DamageModel, FlawParameters, ModelOptions, PIAModel,
    SMMModelGriffithFlaw, StressHistory,
};

fn material() -> CeramicMaterial {
    CeramicMaterial::new(
        array![0.0, 1000.0],
        FlawParameters::constant(2, 500.0, 7.65, 320.0, 30.0, 0.0),
        FlawParameters::constant(2, 400.0, 7.65, 320.0, 30.0, 0.0),
        0.82,
        0.219,
    )
    .unwrap()
}

fn small_options() -> ModelOptions {
    ModelOptions {
        hemisphere: Arc::new(OrientationGrid::hemisphere(16, 24)),
        semicircle: Arc::new(OrientationGrid::semicircle(32)),
        ..ModelOptions::default()
    }
}

fn history_from_components(comps: &[f64], nelem: usize) -> StressHistory {
    let ntime = comps.len() / (nelem * 6);
    let stress = Array3::from_shape_vec((ntime, nelem, 6), comps.to_vec()).unwrap();
    let time = ndarray::Array1::from_iter((0..ntime).map(|i| i as f64 * 0.01));
    StressHistory::new(time, stress, Array2::from_elem((ntime, nelem), 500.0)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Log-reliabilities are never positive, never NaN, for arbitrary stress
    /// states.
    #[test]
    fn log_reliability_never_positive(
        comps in proptest::collection::vec(-400.0f64..400.0, 2 * 2 * 6),
        v0 in 0.01f64..10.0,
        v1 in 0.01f64..10.0,
    ) {
        let history = history_from_components(&comps, 2);
        let model = PIAModel::new(small_options());
        let lr = model
            .calculate_volume_flaw_element_log_reliability(
                &history,
                &array![v0, v1],
                &material(),
                0.02,
            )
            .unwrap();
        for &v in lr.iter() {
            prop_assert!(v <= 0.0, "positive log reliability {v}");
            prop_assert!(!v.is_nan());
        }
    }

    /// Scaling every stress component by k >= 1 never raises the
    /// reliability.
    #[test]
    fn scaling_never_raises_reliability(
        comps in proptest::collection::vec(-300.0f64..300.0, 2 * 1 * 6),
        k in 1.0f64..4.0,
    ) {
        let base = history_from_components(&comps, 1);
        let scaled = StressHistory::new(
            base.time().to_owned(),
            base.stress().to_owned() * k,
            base.temperature().to_owned(),
        )
        .unwrap();

        for model in [
            Box::new(PIAModel::new(small_options())) as Box<dyn DamageModel>,
            Box::new(SMMModelGriffithFlaw::new(small_options())),
        ] {
            let lr0 = model
                .calculate_volume_flaw_element_log_reliability(
                    &base, &array![1.0], &material(), 0.02,
                )
                .unwrap();
            let lr1 = model
                .calculate_volume_flaw_element_log_reliability(
                    &scaled, &array![1.0], &material(), 0.02,
                )
                .unwrap();
            prop_assert!(
                lr1[0] <= lr0[0] + 1e-12,
                "{}: {} vs {} at k = {k}",
                model.name(),
                lr1[0],
                lr0[0]
            );
        }
    }

    /// Evaluating twice gives bit-identical results.
    #[test]
    fn evaluation_is_deterministic(
        comps in proptest::collection::vec(-300.0f64..300.0, 3 * 2 * 6),
    ) {
        let history = history_from_components(&comps, 2);
        let model = PIAModel::new(small_options());
        let volumes = array![1.0, 2.0];
        let a = model
            .calculate_volume_flaw_element_log_reliability(&history, &volumes, &material(), 0.03)
            .unwrap();
        let b = model
            .calculate_volume_flaw_element_log_reliability(&history, &volumes, &material(), 0.03)
            .unwrap();
        prop_assert_eq!(a, b);
    }
}

proptest! {
    /// Piecewise-linear interpolation stays inside the hull of the tabulated
    /// values.
    #[test]
    fn interpolation_stays_in_hull(
        t in 0.0f64..1000.0,
        a in 1.0f64..100.0,
        b in 1.0f64..100.0,
    ) {
        let xs = [0.0, 1000.0];
        let vs = [a, b];
        let v = interp1d(&xs, &vs, t, RangePolicy::Fail).unwrap();
        prop_assert!(v >= a.min(b) - 1e-12 && v <= a.max(b) + 1e-12);
    }

    /// Hemisphere quadrature weights approximate the 2 pi measure.
    #[test]
    fn hemisphere_weights_sum_to_measure(
        nalpha in 12usize..48,
        nbeta in 8usize..48,
    ) {
        let grid = OrientationGrid::hemisphere(nalpha, nbeta);
        let rel = (grid.total_weight() - grid.measure()).abs() / grid.measure();
        prop_assert!(rel < 0.1, "relative defect {rel}");
    }

    /// Semicircle quadrature weights sum to pi exactly (midpoint rule).
    #[test]
    fn semicircle_weights_sum_to_pi(npsi in 1usize..256) {
        let grid = OrientationGrid::semicircle(npsi);
        prop_assert!((grid.total_weight() - std::f64::consts::PI).abs() < 1e-9);
    }

    /// Weakest-link aggregation: the total log is the sum, and the derived
    /// quantities stay in range.
    #[test]
    fn aggregation_law(
        lrs in proptest::collection::vec(-5.0f64..=0.0, 1..24),
    ) {
        let arr = ndarray::Array1::from_vec(lrs.clone());
        let summary = aggregate(&[arr.view()]);
        let expected: f64 = lrs.iter().sum();
        prop_assert!((summary.log_reliability - expected).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&summary.reliability));
        prop_assert!((0.0..=1.0).contains(&summary.probability_of_failure));
        prop_assert!(
            (summary.probability_of_failure + summary.reliability - 1.0).abs() < 1e-12
        );
    }
}
