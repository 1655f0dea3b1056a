use std::sync::Arc;

use nalgebra::Vector3;
use ndarray::{array, Array1, Array2, Array3};

use ceralife::damage::{
    CSEGriffithFlaw, EquivalentStressKernel, SMMGriffithFlaw, SMMSemiCircularCrack,
};
use ceralife::orientation::OrientationGrid;
use ceralife::{
    aggregate, CSEModelGriffithFlaw, CeramicMaterial, DamageError, DamageModel, FlawParameters,
    ModelOptions, PIAModel, SMMModelGriffithFlaw, SMMModelSemiCircularCrack, StressHistory,
    SurfaceFacet, SurfaceGeometry,
};

/// Reference ceramic from the spinning-disk calibration: identical volume and
/// surface Weibull modulus, distinct scale parameters.
fn disk_material() -> CeramicMaterial {
    let m = 7.65;
    let s0_v = 74.79 * 1000.0_f64.powf(3.0 / m);
    let s0_s = 232.0 * 1000.0_f64.powf(2.0 / m);
    CeramicMaterial::new(
        array![0.0, 1000.0],
        FlawParameters::constant(2, s0_v, m, 320.0, 30.0, 0.0),
        FlawParameters::constant(2, s0_s, m, 320.0, 30.0, 0.0),
        0.82,
        0.219,
    )
    .unwrap()
}

/// Coarser grids keep the orientation-averaged models quick under test; the
/// kbar normalization makes the uniaxial checks grid-independent.
fn test_options() -> ModelOptions {
    ModelOptions {
        hemisphere: Arc::new(OrientationGrid::hemisphere(31, 60)),
        semicircle: Arc::new(OrientationGrid::semicircle(91)),
        ..ModelOptions::default()
    }
}

fn all_models() -> Vec<Box<dyn DamageModel>> {
    vec![
        Box::new(PIAModel::new(test_options())),
        Box::new(CSEModelGriffithFlaw::new(test_options())),
        Box::new(SMMModelGriffithFlaw::new(test_options())),
        Box::new(SMMModelSemiCircularCrack::new(test_options())),
    ]
}

fn single_element_history(mandel: [f64; 6]) -> StressHistory {
    let mut stress = Array3::zeros((1, 1, 6));
    for (i, v) in mandel.into_iter().enumerate() {
        stress[[0, 0, i]] = v;
    }
    StressHistory::new(array![0.0], stress, array![[500.0]]).unwrap()
}

fn unit_facet() -> SurfaceGeometry {
    SurfaceGeometry::new(vec![vec![SurfaceFacet {
        normal: Vector3::z(),
        area: 1.0,
    }]])
    .unwrap()
}

/// A miniature cyclic fixture: two elements through five samples of one load
/// cycle, element 1 under twice the stress of element 0, with a modest
/// rotating shear component.
fn cyclic_history() -> StressHistory {
    let time = array![0.0, 0.0025, 0.005, 0.0075, 0.01];
    let wave = [0.0, 0.707, 1.0, 0.707, 0.0];
    let mut stress = Array3::zeros((5, 2, 6));
    for (t, w) in wave.into_iter().enumerate() {
        for e in 0..2 {
            let scale = (e + 1) as f64 * 180.0;
            stress[[t, e, 0]] = scale * w;
            stress[[t, e, 1]] = 0.3 * scale * w;
            stress[[t, e, 5]] = 0.2 * scale * w; // sqrt2 * s12
        }
    }
    let temperature = Array2::from_elem((5, 2), 500.0);
    StressHistory::new(time, stress, temperature).unwrap()
}

fn cyclic_surface() -> SurfaceGeometry {
    SurfaceGeometry::new(vec![
        vec![SurfaceFacet {
            normal: Vector3::z(),
            area: 2.5,
        }],
        vec![
            SurfaceFacet {
                normal: Vector3::z(),
                area: 1.5,
            },
            SurfaceFacet {
                normal: Vector3::x(),
                area: 1.0,
            },
        ],
    ])
    .unwrap()
}

#[test]
fn test_pia_uniaxial_closed_form() {
    // single element, single time step, uniaxial sigma = 100, A = 1,
    // m_s = 2, s0_s = 10, Bs = 1, Ns = 1, su_s = 0: the static path gives
    // log R = -(100 / 10)^2 = -100
    let material = CeramicMaterial::new(
        array![0.0, 1000.0],
        FlawParameters::constant(2, 10.0, 2.0, 1.0, 1.0, 0.0),
        FlawParameters::constant(2, 10.0, 2.0, 1.0, 1.0, 0.0),
        0.82,
        0.219,
    )
    .unwrap();
    let history = single_element_history([100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let model = PIAModel::new(test_options());
    let lr = model
        .calculate_surface_flaw_element_log_reliability(&history, &unit_facet(), &material, 0.0)
        .unwrap();
    assert!((lr[0] + 100.0).abs() < 1e-9, "lr = {}", lr[0]);

    let lr = model
        .calculate_volume_flaw_element_log_reliability(&history, &array![1.0], &material, 0.0)
        .unwrap();
    assert!((lr[0] + 100.0).abs() < 1e-9, "lr = {}", lr[0]);
}

#[test]
fn test_all_models_reject_pure_compression() {
    let history = single_element_history([-200.0, -150.0, -100.0, 0.0, 0.0, 0.0]);
    for model in all_models() {
        let lr = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &unit_facet(),
                &disk_material(),
                0.0,
            )
            .unwrap();
        assert_eq!(lr[0], 0.0, "{} surface", model.name());
        if model.supports_volume() {
            let lr = model
                .calculate_volume_flaw_element_log_reliability(
                    &history,
                    &array![1.0],
                    &disk_material(),
                    0.0,
                )
                .unwrap();
            assert_eq!(lr[0], 0.0, "{} volume", model.name());
        }
    }
}

#[test]
fn test_log_reliability_is_nonpositive_and_pf_in_range() {
    let history = cyclic_history();
    let volumes = array![3.0, 2.0];
    for model in all_models() {
        let lr_s = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &cyclic_surface(),
                &disk_material(),
                1.0,
            )
            .unwrap();
        assert!(lr_s.iter().all(|&v| v <= 0.0 && v.is_finite()), "{}", model.name());
        let lr_v;
        let mut modes = vec![lr_s.view()];
        if model.supports_volume() {
            lr_v = model
                .calculate_volume_flaw_element_log_reliability(
                    &history,
                    &volumes,
                    &disk_material(),
                    1.0,
                )
                .unwrap();
            assert!(lr_v.iter().all(|&v| v <= 0.0 && v.is_finite()), "{}", model.name());
            modes.push(lr_v.view());
        }
        let summary = aggregate(&modes);
        assert!(summary.log_reliability <= 0.0);
        assert!((0.0..=1.0).contains(&summary.probability_of_failure));
        assert!((0.0..=1.0).contains(&summary.reliability));
    }
}

#[test]
fn test_scaling_stress_never_raises_reliability() {
    let base = cyclic_history();
    for k in [1.5, 2.0, 4.0] {
        let scaled = StressHistory::new(
            base.time().to_owned(),
            base.stress().to_owned() * k,
            base.temperature().to_owned(),
        )
        .unwrap();
        for model in all_models() {
            let lr0 = model
                .calculate_surface_flaw_element_log_reliability(
                    &base,
                    &cyclic_surface(),
                    &disk_material(),
                    1.0,
                )
                .unwrap();
            let lr1 = model
                .calculate_surface_flaw_element_log_reliability(
                    &scaled,
                    &cyclic_surface(),
                    &disk_material(),
                    1.0,
                )
                .unwrap();
            for e in 0..lr0.len() {
                assert!(
                    lr1[e] <= lr0[e] + 1e-12,
                    "{} element {e}: {} vs {}",
                    model.name(),
                    lr1[e],
                    lr0[e]
                );
            }
        }
    }
}

#[test]
fn test_more_cycles_means_more_risk() {
    let history = cyclic_history();
    let model = SMMModelGriffithFlaw::new(test_options());
    let mut last = 0.0;
    for cycles in [1.0, 100.0, 10000.0] {
        let lr = model
            .calculate_volume_flaw_element_log_reliability(
                &history,
                &array![1.0, 1.0],
                &disk_material(),
                cycles * 0.01,
            )
            .unwrap();
        let total: f64 = lr.sum();
        assert!(total <= last + 1e-15, "cycles = {cycles}: {total} vs {last}");
        last = total;
    }
}

#[test]
fn test_evaluation_is_idempotent() {
    let history = cyclic_history();
    for model in all_models() {
        let a = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &cyclic_surface(),
                &disk_material(),
                1.0,
            )
            .unwrap();
        let b = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &cyclic_surface(),
                &disk_material(),
                1.0,
            )
            .unwrap();
        assert_eq!(a, b, "{}", model.name());
    }
}

#[test]
fn test_aggregation_of_zeros_is_unity() {
    let lr = Array1::zeros(17);
    let summary = aggregate(&[lr.view()]);
    assert_eq!(summary.reliability, 1.0);
    assert_eq!(summary.probability_of_failure, 0.0);
}

#[test]
fn test_semicircular_crack_has_no_volume_kernel() {
    let model = SMMModelSemiCircularCrack::new(test_options());
    assert!(!model.supports_volume());
    let err = model
        .calculate_volume_flaw_element_log_reliability(
            &cyclic_history(),
            &array![1.0, 1.0],
            &disk_material(),
            1.0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DamageError::UnsupportedEvaluation {
            model: "SMMModelSemiCircularCrack",
            ..
        }
    ));
}

#[test]
fn test_zero_area_element_is_risk_free() {
    // element 0 has no exposed area but a large stress; element 1 anchors the
    // total geometry
    let mut stress = Array3::zeros((1, 2, 6));
    stress[[0, 0, 0]] = 900.0;
    stress[[0, 1, 0]] = 100.0;
    let history =
        StressHistory::new(array![0.0], stress, Array2::from_elem((1, 2), 500.0)).unwrap();
    let surface = SurfaceGeometry::new(vec![
        vec![SurfaceFacet {
            normal: Vector3::z(),
            area: 0.0,
        }],
        vec![SurfaceFacet {
            normal: Vector3::z(),
            area: 1.0,
        }],
    ])
    .unwrap();
    for model in all_models() {
        let lr = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &surface,
                &disk_material(),
                0.0,
            )
            .unwrap();
        assert_eq!(lr[0], 0.0, "{}", model.name());
        assert!(lr[1] < 0.0, "{}", model.name());
    }
}

#[test]
fn test_kernels_coincide_without_shear() {
    let (cse, smm) = (CSEGriffithFlaw, SMMGriffithFlaw);
    for sn in [0.0, 1.0, 55.0, 400.0] {
        let a = cse.equivalent_stress(sn, 0.0, 0.82, 0.219);
        let b = smm.equivalent_stress(sn, 0.0, 0.82, 0.219);
        assert!((a - b).abs() < 1e-12, "sn = {sn}: {a} vs {b}");
        assert!((a - sn).abs() < 1e-12);
        let c = SMMSemiCircularCrack.equivalent_stress(sn, 0.0, 0.82, 0.219);
        assert!((c - sn).abs() < 1e-12);
    }
}

#[test]
fn test_uniaxial_tension_reduces_to_weibull_for_all_kernels() {
    // with the Batdorf normalization, a uniaxial tensile load gives the same
    // reliability as the plain uniaxial Weibull expression for every
    // orientation-averaged model, so CSE and SMM agree exactly
    let history = single_element_history([150.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let material = disk_material();
    let m = 7.65;
    let s0_v = 74.79 * 1000.0_f64.powf(3.0 / m);
    let expected = -(150.0_f64 / s0_v).powf(m) * 2.0;

    for model in [
        Box::new(CSEModelGriffithFlaw::new(test_options())) as Box<dyn DamageModel>,
        Box::new(SMMModelGriffithFlaw::new(test_options())),
        Box::new(PIAModel::new(test_options())),
    ] {
        let lr = model
            .calculate_volume_flaw_element_log_reliability(&history, &array![2.0], &material, 0.0)
            .unwrap();
        assert!(
            (lr[0] - expected).abs() < 1e-9 * expected.abs(),
            "{}: {} vs {expected}",
            model.name(),
            lr[0]
        );
    }
}

#[test]
fn test_shape_mismatch_is_reported() {
    let history = cyclic_history();
    let model = PIAModel::new(test_options());
    // wrong volume count
    let err = model
        .calculate_volume_flaw_element_log_reliability(
            &history,
            &array![1.0],
            &disk_material(),
            1.0,
        )
        .unwrap_err();
    assert!(matches!(err, DamageError::ShapeMismatch { .. }));
    // wrong surface element count
    let err = model
        .calculate_surface_flaw_element_log_reliability(
            &history,
            &SurfaceGeometry::none(5),
            &disk_material(),
            1.0,
        )
        .unwrap_err();
    assert!(matches!(err, DamageError::ShapeMismatch { .. }));
}

#[test]
fn test_material_range_violation_aborts() {
    // 1500 degrees is outside the calibrated [0, 1000] range
    let mut stress = Array3::zeros((1, 1, 6));
    stress[[0, 0, 0]] = 50.0;
    let history =
        StressHistory::new(array![0.0], stress, array![[1500.0]]).unwrap();
    let model = PIAModel::new(test_options());
    let err = model
        .calculate_volume_flaw_element_log_reliability(
            &history,
            &array![1.0],
            &disk_material(),
            0.0,
        )
        .unwrap_err();
    assert!(matches!(err, DamageError::MaterialRange { .. }));
}

#[test]
fn test_cyclic_models_match_across_flaw_populations() {
    // sanity on the cyclic fixture: the heavier-loaded element is always the
    // riskier one, for every model and both populations
    let history = cyclic_history();
    let volumes = array![1.0, 1.0];
    let surface = SurfaceGeometry::new(vec![
        vec![SurfaceFacet {
            normal: Vector3::z(),
            area: 1.0,
        }],
        vec![SurfaceFacet {
            normal: Vector3::z(),
            area: 1.0,
        }],
    ])
    .unwrap();
    for model in all_models() {
        let lr = model
            .calculate_surface_flaw_element_log_reliability(
                &history,
                &surface,
                &disk_material(),
                1.0,
            )
            .unwrap();
        assert!(lr[1] < lr[0], "{} surface: {} vs {}", model.name(), lr[1], lr[0]);
        if model.supports_volume() {
            let lr = model
                .calculate_volume_flaw_element_log_reliability(
                    &history,
                    &volumes,
                    &disk_material(),
                    1.0,
                )
                .unwrap();
            assert!(lr[1] < lr[0], "{} volume", model.name());
        }
    }
}
