mod common;

use common::TestWorkspace;
use datascope::{
    correlate::{self, CorrelationMethod},
    curvefit::{self, CurveFitMethod},
    error::EngineError,
    extrapolate::{self, ExtrapolationMethod},
    interpolate::{self, InterpolateOptions, InterpolationKind},
    io_utils,
    oversample::{self, OversampleMethod},
    reduce::{self, ReduceOptions, ReductionMethod},
    suggest,
};

#[test]
fn reduction_preserves_rows_and_requested_components() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    for method in [
        ReductionMethod::Pca,
        ReductionMethod::Tsne,
        ReductionMethod::Umap,
    ] {
        let reduced = reduce::reduce(&frame, method, &ReduceOptions::default()).expect("reduce");
        assert_eq!(reduced.row_count(), frame.row_count(), "{method}");
        assert_eq!(reduced.features, vec!["dim1", "dim2"], "{method}");
    }
}

#[test]
fn pca_reproduces_itself_across_runs() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    let options = ReduceOptions::default();
    let first = reduce::reduce(&frame, ReductionMethod::Pca, &options).expect("first run");
    let second = reduce::reduce(&frame, ReductionMethod::Pca, &options).expect("second run");
    assert_eq!(first, second);
}

#[test]
fn unsupported_reduction_method_string_is_rejected() {
    let err = "lda".parse::<ReductionMethod>().unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedMethod { .. }));
}

#[test]
fn correlation_of_linear_transform_is_one() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    let r = correlate::correlation(&frame, "feature1", "feature2", CorrelationMethod::Pearson)
        .expect("correlation");
    assert!((r - 1.0).abs() < 1e-9);
}

#[test]
fn linear_interpolation_returns_exactly_the_requested_rows() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    let options = InterpolateOptions {
        num_points: 10,
        ..Default::default()
    };
    let result = interpolate::interpolate(
        &frame,
        "feature1",
        "feature2",
        InterpolationKind::Linear,
        &options,
    )
    .expect("interpolate");
    assert_eq!(result.row_count(), 10);
    let xs = result.numeric_column("feature1").expect("grid");
    assert!((xs[0] - 1.0).abs() < 1e-10);
    assert!((xs[9] - 5.0).abs() < 1e-10);
}

#[test]
fn linear_extrapolation_matches_the_linear_extension() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    let targets = [6.0, 7.0, 8.0];
    let result = extrapolate::extrapolate(
        &frame,
        "feature1",
        "feature2",
        &targets,
        ExtrapolationMethod::Linear,
        2.0,
    )
    .expect("extrapolate");
    assert_eq!(result.row_count(), targets.len());
    let ys = result.numeric_column("feature2").expect("predictions");
    for (target, y) in targets.iter().zip(&ys) {
        assert!((y - 2.0 * target).abs() < 1e-8, "f({target}) = {y}");
    }
}

#[test]
fn oversampling_at_factor_one_balances_binary_classes() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_classes_csv()).expect("load classes");
    let balanced =
        oversample::oversample(&frame, "x", "class", OversampleMethod::Smote, 1.0, 42)
            .expect("oversample");
    let mut a = 0;
    let mut b = 0;
    for row in 0..balanced.row_count() {
        match balanced.value(row, "class").as_display().as_str() {
            "a" => a += 1,
            "b" => b += 1,
            other => panic!("unexpected class {other}"),
        }
    }
    assert_eq!(a, b);
}

#[test]
fn drop_suggestion_flags_a_perfectly_correlated_pair() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    let drops = suggest::suggest_dropping(
        &frame,
        suggest::DEFAULT_DROP_CORRELATION,
        suggest::DEFAULT_DROP_VARIANCE,
    )
    .expect("suggest");
    assert!(
        drops.contains(&"feature2".to_string()),
        "expected feature2 in {drops:?}"
    );
}

#[test]
fn curve_fit_output_contract_holds_per_method() {
    let workspace = TestWorkspace::new();
    let frame = io_utils::load_table(&workspace.write_sample_csv()).expect("load sample");
    for method in [
        CurveFitMethod::Linear,
        CurveFitMethod::Polynomial,
        CurveFitMethod::Exponential,
    ] {
        let fit = curvefit::fit_curve(&frame, "feature1", "feature2", method, 2.0)
            .expect("fit curve");
        assert_eq!(fit.curve.row_count(), curvefit::CURVE_SAMPLES, "{method}");
        assert!(!fit.params.is_empty(), "{method}");
        if method == CurveFitMethod::Polynomial {
            assert!(fit.covariance.is_none());
        }
    }
}
