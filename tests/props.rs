use datascope::{
    extrapolate::{self, ExtrapolationMethod},
    frame::DataFrame,
    interpolate::{self, InterpolateOptions, InterpolationKind},
};
use proptest::prelude::*;

fn indexed_frame(ys: &[f64]) -> DataFrame {
    let xs = (0..ys.len()).map(|i| i as f64).collect::<Vec<_>>();
    DataFrame::from_numeric_columns(&[("x", &xs), ("y", ys)])
}

proptest! {
    #[test]
    fn linear_interpolation_always_spans_the_grid(
        ys in proptest::collection::vec(-100.0f64..100.0, 2..30),
        points in 2usize..60,
    ) {
        let frame = indexed_frame(&ys);
        let options = InterpolateOptions { num_points: points, ..Default::default() };
        let result = interpolate::interpolate(&frame, "x", "y", InterpolationKind::Linear, &options)
            .expect("interpolate");
        prop_assert_eq!(result.row_count(), points);
        let grid = result.numeric_column("x").expect("grid");
        prop_assert!((grid[0] - 0.0).abs() < 1e-9);
        prop_assert!((grid[points - 1] - (ys.len() - 1) as f64).abs() < 1e-9);
    }

    #[test]
    fn extrapolation_output_length_matches_targets(
        ys in proptest::collection::vec(-100.0f64..100.0, 2..30),
        targets in proptest::collection::vec(-1000.0f64..1000.0, 1..20),
    ) {
        let frame = indexed_frame(&ys);
        let result = extrapolate::extrapolate(
            &frame,
            "x",
            "y",
            &targets,
            ExtrapolationMethod::Linear,
            2.0,
        )
        .expect("extrapolate");
        prop_assert_eq!(result.row_count(), targets.len());
        let predictions = result.numeric_column("y").expect("predictions");
        prop_assert!(predictions.iter().all(|v| v.is_finite()));
    }
}
