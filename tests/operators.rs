use polars::prelude::*;
use std::sync::Arc;
use tsfold::config::OperatorOptions;
use tsfold::data::{schema_of, CsvConnector};
use tsfold::engines::{ExecutionContext, GroupOperator, LocalDriver, ReleaseStrategy};
use tsfold::model::{
    BaselineModels, Model, ModelErrorCode, ModelFailure, ModelOptions, ModelOutput, ValidityMask,
};
use tsfold::operators::{
    BacktestOperator, DecompositionOperator, FillGapsOperator, ForecastOperator, MetricsOperator,
    StatsOperator,
};
use tsfold::TsfoldError;

/// "long" has eight points, "short" a single one.
fn uneven_frame() -> DataFrame {
    df!(
        "id" => ["long", "long", "long", "long", "long", "long", "long", "long", "short"],
        "t" => [1i64, 2, 3, 4, 5, 6, 7, 8, 1],
        "v" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 3.0]
    )
    .unwrap()
}

fn run<Op: GroupOperator>(operator: Op, df: &DataFrame) -> Result<DataFrame, TsfoldError> {
    let ctx = ExecutionContext::new(operator).with_batch_capacity(3);
    LocalDriver::collect(&ctx, CsvConnector::partition(df, 2, 2))
}

fn str_values(out: &DataFrame, name: &str) -> Vec<String> {
    out.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(str::to_string)
        .collect()
}

struct FailingModel(ModelErrorCode);

impl Model for FailingModel {
    fn forecast(
        &self,
        _values: &[f64],
        _validity: Option<&ValidityMask>,
        _options: &ModelOptions,
    ) -> Result<ModelOutput, ModelFailure> {
        Err(ModelFailure::new(self.0, "stub failure"))
    }
}

#[test]
fn test_forecast_insufficient_data_fails_by_default() {
    let df = uneven_frame();
    let op = ForecastOperator::bind(
        &schema_of(&df),
        &OperatorOptions::new().with("horizon", 2),
        Arc::new(BaselineModels),
    )
    .unwrap();
    let err = run(op, &df).unwrap_err();
    assert!(matches!(err, TsfoldError::InsufficientData { ref key, .. } if key == "short"));
}

#[test]
fn test_forecast_skip_and_pad() {
    let df = uneven_frame();
    let options = OperatorOptions::new()
        .with("horizon", 2)
        .with("insufficient_data", "skip");
    let op = ForecastOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df).unwrap();
    assert_eq!(str_values(&out, "id"), vec!["long", "long"]);

    let options = options.with("insufficient_data", "pad");
    let op = ForecastOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df).unwrap();
    let padded = out
        .lazy()
        .filter(col("id").eq(lit("short")))
        .collect()
        .unwrap();
    assert_eq!(padded.height(), 2);
    let point = padded.column("point_forecast").unwrap().f64().unwrap();
    assert!(point.into_no_null_iter().all(|p| p == 3.0));
    assert_eq!(padded.column("lower").unwrap().null_count(), 2);
    assert_eq!(padded.column("upper").unwrap().null_count(), 2);
    let times = padded.column("t").unwrap().i64().unwrap();
    assert_eq!(times.into_no_null_iter().collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn test_invalid_model_is_fatal() {
    let df = uneven_frame();
    let options = OperatorOptions::new().with("insufficient_data", "skip");
    let op = ForecastOperator::bind(
        &schema_of(&df),
        &options,
        Arc::new(FailingModel(ModelErrorCode::InvalidModel)),
    )
    .unwrap();
    assert!(matches!(run(op, &df), Err(TsfoldError::Model { .. })));

    let spec_without_ets = OperatorOptions::new()
        .with("method", "naive")
        .with("model", "alpha=0.5")
        .with("horizon", 1)
        .with("n_folds", 1);
    let op = BacktestOperator::bind(&schema_of(&df), &spec_without_ets, Arc::new(BaselineModels))
        .unwrap();
    assert!(matches!(run(op, &df), Err(TsfoldError::Model { .. })));
}

#[test]
fn test_other_model_errors_skip_the_group() {
    let df = uneven_frame();
    let op = ForecastOperator::bind(
        &schema_of(&df),
        &OperatorOptions::new(),
        Arc::new(FailingModel(ModelErrorCode::Computation)),
    )
    .unwrap();
    let out = run(op, &df).unwrap();
    assert_eq!(out.height(), 0);
    assert_eq!(out.width(), 7);
}

#[test]
fn test_backtest_without_frequency_counts_positions() {
    let df = uneven_frame();
    let options = OperatorOptions::new()
        .with("horizon", 2)
        .with("n_folds", 2)
        .with("metric", "mae");
    let op = BacktestOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df).unwrap();

    // Axis 1..=8: initial 4 points, folds test [5, 6] and [7, 8]. "short"
    // has nothing in either test window.
    assert!(str_values(&out, "id").iter().all(|id| id == "long"));
    let folds = out.column("fold_id").unwrap().i64().unwrap();
    assert_eq!(folds.into_no_null_iter().collect::<Vec<_>>(), vec![1, 1, 2, 2]);
    let score = out.column("fold_metric_score").unwrap().f64().unwrap();
    // Naive from 4 against 5, 6; then from 6 against 7, 8.
    assert_eq!(
        score.into_no_null_iter().collect::<Vec<_>>(),
        vec![1.5, 1.5, 1.5, 1.5]
    );
}

#[test]
fn test_stats_describes_every_group() {
    let df = uneven_frame();
    for options in [
        OperatorOptions::new(),
        OperatorOptions::new().with("insufficient_data", "fail"),
    ] {
        let out = run(StatsOperator::bind(&schema_of(&df), &options).unwrap(), &df).unwrap();
        assert_eq!(out.height(), 2);
        let short = out
            .lazy()
            .filter(col("id").eq(lit("short")))
            .collect()
            .unwrap();
        assert_eq!(short.column("length").unwrap().i64().unwrap().get(0), Some(1));
        assert_eq!(short.column("mean").unwrap().f64().unwrap().get(0), Some(3.0));
        assert_eq!(short.column("std_dev").unwrap().null_count(), 1);
        assert_eq!(short.column("variance").unwrap().null_count(), 1);
    }
}

#[test]
fn test_boolean_group_column_is_rejected_at_bind() {
    let df = df!(
        "flag" => [true, true, true],
        "t" => [0i64, 1, 2],
        "v" => [1.0, 2.0, 3.0]
    )
    .unwrap();
    assert!(matches!(
        StatsOperator::bind(&schema_of(&df), &OperatorOptions::new()),
        Err(TsfoldError::Schema(_))
    ));

    let numeric = df!(
        "flag" => [1u8, 1, 0],
        "t" => [0i64, 1, 2],
        "v" => [1.0, 2.0, 3.0]
    )
    .unwrap();
    let out = run(
        StatsOperator::bind(&schema_of(&numeric), &OperatorOptions::new()).unwrap(),
        &numeric,
    )
    .unwrap()
    .sort(["flag"], SortMultipleOptions::default())
    .unwrap();
    assert_eq!(out.column("flag").unwrap().dtype(), &DataType::UInt8);
    let lengths = out.column("length").unwrap().i64().unwrap();
    assert_eq!(lengths.into_no_null_iter().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_metrics_per_group() {
    let df = df!(
        "id" => ["a", "a", "a", "b", "b"],
        "t" => [1i32, 2, 3, 1, 2],
        "actual" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0), None],
        "forecast" => [1.0, 2.0, 5.0, 4.0, 4.0]
    )
    .unwrap();
    let options = OperatorOptions::new().with("metric", "MAE");
    let out = run(MetricsOperator::bind(&schema_of(&df), &options).unwrap(), &df)
        .unwrap()
        .sort(["id"], SortMultipleOptions::default())
        .unwrap();

    assert_eq!(str_values(&out, "metric"), vec!["mae", "mae"]);
    let value = out.column("value").unwrap().f64().unwrap();
    assert!((value.get(0).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(value.get(1), Some(0.0));
    let n = out.column("n_observations").unwrap().i64().unwrap();
    assert_eq!(n.into_no_null_iter().collect::<Vec<_>>(), vec![3, 1]);
}

#[test]
fn test_metrics_coverage_reads_interval_columns() {
    let df = df!(
        "id" => ["a", "a", "a", "a"],
        "t" => [1i64, 2, 3, 4],
        "actual" => [1.0, 2.0, 3.0, 10.0],
        "forecast" => [1.0, 2.0, 3.0, 4.0],
        "lower" => [Some(0.0), Some(1.0), None, Some(3.0)],
        "upper" => [2.0, 3.0, 4.0, 5.0]
    )
    .unwrap();
    let options = OperatorOptions::new().with("metric", "coverage");
    let out = run(MetricsOperator::bind(&schema_of(&df), &options).unwrap(), &df).unwrap();

    // The row with a missing bound is left out; two of the other three hit.
    let value = out.column("value").unwrap().f64().unwrap();
    assert!((value.get(0).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    let n = out.column("n_observations").unwrap().i64().unwrap();
    assert_eq!(n.get(0), Some(3));
}

#[test]
fn test_unknown_metric_fails_at_bind() {
    let df = uneven_frame();
    let options = OperatorOptions::new().with("metric", "wape");
    assert!(matches!(
        BacktestOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)),
        Err(TsfoldError::ConfigParse { .. })
    ));
}

#[test]
fn test_bad_layouts_fail_at_bind() {
    let two_columns = df!("t" => [1i64], "v" => [1.0]).unwrap();
    assert!(matches!(
        StatsOperator::bind(&schema_of(&two_columns), &OperatorOptions::new()),
        Err(TsfoldError::Schema(_))
    ));

    let float_time = df!("id" => ["a"], "t" => [1.5], "v" => [1.0]).unwrap();
    assert!(matches!(
        StatsOperator::bind(&schema_of(&float_time), &OperatorOptions::new()),
        Err(TsfoldError::Schema(_))
    ));

    let text_value = df!("id" => ["a"], "t" => [1i64], "v" => ["x"]).unwrap();
    assert!(matches!(
        StatsOperator::bind(&schema_of(&text_value), &OperatorOptions::new()),
        Err(TsfoldError::Schema(_))
    ));

    let monthly_on_integers = OperatorOptions::new().with("frequency", "1mo");
    assert!(ForecastOperator::bind(
        &schema_of(&uneven_frame()),
        &monthly_on_integers,
        Arc::new(BaselineModels)
    )
    .is_err());
}

#[test]
fn test_release_strategies_agree() {
    let df = df!(
        "store" => ["s1", "s1", "s2", "s2", "s1", "s2", "s1", "s2"],
        "item" => [1i32, 1, 1, 1, 1, 1, 1, 1],
        "t" => [4i64, 1, 2, 1, 2, 3, 3, 4],
        "v" => [Some(4.0), Some(1.0), None, Some(10.0), Some(2.0), Some(30.0), Some(3.0), Some(40.0)]
    )
    .unwrap();
    let options = OperatorOptions::new().with("horizon", 2);

    let frame_for = |release: ReleaseStrategy| {
        let op = ForecastOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
        let ctx = ExecutionContext::new(op)
            .with_release_strategy(release)
            .with_batch_capacity(1);
        LocalDriver::collect(&ctx, CsvConnector::partition(&df, 1, 3))
            .unwrap()
            .sort(["store", "forecast_step"], SortMultipleOptions::default())
            .unwrap()
    };

    let per_group = frame_for(ReleaseStrategy::PerGroup);
    let bulk = frame_for(ReleaseStrategy::Bulk);
    assert_eq!(per_group.height(), 4);
    assert!(per_group.equals_missing(&bulk));
    assert_eq!(per_group.column("item").unwrap().dtype(), &DataType::Int32);
}

/// "cycle" repeats 1, 2, 3 three times; "short" has two points.
fn cyclic_frame() -> DataFrame {
    df!(
        "id" => ["cycle", "cycle", "cycle", "cycle", "cycle", "cycle", "cycle", "cycle", "cycle", "short", "short"],
        "t" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 1, 2],
        "v" => [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 6.0]
    )
    .unwrap()
}

fn opt_f64s(out: &DataFrame, name: &str) -> Vec<Option<f64>> {
    out.column(name).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn test_decomposition_policies() {
    let df = cyclic_frame();
    let options = OperatorOptions::new().with("seasonal_period", 3);
    let op = DecompositionOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let err = run(op, &df).unwrap_err();
    assert!(matches!(err, TsfoldError::InsufficientData { ref key, .. } if key == "short"));

    let options = options.with("insufficient_data", "skip");
    let op = DecompositionOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df)
        .unwrap()
        .sort(["t"], SortMultipleOptions::default())
        .unwrap();
    assert_eq!(out.height(), 9);
    assert!(str_values(&out, "id").iter().all(|id| id == "cycle"));
    for trend in opt_f64s(&out, "trend") {
        assert!((trend.unwrap() - 2.0).abs() < 1e-12);
    }
    let seasonal: Vec<f64> = opt_f64s(&out, "seasonal").into_iter().map(Option::unwrap).collect();
    for (i, s) in seasonal.iter().enumerate() {
        assert!((s - [-1.0, 0.0, 1.0][i % 3]).abs() < 1e-12);
    }
    for r in opt_f64s(&out, "remainder") {
        assert!(r.unwrap().abs() < 1e-12);
    }
    let periods: Vec<Option<i64>> = out.column("period").unwrap().i64().unwrap().into_iter().collect();
    assert_eq!(periods, vec![Some(3); 9]);
}

#[test]
fn test_decomposition_pad_keeps_the_trend() {
    let df = cyclic_frame();
    let options = OperatorOptions::new()
        .with("seasonal_period", 3)
        .with("insufficient_data", "pad");
    let op = DecompositionOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df).unwrap();
    assert_eq!(out.height(), 11);

    let short = out
        .lazy()
        .filter(col("id").eq(lit("short")))
        .sort(["t"], SortMultipleOptions::default())
        .collect()
        .unwrap();
    assert_eq!(opt_f64s(&short, "v"), vec![Some(4.0), Some(6.0)]);
    assert_eq!(opt_f64s(&short, "trend"), vec![Some(5.0), Some(5.0)]);
    assert_eq!(opt_f64s(&short, "remainder"), vec![Some(-1.0), Some(1.0)]);
    assert_eq!(short.column("seasonal").unwrap().null_count(), 2);
    assert_eq!(short.column("period").unwrap().null_count(), 2);
}

#[test]
fn test_fill_gaps_inserts_null_steps() {
    let df = df!(
        "id" => ["a", "b", "a", "a"],
        "t" => [5i64, 3, 1, 2],
        "v" => [5.0, 7.0, 1.0, 2.0]
    )
    .unwrap();
    let options = OperatorOptions::new().with("fill_until", "6");
    let op = FillGapsOperator::bind(&schema_of(&df), &options).unwrap();
    let out = run(op, &df)
        .unwrap()
        .sort(["id", "t"], SortMultipleOptions::default())
        .unwrap();

    let t: Vec<i64> = out.column("t").unwrap().i64().unwrap().into_no_null_iter().collect();
    assert_eq!(t, vec![1, 2, 3, 4, 5, 6, 3, 4, 5, 6]);
    assert_eq!(
        opt_f64s(&out, "v"),
        vec![
            Some(1.0),
            Some(2.0),
            None,
            None,
            Some(5.0),
            None,
            Some(7.0),
            None,
            None,
            None
        ]
    );
    assert_eq!(out.column("t").unwrap().dtype(), &DataType::Int64);
}

#[test]
fn test_fill_gaps_rejects_duplicates_and_bad_limits() {
    let df = df!(
        "id" => ["a", "a", "a"],
        "t" => [1i64, 1, 3],
        "v" => [1.0, 2.0, 3.0]
    )
    .unwrap();
    let op = FillGapsOperator::bind(&schema_of(&df), &OperatorOptions::new()).unwrap();
    assert!(matches!(run(op, &df), Err(TsfoldError::Computation(_))));

    let options = OperatorOptions::new().with("fill_until", "yesterday");
    assert!(matches!(
        FillGapsOperator::bind(&schema_of(&df), &options),
        Err(TsfoldError::ConfigParse { ref key, .. }) if key == "fill_until"
    ));
}
