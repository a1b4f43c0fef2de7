use polars::prelude::*;
use std::sync::Arc;
use tsfold::config::OperatorOptions;
use tsfold::data::{schema_of, CsvConnector};
use tsfold::engines::{ExecutionContext, GroupOperator, LocalDriver, ReleaseStrategy};
use tsfold::model::BaselineModels;
use tsfold::operators::{
    BacktestOperator, CvFoldsOperator, CvSplitOperator, FillGapsOperator, ForecastOperator,
};

const FIRST_DAY: i32 = 19_000;

/// Two groups over ten consecutive days: "a" counts up from 0, "b" stays at 5.
fn daily_frame() -> DataFrame {
    let mut ids = Vec::new();
    let mut days = Vec::new();
    let mut values = Vec::new();
    for id in ["a", "b"] {
        for d in 0..10 {
            ids.push(id);
            days.push(FIRST_DAY + d);
            values.push(if id == "a" { d as f64 } else { 5.0 });
        }
    }
    let date = Series::new("date".into(), days).cast(&DataType::Date).unwrap();
    DataFrame::new(vec![
        Column::from(Series::new("id".into(), ids)),
        Column::from(date),
        Column::from(Series::new("value".into(), values)),
    ])
    .unwrap()
}

fn scenario_options() -> OperatorOptions {
    OperatorOptions::new()
        .with("horizon", 3)
        .with("n_folds", 2)
        .with("window_type", "expanding")
        .with("skip_length", 3)
        .with("initial_train_size", 4)
        .with("frequency", "1d")
}

fn run<Op: GroupOperator>(operator: Op, df: &DataFrame, workers: usize) -> DataFrame {
    let ctx = ExecutionContext::new(operator).with_batch_capacity(4);
    LocalDriver::collect(&ctx, CsvConnector::partition(df, workers, 3)).unwrap()
}

fn days(out: &DataFrame, name: &str) -> Vec<i32> {
    out.column(name)
        .unwrap()
        .cast(&DataType::Int32)
        .unwrap()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .map(|d| d - FIRST_DAY)
        .collect()
}

/// (id, fold_id, day, forecast, actual, score) sorted by id, fold and day.
fn backtest_rows(out: &DataFrame) -> Vec<(String, i64, i32, f64, f64, f64)> {
    let ids = out.column("id").unwrap().str().unwrap().clone();
    let folds = out.column("fold_id").unwrap().i64().unwrap().clone();
    let forecast = out.column("forecast").unwrap().f64().unwrap().clone();
    let actual = out.column("actual").unwrap().f64().unwrap().clone();
    let score = out.column("fold_metric_score").unwrap().f64().unwrap().clone();
    let day = days(out, "date");

    let mut rows: Vec<_> = (0..out.height())
        .map(|i| {
            (
                ids.get(i).unwrap().to_string(),
                folds.get(i).unwrap(),
                day[i],
                forecast.get(i).unwrap(),
                actual.get(i).unwrap(),
                score.get(i).unwrap(),
            )
        })
        .collect();
    rows.sort_by(|x, y| (&x.0, x.1, x.2).cmp(&(&y.0, y.1, y.2)));
    rows
}

#[test]
fn test_backtest_drops_the_overhanging_fold() {
    let df = daily_frame();
    let op = BacktestOperator::bind(&schema_of(&df), &scenario_options(), Arc::new(BaselineModels))
        .unwrap();
    let out = run(op, &df, 3);

    assert_eq!(out.column("date").unwrap().dtype(), &DataType::Date);
    let rows = backtest_rows(&out);
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.1 == 1));

    let a: Vec<_> = rows.iter().filter(|r| r.0 == "a").collect();
    assert_eq!(a.iter().map(|r| r.2).collect::<Vec<_>>(), vec![5, 6, 7]);
    assert!(a.iter().all(|r| r.3 == 4.0));
    assert_eq!(a.iter().map(|r| r.4).collect::<Vec<_>>(), vec![5.0, 6.0, 7.0]);

    let b: Vec<_> = rows.iter().filter(|r| r.0 == "b").collect();
    assert!(b.iter().all(|r| r.3 == 5.0 && r.4 == 5.0));

    // RMSE over both groups: squared errors 1, 4, 9 from "a" and zeros from "b".
    let expected = (14.0f64 / 6.0).sqrt();
    assert!(rows.iter().all(|r| (r.5 - expected).abs() < 1e-12));
}

#[test]
fn test_per_group_release_scores_each_group_alone() {
    let df = daily_frame();
    let op = BacktestOperator::bind(&schema_of(&df), &scenario_options(), Arc::new(BaselineModels))
        .unwrap();
    let ctx = ExecutionContext::new(op)
        .with_release_strategy(ReleaseStrategy::PerGroup)
        .with_batch_capacity(4);
    let out = LocalDriver::collect(&ctx, CsvConnector::partition(&df, 2, 3)).unwrap();
    let rows = backtest_rows(&out);

    let expected_a = (14.0f64 / 3.0).sqrt();
    assert!(rows
        .iter()
        .all(|r| if r.0 == "a" { (r.5 - expected_a).abs() < 1e-12 } else { r.5 == 0.0 }));
}

#[test]
fn test_backtest_clip_horizon_keeps_truncated_fold() {
    let df = daily_frame();
    let options = scenario_options().with("clip_horizon", true);
    let op = BacktestOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let rows = backtest_rows(&run(op, &df, 2));

    assert_eq!(rows.len(), 10);
    let second: Vec<_> = rows.iter().filter(|r| r.0 == "a" && r.1 == 2).collect();
    assert_eq!(second.iter().map(|r| r.2).collect::<Vec<_>>(), vec![8, 9]);
    assert!(second.iter().all(|r| r.3 == 7.0));
}

#[test]
fn test_backtest_error_columns() {
    let df = daily_frame();
    let op = BacktestOperator::bind(&schema_of(&df), &scenario_options(), Arc::new(BaselineModels))
        .unwrap();
    let out = run(op, &df, 1);

    let forecast = out.column("forecast").unwrap().f64().unwrap().clone();
    let actual = out.column("actual").unwrap().f64().unwrap().clone();
    let error = out.column("error").unwrap().f64().unwrap().clone();
    let abs_error = out.column("abs_error").unwrap().f64().unwrap().clone();
    for i in 0..out.height() {
        let e = forecast.get(i).unwrap() - actual.get(i).unwrap();
        assert_eq!(error.get(i), Some(e));
        assert_eq!(abs_error.get(i), Some(e.abs()));
    }
    let names = out.column("model_name").unwrap().str().unwrap().clone();
    assert!(names.into_iter().all(|n| n == Some("Naive")));
}

#[test]
fn test_forecast_extends_each_group_by_calendar_days() {
    let df = daily_frame();
    let options = OperatorOptions::new().with("horizon", 3);
    let op = ForecastOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df, 2);

    assert_eq!(out.height(), 6);
    assert_eq!(out.column("date").unwrap().dtype(), &DataType::Date);

    let ids = out.column("id").unwrap().str().unwrap().clone();
    let steps = out.column("forecast_step").unwrap().i64().unwrap().clone();
    let point = out.column("point_forecast").unwrap().f64().unwrap().clone();
    let day = days(&out, "date");
    for i in 0..out.height() {
        let step = steps.get(i).unwrap() as i32;
        assert_eq!(day[i], 9 + step);
        let expected = if ids.get(i) == Some("a") { 9.0 } else { 5.0 };
        assert_eq!(point.get(i), Some(expected));
    }
}

#[test]
fn test_forecast_keeps_timestamp_type() {
    let hour_ms = 3_600_000i64;
    let stamps: Vec<i64> = (0..6).map(|h| h * hour_ms).collect();
    let ts = Series::new("ts".into(), stamps)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
    let df = DataFrame::new(vec![
        Column::from(Series::new("id".into(), vec!["x"; 6])),
        Column::from(ts),
        Column::from(Series::new("value".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
    ])
    .unwrap();

    let options = OperatorOptions::new().with("horizon", 2).with("frequency", "1h");
    let op = ForecastOperator::bind(&schema_of(&df), &options, Arc::new(BaselineModels)).unwrap();
    let out = run(op, &df, 1);

    let column = out.column("ts").unwrap();
    assert_eq!(
        column.dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );
    let micros: Vec<i64> = column
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(micros, vec![6 * hour_ms * 1_000, 7 * hour_ms * 1_000]);
}

#[test]
fn test_cv_split_tags_train_and_test_rows() {
    let df = daily_frame();
    let op = CvSplitOperator::bind(&schema_of(&df), &scenario_options()).unwrap();
    let out = run(op, &df, 2);

    // One fold: days 0..=4 train, 5..=7 test, for both groups.
    assert_eq!(out.height(), 16);
    let split = out.column("split").unwrap().str().unwrap().clone();
    let day = days(&out, "date");
    for (i, d) in day.iter().enumerate() {
        let expected = if *d <= 4 { "train" } else { "test" };
        assert_eq!(split.get(i), Some(expected));
        assert!(*d <= 7);
    }
    assert_eq!(out.column("value").unwrap().dtype(), &DataType::Float64);
}

#[test]
fn test_monthly_frequency_uses_positions() {
    // Month ends: 2024-01-31 .. 2024-06-30, as days since the epoch.
    let month_ends = vec![19_753i32, 19_782, 19_813, 19_843, 19_874, 19_904];
    let date = Series::new("date".into(), month_ends)
        .cast(&DataType::Date)
        .unwrap();
    let df = DataFrame::new(vec![
        Column::from(Series::new("id".into(), vec!["m"; 6])),
        Column::from(date),
        Column::from(Series::new("value".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
    ])
    .unwrap();

    let options = OperatorOptions::new()
        .with("horizon", 1)
        .with("n_folds", 2)
        .with("frequency", "monthly");
    let op = CvSplitOperator::bind(&schema_of(&df), &options).unwrap();
    let out = run(op, &df, 1);

    // Automatic initial size leaves room for both folds: 4 train points,
    // then one test month each.
    let folds = out.column("fold_id").unwrap().i64().unwrap().clone();
    let split = out.column("split").unwrap().str().unwrap().clone();
    let tests: Vec<(i64, i32)> = (0..out.height())
        .filter(|i| split.get(*i) == Some("test"))
        .map(|i| (folds.get(i).unwrap(), days(&out, "date")[i]))
        .collect();
    assert_eq!(tests, vec![(1, 19_874 - FIRST_DAY), (2, 19_904 - FIRST_DAY)]);
}

#[test]
fn test_cv_folds_lists_each_fold_once() {
    let df = daily_frame();
    for release in [ReleaseStrategy::Bulk, ReleaseStrategy::PerGroup] {
        let op = CvFoldsOperator::bind(&schema_of(&df), &scenario_options()).unwrap();
        let ctx = ExecutionContext::new(op)
            .with_release_strategy(release)
            .with_batch_capacity(4);
        let out = LocalDriver::collect(&ctx, CsvConnector::partition(&df, 2, 3)).unwrap();

        assert_eq!(out.height(), 1);
        let fold: Vec<i64> = out.column("fold_id").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(fold, vec![1]);
        assert_eq!(days(&out, "train_start"), vec![0]);
        assert_eq!(days(&out, "train_end"), vec![4]);
        assert_eq!(days(&out, "test_start"), vec![5]);
        assert_eq!(days(&out, "test_end"), vec![7]);
        assert_eq!(out.column("test_end").unwrap().dtype(), &DataType::Date);
    }
}

#[test]
fn test_fill_gaps_on_dates_runs_to_the_limit() {
    let df = daily_frame()
        .lazy()
        .filter(
            col("id")
                .eq(lit("a"))
                .and(col("value").lt_eq(lit(1.0)).or(col("value").eq(lit(4.0)))),
        )
        .collect()
        .unwrap();
    let options = OperatorOptions::new()
        .with("frequency", "1d")
        .with("fill_until", "2022-01-14");
    let op = FillGapsOperator::bind(&schema_of(&df), &options).unwrap();
    let out = run(op, &df, 2)
        .sort(["date"], SortMultipleOptions::default())
        .unwrap();

    assert_eq!(days(&out, "date"), vec![0, 1, 2, 3, 4, 5, 6]);
    let values: Vec<Option<f64>> = out.column("value").unwrap().f64().unwrap().into_iter().collect();
    assert_eq!(
        values,
        vec![Some(0.0), Some(1.0), None, None, Some(4.0), None, None]
    );
    assert_eq!(out.column("date").unwrap().dtype(), &DataType::Date);
}
