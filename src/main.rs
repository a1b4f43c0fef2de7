use anyhow::{bail, Context};
use polars::prelude::*;
use std::sync::Arc;
use tsfold::config::{AppConfig, ConfigManager, OperatorKind, OperatorOptions};
use tsfold::data::{schema_of, CsvConnector};
use tsfold::engines::{ExecutionContext, GroupOperator, LocalDriver};
use tsfold::model::{BaselineModels, Model};
use tsfold::operators::{
    BacktestOperator, CvFoldsOperator, CvSplitOperator, DecompositionOperator, FillGapsOperator,
    ForecastOperator, MetricsOperator, StatsOperator,
};

fn run<Op: GroupOperator>(operator: Op, config: &AppConfig, df: &DataFrame) -> anyhow::Result<DataFrame> {
    let ctx = ExecutionContext::new(operator).with_batch_capacity(config.engine.batch_capacity);
    let partitions = CsvConnector::partition(df, config.engine.workers, config.engine.batch_capacity);
    Ok(LocalDriver::collect(&ctx, partitions)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: tsfold <config.toml> [input.csv]");
    };
    let manager = ConfigManager::new();
    manager
        .load_from_file(&path)
        .with_context(|| format!("loading {}", path))?;
    if let Some(input) = args.next() {
        manager.update(|c| c.job.input = input.into())?;
    }
    let config = manager.get()?;
    let job = &config.job;

    let df = CsvConnector::load(&job.input)
        .with_context(|| format!("reading {}", job.input.display()))?;
    let df = CsvConnector::project(df, &job.columns)?;
    let schema = schema_of(&df);
    let options = OperatorOptions::from_map(&job.options);
    let model: Arc<dyn Model> = Arc::new(BaselineModels);

    let out = match job.operator {
        OperatorKind::Backtest => run(BacktestOperator::bind(&schema, &options, model)?, &config, &df)?,
        OperatorKind::Forecast => run(ForecastOperator::bind(&schema, &options, model)?, &config, &df)?,
        OperatorKind::CvSplit => run(CvSplitOperator::bind(&schema, &options)?, &config, &df)?,
        OperatorKind::Metrics => run(MetricsOperator::bind(&schema, &options)?, &config, &df)?,
        OperatorKind::Stats => run(StatsOperator::bind(&schema, &options)?, &config, &df)?,
        OperatorKind::Decomposition => {
            run(DecompositionOperator::bind(&schema, &options, model)?, &config, &df)?
        }
        OperatorKind::FillGaps => run(FillGapsOperator::bind(&schema, &options)?, &config, &df)?,
        OperatorKind::CvFolds => run(CvFoldsOperator::bind(&schema, &options)?, &config, &df)?,
    };

    log::info!("{:?} produced {} rows", job.operator, out.height());
    println!("{}", out);
    Ok(())
}
