use anyhow::{bail, Context, Result};
use coins_explorer::cache::{Dataset, DatasetSource, FileSource};
use coins_explorer::{
    export, ingest_with_stats, init_logging, Config, FilterQuery, IngestStats, LogConfig, RecordSet, RecordsFilter,
};
use std::env;
use std::io::{self, Write};
use tracing::info;

const USAGE: &str = "usage: coins-explorer <summary | export [FIELD=criterion | from=YEAR | to=YEAR | years=complete ...]>";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let log_config = LogConfig::from_env().context("Invalid logging configuration")?;
    init_logging(&log_config).context("Failed to initialize logging")?;

    let config = Config::from_env().context("Failed to load configuration")?;

    match args.first().map(String::as_str) {
        Some("summary") => run_summary(&config),
        Some("export") => run_export(&config, &args[1..]),
        _ => bail!(USAGE),
    }
}

fn load(config: &Config) -> Result<(RecordSet, IngestStats)> {
    let source = FileSource::new(config.data.clone());
    let coins = source.open(Dataset::Coins).context("Cannot open coins dataset")?;
    let wages = source.open(Dataset::Wages).context("Cannot open wages dataset")?;

    ingest_with_stats(coins, wages).context("Failed to ingest datasets")
}

fn run_summary(config: &Config) -> Result<()> {
    let (records, stats) = load(config)?;
    let filter = RecordsFilter::new();
    let all: Vec<_> = records.iter().collect();

    println!("🪙 Coins Explorer - dataset summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Rows read:            {}", stats.rows);
    println!("Records:              {}", stats.records);
    println!("Rows skipped:         {}", stats.skipped_rows);
    println!("Records with links:   {}", stats.linked_records);
    println!("Reconciliation:       {}", stats.reconciliation.summary());
    println!("Wage years:           {}", stats.wage_years);
    println!("Values normalized:    {}", stats.normalized_values);

    if let Some((min, max)) = filter.year_bounds(&all) {
        println!("Years covered:        {} - {}", min, max);
    }

    for (field, values) in filter.distinct_values(&all) {
        println!("Distinct {:<16} {}", format!("{}:", field), values.len());
    }

    Ok(())
}

fn run_export(config: &Config, params: &[String]) -> Result<()> {
    let pairs = params
        .iter()
        .map(|param| match param.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => bail!("Expected key=value, got '{}'", param),
        })
        .collect::<Result<Vec<_>>>()?;
    let query = FilterQuery::from_pairs(pairs);

    let (records, _) = load(config)?;
    let selected = RecordsFilter::new().apply(&records, &query);
    info!(selected = selected.len(), total = records.len(), "Exporting records");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    export::write_records(&mut out, selected).context("Failed to write CSV")?;
    out.flush()?;

    Ok(())
}
