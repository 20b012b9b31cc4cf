use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chartdeck::{
    validate, ChartAdvisor, DataTable, PlanFile, PngDeck, RecordingDeck, RenderOptions, SlideDeck,
    StyleConfig,
};

#[derive(Parser, Debug)]
#[command(name = "chartdeck")]
#[command(about = "Turn a tabular dataset and a chart plan into chart slides", long_about = None)]
struct Args {
    /// Dataset file (.csv or .json), or '-' to read CSV from stdin
    data: String,

    /// Core message placed as the title of every slide
    #[arg(short, long, default_value = "")]
    message: String,

    /// Chart plan JSON file
    #[arg(short, long)]
    plan: PathBuf,

    /// Output directory for rendered PNG slides
    #[arg(short, long, default_value = "slides")]
    out: PathBuf,

    /// Record the deck call log as JSON instead of rendering PNGs
    #[arg(long)]
    dry_run: bool,

    /// Validate the dataset and exit; nonzero status if issues are found
    #[arg(long)]
    check: bool,
}

fn load_table(source: &str) -> Result<DataTable> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read CSV from stdin")?;
        return DataTable::from_csv(buffer.as_bytes());
    }

    let path = PathBuf::from(source);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let value: serde_json::Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse '{}' as JSON", path.display()))?;
        DataTable::from_json(&value)
    } else {
        DataTable::from_csv(contents.as_bytes())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let table = load_table(&args.data)?;

    let report = validate::validate(&table);
    for hint in &report.hints {
        tracing::warn!(hint = %hint, "data quality issue");
    }
    if args.check {
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_valid {
            std::process::exit(1);
        }
        return Ok(());
    }

    let advisor = PlanFile::new(args.plan.clone());
    let plan = advisor
        .advise(&table, &args.message)
        .context("Failed to load chart plan")?;

    let style = StyleConfig::default();

    if args.dry_run {
        let mut deck = RecordingDeck::new();
        let report = chartdeck::run_batch(&mut deck, &table, &args.message, &plan, &style)?;
        println!("{}", deck.to_json()?);
        tracing::info!(slides = report.slide_count, "dry run complete");
        return Ok(());
    }

    let mut deck = PngDeck::new(RenderOptions::default(), style.clone());
    let report = chartdeck::run_batch(&mut deck, &table, &args.message, &plan, &style)?;
    let paths = deck
        .save(&args.out)
        .context("Failed to write rendered slides")?;

    if paths.len() != deck.slide_count() {
        bail!(
            "rendered {} slides but wrote {} files",
            deck.slide_count(),
            paths.len()
        );
    }
    for path in &paths {
        println!("{}", path.display());
    }
    tracing::info!(slides = report.slide_count, "deck written");

    Ok(())
}
