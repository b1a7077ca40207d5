//! `vulca` command line
//!
//! Compares evaluated subjects from a JSON record file or from the
//! evaluation API, prints the summary and optionally exports it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vulca_engine::analysis::leaderboard;
use vulca_engine::client::{EvaluationSource, HttpEvaluationSource, RawEvaluation, StaticEvaluationSource};
use vulca_engine::dimensions::{DimensionCatalog, PerspectiveCatalog};
use vulca_engine::viz::{ViewLevel, ViewSettings};
use vulca_engine::{ComparisonReport, EngineConfig, EvaluationService, ExportBundle, FilterMode, ViewMode};

#[derive(Parser)]
#[command(name = "vulca", version, about = "Compare multi-dimensional creative evaluations")]
struct Cli {
    /// Engine configuration file (defaults apply when missing)
    #[arg(long, global = true, default_value = "vulca.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare the subjects in a JSON record file
    Compare {
        records: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Fetch subjects from the evaluation API and compare them
    Fetch {
        #[arg(required = true)]
        subjects: Vec<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Rank the subjects in a JSON record file by overall score
    Leaderboard { records: PathBuf },
    /// Print the built-in dimension and perspective catalogs
    Catalog {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long, default_value = "6d")]
    view: ViewMode,
    #[arg(long, default_value = "overview")]
    level: ViewLevel,
    #[arg(long, default_value = "high-variance")]
    filter: FilterMode,
    /// Dimension count for `--filter custom`
    #[arg(long)]
    count: Option<usize>,
    /// Seed for synthesized 47D jitter
    #[arg(long)]
    seed: Option<u64>,
    /// Write the full JSON export here
    #[arg(long)]
    export: Option<PathBuf>,
    /// Write the per-subject CSV here
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl ViewArgs {
    fn settings(&self) -> ViewSettings {
        ViewSettings::new(self.view).level(self.level).filter(self.filter, self.count)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging() {
        eprintln!("failed to initialize logging: {:#}", e);
    }

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vulca_engine=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("tracing subscriber already set")?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::load(&cli.config)
        .await
        .with_context(|| format!("loading config {}", cli.config.display()))?
        .with_env_overrides()?;

    match cli.command {
        Command::Compare { records, view } => {
            let raw = read_records(&records).await?;
            let ids: Vec<String> = raw.iter().map(|r| r.subject_id.clone()).collect();
            let config = with_seed(config, view.seed);
            let service = EvaluationService::new(StaticEvaluationSource::new(raw), config);
            compare(&service, &ids, &view).await
        }
        Command::Fetch { subjects, view } => {
            let config = with_seed(config, view.seed);
            let source = HttpEvaluationSource::new(&config.api_base_url, config.request_timeout(), config.retry)?;
            let source = match std::env::var("VULCA_API_TOKEN") {
                Ok(token) => source.with_token(token),
                Err(_) => source,
            };
            info!(base_url = %config.api_base_url, "fetching from evaluation API");
            let service = EvaluationService::new(source, config);
            compare(&service, &subjects, &view).await
        }
        Command::Leaderboard { records } => {
            let raw = read_records(&records).await?;
            let ids: Vec<String> = raw.iter().map(|r| r.subject_id.clone()).collect();
            let service = EvaluationService::new(StaticEvaluationSource::new(raw), config);
            let records: Vec<_> = service.evaluations(&ids).await?.into_iter().map(|f| f.value).collect();
            for entry in leaderboard(&records) {
                let flag = if entry.synthesized { " (synthesized 47D)" } else { "" };
                println!("{:>3}. {:<32} {:>6.2}{}", entry.rank, entry.subject_name, entry.overall, flag);
            }
            Ok(())
        }
        Command::Catalog { json } => {
            let dimensions = DimensionCatalog::builtin();
            let perspectives = PerspectiveCatalog::builtin();
            if json {
                let value = serde_json::json!({ "dimensions": dimensions, "perspectives": perspectives });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }
            let mut current = None;
            for entry in &dimensions.entries {
                if current != Some(entry.category) {
                    println!("\n{}", entry.category.label());
                    current = Some(entry.category);
                }
                println!("  {:<28} {}", entry.id, entry.display_name);
            }
            println!("\nCultural perspectives");
            for entry in &perspectives.entries {
                println!("  {:<12} {}", entry.id, entry.description);
            }
            Ok(())
        }
    }
}

fn with_seed(mut config: EngineConfig, seed: Option<u64>) -> EngineConfig {
    if seed.is_some() {
        config.jitter_seed = seed;
    }
    config
}

async fn read_records(path: &Path) -> Result<Vec<RawEvaluation>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing evaluation records in {}", path.display()))
}

async fn compare<S: EvaluationSource>(service: &EvaluationService<S>, ids: &[String], view: &ViewArgs) -> Result<()> {
    let report = service.compare_with(ids, view.settings()).await?;
    print_report(&report);

    if view.export.is_some() || view.csv.is_some() {
        let bundle = ExportBundle::from_report(&report);
        if let Some(path) = &view.export {
            bundle.write_json(path).await.with_context(|| format!("writing {}", path.display()))?;
        }
        if let Some(path) = &view.csv {
            bundle.write_csv(path).await.with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_report(report: &ComparisonReport) {
    let result = &report.result;

    println!("\n{}", "═".repeat(60));
    println!("Comparison ({} view, {} subjects)", report.view.view_mode, result.subjects.len());
    println!("{}", "═".repeat(60));

    if report.is_degraded() {
        println!("⚠ stale data in use: {}", report.stale_inputs.join(", "));
    }
    if report.has_synthesized_data() {
        println!("⚠ some 47D scores are synthesized from 6D summaries");
    }
    if !result.excluded_subjects.is_empty() {
        println!("no data: {}", result.excluded_subjects.join(", "));
    }

    if let Some(pair) = &result.most_similar_pair {
        println!("Most similar:   {} / {} ({:.2})", pair.first, pair.second, pair.difference);
    }
    if let Some(pair) = &result.most_different_pair {
        println!("Most different: {} / {} ({:.2})", pair.first, pair.second, pair.difference);
    }
    println!("Average difference: {:.2}", result.average_difference);

    if !report.displayed_dimensions.is_empty() {
        println!("\nDimensions ({:?}):", report.view.filter_mode);
        for stats in report.displayed_stats() {
            println!("  {:<28} mean {:>6.2}  std {:>6.2}", stats.dim.label(), stats.mean, stats.std);
        }
    }

    for (perspective, summary) in &result.cultural_analysis {
        println!(
            "  {:<12} mean {:>6.2}  best {} ({:.2})",
            perspective.label(),
            summary.mean,
            summary.best_model,
            summary.best_score
        );
    }

    println!("\nChart: {:?} ({})", report.decision.chart_type, report.decision.rationale);
}
