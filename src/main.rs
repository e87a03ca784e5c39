use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use essayscore::features::Describe;
use essayscore::io::io_for_path;
use essayscore::operators::LoadTable;
use essayscore::pipeline::Operator;
use essayscore::tracking::RunRecord;
use essayscore::{
    Config, ExtractorRegistry, FeatureCategory, FeatureSet, MemoryTracker, OperatorRegistry,
    PipelineBuilder, PipelineConfig, PipelineContext, RunWindow, SqliteTracker, Tracker,
};

#[derive(Parser, Debug)]
#[command(name = "essayscore")]
#[command(version = "0.1.0")]
#[command(about = "Extract text features from essay discourses and run scoring pipelines")]
struct Args {
    /// Application config file (overrides ESSAYSCORE_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List feature extractors by category and the pipeline operators
    List,

    /// Extract features from a table file
    Extract {
        /// Input table (csv, json or sqlite)
        #[arg(short, long)]
        input: PathBuf,

        /// Output table. Prints summary statistics when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Feature category to extract
        #[arg(long)]
        category: Option<FeatureCategory>,

        /// Feature to extract, repeatable
        #[arg(short, long = "feature")]
        features: Vec<String>,
    },

    /// Run a pipeline definition
    Run {
        /// Pipeline file (defaults to pipeline.config_path)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// First step ordinal to run (1-based)
        #[arg(long)]
        start: Option<usize>,

        /// Step ordinal to stop before
        #[arg(long)]
        stop: Option<usize>,

        /// Keep the tracking run in memory instead of the database
        #[arg(long)]
        no_tracking: bool,
    },

    /// Show tracked pipeline runs
    Runs {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("essayscore=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    match args.command {
        Command::List => list(),
        Command::Extract {
            input,
            output,
            category,
            features,
        } => {
            let config = load_config(args.config)?;
            extract(&config, input, output, category, features).await
        }
        Command::Run {
            pipeline,
            start,
            stop,
            no_tracking,
        } => {
            let config = load_config(args.config)?;
            run(&config, pipeline, RunWindow::new(start, stop), no_tracking).await
        }
        Command::Runs { format, limit } => {
            let config = load_config(args.config)?;
            let tracker = SqliteTracker::new(&config.tracking.database_path)?;
            let runs: Vec<RunRecord> = tracker.list_runs()?.into_iter().take(limit).collect();
            let output = match format.as_str() {
                "json" => serde_json::to_string_pretty(&runs)?,
                _ => format_runs(&runs),
            };
            println!("{}", output);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(path) => Config::from_path(path)?,
        None => Config::from_env()?,
    })
}

fn list() -> anyhow::Result<()> {
    let registry = ExtractorRegistry::builtin()?;

    let mut output = String::new();
    output.push_str("Feature extractors:\n");
    for category in registry.categories() {
        let names = registry.list_category(*category);
        output.push_str(&format!("  {} ({})\n", category, names.len()));
        for name in names {
            output.push_str(&format!("    - {}\n", name));
        }
    }

    output.push_str("\nOperators:\n");
    for (module, operator) in OperatorRegistry::builtin().list() {
        output.push_str(&format!("  {}.{}\n", module, operator));
    }

    println!("{}", output);
    Ok(())
}

async fn extract(
    config: &Config,
    input: PathBuf,
    output: Option<PathBuf>,
    category: Option<FeatureCategory>,
    features: Vec<String>,
) -> anyhow::Result<()> {
    if category.is_none() && features.is_empty() {
        anyhow::bail!("pass --category or at least one --feature");
    }

    let mut context = PipelineContext::new(config.columns.clone(), ".");
    let load = LoadTable {
        path: input,
        retry_lossy: true,
    };
    let table = load
        .execute(None, &mut context)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no table loaded"))?;

    let registry = ExtractorRegistry::builtin()?;
    let mut set = FeatureSet::new(table, config.columns.clone())?;
    if let Some(category) = category {
        set.extract_category(&registry, category)?;
    }
    let names: Vec<&str> = features.iter().map(String::as_str).collect();
    set.extract_named(&registry, &names)?;

    match output {
        Some(path) => {
            io_for_path(&path)?.write(&set.to_table()?, &path)?;
            tracing::info!("Output written to: {}", path.display());
        }
        None => {
            let summaries: Vec<(&str, Describe)> = set
                .list_features()
                .into_iter()
                .map(|name| set.get_feature(name).map(|f| (name, f.describe())))
                .collect::<essayscore::Result<_>>()?;
            println!("{}", format_summaries(&summaries));
        }
    }
    Ok(())
}

async fn run(
    config: &Config,
    pipeline_path: Option<PathBuf>,
    window: RunWindow,
    no_tracking: bool,
) -> anyhow::Result<()> {
    let pipeline_config = PipelineConfig::from(config);
    let path = pipeline_path.unwrap_or_else(|| pipeline_config.config_path.clone());

    let tracker: Box<dyn Tracker> = if no_tracking {
        Box::new(MemoryTracker::new())
    } else {
        Box::new(SqliteTracker::new(&config.tracking.database_path)?)
    };

    let mut pipeline = PipelineBuilder::from_path(&path)?
        .with_context(PipelineContext::from(&pipeline_config))
        .with_tracker(tracker);

    println!("{}", pipeline.steps_summary());
    let data = pipeline.run(window).await?;

    let mut output = String::new();
    output.push_str(&format!(
        "\n=== Pipeline {} v{} ===\n",
        pipeline.name(),
        pipeline.version()
    ));
    if let Some(run_id) = pipeline.run_id() {
        output.push_str(&format!("Run: {}\n", run_id));
    }
    output.push_str(&format!(
        "Duration: {:.4}s\n",
        pipeline.duration().unwrap_or_default()
    ));
    for step in pipeline.steps() {
        match step.duration() {
            Some(duration) => output.push_str(&format!(
                "  {}. {} ({}): {:.4}s\n",
                step.ordinal(),
                step.name(),
                step.kind(),
                duration
            )),
            None => output.push_str(&format!(
                "  {}. {} ({}): skipped\n",
                step.ordinal(),
                step.name(),
                step.kind()
            )),
        }
    }
    for (name, path) in &pipeline.context().artifacts {
        output.push_str(&format!("Artifact {}: {}\n", name, path.display()));
    }
    if let Some(table) = data {
        output.push_str(&format!(
            "Result: {} rows x {} columns\n",
            table.n_rows(),
            table.n_columns()
        ));
    }

    println!("{}", output);
    Ok(())
}

fn format_summaries(summaries: &[(&str, Describe)]) -> String {
    let mut output = String::new();
    output.push_str("| Feature | Count | Mean | Std | Min | 50% | Max |\n");
    output.push_str("|---------|-------|------|-----|-----|-----|-----|\n");
    for (name, d) in summaries {
        output.push_str(&format!(
            "| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} | {:.4} |\n",
            name, d.count, d.mean, d.std, d.min, d.p50, d.max
        ));
    }
    output
}

fn format_runs(runs: &[RunRecord]) -> String {
    if runs.is_empty() {
        return "No tracked runs.".to_string();
    }

    let mut output = String::new();
    for run in runs {
        output.push_str(&format!(
            "{} {} [{}] started {}\n",
            run.id,
            run.name,
            run.status,
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        for (key, value) in &run.metrics {
            output.push_str(&format!("    {}: {}\n", key, value));
        }
    }
    output
}
