use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::io;
use std::path::PathBuf;

use taxcredit_rs::compare::{
    deepest_level, isolate_top_params, method_by_dataset, pairwise_method_comparisons, parameter_comparisons,
    per_level_kruskal_wallis, rows_at_level, Direction, Metric, ScoredRow,
};
use taxcredit_rs::params::ParamSchemas;
use taxcredit_rs::report::{
    read_accuracy_summary_file, read_mock_results_file, write_level_tests, write_pairwise_comparisons,
    write_parameter_tallies, write_per_level_accuracy,
};
use taxcredit_rs::stats::Correction;
use taxcredit_rs::{
    evaluate_classification_accuracy, evaluate_results, extract_per_level_accuracy, AccuracyEvalConfig,
    MockEvalConfig, TestMode,
};

type CliResult<T> = std::result::Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "taxcredit-rs")]
#[command(version)]
#[command(about = "Evaluate taxonomy classifiers against mock communities and simulated query sets", long_about = None)]
struct Cli {
    /// Worker threads (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score mock-community feature tables against their expected composition
    Mock(MockArgs),

    /// Score per-sequence assignments of novel-taxa or cross-validated runs
    Accuracy(AccuracyArgs),

    /// Split an accuracy summary into per-level match ratios
    PerLevel(PerLevelArgs),

    /// Compare methods in a results file
    Compare(CompareArgs),
}

#[derive(Args)]
struct MockArgs {
    /// Directories holding <results-dirname>/<dataset>/<reference>/<method>/<params>/
    #[arg(long = "results-dir", required = true)]
    results_dirs: Vec<PathBuf>,
    #[arg(long, default_value = "mock-community")]
    results_dirname: String,
    /// Root of <dataset>/<reference>/expected/ tables
    #[arg(long)]
    expected_dir: PathBuf,
    /// Tab-delimited output, reused on later runs unless --force
    #[arg(long, default_value = "mock_results.tsv")]
    results_fp: PathBuf,
    /// Taxonomic ranks to evaluate (0 = kingdom)
    #[arg(long = "level", value_delimiter = ',', default_values_t = vec![2, 3, 4, 5, 6])]
    levels: Vec<usize>,
    #[arg(long, default_value_t = 0.0)]
    min_count: f64,
    /// Only keep taxa under this lineage, e.g. "k__Bacteria;p__Firmicutes"
    #[arg(long)]
    taxa_to_keep: Option<String>,
    #[arg(long, default_value = "taxonomy")]
    md_key: String,
    /// Extra parameter schemas, e.g. "q2-nb=confidence,alpha"
    #[arg(long = "param-schema")]
    param_schemas: Vec<String>,
    #[arg(long)]
    no_correlations: bool,
    /// Evaluate only this many randomly chosen result tables
    #[arg(long)]
    subsample: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    NovelTaxa,
    CrossValidated,
}

impl From<ModeArg> for TestMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::NovelTaxa => TestMode::NovelTaxa,
            ModeArg::CrossValidated => TestMode::CrossValidated,
        }
    }
}

#[derive(Args)]
struct AccuracyArgs {
    /// Directories holding <dataset>/<method>/<params>/query_tax_assignments.txt
    #[arg(long = "results-dir", required = true)]
    results_dirs: Vec<PathBuf>,
    /// Root of <dataset>/query_taxa.tsv
    #[arg(long)]
    expected_dir: PathBuf,
    #[arg(long, default_value = "evaluate_classification_summary.csv")]
    summary_fp: PathBuf,
    #[arg(long, value_enum, default_value = "novel-taxa")]
    mode: ModeArg,
    /// Skip writing classification_accuracy_log.tsv files
    #[arg(long)]
    no_logs: bool,
}

#[derive(Args)]
struct PerLevelArgs {
    /// Summary written by `accuracy`
    summary_fp: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputKind {
    /// Tab-delimited output of `mock`
    Mock,
    /// Comma-delimited summary of `accuracy`, split per level
    Accuracy,
}

#[derive(Args)]
struct CompareArgs {
    input: PathBuf,
    #[arg(long, value_enum, default_value = "mock")]
    kind: InputKind,
    #[arg(long, default_value = "F-measure")]
    metric: Metric,
    /// Lower metric values are better
    #[arg(long)]
    minimize: bool,
    /// Compare every parameter set instead of each method's best
    #[arg(long)]
    all_params: bool,
    #[arg(long)]
    paired: bool,
    #[arg(long)]
    parametric: bool,
    #[arg(long, default_value = "fdr_bh")]
    correction: Correction,
    /// Level to rank methods and parameters at (defaults to the deepest level present)
    #[arg(long)]
    at_level: Option<usize>,
    /// Also test each level for differences between methods
    #[arg(long = "level", value_delimiter = ',')]
    levels: Vec<usize>,
    /// Print the best parameters per method for this dataset
    #[arg(long)]
    best_for: Option<String>,
    /// Count how often each parameter set of this method ranks near the top
    #[arg(long)]
    tally: Option<String>,
}

fn spinner(color: &str, msg: &str) -> CliResult<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))?,
    );
    spinner.set_message(msg.to_string());
    Ok(spinner)
}

fn run_mock(args: MockArgs) -> CliResult<()> {
    let mut schemas = ParamSchemas::default();
    for spec in &args.param_schemas {
        schemas.register_spec(spec)?;
    }
    let config = MockEvalConfig {
        results_dirs: args.results_dirs,
        results_dirname: args.results_dirname,
        expected_dir: args.expected_dir,
        results_fp: args.results_fp,
        levels: args.levels,
        min_count: args.min_count,
        taxa_to_keep: args
            .taxa_to_keep
            .map(|t| t.split(';').map(|s| s.trim().to_string()).collect()),
        md_key: args.md_key,
        schemas,
        correlations: !args.no_correlations,
        subsample: args.subsample.is_some(),
        subsample_size: args.subsample.unwrap_or(MockEvalConfig::default().subsample_size),
        seed: args.seed,
        force: args.force,
        ..MockEvalConfig::default()
    };

    let spinner = spinner("blue", "Scoring mock-community tables...")?;
    let rows = evaluate_results(&config)?;
    spinner.finish_with_message(format!(
        "{} result rows in {}.",
        rows.len(),
        config.results_fp.display()
    ));
    Ok(())
}

fn run_accuracy(args: AccuracyArgs) -> CliResult<()> {
    let config = AccuracyEvalConfig {
        results_dirs: args.results_dirs,
        expected_dir: args.expected_dir,
        summary_fp: args.summary_fp,
        mode: args.mode.into(),
        write_logs: !args.no_logs,
    };

    let spinner = spinner("green", "Scoring query assignments...")?;
    let rows = evaluate_classification_accuracy(&config)?;
    spinner.finish_with_message(format!(
        "Summarised {} result directories in {}.",
        rows.len(),
        config.summary_fp.display()
    ));
    Ok(())
}

fn run_per_level(args: PerLevelArgs) -> CliResult<()> {
    let rows = read_accuracy_summary_file(&args.summary_fp)?;
    write_per_level_accuracy(io::stdout().lock(), &extract_per_level_accuracy(&rows))?;
    Ok(())
}

fn compare_rows<R: ScoredRow + Clone>(rows: Vec<R>, args: &CompareArgs) -> CliResult<()> {
    let direction = if args.minimize {
        Direction::Minimize
    } else {
        Direction::Maximize
    };

    let Some(level) = args.at_level.or_else(|| deepest_level(&rows)) else {
        log::warn!("{} has no result rows", args.input.display());
        return Ok(());
    };
    let ranked = rows_at_level(&rows, level);
    if ranked.is_empty() {
        return Err(format!("no result rows at level {level}").into());
    }
    log::info!("Ranking {} rows at level {level}", ranked.len());

    if let Some(dataset) = &args.best_for {
        for r in method_by_dataset(&ranked, dataset, args.metric, direction) {
            println!(
                "{}\t{}\t{}",
                r.method(),
                r.parameters(),
                r.score(args.metric).unwrap_or(f64::NAN)
            );
        }
    }

    if let Some(method) = &args.tally {
        let metrics = [Metric::Precision, Metric::Recall, Metric::FMeasure];
        let names: Vec<String> = metrics.iter().map(|m| m.to_string()).collect();
        write_parameter_tallies(io::stdout().lock(), &parameter_comparisons(&ranked, method, &metrics), &names)?;
    }

    let (compared, all_levels) = if args.all_params {
        (ranked, rows)
    } else {
        let (best, winners) = isolate_top_params(&ranked, args.metric, direction);
        for (method, params) in &winners {
            log::info!("Best {} for {method} at level {level}: {params}", args.metric);
        }
        let all_levels = rows
            .into_iter()
            .filter(|r| winners.iter().any(|(m, p)| m == r.method() && p == r.parameters()))
            .collect();
        (best, all_levels)
    };

    let comparisons = pairwise_method_comparisons(&compared, args.metric, args.paired, args.parametric, args.correction);
    write_pairwise_comparisons(io::stdout().lock(), &comparisons)?;

    if !args.levels.is_empty() {
        let tests = per_level_kruskal_wallis(&all_levels, &[args.metric], &args.levels, R::method, args.correction);
        write_level_tests(io::stdout().lock(), &tests)?;
    }
    Ok(())
}

fn run_compare(args: CompareArgs) -> CliResult<()> {
    match args.kind {
        InputKind::Mock => compare_rows(read_mock_results_file(&args.input)?, &args),
        InputKind::Accuracy => {
            let summary = read_accuracy_summary_file(&args.input)?;
            compare_rows(extract_per_level_accuracy(&summary), &args)
        }
    }
}

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
    }

    match cli.command {
        Commands::Mock(args) => run_mock(args),
        Commands::Accuracy(args) => run_accuracy(args),
        Commands::PerLevel(args) => run_per_level(args),
        Commands::Compare(args) => run_compare(args),
    }
}
