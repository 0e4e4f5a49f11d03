use assetsweep::config::{AnalysisConfig, Config};
use assetsweep::engine::Engine;
use assetsweep::plan::CleanupPlan;
use assetsweep::refactor::Quarantine;
use assetsweep::report::{ClassificationReport, ReportFormat, Reporter};
use assetsweep::watch::FileWatcher;
use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// assetsweep - Find unused assets in game project content and plan their removal
#[derive(Parser, Debug)]
#[command(name = "assetsweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content directory, relative to the project (default: Content)
    #[arg(long)]
    content: Option<PathBuf>,

    /// Assets that are always kept, as ids or glob patterns (can be specified multiple times)
    #[arg(short, long)]
    root: Vec<String>,

    /// Asset path patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compute and print a cleanup plan
    #[arg(long)]
    plan: bool,

    /// Execute the cleanup plan by moving assets into quarantine
    #[arg(long)]
    delete: bool,

    /// Dry run - show what would be moved without making changes
    #[arg(long)]
    dry_run: bool,

    /// Interactive mode for deletions (confirm each)
    #[arg(long)]
    interactive: bool,

    /// Skip the final confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Where quarantined assets are moved (default: <project>/.assetsweep/quarantine)
    #[arg(long, value_name = "DIR")]
    quarantine_dir: Option<PathBuf>,

    /// Generate undo script
    #[arg(long, value_name = "FILE")]
    undo_script: Option<PathBuf>,

    /// Also list used assets in terminal output
    #[arg(long)]
    show_used: bool,

    /// Do not scan source and config files for asset paths
    #[arg(long)]
    no_indirect: bool,

    /// Watch mode - refresh the analysis as content changes
    #[arg(long)]
    watch: bool,

    /// Worker threads for extraction (0 = all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    info!("assetsweep v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config(&cli)?;
    let analysis = config.analysis_config(&cli.path);
    let mut engine = Engine::from_config(&config, &cli.path).into_diagnostic()?;

    run_analysis(&mut engine, &analysis, &cli)?;

    if cli.watch {
        run_watch_mode(&mut engine, &analysis, &cli)?;
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    // Reports go to stdout; keep logs off it
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        // Try to load from default locations
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if let Some(content) = &cli.content {
        config.content_dir = content.clone();
    }
    if !cli.root.is_empty() {
        config.roots.extend(cli.root.clone());
    }
    if !cli.exclude.is_empty() {
        config.exclude.paths.extend(cli.exclude.clone());
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if cli.no_indirect {
        config.indirect.enabled = false;
    }

    Ok(config)
}

fn run_analysis(engine: &mut Engine, analysis: &AnalysisConfig, cli: &Cli) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let start_time = Instant::now();

    let show_progress = !cli.quiet && matches!(cli.format, OutputFormat::Terminal);
    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .into_diagnostic()?,
        );
        pb.set_message(format!("Analyzing {}", analysis.content_root.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = engine.run_analysis(analysis);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let report = result.into_diagnostic()?;

    info!("Analysis completed in {:.2}s", start_time.elapsed().as_secs_f64());

    let plan = plan_for(engine, &report, cli)?;
    render(&report, plan.as_ref(), cli)?;

    // Execute the plan if requested
    if cli.delete {
        let Some(plan) = plan else {
            return Ok(());
        };
        let graph = engine
            .graph()
            .ok_or_else(|| miette::miette!("No graph to execute the plan against"))?;
        let quarantine_dir = cli
            .quarantine_dir
            .clone()
            .unwrap_or_else(|| cli.path.join(".assetsweep").join("quarantine"));

        Quarantine::new(analysis.content_root.clone(), quarantine_dir)
            .with_sidecar_suffix(&analysis.sidecar_suffix)
            .with_interactive(cli.interactive)
            .with_confirmation(!cli.yes)
            .with_dry_run(cli.dry_run)
            .with_undo_script(cli.undo_script.clone())
            .execute(&plan, graph)
            .into_diagnostic()?;
    }

    Ok(())
}

fn plan_for(engine: &Engine, report: &ClassificationReport, cli: &Cli) -> Result<Option<CleanupPlan>> {
    if !(cli.plan || cli.delete) {
        return Ok(None);
    }
    if !report.is_complete() {
        eprintln!("{}", "Analysis incomplete; no plan computed.".yellow());
        return Ok(None);
    }
    engine.compute_plan(report).map(Some).into_diagnostic()
}

fn render(report: &ClassificationReport, plan: Option<&CleanupPlan>, cli: &Cli) -> Result<()> {
    Reporter::new(cli.format.clone().into(), cli.output.clone())
        .with_used(cli.show_used)
        .report(report, plan)
}

fn run_watch_mode(engine: &mut Engine, analysis: &AnalysisConfig, cli: &Cli) -> Result<()> {
    let watcher = FileWatcher::new()
        .with_extensions(analysis.extensions.clone())
        .with_sidecar_suffix(&analysis.sidecar_suffix);

    watcher
        .watch(&analysis.content_root, |changed| {
            let outcome = engine.refresh(changed).into_diagnostic().and_then(|report| {
                let plan = plan_for(engine, &report, cli)?;
                render(&report, plan.as_ref(), cli)
            });
            match outcome {
                Ok(()) => {
                    println!();
                    println!("{}", "✓ Refreshed. Waiting for changes...".green());
                }
                Err(e) => {
                    eprintln!("{}: {:?}", "Analysis error".red(), e);
                }
            }
            true // Continue watching
        })
        .map_err(|e| miette::miette!("Watch error: {}", e))?;

    Ok(())
}
