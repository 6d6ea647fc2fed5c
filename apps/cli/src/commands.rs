//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rulegraph_core::{
    BatchConfig, BatchReport, DirectorySource, DocumentRef, DocumentSource, ProgressReporter,
    load_registry, process_document, run_batch,
};
use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::{AppConfig, GraphFormat, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rulegraph: classify court rules and build their knowledge graph.
#[derive(Parser)]
#[command(
    name = "rulegraph",
    version,
    about = "Classify court-rule documents and build a cross-reference knowledge graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.rulegraph/rulegraph.toml).
    #[arg(long, global = true, env = "RULEGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process a directory of documents and rebuild the collection's graph.
    Run {
        /// Directory of *.json / *.txt / *.md documents.
        dir: PathBuf,

        /// Collection name (defaults to the directory name).
        #[arg(short, long)]
        collection: Option<String>,

        /// Data directory holding corpus and graph files.
        #[arg(long)]
        data_dir: Option<String>,

        /// Hours after which the whole collection is reprocessed.
        #[arg(long)]
        stale_hours: Option<f64>,

        /// Parallel fetch/classify workers.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Delay before each fetch, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Graph formats to write (comma-separated: attribute,force,graphml).
        #[arg(long, value_delimiter = ',')]
        formats: Option<Vec<GraphFormatArg>>,

        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a single document file and print the result as JSON.
    Classify {
        /// A *.json / *.txt / *.md document.
        file: PathBuf,
    },

    /// Inspect the pattern registry.
    Patterns {
        #[command(subcommand)]
        action: PatternsAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum GraphFormatArg {
    Attribute,
    Force,
    Graphml,
}

impl From<GraphFormatArg> for GraphFormat {
    fn from(arg: GraphFormatArg) -> Self {
        match arg {
            GraphFormatArg::Attribute => GraphFormat::Attribute,
            GraphFormatArg::Force => GraphFormat::Force,
            GraphFormatArg::Graphml => GraphFormat::Graphml,
        }
    }
}

/// Pattern registry subcommands.
#[derive(Subcommand)]
pub(crate) enum PatternsAction {
    /// List every pattern rule.
    List {
        /// Only rules whose category starts with this prefix.
        #[arg(long)]
        category: Option<String>,
    },
    /// Compile a registry file and report problems.
    Validate {
        /// Registry TOML (defaults to the configured or built-in registry).
        path: Option<PathBuf>,
    },
    /// Print the built-in registry as TOML.
    Dump,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rulegraph=info",
        1 => "rulegraph=debug",
        _ => "rulegraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so JSON output on stdout stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Run {
            dir,
            collection,
            data_dir,
            stale_hours,
            concurrency,
            delay_ms,
            formats,
            json,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            let overrides = RunOverrides {
                data_dir,
                stale_hours,
                concurrency,
                delay_ms,
                formats,
            };
            overrides.apply(&mut config);
            config.validate()?;
            cmd_run(&config, &dir, collection.as_deref(), json).await
        }
        Command::Classify { file } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_classify(&config, &file).await
        }
        Command::Patterns { action } => {
            let config = resolve_config(config_path.as_deref())?;
            match action {
                PatternsAction::List { category } => cmd_patterns_list(&config, category.as_deref()),
                PatternsAction::Validate { path } => cmd_patterns_validate(&config, path.as_deref()),
                PatternsAction::Dump => cmd_patterns_dump(),
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Command-line values that take precedence over the config file.
struct RunOverrides {
    data_dir: Option<String>,
    stale_hours: Option<f64>,
    concurrency: Option<usize>,
    delay_ms: Option<u64>,
    formats: Option<Vec<GraphFormatArg>>,
}

impl RunOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.data_dir {
            config.corpus.data_dir = dir;
        }
        if let Some(hours) = self.stale_hours {
            config.corpus.stale_threshold_hours = hours;
        }
        if let Some(n) = self.concurrency {
            config.fetch.concurrency = n;
        }
        if let Some(ms) = self.delay_ms {
            config.fetch.delay_ms = ms;
        }
        if let Some(formats) = self.formats {
            config.graph.output_formats = formats.into_iter().map(GraphFormat::from).collect();
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn collection_name(dir: &Path, collection: Option<&str>) -> Result<String> {
    if let Some(name) = collection {
        return Ok(name.to_string());
    }
    let canonical = std::fs::canonicalize(dir).map_err(|e| eyre!("cannot read '{}': {e}", dir.display()))?;
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("cannot derive a collection name from '{}'; pass --collection", dir.display()))
}

async fn cmd_run(config: &AppConfig, dir: &Path, collection: Option<&str>, json: bool) -> Result<()> {
    let collection = collection_name(dir, collection)?;
    let registry = Arc::new(load_registry(&config.patterns)?);
    let batch = BatchConfig::from_app_config(config, &collection)?;
    let source = Arc::new(DirectorySource::new(dir, &collection));

    info!(
        dir = %source.dir().display(),
        collection = %collection,
        corpus = %batch.corpus_path.display(),
        "starting batch run"
    );

    let reporter = CliProgress::new(json);
    let report = run_batch(source, registry, &batch, Utc::now(), &reporter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    println!("  Collection: {}", report.collection);
    println!(
        "  Mode:       {}",
        if report.stale { "full refresh" } else { "incremental" }
    );
    if let Some(warning) = &report.corpus_warning {
        println!("  Warning:    previous corpus discarded ({warning})");
    }
    println!("  Processed:  {} ({} skipped)", report.eligible, report.skipped.len());
    println!("  Succeeded:  {}", report.succeeded);
    println!("  Degraded:   {}", report.degraded);
    println!("  Failed:     {}", report.failed.len());
    for failure in &report.failed {
        println!("    - {}: {}", failure.identifier, failure.error);
    }
    println!(
        "  Merged:     {} added, {} replaced, {} duplicates",
        report.merge.added.len(),
        report.merge.replaced.len(),
        report.merge.duplicates.len()
    );
    for dup in &report.merge.duplicates {
        println!("    - {} duplicates {}", dup.rejected_id, dup.existing_id);
    }
    println!("  Corpus:     {} documents", report.corpus_size);
    println!("  Graph:      {} nodes, {} edges", report.graph_nodes, report.graph_edges);
    if let Some(overflow) = &report.overflow {
        println!(
            "  Truncated:  {} nodes, {} edges dropped",
            overflow.nodes_dropped, overflow.edges_dropped
        );
    }
    for path in &report.written {
        println!("  Wrote:      {}", path.display());
    }
    println!("  Time:       {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();
}

async fn cmd_classify(config: &AppConfig, file: &Path) -> Result<()> {
    let registry = load_registry(&config.patterns)?;
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let identifier = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("'{}' is not a file", file.display()))?;

    // Probe the file through the directory source so json metadata is honored.
    let source = DirectorySource::new(dir, "adhoc");
    let doc_ref = source
        .enumerate()
        .await?
        .into_iter()
        .find(|r| Path::new(&r.locator).file_name() == file.file_name())
        .unwrap_or(DocumentRef {
            identifier,
            locator: file.to_string_lossy().into_owned(),
        });
    let doc = source.fetch(&doc_ref).await?;

    let batch = BatchConfig::from_app_config(config, "adhoc")?;
    let entry = process_document(doc, &registry, &batch, Utc::now());
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn cmd_patterns_list(config: &AppConfig, category: Option<&str>) -> Result<()> {
    let registry = load_registry(&config.patterns)?;
    let rules = registry.rules();
    let mut shown = 0;
    for rule in rules
        .iter()
        .filter(|r| category.is_none_or(|prefix| r.category.starts_with(prefix)))
    {
        let kind = match rule.kind {
            rulegraph_patterns::PatternKind::Keyword => "keyword",
            rulegraph_patterns::PatternKind::Regex => "regex",
        };
        println!("{:<40} {:<8} {:>3}  {}", rule.category, kind, rule.weight, rule.pattern);
        shown += 1;
    }
    println!();
    println!("  {shown} of {} rules", rules.len());
    Ok(())
}

fn cmd_patterns_validate(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let (label, registry) = match path {
        Some(p) => (p.display().to_string(), PatternRegistry::load(p)?),
        None => {
            let label = config
                .patterns
                .registry_path
                .clone()
                .unwrap_or_else(|| "built-in registry".to_string());
            (label, load_registry(&config.patterns)?)
        }
    };
    println!("{label}: ok ({} rules)", registry.rules().len());
    Ok(())
}

fn cmd_patterns_dump() -> Result<()> {
    let registry = PatternRegistry::builtin()?;
    println!("{}", toml::to_string_pretty(registry.definition())?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(hidden: bool) -> Self {
        if hidden {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_done(&self, identifier: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Classifying [{current}/{total}] {identifier}"));
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}
