use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_gsea::app::{App, EngineKind, GeneSetsInput, ProgressSink, summarize};
use kira_gsea::config::ConfigLoader;
use kira_gsea::domain::{FrameFormat, IdType, Metric, PermutationType};
use kira_gsea::engine::RunOptions;
use kira_gsea::error::KiraError;
use kira_gsea::expression::ExpressionSet;
use kira_gsea::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "kira-gsea")]
#[command(about = "Gene-set collections, MSigDB libraries and GSEA engine runs")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./kira-gsea.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Browse the local MSigDB release")]
    Library(LibraryArgs),
    #[command(about = "Inspect and transform gene-set collections")]
    Gmt(GmtArgs),
    #[command(about = "Run an external GSEA engine")]
    Gsea(GseaArgs),
}

#[derive(Args)]
struct LibraryArgs {
    #[command(subcommand)]
    command: LibraryCommand,
}

#[derive(Subcommand)]
enum LibraryCommand {
    #[command(about = "List libraries available for the configured version")]
    List,
    #[command(about = "Load a library and optionally write it out")]
    Load(LoadArgs),
}

#[derive(Args)]
struct LoadArgs {
    name: String,

    #[arg(long, value_enum, default_value_t = IdType::Symbols)]
    id_type: IdType,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct GmtArgs {
    #[command(subcommand)]
    command: GmtCommand,
}

#[derive(Subcommand)]
enum GmtCommand {
    #[command(about = "Summarize a collection")]
    Inspect(SourceArgs),
    #[command(about = "Keep gene sets within a size range")]
    Trim(TrimArgs),
    #[command(about = "Restrict gene sets to a gene universe")]
    Subset(SubsetArgs),
    #[command(about = "Merge gene sets with identical genes")]
    Collapse(CollapseArgs),
    #[command(about = "Export a collection as a table")]
    Frame(FrameArgs),
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Flat file to read.
    #[arg(long, conflicts_with = "library", required_unless_present = "library")]
    gmt: Option<PathBuf>,

    /// MSigDB library name, e.g. `c2.cp.reactome`.
    #[arg(long)]
    library: Option<String>,

    #[arg(long, value_enum, default_value_t = IdType::Symbols)]
    id_type: IdType,
}

impl SourceArgs {
    fn input(&self) -> miette::Result<GeneSetsInput> {
        match (&self.gmt, &self.library) {
            (Some(path), _) => Ok(GeneSetsInput::File(path.clone())),
            (None, Some(name)) => Ok(GeneSetsInput::Library {
                name: name.clone(),
                id_type: self.id_type,
            }),
            (None, None) => Err(miette::Report::msg("either --gmt or --library is required")),
        }
    }
}

#[derive(Args)]
struct TrimArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, default_value_t = 0)]
    min: usize,

    #[arg(long, default_value_t = usize::MAX)]
    max: usize,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SubsetArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// File listing the gene universe, separated by whitespace.
    #[arg(long)]
    genes: PathBuf,

    #[arg(long, default_value_t = 0.0)]
    min_representation: f64,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct CollapseArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, default_value = " | ")]
    separator: String,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, value_enum, default_value_t = FrameFormat::Wide)]
    format: FrameFormat,

    #[arg(long)]
    metadata: bool,
}

#[derive(Args)]
struct GseaArgs {
    #[command(subcommand)]
    command: GseaCommand,
}

#[derive(Subcommand)]
enum GseaCommand {
    #[command(about = "Run enrichment on an expression matrix")]
    Run(RunArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineArg {
    Gseapy,
    Desktop,
}

impl From<EngineArg> for EngineKind {
    fn from(value: EngineArg) -> Self {
        match value {
            EngineArg::Gseapy => EngineKind::GseaPy,
            EngineArg::Desktop => EngineKind::GseaDesktop,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Tab-separated matrix, genes in rows and samples in columns.
    #[arg(long)]
    expression: PathBuf,

    /// One class label per sample, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    classes: Vec<String>,

    /// Compare only this class against --control.
    #[arg(long, requires = "control")]
    case: Option<String>,

    #[arg(long, requires = "case")]
    control: Option<String>,

    #[arg(long, value_enum, default_value_t = EngineArg::Gseapy)]
    engine: EngineArg,

    #[arg(long, value_enum, default_value_t = Metric::SignalToNoise)]
    metric: Metric,

    #[arg(long, default_value_t = 1000)]
    permutations: u32,

    #[arg(long, value_enum, default_value_t = PermutationType::Phenotype)]
    permutation_type: PermutationType,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long)]
    plot: bool,

    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::MissingDatabase(_)
        | KiraError::UnknownLibrary(_)
        | KiraError::MissingCatalogEntry(_)
        | KiraError::ConfigRead(_) => 2,
        KiraError::MissingTool(_)
        | KiraError::MissingInstallation(_)
        | KiraError::EngineFailed { .. }
        | KiraError::NoResults { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = App::new(config);
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Text => &TextOutput,
    };

    match cli.command {
        Commands::Library(args) => run_library(args.command, &app, sink, output_mode),
        Commands::Gmt(args) => run_gmt(args.command, &app, sink, output_mode),
        Commands::Gsea(args) => match args.command {
            GseaCommand::Run(run_args) => run_gsea(run_args, &app, sink, output_mode),
        },
    }
}

fn run_library(
    command: LibraryCommand,
    app: &App,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        LibraryCommand::List => {
            let result = app.libraries(sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_libraries(&result).into_diagnostic(),
                OutputMode::Text => TextOutput::print_libraries(&result).into_diagnostic(),
            }
        }
        LibraryCommand::Load(args) => {
            let loaded = app.load_library(&args.name, args.id_type, sink)?;
            if let Some(out) = &args.out {
                app.export(&loaded.value, out, sink)?;
            }
            let summary = summarize(&loaded.value, loaded.warnings, args.out.as_deref());
            print_summary(&summary, output_mode)
        }
    }
}

fn run_gmt(
    command: GmtCommand,
    app: &App,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let summary = match command {
        GmtCommand::Inspect(source) => app.inspect(&source.input()?, sink)?,
        GmtCommand::Trim(args) => app.trim(
            &args.source.input()?,
            args.min,
            args.max,
            args.out.as_deref(),
            sink,
        )?,
        GmtCommand::Subset(args) => {
            let genes = read_gene_list(&args.genes)?;
            app.subset(
                &args.source.input()?,
                &genes,
                args.min_representation,
                args.out.as_deref(),
                sink,
            )?
        }
        GmtCommand::Collapse(args) => app.collapse(
            &args.source.input()?,
            &args.separator,
            args.out.as_deref(),
            sink,
        )?,
        GmtCommand::Frame(args) => {
            let result = app.frame(&args.source.input()?, args.format, args.metadata, sink)?;
            return match output_mode {
                OutputMode::Json => JsonOutput::print_frame(&result).into_diagnostic(),
                OutputMode::Text => {
                    TextOutput::print_warnings(&result.warnings).into_diagnostic()?;
                    Ok(TextOutput::print_frame(&result.frame)?)
                }
            };
        }
    };
    print_summary(&summary, output_mode)
}

fn run_gsea(
    args: RunArgs,
    app: &App,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut expression = ExpressionSet::read_tsv(&args.expression, args.classes.clone())?;
    if let (Some(case), Some(control)) = (&args.case, &args.control) {
        expression = expression.contrast(case, control)?;
    }

    let engine = app.engine(args.engine.into())?;
    let options = RunOptions {
        metric: args.metric,
        permutations: args.permutations,
        permutation_type: args.permutation_type,
        threads: args.threads,
        plot: args.plot,
        verbose: matches!(output_mode, OutputMode::Text),
        out_dir: args.out_dir.clone(),
        ..RunOptions::default()
    };
    let result = app.run_gsea(engine.as_ref(), &expression, &args.source.input()?, options, sink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic(),
        OutputMode::Text => {
            TextOutput::print_warnings(&result.warnings).into_diagnostic()?;
            Ok(TextOutput::print_table(&result.table)?)
        }
    }
}

fn print_summary(
    summary: &kira_gsea::app::CollectionSummary,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(summary).into_diagnostic(),
        OutputMode::Text => TextOutput::print_summary(summary).into_diagnostic(),
    }
}

fn read_gene_list(path: &Path) -> miette::Result<BTreeSet<String>> {
    let content = fs::read_to_string(path)
        .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}
