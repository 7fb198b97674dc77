mod annotation;
mod locator;
mod logging;
mod normalize;
mod output;
mod patterns;
mod pipeline;
mod report;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::locator::locate;
use crate::logging::init_logging;
use crate::output::{OutputFormat, output_writer, write_annotations};
use crate::pipeline::PipelineConfig;

/// CLI arguments for spotbugs-annotate.
#[derive(Parser, Debug)]
#[command(
    name = "spotbugs-annotate",
    about = "Convert SpotBugs XML reports into source annotations for code review.",
    version,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(flatten)]
    convert: ConvertArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

/// Options for converting reports.
#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    #[arg(
        long,
        value_name = "PATH",
        required = true,
        num_args = 1..,
        help = "SpotBugs XML report(s). Annotations are emitted in argument order."
    )]
    report: Vec<PathBuf>,
    #[command(flatten)]
    source: SourceArgs,
    #[arg(
        long,
        help = "Keep violations whose source file is not found under the root (path is left empty). Intended for testing."
    )]
    skip_source_check: bool,
    #[arg(long, value_name = "PATH", help = "Output file; stdout when omitted or '-'.")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Source tree configuration shared by all commands.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    #[arg(
        long,
        value_name = "PATH",
        env = "GITHUB_WORKSPACE",
        help = "Source root searched for reported files and used as the base of annotation paths. Defaults to the current directory."
    )]
    root: Option<String>,
}

impl SourceArgs {
    fn config(&self, skip_source_check: bool) -> PipelineConfig {
        PipelineConfig::new(self.root.clone().unwrap_or_default(), skip_source_check)
    }
}

/// Subcommands supported by the CLI.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the files under the source root that a reported file name resolves to.
    Locate(LocateArgs),
}

/// Arguments for the locate subcommand.
#[derive(Args, Debug, Clone)]
struct LocateArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Reported source path; only its last component is matched.
    source_path: String,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging();
    match run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Locate(args)) => run_locate(args),
        None => run_convert(cli.convert),
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let config = args.source.config(args.skip_source_check);
    let mut annotations = Vec::new();
    for report in &args.report {
        annotations.extend(pipeline::run(report, &config)?);
    }
    let mut writer = output_writer(args.output.as_deref())?;
    write_annotations(writer.as_mut(), args.format, &annotations)
}

fn run_locate(args: LocateArgs) -> Result<()> {
    let config = args.source.config(false);
    let file_name = normalize::bare_file_name(Some(args.source_path.as_str()));
    let matches = locate(&config.root, file_name);
    if matches.is_empty() {
        anyhow::bail!(
            "no file named {} under {}",
            file_name,
            config.root.display()
        );
    }
    let mut stdout = std::io::stdout().lock();
    for path in matches {
        writeln!(stdout, "{}", display_relative(&config.root, &path))
            .context("failed to write locate output")?;
    }
    Ok(())
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
