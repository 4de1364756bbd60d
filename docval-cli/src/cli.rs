use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use docval::{ValidationOutcome, ValidationPipeline, ValidatorConfig, Verdict, output};

use crate::logging;

#[derive(Parser)]
#[command(name = "docval")]
#[command(about = "Validate XML, JSON and YAML documents against schemas and constraint rules")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report problems
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single document
    Validate(ValidateArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Document to validate
    file: PathBuf,

    /// Treat the document as this format (xml, json or yaml) instead of detecting it
    #[arg(long = "as", value_name = "FORMAT")]
    as_format: Option<String>,

    /// Configuration file naming schemas and constraint rules
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// XML Schema source; repeat to compile several together
    #[arg(long = "xml-schema", value_name = "XSD")]
    xml_schemas: Vec<PathBuf>,

    /// JSON Schema for JSON and YAML documents
    #[arg(long, value_name = "SCHEMA")]
    json_schema: Option<PathBuf>,

    /// Constraint rule file; repeatable, evaluated in order
    #[arg(long = "constraints", value_name = "RULES")]
    constraints: Vec<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            return ExitCode::from(Verdict::ConfigurationError.exit_code());
        }
    };

    logging::init(cli.verbose, cli.quiet);
    colored::control::set_override(std::io::stdout().is_terminal());

    match cli.command {
        Commands::Validate(args) => validate(&args, cli.quiet),
    }
}

fn validate(args: &ValidateArgs, quiet: bool) -> ExitCode {
    let pipeline = match build_pipeline(args) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            tracing::error!("{err:#}");
            return ExitCode::from(Verdict::ConfigurationError.exit_code());
        }
    };

    let outcome = pipeline.validate_path(&args.file, args.as_format.as_deref());
    if let Some(message) = &outcome.message {
        tracing::error!("{message}");
    } else if outcome.verdict.is_valid() {
        tracing::info!("The file '{}' is valid.", outcome.target.display());
    }

    if let Err(err) = print_outcome(&outcome, args.output, quiet) {
        tracing::error!("failed to write report: {err:#}");
    }
    ExitCode::from(outcome.verdict.exit_code())
}

fn build_pipeline(args: &ValidateArgs) -> anyhow::Result<ValidationPipeline> {
    let mut config = match &args.config {
        Some(path) => ValidatorConfig::from_file(path)?,
        None => ValidatorConfig::default(),
    };
    config.merge(
        args.xml_schemas.clone(),
        args.json_schema.clone(),
        args.constraints.clone(),
    );
    tracing::debug!(
        xml_schemas = config.xml_schemas.len(),
        json_schema = config.json_schema.is_some(),
        constraints = config.constraints.len(),
        "configuration loaded"
    );
    Ok(ValidationPipeline::from_config(&config)?)
}

fn print_outcome(
    outcome: &ValidationOutcome,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Json => output::write_json(outcome, &mut stdout),
        OutputFormat::Human if quiet && outcome.verdict.is_valid() => Ok(()),
        OutputFormat::Human => {
            let mut buffer = Vec::new();
            output::write_human(outcome, &mut buffer)?;
            for line in String::from_utf8_lossy(&buffer).lines() {
                if line.starts_with('\u{2713}') {
                    writeln!(stdout, "{}", line.green())?;
                } else if line.starts_with('\u{2717}') {
                    writeln!(stdout, "{}", line.red())?;
                } else {
                    writeln!(stdout, "{line}")?;
                }
            }
            Ok(())
        }
    }
}
