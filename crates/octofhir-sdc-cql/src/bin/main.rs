//! sdc-cql command-line interface

use clap::{Parser, Subcommand};
use octofhir_sdc_cql::cli::output::{ColorMode, OutputFormat};
use octofhir_sdc_cql::cli::{GlobalOptions, execute, expression, output, run, translate};
use octofhir_sdc_cql::config::{REQUEST_TIMEOUT_ENV, TRANSLATOR_URL_ENV};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CQL tools for FHIR SDC Questionnaires
#[derive(Parser)]
#[command(name = "sdc-cql")]
#[command(author, version, about = "Resolve and execute CQL in FHIR SDC Questionnaires", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    /// Base URL of the CQL-to-ELM translation service
    #[arg(long, env = TRANSLATOR_URL_ENV, default_value = "http://localhost:8080", global = true)]
    translator_url: String,

    /// Request timeout in milliseconds
    #[arg(long, env = REQUEST_TIMEOUT_ENV, default_value_t = 30_000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and execute the CQL of a questionnaire
    Run {
        /// Questionnaire JSON file
        file: PathBuf,

        /// Also scan nested items
        #[arg(long)]
        nested: bool,
    },

    /// Translate CQL to ELM
    Translate {
        /// CQL file to translate
        file: PathBuf,
    },

    /// Evaluate a single CQL expression
    Expression {
        /// CQL expression text
        expression: String,

        /// Include the translated ELM
        #[arg(long)]
        elm: bool,
    },

    /// Execute an ELM JSON document
    Execute {
        /// ELM JSON file
        file: PathBuf,

        /// Patients JSON file (array of Patient resources)
        #[arg(short, long)]
        patients: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(cli.color);
    init_tracing(cli.verbose);

    let options = GlobalOptions {
        translator_url: cli.translator_url,
        timeout_ms: cli.timeout_ms,
        verbose: cli.verbose,
        format: cli.format,
        output_file: cli.output,
    };

    let result = match cli.command {
        Commands::Run { file, nested } => run::run(run::RunConfig { file, nested }, &options).await,
        Commands::Translate { file } => {
            translate::translate(translate::TranslateConfig { file }, &options).await
        }
        Commands::Expression { expression, elm } => {
            let config = expression::ExpressionConfig {
                expression,
                show_elm: elm,
            };
            expression::evaluate(config, &options).await
        }
        Commands::Execute { file, patients } => {
            execute::execute(execute::ExecuteConfig { file, patients }, &options).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
