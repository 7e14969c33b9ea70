mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use itrx_core::export::bundle::DEFAULT_BUNDLE_NAME;
use itrx_core::export::WidthPolicy;
use itrx_core::metadata::TaxpayerAnchor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "itrx",
    version,
    about = "Convert income-tax return PDFs into per-taxpayer workbooks"
)]
struct Cli {
    /// Log section-scan transitions and per-document progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which form configuration to use and how to read identity fields.
#[derive(Args, Clone)]
pub struct FormArgs {
    /// Predefined form configuration (e.g., "ITR1")
    #[arg(short, long, default_value = "ITR1", conflicts_with = "config")]
    pub form: String,

    /// Custom form configuration file (<FORM>_header.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where the PAN is anchored in the document: label or bracketed
    #[arg(long, default_value = "label")]
    pub taxpayer_anchor: TaxpayerAnchor,
}

/// How source documents are read.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Inputs are pre-extracted row JSON files instead of PDFs
    #[arg(long)]
    pub rows_json: bool,

    /// Seconds allowed for extracting one PDF
    #[arg(long, default_value_t = 120, value_name = "SECS")]
    pub timeout_secs: u64,
}

#[derive(Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Documents parsed in parallel (default: available CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Write <name>_extracted.txt next to each source document
    #[arg(long)]
    pub traces: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every document in a directory and report results and failures
    Process {
        /// Directory of source documents
        dir: PathBuf,

        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        batch: BatchArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Show one line per parsed document, ordered by PAN then filing date
    Summary {
        /// Directory of source documents
        dir: PathBuf,

        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        batch: BatchArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Write one workbook per PAN, one sheet per configured section
    Export {
        /// Directory of source documents
        dir: PathBuf,

        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        batch: BatchArgs,

        /// Directory for the workbooks (default: the source directory)
        #[arg(short = 'O', long = "out", value_name = "DIR")]
        out: Option<PathBuf>,

        /// Column width rule: ceiling (cap at 60) or floor (at least 60)
        #[arg(long, default_value = "ceiling")]
        width_policy: WidthPolicy,

        /// Also zip the written workbooks into one archive
        #[arg(long)]
        zip: bool,

        /// File name of the zip archive
        #[arg(long, default_value = DEFAULT_BUNDLE_NAME, requires = "zip")]
        zip_name: String,
    },
    /// Parse a single document and show its sections
    Parse {
        /// Path to a PDF (or row JSON with --rows-json)
        input_file: PathBuf,

        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Field-pattern configuration for scalar field extraction
        #[arg(long, value_name = "FILE")]
        fields: Option<PathBuf>,

        /// Column label for the extracted field values (e.g., "AY 2023-24")
        #[arg(long, requires = "fields")]
        year: Option<String>,

        /// Print the section-scan event log
        #[arg(long)]
        events: bool,

        /// Write the document as its own workbook
        #[arg(long, value_name = "FILE")]
        xlsx: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Inspect and validate form configurations
    Forms {
        #[command(subcommand)]
        action: FormsAction,
    },
}

#[derive(Subcommand)]
enum FormsAction {
    /// List predefined forms
    List,
    /// Describe a form's sections in plain language
    Explain {
        /// Preset name (e.g., "ITR1")
        form: String,
    },
    /// Validate a custom form configuration file
    Validate {
        /// Path to a <FORM>_header.json file
        file: PathBuf,
    },
    /// List form configurations found in a directory
    Discover {
        /// Directory holding <FORM>_header.json files
        dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            dir,
            form,
            batch,
            output,
        } => commands::process::run(&dir, &form, &batch, &output),
        Commands::Summary {
            dir,
            form,
            batch,
            output,
        } => commands::summary::run(&dir, &form, &batch, &output),
        Commands::Export {
            dir,
            form,
            batch,
            out,
            width_policy,
            zip,
            zip_name,
        } => {
            let bundle = zip.then_some(zip_name);
            commands::export::run(&dir, &form, &batch, out, width_policy, bundle)
        }
        Commands::Parse {
            input_file,
            form,
            source,
            fields,
            year,
            events,
            xlsx,
            output,
        } => commands::parse::run(commands::parse::ParseRequest {
            input_file,
            form,
            source,
            fields,
            year,
            events,
            xlsx,
            output,
        }),
        Commands::Forms { action } => match action {
            FormsAction::List => commands::forms::list(),
            FormsAction::Explain { form } => commands::forms::explain(&form),
            FormsAction::Validate { file } => commands::forms::validate(&file),
            FormsAction::Discover { dir } => commands::forms::discover(&dir),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
