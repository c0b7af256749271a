use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nansen_tools::export::{self, ExportSettings};
use nansen_tools::io::excel_write::RenderOptions;
use nansen_tools::io::toktlogger::DEFAULT_HOST;
use nansen_tools::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose).and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::ActivityLog(args) => execute_activity_log(args),
        Command::Template(args) => execute_template(args),
    }
}

fn execute_activity_log(args: ActivityLogArgs) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(ToolError::MissingInput(args.dir));
    }

    let options = args.sheet.render_options();
    let settings = ExportSettings {
        host: args.host,
        dir: args.dir,
        basename: args.basename,
        title: args.title,
        fields: args.sheet.fields,
        options,
    };
    let report = export::export_activity_log(&settings)?;
    println!("Generated file: {}", report.path.display());
    Ok(())
}

fn execute_template(args: TemplateArgs) -> Result<()> {
    let catalog = export::load_catalog(args.sheet.fields.as_deref())?;
    let report = export::write_template(
        &args.output,
        &args.title,
        &args.field,
        &catalog,
        &args.sheet.render_options(),
    )?;
    println!("Generated file: {}", report.path.display());
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export cruise activity logs to formatted Excel workbooks."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull the current cruise's activities from the toktlogger into a workbook.
    ActivityLog(ActivityLogArgs),
    /// Write an empty entry template with the chosen columns.
    Template(TemplateArgs),
}

#[derive(clap::Args)]
struct SheetArgs {
    /// Field catalog JSON file. Defaults to the built-in catalog.
    #[arg(long)]
    fields: Option<PathBuf>,

    /// Leave out the Metadata sheet.
    #[arg(long)]
    no_metadata: bool,

    /// Leave out the Conversion sheet.
    #[arg(long)]
    no_conversions: bool,
}

impl SheetArgs {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            include_metadata: !self.no_metadata,
            include_conversions: !self.no_conversions,
        }
    }
}

#[derive(clap::Args)]
struct ActivityLogArgs {
    /// Toktlogger host name or base URL.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Directory the workbook is written to.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Output name; `_N.xlsx` is appended with the first free N.
    #[arg(long, default_value = "activity_log")]
    basename: String,

    /// Title shown in the top-left cell of the Data sheet.
    #[arg(long, default_value = "")]
    title: String,

    #[command(flatten)]
    sheet: SheetArgs,
}

#[derive(clap::Args)]
struct TemplateArgs {
    /// Output file path. Written as given, without probing for a free name.
    #[arg(long)]
    output: PathBuf,

    /// Field keys, in column order.
    #[arg(long = "field", required = true)]
    field: Vec<String>,

    /// Title shown in the top-left cell of the Data sheet.
    #[arg(long, default_value = "")]
    title: String,

    #[command(flatten)]
    sheet: SheetArgs,
}
