use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use spendscan_core::{analyze, expenses_from_json, ExpenseRecord};
use spendscan_finance::api::export_filename;
use spendscan_finance::{export_csv, export_excel, parse_multiple_pdfs, read_csv, write_csv, write_xlsx, CancelToken, InputFile};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(
    name = "spendscan",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SPENDSCAN_BUILD_SHA"), ")"),
    about = "Bank statement PDF parser and expense exporter"
)]
struct Cli {
    /// Config file (default: ~/.spendscan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one or more statement PDFs and print the results as JSON
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print only the extracted expense records
        #[arg(long)]
        records_only: bool,
    },

    /// Export an expense list (JSON) as CSV or XLSX
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// JSON array of expenses, or {"expenses": [...]}
        #[arg(long)]
        input: PathBuf,

        /// Output path (default: generated name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the {content, filename} payload JSON instead of writing a file
        #[arg(long)]
        base64: bool,
    },

    /// Summarize an expense list (JSON or a previous CSV export)
    Analyze {
        #[arg(long)]
        input: PathBuf,
    },

    /// List registered statement layouts in detection order
    Layouts,

    /// Manage config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default configuration if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormat {
    Csv,
    Xlsx,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config_path = config::resolve_path(cli.config.as_deref())?;

    if let Command::Config {
        command: ConfigCommand::Init,
    } = cli.command
    {
        return config::init_config(&config_path);
    }

    let cfg = config::load_config(&config_path)?;
    debug!(path = %config_path.display(), layouts = cfg.layouts.len(), "loaded config");

    match cli.command {
        Command::Parse { files, records_only } => parse(&cfg, files, records_only).await?,
        Command::Export {
            format,
            input,
            out,
            base64,
        } => export(&cfg, format, &input, out, base64)?,
        Command::Analyze { input } => {
            let records = load_expenses(&cfg, &input)?;
            print_json(&analyze(&records, &cfg.engine.money))?;
        }
        Command::Layouts => {
            let engine = cfg.build_engine()?;
            for layout in engine.registry().layouts() {
                let spec = layout.spec();
                println!("{:<22} {:<28} {:?}", spec.id, spec.name, spec.kind);
                println!("{:<22} anchors: {}", "", spec.anchors.join(" | "));
            }
        }
        Command::Config { .. } => {
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
        }
    }

    Ok(())
}

async fn parse(cfg: &config::Config, paths: Vec<PathBuf>, records_only: bool) -> Result<()> {
    let engine = cfg.build_engine()?;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        files.push(InputFile::new(display_name(path), bytes));
    }

    if files.len() == 1 {
        let file = &files[0];
        let result = engine.parse_pdf(&file.name, &file.bytes);
        if records_only {
            return print_json(&result.records());
        }
        return print_json(&result);
    }

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = parse_multiple_pdfs(Arc::new(engine), files, &cancel).await?;
    if records_only {
        let records: Vec<&ExpenseRecord> = report.results.iter().flat_map(|r| r.records()).collect();
        return print_json(&records);
    }
    print_json(&report)
}

fn export(cfg: &config::Config, format: ExportFormat, input: &Path, out: Option<PathBuf>, base64: bool) -> Result<()> {
    let value = read_json(input)?;

    if base64 {
        return match format {
            ExportFormat::Csv => print_json(&export_csv(&value, &cfg.engine)?),
            ExportFormat::Xlsx => print_json(&export_excel(&value, &cfg.engine)?),
        };
    }

    let records = expenses_from_json(&value, &cfg.engine)?;
    let (bytes, ext) = match format {
        ExportFormat::Csv => (write_csv(&records, &cfg.engine.money)?.into_bytes(), "csv"),
        ExportFormat::Xlsx => (write_xlsx(&records, &cfg.engine.money)?, "xlsx"),
    };
    let path = out.unwrap_or_else(|| PathBuf::from(export_filename(ext)));
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// JSON expense list, or a CSV previously written by `export`.
fn load_expenses(cfg: &config::Config, input: &Path) -> Result<Vec<ExpenseRecord>> {
    let is_csv = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        let text = fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
        return read_csv(&text).with_context(|| format!("parse {}", input.display()));
    }
    let value = read_json(input)?;
    Ok(expenses_from_json(&value, &cfg.engine)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    serde_json::from_str(&text).with_context(|| format!("parse {} as JSON", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serialize output")?);
    Ok(())
}
