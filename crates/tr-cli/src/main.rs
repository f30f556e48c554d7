//! Table Reader CLI
//!
//! Command-line tool for scanning, viewing, and exporting tables loaded by tr-core.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tr_core::{load_path, scan_directory, LoadOptions, TableData};
use tracing::warn;

#[derive(Parser)]
#[command(name = "tr-cli")]
#[command(about = "Load tables from CSV, HTML, MediaWiki, spreadsheet and JSON sources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for loadable files
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Load a file and display its tables
    Show {
        /// File to load
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of rows to display per table
        #[arg(short, long)]
        limit: Option<usize>,

        /// Loader options (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },

    /// Export the tables of a file
    Export {
        /// File to load
        #[arg(short, long)]
        file: PathBuf,

        /// Output format (json or csv)
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short = 'O', long)]
        output: PathBuf,

        /// Loader options (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },

    /// Print the content fingerprint of each table in a file
    Fingerprint {
        /// File to load
        #[arg(short, long)]
        file: PathBuf,

        /// Loader options (JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> tr_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { root } => cmd_scan(&root),
        Commands::Show {
            file,
            limit,
            options,
        } => cmd_show(&file, limit, options.as_deref()),
        Commands::Export {
            file,
            format,
            output,
            options,
        } => cmd_export(&file, &format, &output, options.as_deref()),
        Commands::Fingerprint { file, options } => cmd_fingerprint(&file, options.as_deref()),
    }
}

fn load_options(path: Option<&Path>) -> tr_core::Result<LoadOptions> {
    match path {
        Some(path) => LoadOptions::from_file(path),
        None => Ok(LoadOptions::default()),
    }
}

/// Load every table of a file, skipping tables that fail
fn load_tables(file: &Path, options: &LoadOptions) -> tr_core::Result<Vec<TableData>> {
    let mut tables = Vec::new();
    for result in load_path(file, options)? {
        match result {
            Ok(table) => tables.push(table),
            Err(e) => warn!(file = %file.display(), error = %e, "skipping table"),
        }
    }

    if tables.is_empty() {
        return Err(tr_core::Error::EmptyData(file.display().to_string()));
    }
    Ok(tables)
}

fn cmd_scan(roots: &[PathBuf]) -> tr_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!(
        "Found {} files in {} formats",
        result.total_files,
        result.groups.len()
    );

    for group in &result.groups {
        println!();
        println!("{} ({} files)", group.format, group.files.len());
        for path in &group.files {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

fn cmd_show(file: &Path, limit: Option<usize>, options: Option<&Path>) -> tr_core::Result<()> {
    let options = load_options(options)?;
    let tables = load_tables(file, &options)?;

    println!("File: {}", file.display());
    println!("Tables: {}", tables.len());

    for table in &tables {
        println!();
        println!(
            "{} ({} columns, {} rows)",
            table.name(),
            table.column_count(),
            table.row_count()
        );
        println!("{}", table.headers().join("\t"));
        println!("{}", "-".repeat(table.column_count().max(1) * 12));

        let row_limit = limit.unwrap_or(table.row_count());
        for record in table.records().iter().take(row_limit) {
            let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            println!("{}", values.join("\t"));
        }

        if table.row_count() > row_limit {
            println!("... ({} more rows)", table.row_count() - row_limit);
        }
    }

    Ok(())
}

fn cmd_export(
    file: &Path,
    format: &str,
    output: &Path,
    options: Option<&Path>,
) -> tr_core::Result<()> {
    let options = load_options(options)?;
    let tables = load_tables(file, &options)?;

    let mut writer = BufWriter::new(File::create(output)?);

    match format.to_lowercase().as_str() {
        "json" => {
            let dicts: Vec<serde_json::Value> = tables.iter().map(TableData::as_dict).collect();
            let json = serde_json::to_string_pretty(&dicts).map_err(|e| tr_core::Error::Json {
                source_name: output.display().to_string(),
                source: e,
            })?;
            writeln!(writer, "{}", json)?;
        }
        "csv" => {
            for (i, table) in tables.iter().enumerate() {
                if i > 0 {
                    writeln!(writer)?;
                }
                writeln!(writer, "# {}", table.name())?;
                writer.write_all(&table_to_csv(table)?)?;
            }
        }
        _ => {
            return Err(tr_core::Error::Validation {
                source_name: "export".to_string(),
                message: format!("unknown format '{}', supported formats: json, csv", format),
            });
        }
    }
    writer.flush()?;

    println!("Exported {} tables to {}", tables.len(), output.display());

    Ok(())
}

fn cmd_fingerprint(file: &Path, options: Option<&Path>) -> tr_core::Result<()> {
    let options = load_options(options)?;

    for table in load_tables(file, &options)? {
        println!("{}  {}", table.fingerprint(), table.name());
    }

    Ok(())
}

/// Render one table as CSV: header row, then records
fn table_to_csv(table: &TableData) -> tr_core::Result<Vec<u8>> {
    let csv_error = |e: csv::Error| tr_core::Error::Csv {
        source_name: table.name().to_string(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(vec![]);
    csv_writer.write_record(table.headers()).map_err(csv_error)?;
    for record in table.records() {
        csv_writer
            .write_record(record.iter().map(|v| v.to_string()))
            .map_err(csv_error)?;
    }

    csv_writer.into_inner().map_err(|e| e.into_error().into())
}
