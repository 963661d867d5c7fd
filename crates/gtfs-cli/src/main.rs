//! GTFS feed CLI
//!
//! Command-line tool for validating, inspecting, editing and exporting
//! unpacked GTFS feeds.

use clap::{Parser, Subcommand};
use gtfs_core::{
    apply_patch, read_bundle_dir, write_bundle_dir, BatchFile, Edit, FeedStore, PatchFile, Row,
    SchemaRegistry,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gtfs-cli")]
#[command(about = "GTFS feed validator and editor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a feed directory
    Validate {
        /// Directory holding the unpacked feed
        #[arg(short, long)]
        dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the files in a feed with their row counts
    List {
        /// Directory holding the unpacked feed
        #[arg(short, long)]
        dir: PathBuf,
    },

    /// Show the rows of one file
    Show {
        /// Directory holding the unpacked feed
        #[arg(short, long)]
        dir: PathBuf,

        /// File to show (e.g. stops.txt)
        #[arg(short, long)]
        file: String,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Columns to display (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,
    },

    /// Write an empty feed (header-only files) to a directory
    New {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load a feed and write it back out in canonical column order
    Export {
        /// Directory holding the unpacked feed
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply a patch file and export the edited feed
    Patch {
        /// Directory holding the unpacked feed
        #[arg(short, long)]
        dir: PathBuf,

        /// Path to patch file (JSON)
        #[arg(short, long)]
        patch: PathBuf,

        /// Output directory for the edited feed
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a batch of patch files against one feed
    Batch {
        /// Path to batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,
    },

    /// Create a patch file template
    CreatePatch {
        /// Output path for the patch file
        #[arg(short, long)]
        output: PathBuf,

        /// Example cell edits to include (file:row:field:value)
        #[arg(short, long)]
        example: Vec<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> gtfs_core::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { dir, json } => cmd_validate(&dir, json),
        Commands::List { dir } => cmd_list(&dir).map(|_| ExitCode::SUCCESS),
        Commands::Show {
            dir,
            file,
            limit,
            columns,
        } => cmd_show(&dir, &file, limit, columns).map(|_| ExitCode::SUCCESS),
        Commands::New { output } => cmd_new(&output).map(|_| ExitCode::SUCCESS),
        Commands::Export { dir, output } => cmd_export(&dir, &output).map(|_| ExitCode::SUCCESS),
        Commands::Patch { dir, patch, output } => {
            cmd_patch(&dir, &patch, &output).map(|_| ExitCode::SUCCESS)
        }
        Commands::Batch { batch } => cmd_batch(&batch).map(|_| ExitCode::SUCCESS),
        Commands::CreatePatch { output, example } => {
            cmd_create_patch(&output, &example).map(|_| ExitCode::SUCCESS)
        }
    }
}

fn load_store(dir: &Path) -> gtfs_core::Result<FeedStore<'static>> {
    tracing::info!(dir = %dir.display(), "loading feed");
    let bundle = read_bundle_dir(dir)?;
    FeedStore::load_feed(SchemaRegistry::gtfs(), bundle)
}

fn cmd_validate(dir: &Path, json: bool) -> gtfs_core::Result<ExitCode> {
    let store = load_store(dir)?;
    let report = store.validate();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validated {} file(s) in {}", store.tables().len(), dir.display());
        println!();

        if !report.errors.is_empty() {
            println!("Errors ({}):", report.errors.len());
            for message in report.error_messages() {
                println!("  {}", message);
            }
            println!();
        }

        if !report.warnings.is_empty() {
            println!("Warnings ({}):", report.warnings.len());
            for message in report.warning_messages() {
                println!("  {}", message);
            }
            println!();
        }

        if report.is_valid() {
            println!("Feed is valid.");
        }
    }

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_list(dir: &Path) -> gtfs_core::Result<()> {
    let store = load_store(dir)?;
    let registry = store.registry();

    println!("Files ({}):", store.tables().len());
    println!();

    for (name, rows) in store.summary() {
        let marker = if registry.is_required_file(name) {
            " [required]"
        } else if !registry.is_known_file(name) {
            " [unknown]"
        } else {
            ""
        };
        println!("  {} ({} rows){}", name, rows, marker);
    }

    let missing: Vec<&str> = registry
        .required_files()
        .iter()
        .copied()
        .filter(|f| !store.has_file(f))
        .collect();
    if !missing.is_empty() {
        println!();
        println!("Missing required files: {}", missing.join(", "));
    }

    Ok(())
}

fn cmd_show(
    dir: &Path,
    file: &str,
    limit: Option<usize>,
    columns: Option<String>,
) -> gtfs_core::Result<()> {
    let store = load_store(dir)?;

    let table = store
        .table(file)
        .ok_or_else(|| gtfs_core::Error::UnknownFile(file.to_string()))?;

    // Filter columns if specified
    let all_columns = gtfs_core::column_order(table, store.registry().schema(file));
    let display_cols: Vec<&str> = match &columns {
        Some(filter) => {
            let wanted: Vec<&str> = filter.split(',').map(str::trim).collect();
            all_columns
                .iter()
                .map(String::as_str)
                .filter(|c| wanted.contains(c))
                .collect()
        }
        None => all_columns.iter().map(String::as_str).collect(),
    };

    // Print header
    println!("{}", display_cols.join("\t"));
    println!("{}", "-".repeat(display_cols.len() * 12));

    // Print rows
    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        let values: Vec<&str> = display_cols
            .iter()
            .map(|col| row.get(col).unwrap_or(""))
            .collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }

    Ok(())
}

fn cmd_new(output: &Path) -> gtfs_core::Result<()> {
    let store = FeedStore::create_empty(SchemaRegistry::gtfs());
    let written = write_bundle_dir(output, &store.export_tables())?;

    println!("Created empty feed in {}", output.display());
    for path in &written {
        println!("  - {}", path.display());
    }

    Ok(())
}

fn cmd_export(dir: &Path, output: &Path) -> gtfs_core::Result<()> {
    let store = load_store(dir)?;
    let written = write_bundle_dir(output, &store.export_tables())?;

    println!("Exported {} files to {}", written.len(), output.display());

    Ok(())
}

fn cmd_patch(dir: &Path, patch_path: &Path, output_dir: &Path) -> gtfs_core::Result<()> {
    // Load the patch file
    let patch = PatchFile::load(patch_path)?;
    println!("Loaded patch with {} edits", patch.edits.len());
    if let Some(description) = &patch.description {
        println!("  {}", description);
    }

    let mut store = load_store(dir)?;
    let result = apply_patch(&mut store, &patch);

    if !result.failed.is_empty() {
        println!("\nWarning: {} edits could not be applied:", result.failed.len());
        for (edit, reason) in &result.failed {
            println!("  - {}: {}", edit.file(), reason);
        }
    }

    let written = write_bundle_dir(output_dir, &store.export_tables())?;

    println!("\nExport complete:");
    println!("  {} edits applied", result.applied);
    println!("  {} files written to {}", written.len(), output_dir.display());

    let report = store.validate();
    if !report.is_valid() {
        println!(
            "\nNote: edited feed has {} validation error(s); run `gtfs-cli validate` for details",
            report.errors.len()
        );
    }

    Ok(())
}

fn cmd_batch(batch_path: &Path) -> gtfs_core::Result<()> {
    let batch = BatchFile::load(batch_path)?;

    println!("Running batch with {} patch files", batch.patches.len());
    println!("Feed: {}", batch.feed_dir.display());
    println!("Output: {}", batch.output_dir.display());
    println!();

    // Load once, apply every patch to the same feed
    let mut store = load_store(&batch.feed_dir)?;

    let mut total_edits = 0;
    let mut errors = Vec::new();

    for patch_path in &batch.patches {
        println!("Processing patch: {}", patch_path.display());

        let patch = match PatchFile::load(patch_path) {
            Ok(p) => p,
            Err(e) => {
                errors.push((patch_path.clone(), e.to_string()));
                continue;
            }
        };

        let result = apply_patch(&mut store, &patch);
        total_edits += result.applied;
        println!("  Applied {} edits", result.applied);
        for (edit, reason) in result.failed {
            errors.push((patch_path.clone(), format!("{}: {}", edit.file(), reason)));
        }
    }

    let written = write_bundle_dir(&batch.output_dir, &store.export_tables())?;

    println!();
    println!("Batch complete:");
    println!("  {} total edits applied", total_edits);
    println!("  {} files written", written.len());

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (path, err) in &errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_create_patch(output: &Path, examples: &[String]) -> gtfs_core::Result<()> {
    let mut patch = PatchFile::new();

    // Parse example edits: "file:row:field:value"
    for example in examples {
        let parts: Vec<&str> = example.splitn(4, ':').collect();
        if parts.len() != 4 {
            eprintln!(
                "Warning: Invalid example format '{}', expected 'file:row:field:value'",
                example
            );
            continue;
        }

        let row: usize = match parts[1].parse() {
            Ok(row) => row,
            Err(_) => {
                eprintln!("Warning: Invalid row '{}' in example", parts[1]);
                continue;
            }
        };

        patch.add_edit(Edit::update_cell(parts[0], row, parts[2], parts[3]));
    }

    // If no examples provided, add a placeholder
    if patch.edits.is_empty() {
        let values: Row = [("stop_id", "NEW_STOP"), ("stop_name", "New stop")]
            .into_iter()
            .collect();
        patch.add_edit(Edit::add_row("stops.txt", values));
    }

    patch.save(output)?;
    println!("Created patch file: {}", output.display());
    println!("Edits: {}", patch.edits.len());
    println!();
    println!("Edit the file to add your changes, then run:");
    println!(
        "  gtfs-cli patch --dir <feed> --patch {} --output <dir>",
        output.display()
    );

    Ok(())
}
