//! pgcompare CLI Tool
//!
//! Compares two schema snapshots and writes ordered migration, rollback and
//! dump scripts. Suitable for CI pipelines: exit code 1 on any error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pgcompare::config::DEFAULT_SETTINGS_FILE;
use pgcompare::migration::{generate, generate_dump, generate_rollback, MigrationScript};
use pgcompare::summary::{apply_filters, DiffSummary};
use pgcompare::{compare, Direction, Settings, TransactionScope};
use pgcompare_cli::error::CliError;
use pgcompare_cli::loader::load_snapshot;
use pgcompare_cli::report::render_text;
use pgcompare_cli::writer::{display_path, write_script, WriteOptions};

#[derive(Parser)]
#[command(name = "pgcompare")]
#[command(about = "Schema comparison and migration generation for PostgreSQL")]
#[command(version = "0.1.0")]
struct Cli {
    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two snapshots and report the differences
    Compare {
        source: PathBuf,
        target: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Only report tables missing on one side
        #[arg(long)]
        only_missing_tables: bool,

        /// Only report differences inside common tables
        #[arg(long)]
        only_column_diffs: bool,

        /// Only report missing columns and critical column differences
        #[arg(long)]
        critical_only: bool,
    },

    /// Generate ordered migration stage files
    Migrate {
        source: PathBuf,
        target: PathBuf,

        #[arg(long, value_enum)]
        direction: Option<DirectionArg>,

        #[arg(long, value_enum)]
        transaction_scope: Option<ScopeArg>,

        /// Do not order new tables by foreign key dependencies
        #[arg(long)]
        no_sort: bool,

        /// Do not create circular tables in two phases
        #[arg(long)]
        no_circular: bool,

        /// Output directory (default: output_dir setting)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write rollback stage files
        #[arg(long)]
        rollback: bool,

        /// Leave destructive rollback statements uncommented
        #[arg(long)]
        execute_drops: bool,
    },

    /// Generate stage files recreating a whole snapshot
    Dump {
        snapshot: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    SourceToTarget,
    TargetToSource,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::SourceToTarget => Direction::SourceToTarget,
            DirectionArg::TargetToSource => Direction::TargetToSource,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    None,
    PerFile,
    Single,
}

impl From<ScopeArg> for TransactionScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::None => TransactionScope::None,
            ScopeArg::PerFile => TransactionScope::PerFile,
            ScopeArg::Single => TransactionScope::Single,
        }
    }
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let result = run(&cli);

    match result {
        Ok(()) => {
            if !cli.quiet {
                println!("{}", "✅ Success".green());
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red(), e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = cli.command {
        return handle_init(&cli.config, force);
    }

    let mut settings = Settings::load_from(&cli.config).context("loading settings")?;

    match &cli.command {
        Commands::Compare {
            source,
            target,
            format,
            only_missing_tables,
            only_column_diffs,
            critical_only,
        } => {
            settings.filters.only_missing_tables |= *only_missing_tables;
            settings.filters.only_column_diffs |= *only_column_diffs;
            settings.filters.critical_only |= *critical_only;
            handle_compare(&settings, source, target, *format)
        }
        Commands::Migrate {
            source,
            target,
            direction,
            transaction_scope,
            no_sort,
            no_circular,
            out,
            rollback,
            execute_drops,
        } => {
            if let Some(direction) = direction {
                settings.migration.direction = (*direction).into();
            }
            if let Some(scope) = transaction_scope {
                settings.migration.transaction_scope = (*scope).into();
            }
            settings.migration.sort_dependencies &= !no_sort;
            settings.migration.handle_circular_deps &= !no_circular;
            settings.migration.dry_run &= !execute_drops;
            if let Some(out) = out {
                settings.output_dir = out.clone();
            }
            handle_migrate(&settings, source, target, *rollback)
        }
        Commands::Dump { snapshot, out } => {
            if let Some(out) = out {
                settings.output_dir = out.clone();
            }
            handle_dump(&settings, snapshot)
        }
        Commands::Init { .. } => Ok(()),
    }
}

fn handle_compare(settings: &Settings, source: &Path, target: &Path, format: Format) -> anyhow::Result<()> {
    let source_snapshot = load_snapshot(source, settings)?;
    let target_snapshot = load_snapshot(target, settings)?;

    let diff = compare(&source_snapshot, &target_snapshot);
    let diff = apply_filters(&diff, &settings.filters);

    match format {
        Format::Text => print!("{}", render_text(&diff)),
        Format::Json => {
            let summary = DiffSummary::build(&diff, &source_snapshot, &target_snapshot);
            println!("{}", summary.to_json().map_err(CliError::from)?);
        }
    }
    Ok(())
}

fn handle_migrate(settings: &Settings, source: &Path, target: &Path, rollback: bool) -> anyhow::Result<()> {
    let source_snapshot = load_snapshot(source, settings)?;
    let target_snapshot = load_snapshot(target, settings)?;
    let diff = compare(&source_snapshot, &target_snapshot);
    let options = &settings.migration;

    println!(
        "Generating {} migration into {}...",
        options.direction.label(),
        display_path(&settings.output_dir)
    );

    let script = generate(&diff, &source_snapshot, &target_snapshot, options);
    report_written(&script, settings)?;

    if rollback {
        let script = generate_rollback(&diff, &source_snapshot, &target_snapshot, options);
        report_written(&script, settings)?;
        if options.dry_run {
            println!("   Destructive rollback statements are commented out (use --execute-drops)");
        }
    }
    Ok(())
}

fn handle_dump(settings: &Settings, snapshot: &Path) -> anyhow::Result<()> {
    let snapshot = load_snapshot(snapshot, settings)?;
    println!(
        "Dumping {} table(s) into {}...",
        snapshot.tables.len(),
        display_path(&settings.output_dir)
    );
    let script = generate_dump(&snapshot, &settings.migration);
    report_written(&script, settings)
}

fn report_written(script: &MigrationScript, settings: &Settings) -> anyhow::Result<()> {
    if script.has_no_changes() {
        println!("{}", "✅ No changes to apply".green());
    }
    let options = WriteOptions {
        skip_empty_files: settings.skip_empty_files,
        transaction_scope: settings.migration.transaction_scope,
    };
    let written = write_script(script, &settings.output_dir, &options)?;
    for path in &written {
        println!("  ✓ {}", display_path(path));
    }
    Ok(())
}

fn handle_init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()).into());
    }
    let content = toml::to_string_pretty(&Settings::default()).map_err(CliError::from)?;
    fs::write(path, content).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    println!("✅ Wrote {}", display_path(path));
    Ok(())
}
