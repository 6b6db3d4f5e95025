use anyhow::Context;
use apkcensus::{ApkCensus, CensusError, Cli, OutputFormatter, OutputMode, UserFriendlyError};
use clap::Parser;
use std::process;
use tracing_subscriber::prelude::*;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Warning: {:#}", e);
    }

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let census = match ApkCensus::from_cli(&cli) {
        Ok(census) => census,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&census);
    }

    match census.run() {
        Ok(report) => {
            census.output_formatter().print_batch_report(&report);

            if report.has_warnings() {
                2 // Success with per-package warnings
            } else {
                0
            }
        }
        Err(e) => {
            census.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &CensusError) -> i32 {
    match error {
        CensusError::InputFolderNotFound { .. } => 3,
        CensusError::BaselineUnavailable { .. } => 4,
        CensusError::OutputNotWritable { .. } => 5,
        _ => 1,
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the `-v` derived level.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("apkcensus={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .context("failed to initialise logging")
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "apkcensus.toml".to_string());

    match ApkCensus::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  apkcensus --config {}", config_path);
            println!("\nEdit the file to point at your mod folder and reference build.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(census: &ApkCensus) -> i32 {
    let formatter = census.output_formatter();
    let config = census.config();

    formatter.print_header("Dry run");
    formatter.info("No packages will be unpacked");

    if formatter.mode() != OutputMode::Json {
        formatter.info("Configuration that would be used:");
        if let Some(ref input) = config.paths.input_folder {
            println!("  Input folder: {}", input.display());
        }
        println!("  Reference build: {}", config.paths.reference_dir.display());
        println!("  Output table: {}", config.paths.output_csv.display());
        println!("  Package extension: .{}", config.scan.extension.trim_start_matches('.'));
        println!("  Extended columns: {}", config.report.extended_columns);
        formatter.print_separator();
    }

    match census.plan() {
        Ok(packages) => {
            formatter.print_package_plan(&packages);
            formatter.success("Dry run completed successfully");
            0
        }
        Err(e) => {
            census.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(error: &CensusError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
