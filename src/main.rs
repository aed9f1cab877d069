use clap::Parser;
use office_extract::{
    Cli, FileTypeCategory, OfficeExtract, OfficeExtractError, OutputFormatter, OutputMode,
    UserFriendlyError,
};
use std::path::Path;
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let (Some(archive), Some(category)) = (cli.archive.as_deref(), cli.file_type) else {
        eprintln!("An archive and --type are required");
        return 1;
    };

    let office_extract = match OfficeExtract::from_cli(&cli) {
        Ok(office_extract) => office_extract,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&cli, &office_extract, archive, category);
    }

    // Execute main extraction workflow
    match office_extract.extract_to_file(archive, category, cli.output_path(), cli.report) {
        Ok(report) => {
            office_extract.output_formatter().print_extraction_report(&report);

            if report.has_warnings() {
                2 // Success with warnings
            } else {
                0
            }
        }
        Err(e) => {
            office_extract.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &OfficeExtractError) -> i32 {
    match error {
        OfficeExtractError::Cancelled => 130, // Interrupted (SIGINT)
        OfficeExtractError::InvalidArchive { .. } => 3,
        OfficeExtractError::Io(_) => 4,
        OfficeExtractError::NameCollision { .. } => 5,
        OfficeExtractError::OutputExists { .. } => 6,
        OfficeExtractError::Config { .. } => 7,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "office-extract.toml".to_string());

    match OfficeExtract::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  office-extract <archive> --type excel --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
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

fn handle_dry_run(
    cli: &Cli,
    office_extract: &OfficeExtract,
    archive: &Path,
    category: FileTypeCategory,
) -> i32 {
    let formatter = office_extract.output_formatter();

    formatter.info("DRY RUN MODE - No files will be written");
    formatter.print_separator();

    // Display configuration that would be used
    formatter.info("Configuration that would be used:");
    let config = office_extract.config();
    if formatter.mode() != OutputMode::Json && !cli.quiet {
        println!("  Rename files: {}", config.naming.rename);
        println!("  Submission infix: {}", config.naming.submission_infix);
        println!("  Collision policy: {}", config.output.collision_policy);
        println!("  Compression level: {}", config.output.compression_level);
        println!("  Max file size: {} bytes", config.filters.max_file_size);
        println!("  Exclude patterns: {}", config.filters.exclude_patterns.join(", "));
    }
    formatter.print_separator();

    let bytes = match std::fs::read(archive) {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = OfficeExtractError::from(e);
            formatter.print_user_friendly_error(&error);
            return exit_code_for(&error);
        }
    };

    match office_extract.plan(&bytes, category) {
        Ok(plan) => {
            formatter.print_plan(&plan);
            if cli.force {
                formatter.warning("Force mode enabled - would overwrite an existing output file");
            }
            formatter.success("Dry run completed successfully");
            formatter.info("Run without --dry-run to write the archive");
            0
        }
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(error: &OfficeExtractError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "office_extract=warn",
        1 => "office_extract=info",
        _ => "office_extract=debug",
    };

    // RUST_LOG still wins when set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init()
        .ok();
}
