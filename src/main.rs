use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufReader};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

use orgharvest::browser::ChromeSession;
use orgharvest::cli::Args;
use orgharvest::config::AppConfig;
use orgharvest::excel::write_results;
use orgharvest::logger::{ScrapeLogger, VerbosityLevel};
use orgharvest::query::resolve_query;
use orgharvest::scrape::run_slow_scrape;
use orgharvest::serp::run_fast_scrape;

fn main() {
    let args = Args::parse();

    // All argument validation happens before any browser is launched
    if let Err(message) = args.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    if args.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration at {}", path.display());
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error: failed to create configuration: {}", e);
                process::exit(1);
            }
        }
    }

    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(block) = args.block_images_override() {
        config.browser.block_images = block;
    }
    if let Some(block) = args.block_media_override() {
        config.browser.block_media = block;
    }

    let stdin = io::stdin();
    let mut input = BufReader::new(stdin.lock());
    // Prompts are only useful on a terminal; piped stdin still works,
    // the prompt text just goes nowhere.
    let query = if AppConfig::is_interactive() {
        resolve_query(args.query.as_deref(), &mut input, &mut io::stdout())?
    } else {
        resolve_query(args.query.as_deref(), &mut input, &mut io::sink())?
    };
    let phrase = query.compose();

    let verbosity = VerbosityLevel::from_verbose_count(args.verbose);
    let logger = match args.log.as_deref() {
        Some(path) => ScrapeLogger::with_log_file(verbosity, Path::new(path)),
        None => ScrapeLogger::new(verbosity),
    };

    logger.info(&format!("Searching for '{}' in {} mode", phrase, args.mode));
    let mut session = ChromeSession::launch(&config.browser, &config.delays, args.headless())
        .context("Failed to launch browser")?;

    logger.start_progress(args.limit);
    let result = match args.mode.as_str() {
        "fast" => run_fast_scrape(&mut session, &config, &phrase, args.limit, &logger),
        _ => run_slow_scrape(&mut session, &config, &phrase, args.limit, &logger),
    };
    let organizations = match result {
        Ok(orgs) => orgs,
        Err(e) => {
            logger.finish_progress("Scrape aborted");
            return Err(e);
        }
    };
    logger.finish_progress(&format!(
        "Extracted {} organizations",
        organizations.len()
    ));

    write_results(
        &organizations,
        &args.out,
        &config.output.format,
        &config.output.sheet_name,
        &config.filters,
    )?;
    logger.record_output_file(&args.out);
    logger.print_final_summary();

    Ok(())
}
