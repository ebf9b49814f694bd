use articulate_scanner_core::report::{ReportFormat, generate_report};
use articulate_scanner_core::scan::{ScanConfig, execute_scan};
use articulate_scanner_core::print_banner;
use clap::ArgMatches;
use colored::Colorize;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Logs go to stderr so they never mix with the report on stdout.
/// `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn scan_config_from_matches(matches: &ArgMatches) -> ScanConfig {
    let url = matches.get_one::<String>("URL").cloned().unwrap_or_default();
    let defaults = ScanConfig::default();

    ScanConfig {
        url,
        max_depth: matches
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(defaults.max_depth),
        verify: !matches.get_flag("no-verify"),
        headless: !matches.get_flag("no-headless"),
        max_workers: matches
            .get_one::<u64>("max-workers")
            .map(|n| *n as usize)
            .unwrap_or(defaults.max_workers),
        quiet: matches.get_flag("quiet"),
        timeout: matches
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(defaults.timeout),
        format: matches
            .get_one::<String>("format")
            .and_then(|f| ReportFormat::from_str(f))
            .unwrap_or(defaults.format),
    }
}

fn print_divider() {
    println!("{}", "─".repeat(60).bright_blue());
}

fn print_scan_header(config: &ScanConfig) {
    print_banner();
    println!("{} Course: {}", "→".blue(), config.url.bright_white());
    println!("{} Max depth: {}", "→".blue(), config.max_depth.to_string().cyan());
    if config.verify {
        println!(
            "{} Verification: {} workers, {}s timeout",
            "→".blue(),
            config.max_workers.to_string().cyan(),
            config.timeout.as_secs().to_string().cyan()
        );
    } else {
        println!("{} Verification: {}", "→".blue(), "disabled".yellow());
    }
    if !config.headless {
        println!("{} Browser: {}", "→".blue(), "visible".yellow());
    }
    print_divider();
    println!();
}

/// Run a scan end to end and return the process exit code.
pub async fn handle_scan(matches: &ArgMatches) -> i32 {
    let config = scan_config_from_matches(matches);
    debug!("Scan configuration: {:?}", config);

    if let Err(e) = config.validate() {
        eprintln!("{} {}", "✗".red().bold(), e);
        return EXIT_FAILURE;
    }

    // JSON goes to stdout untouched; decoration only accompanies text reports.
    let decorate = !config.quiet && config.format == ReportFormat::Text;
    if decorate {
        print_scan_header(&config);
    }

    let outcome = match execute_scan(&config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} Scan failed: {}", "✗".red().bold(), e);
            return EXIT_FAILURE;
        }
    };

    if decorate {
        println!("\n{} Scan complete!\n", "✓".green().bold());
    }

    match generate_report(config.format, &outcome.crawl, outcome.verification.as_deref()) {
        Ok(report) => {
            print!("{}", report);
            if config.format == ReportFormat::Json {
                println!();
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
            EXIT_FAILURE
        }
    }
}
