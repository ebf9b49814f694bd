pub mod report;
pub mod scan;
pub mod verify;

use colored::Colorize;

pub use report::{
    ReportFormat, ScanSummary, generate_json_report, generate_report, generate_text_report,
    summarize,
};
pub use scan::{ScanConfig, ScanOutcome, execute_scan, run_scan};
pub use verify::{LinkStatus, VerificationResult, Verifier, VerifyOptions, classify};

/// Header printed before a scan unless `--quiet` is set.
pub fn print_banner() {
    let rule = "═".repeat(60);
    println!("{}", rule.bright_blue().bold());
    println!(
        "{} {}",
        "  ARTICULATE RISE LINK SCANNER".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}", rule.bright_blue().bold());
}
