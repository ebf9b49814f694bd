// Report generation from crawl and verification results

use crate::verify::{LinkStatus, VerificationResult};
use articulate_scanner_crawler::{CrawlReport, LinkRecord, PageFailure};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_urls: usize,
    pub unique_urls: usize,
    pub courses_visited: usize,
    pub pages_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken: Option<usize>,
}

/// Counts are per link record, so a broken URL found on three pages counts three times.
pub fn summarize(crawl: &CrawlReport, results: Option<&[VerificationResult]>) -> ScanSummary {
    let mut summary = ScanSummary {
        total_urls: crawl.links.len(),
        unique_urls: crawl.unique_urls().len(),
        courses_visited: crawl.visited.len(),
        pages_skipped: crawl.failures.len(),
        ..ScanSummary::default()
    };

    if let Some(results) = results {
        let by_url = index_results(results);
        let mut counts: HashMap<LinkStatus, usize> = HashMap::new();
        for link in &crawl.links {
            if let Some(result) = by_url.get(link.url.as_str()) {
                *counts.entry(result.status).or_default() += 1;
            }
        }
        summary.working = Some(counts.get(&LinkStatus::Working).copied().unwrap_or(0));
        summary.redirected = Some(counts.get(&LinkStatus::Redirected).copied().unwrap_or(0));
        summary.broken = Some(counts.get(&LinkStatus::Broken).copied().unwrap_or(0));
    }

    summary
}

fn index_results(results: &[VerificationResult]) -> HashMap<&str, &VerificationResult> {
    results.iter().map(|r| (r.url.as_str(), r)).collect()
}

fn status_icon(status: LinkStatus) -> colored::ColoredString {
    match status {
        LinkStatus::Working => "✓".green().bold(),
        LinkStatus::Redirected => "↪".yellow().bold(),
        LinkStatus::Broken => "✗".red().bold(),
    }
}

fn status_label(status: LinkStatus) -> colored::ColoredString {
    match status {
        LinkStatus::Working => status.label().green(),
        LinkStatus::Redirected => status.label().yellow(),
        LinkStatus::Broken => status.label().red(),
    }
}

fn push_banner(report: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    report.push_str(&format!("{}\n", rule.bright_blue()));
    report.push_str(&format!("{}\n", title.bright_white().bold()));
    report.push_str(&format!("{}\n\n", rule.bright_blue()));
}

fn push_link(report: &mut String, index: usize, link: &LinkRecord, result: Option<&VerificationResult>) {
    match result {
        Some(result) => report.push_str(&format!(
            "{}. [{} {}] {}\n",
            index,
            status_icon(result.status),
            status_label(result.status),
            link.display()
        )),
        None => report.push_str(&format!("{}. {}\n", index, link.display())),
    }

    if let Some(ref text) = link.link_text {
        report.push_str(&format!("   Link text: {}\n", text));
    }
    if let Some(result) = result {
        report.push_str(&format!("   Verification: {}\n", result.message()));
        if let Some(code) = result.status_code {
            report.push_str(&format!("   HTTP Status: {}\n", code));
        }
    }
    report.push('\n');
}

fn push_failures(report: &mut String, failures: &[PageFailure]) {
    if failures.is_empty() {
        return;
    }
    report.push_str(&format!("{}\n", "SKIPPED PAGES".yellow().bold()));
    report.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH)));
    for failure in failures {
        report.push_str(&format!(
            "  {} {} (depth {})\n      {}\n",
            "⚠".yellow(),
            failure.url,
            failure.depth,
            failure.error.dimmed()
        ));
    }
    report.push('\n');
}

/// Render a crawl (and optionally its verification) as a terminal report.
pub fn generate_text_report(crawl: &CrawlReport, results: Option<&[VerificationResult]>) -> String {
    let mut report = String::new();
    let by_url = results.map(index_results);

    let title = if results.is_some() {
        "FINAL RESULTS WITH VERIFICATION"
    } else {
        "RESULTS (No Verification)"
    };
    push_banner(&mut report, title);

    if crawl.links.is_empty() {
        report.push_str("No external links found.\n\n");
    }
    for (i, link) in crawl.links.iter().enumerate() {
        let result = by_url
            .as_ref()
            .and_then(|index| index.get(link.url.as_str()).copied());
        push_link(&mut report, i + 1, link, result);
    }

    push_failures(&mut report, &crawl.failures);

    let summary = summarize(crawl, results);
    let heading = if results.is_some() {
        "VERIFICATION SUMMARY"
    } else {
        "SCAN SUMMARY"
    };
    report.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH).bright_blue()));
    report.push_str(&format!("{}\n", heading.bright_white().bold()));
    report.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH).bright_blue()));
    report.push_str(&format!("Total URLs: {}\n", summary.total_urls));
    report.push_str(&format!("Unique URLs: {}\n", summary.unique_urls));
    report.push_str(&format!("Courses visited: {}\n", summary.courses_visited));
    if summary.pages_skipped > 0 {
        report.push_str(&format!("Pages skipped: {}\n", summary.pages_skipped));
    }
    if let (Some(working), Some(redirected), Some(broken)) =
        (summary.working, summary.redirected, summary.broken)
    {
        report.push_str(&format!("{} Working: {}\n", status_icon(LinkStatus::Working), working));
        report.push_str(&format!(
            "{} Redirected: {}\n",
            status_icon(LinkStatus::Redirected),
            redirected
        ));
        report.push_str(&format!("{} Broken: {}\n", status_icon(LinkStatus::Broken), broken));
    }
    report.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH).bright_blue()));

    report
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLink {
    #[serde(flatten)]
    pub link: LinkRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub root: String,
    pub summary: ScanSummary,
    pub links: Vec<JsonLink>,
    pub skipped: Vec<PageFailure>,
}

pub fn build_json_report(crawl: &CrawlReport, results: Option<&[VerificationResult]>) -> JsonReport {
    let by_url = results.map(index_results);
    let links = crawl
        .links
        .iter()
        .map(|link| JsonLink {
            link: link.clone(),
            verification: by_url
                .as_ref()
                .and_then(|index| index.get(link.url.as_str()).map(|r| (*r).clone())),
        })
        .collect();

    JsonReport {
        root: crawl.root.clone(),
        summary: summarize(crawl, results),
        links,
        skipped: crawl.failures.clone(),
    }
}

pub fn generate_json_report(
    crawl: &CrawlReport,
    results: Option<&[VerificationResult]>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&build_json_report(crawl, results))
}

pub fn generate_report(
    format: ReportFormat,
    crawl: &CrawlReport,
    results: Option<&[VerificationResult]>,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(crawl, results)),
        ReportFormat::Json => generate_json_report(crawl, results),
    }
}
