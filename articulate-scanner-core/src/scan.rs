use crate::report::ReportFormat;
use crate::verify::{
    DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT, LinkStatus, MAX_WORKERS,
    VerificationResult, Verifier, VerifyOptions, VerifyProgressCallback,
};
use articulate_scanner_crawler::course::parse_course_url;
use articulate_scanner_crawler::crawler::DEFAULT_MAX_DEPTH;
use articulate_scanner_crawler::{
    ChromeRenderer, CrawlEvent, CrawlReport, Crawler, PageRenderer, ProgressCallback,
    RendererConfig, ScanError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Options for one scan, fixed for its whole duration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub url: String,
    pub max_depth: usize,
    pub verify: bool,
    pub headless: bool,
    pub max_workers: usize,
    pub quiet: bool,
    pub timeout: Duration,
    pub format: ReportFormat,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            verify: true,
            headless: true,
            max_workers: DEFAULT_MAX_WORKERS,
            quiet: false,
            timeout: DEFAULT_TIMEOUT,
            format: ReportFormat::Text,
        }
    }
}

impl ScanConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Reject configurations that cannot produce a scan before any browser work.
    pub fn validate(&self) -> Result<Url, ScanError> {
        let url = parse_course_url(&self.url)?;
        if !(1..=MAX_WORKERS).contains(&self.max_workers) {
            return Err(ScanError::InvalidConfig(format!(
                "max workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        Ok(url)
    }

    fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub crawl: CrawlReport,
    pub verification: Option<Vec<VerificationResult>>,
}

impl ScanOutcome {
    pub fn broken_count(&self) -> usize {
        self.verification
            .as_ref()
            .map(|results| {
                results
                    .iter()
                    .filter(|r| r.status == LinkStatus::Broken)
                    .count()
            })
            .unwrap_or(0)
    }
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Some(pb)
}

fn crawl_progress(pb: ProgressBar) -> ProgressCallback {
    Arc::new(move |event: CrawlEvent| match event {
        CrawlEvent::CourseStarted { url, depth } => {
            pb.println(format!("{}Scanning course: {}", "  ".repeat(depth), url));
            pb.set_message(format!("Rendering {}", url));
        }
        CrawlEvent::LessonsFound { depth, count, .. } => {
            pb.println(format!("{}Found {} lessons", "  ".repeat(depth), count));
        }
        CrawlEvent::LessonStarted {
            depth,
            index,
            total,
            title,
        } => {
            pb.println(format!("{}  [{}/{}] {}", "  ".repeat(depth), index, total, title));
            pb.set_message(format!("Lesson {}/{}: {}", index, total, title));
        }
        CrawlEvent::LinkedCoursesFound { depth, count, .. } => {
            pb.println(format!(
                "\n{}Found {} linked courses to scan...",
                "  ".repeat(depth),
                count
            ));
        }
        CrawlEvent::PageFailed { url, depth, error } => {
            pb.println(format!("{}Error scanning {}: {}", "  ".repeat(depth), url, error));
        }
    })
}

/// Crawl with an already acquired renderer, then verify if enabled.
pub async fn run_scan<R: PageRenderer>(
    config: &ScanConfig,
    renderer: &mut R,
) -> Result<ScanOutcome, ScanError> {
    config.validate()?;
    let crawl = crawl_courses(config, renderer).await;
    finish_scan(config, crawl).await
}

/// Full scan: launch the browser, crawl, release the browser, verify.
///
/// The browser is closed before verification starts and on every error path
/// after launch.
pub async fn execute_scan(config: &ScanConfig) -> Result<ScanOutcome, ScanError> {
    config.validate()?;

    let pb = spinner(config.show_progress(), "Launching browser...");
    let mut renderer =
        match ChromeRenderer::launch(RendererConfig::default().with_headless(config.headless)).await {
            Ok(renderer) => renderer,
            Err(e) => {
                if let Some(pb) = pb {
                    pb.finish_and_clear();
                }
                return Err(e);
            }
        };
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let crawl = crawl_courses(config, &mut renderer).await;
    if let Err(e) = renderer.close().await {
        warn!("Failed to shut down browser cleanly: {}", e);
    }
    finish_scan(config, crawl).await
}

/// Verification phase shared by every scan entry point; runs once the
/// renderer is no longer needed.
async fn finish_scan(
    config: &ScanConfig,
    crawl: Result<CrawlReport, ScanError>,
) -> Result<ScanOutcome, ScanError> {
    let crawl = crawl?;
    let verification = if config.verify {
        Some(verify_links(config, &crawl).await?)
    } else {
        None
    };
    Ok(ScanOutcome { crawl, verification })
}

async fn crawl_courses<R: PageRenderer>(
    config: &ScanConfig,
    renderer: &mut R,
) -> Result<CrawlReport, ScanError> {
    let pb = spinner(config.show_progress(), "Starting crawl...");

    let mut crawler = Crawler::new()?.with_max_depth(config.max_depth);
    if let Some(ref pb) = pb {
        crawler = crawler.with_progress_callback(crawl_progress(pb.clone()));
    }

    let result = crawler.crawl(renderer, &config.url).await;

    if let Some(pb) = pb {
        match result {
            Ok(ref report) => pb.finish_with_message(format!(
                "URL extraction complete: {} links across {} courses",
                report.links.len(),
                report.visited.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }
    result
}

async fn verify_links(
    config: &ScanConfig,
    crawl: &CrawlReport,
) -> Result<Vec<VerificationResult>, ScanError> {
    let unique = crawl.unique_urls().len();
    info!("Verifying {} unique URLs", unique);

    let mut verifier = Verifier::new(VerifyOptions {
        max_workers: config.max_workers,
        timeout: config.timeout,
        max_redirects: DEFAULT_MAX_REDIRECTS,
    })?;

    let progress_bar = if config.show_progress() && unique > 0 {
        let pb = ProgressBar::new(unique as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let callback: VerifyProgressCallback =
            Arc::new(move |done: usize, _total: usize, result: &VerificationResult| {
                pb.set_position(done as u64);
                pb.set_message(truncate(&result.url, 60));
            });
        verifier = verifier.with_progress_callback(callback);
    }

    let results = verifier.verify(&crawl.links).await;

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Verification complete");
    }
    Ok(results)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
