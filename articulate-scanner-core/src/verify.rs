// Link verification: one HEAD (or GET) per unique URL through a bounded pool

use articulate_scanner_crawler::{LinkRecord, ScanError};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const MAX_WORKERS: usize = 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Working,
    Redirected,
    Broken,
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Working => "WORKING",
            LinkStatus::Redirected => "REDIRECTED",
            LinkStatus::Broken => "BROKEN",
        }
    }
}

/// Result of checking one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub url: String,
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    /// Build a result from what the probe observed; the status is derived
    /// with [`classify`].
    pub fn from_probe(
        url: String,
        status_code: Option<u16>,
        final_url: Option<String>,
        error: Option<String>,
    ) -> Self {
        let status = classify(&url, status_code, final_url.as_deref(), error.is_some());
        let final_url = match status {
            LinkStatus::Redirected => final_url,
            _ => None,
        };
        let error = error.or_else(|| match (status, status_code) {
            (LinkStatus::Broken, Some(code @ 400..=499)) => {
                Some(format!("Client error {} (page not found or forbidden)", code))
            }
            (LinkStatus::Broken, Some(code @ 500..=599)) => Some(format!("Server error {}", code)),
            (LinkStatus::Broken, Some(code)) => Some(format!("Unexpected status code {}", code)),
            _ => None,
        });

        Self {
            url,
            status,
            status_code,
            final_url,
            error,
        }
    }

    pub fn broken(url: String, error: impl Into<String>) -> Self {
        Self::from_probe(url, None, None, Some(error.into()))
    }

    /// Human-readable verdict, e.g. "Redirects to https://..."
    pub fn message(&self) -> String {
        match self.status {
            LinkStatus::Working => "URL is accessible".to_string(),
            LinkStatus::Redirected => match self.final_url {
                Some(ref target) => format!("Redirects to {}", target),
                None => "Redirects".to_string(),
            },
            LinkStatus::Broken => self
                .error
                .clone()
                .unwrap_or_else(|| "Unreachable".to_string()),
        }
    }
}

/// Classify a probe. Total over its inputs:
///
/// * any error, or no status code: `Broken`
/// * 2xx: `Working`, or `Redirected` when the final URL differs
/// * 3xx: `Redirected` when it points somewhere else, otherwise `Working`
/// * everything else: `Broken`
pub fn classify(
    requested: &str,
    status_code: Option<u16>,
    final_url: Option<&str>,
    failed: bool,
) -> LinkStatus {
    let Some(code) = status_code else {
        return LinkStatus::Broken;
    };
    if failed {
        return LinkStatus::Broken;
    }

    let moved = final_url.is_some_and(|target| !same_url(requested, target));
    match code {
        200..=399 if moved => LinkStatus::Redirected,
        200..=399 => LinkStatus::Working,
        _ => LinkStatus::Broken,
    }
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

pub type VerifyProgressCallback = Arc<dyn Fn(usize, usize, &VerificationResult) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub max_workers: usize,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

pub struct Verifier {
    client: Client,
    max_workers: usize,
    progress_callback: Option<VerifyProgressCallback>,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Result<Self, ScanError> {
        let client = Client::builder()
            .user_agent(concat!("articulate-scanner/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_workers: options.max_workers.clamp(1, MAX_WORKERS),
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: VerifyProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Verify every distinct URL among `records`, once each, in
    /// first-discovery order.
    pub async fn verify(&self, records: &[LinkRecord]) -> Vec<VerificationResult> {
        let mut seen = std::collections::HashSet::new();
        let urls: Vec<String> = records
            .iter()
            .filter(|record| seen.insert(record.url.as_str()))
            .map(|record| record.url.clone())
            .collect();
        self.verify_urls(urls).await
    }

    /// Check `urls` with at most `max_workers` requests in flight. Results
    /// come back in input order regardless of completion order.
    pub async fn verify_urls(&self, urls: Vec<String>) -> Vec<VerificationResult> {
        let total = urls.len();
        debug!("Verifying {} URLs with {} workers", total, self.max_workers);

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::with_capacity(total);
        for url in urls {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let completed = completed.clone();
            let progress = self.progress_callback.clone();
            let task_url = url.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => check_url(&client, task_url).await,
                    Err(_) => VerificationResult::broken(task_url, "Verification pool closed"),
                };
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref callback) = progress {
                    callback(done, total, &result);
                }
                result
            });
            tasks.push((url, handle));
        }

        let mut results = Vec::with_capacity(total);
        for (url, handle) in tasks {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Verification task for {} failed: {}", url, e);
                    results.push(VerificationResult::broken(url, format!("Worker task failed: {}", e)));
                }
            }
        }
        results
    }
}

/// HEAD first; servers that refuse HEAD get a GET.
async fn check_url(client: &Client, url: String) -> VerificationResult {
    let response = match client.head(&url).send().await {
        Ok(response) if head_unsupported(response.status()) => {
            debug!("HEAD not supported by {}, retrying with GET", url);
            client.get(&url).send().await
        }
        other => other,
    };

    match response {
        Ok(response) => analyze_response(url, response),
        Err(e) => categorize_error(url, e),
    }
}

fn head_unsupported(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

fn analyze_response(url: String, response: Response) -> VerificationResult {
    let status = response.status();
    let final_url = if status.is_redirection() {
        // Redirect not followed: the target is whatever Location says.
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| response.url().join(location).ok())
            .map(|target| target.to_string())
    } else {
        Some(response.url().to_string())
    };

    VerificationResult::from_probe(url, Some(status.as_u16()), final_url, None)
}

fn categorize_error(url: String, error: reqwest::Error) -> VerificationResult {
    let message = if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects or redirect loop".to_string()
    } else if error.is_connect() {
        "Connection failed".to_string()
    } else if error.is_builder() {
        format!("Invalid URL: {}", error)
    } else {
        format!("Error: {}", error)
    };
    VerificationResult::broken(url, message)
}
