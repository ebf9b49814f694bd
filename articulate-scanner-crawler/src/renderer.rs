//! Page rendering.
//!
//! The crawler only needs "URL in, rendered DOM out". [`PageRenderer`] is that
//! seam; [`ChromeRenderer`] fills it with a single chromiumoxide browser tab
//! that is reused for every page of a scan.

use crate::course::same_document;
use crate::error::{Result, ScanError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// What is being rendered. Rise builds course shells and lessons client-side,
/// and each kind needs its own settle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Course,
    Lesson,
}

pub trait PageRenderer {
    /// Load `url` and return the DOM after scripts have run.
    fn render(&mut self, url: &Url, kind: PageKind) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub navigation_timeout: Duration,
    pub course_settle: Duration,
    pub lesson_settle: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            navigation_timeout: Duration::from_secs(30),
            course_settle: Duration::from_secs(5),
            lesson_settle: Duration::from_secs(3),
        }
    }
}

impl RendererConfig {
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn settle_for(&self, kind: PageKind) -> Duration {
        match kind {
            PageKind::Course => self.course_settle,
            PageKind::Lesson => self.lesson_settle,
        }
    }

    fn executable(&self) -> Option<PathBuf> {
        if let Some(path) = &self.chrome_executable {
            return Some(path.clone());
        }
        let path = PathBuf::from(std::env::var_os(CHROMIUM_PATH_ENV)?);
        if path.exists() {
            info!("Using browser from {}: {}", CHROMIUM_PATH_ENV, path.display());
            Some(path)
        } else {
            warn!(
                "{} points to a missing file, falling back to auto-detection: {}",
                CHROMIUM_PATH_ENV,
                path.display()
            );
            None
        }
    }
}

/// One Chrome process and one tab, used serially.
///
/// Call [`ChromeRenderer::close`] when done. If the renderer is dropped
/// instead (panic, cancelled scan) the CDP handler task is aborted and the
/// browser process is killed by `Browser`'s own drop.
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    config: RendererConfig,
}

impl ChromeRenderer {
    pub async fn launch(config: RendererConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.navigation_timeout)
            .window_size(1920, 1080)
            .no_sandbox()
            .arg("--disable-gpu");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = config.executable() {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(ScanError::BrowserUnavailable)?;

        info!("Launching browser (headless: {})", config.headless);
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScanError::BrowserUnavailable(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler finished");
        });

        Ok(Self {
            browser,
            handler,
            page: None,
            config,
        })
    }

    async fn page(&mut self) -> Result<Page> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::BrowserUnavailable(format!("could not open a tab: {}", e)))?;
        self.page = Some(page.clone());
        Ok(page)
    }

    async fn navigate(page: &Page, url: &Url) -> std::result::Result<(), String> {
        let current = page.url().await.ok().flatten();
        if current.as_deref().is_some_and(|current| same_document(current, url)) {
            // Lesson routes are hash changes; a full navigation would never fire a load event.
            let script = format!("window.location.assign({:?})", url.as_str());
            page.evaluate(script).await.map_err(|e| e.to_string())?;
        } else {
            page.goto(url.as_str()).await.map_err(|e| e.to_string())?;
            page.wait_for_navigation().await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        info!("Closing browser");
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        self.browser.wait().await?;
        self.handler.abort();
        Ok(())
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render(&mut self, url: &Url, kind: PageKind) -> Result<String> {
        debug!("Rendering {:?} page {}", kind, url);
        let page = self.page().await?;

        match tokio::time::timeout(self.config.navigation_timeout, Self::navigate(&page, url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ScanError::page_load(url.as_str(), e)),
            Err(_) => {
                return Err(ScanError::page_load(
                    url.as_str(),
                    format!("navigation timed out after {:?}", self.config.navigation_timeout),
                ));
            }
        }

        tokio::time::sleep(self.config.settle_for(kind)).await;

        page.content()
            .await
            .map_err(|e| ScanError::page_load(url.as_str(), e))
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
