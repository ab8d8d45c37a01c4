use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/122.0.0.0 Safari/537.36";

/// Anything that can turn an address into an HTML document.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<String, FetchError>;
}

/// Plain GET with a desktop User-Agent. Used for detail pages, and for boards
/// that do not need scripts executed.
pub struct HttpLoader {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn load(&self, url: &Url) -> Result<String, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs_f64(),
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self.client.get(url.clone()).send().await.map_err(map_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(map_err)
    }
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub chrome: Option<PathBuf>,
    /// Fixed wait after navigation so client-side rendering can finish.
    pub settle: Duration,
    pub page_timeout: Duration,
}

/// Renders boards in headless Chrome. Each `load` starts its own browser and
/// tears it down before returning.
pub struct BrowserLoader {
    options: BrowserOptions,
}

impl BrowserLoader {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageLoader for BrowserLoader {
    async fn load(&self, url: &Url) -> Result<String, FetchError> {
        let options = self.options.clone();
        let url = url.to_string();

        // headless_chrome is blocking; the session lives and dies inside this closure.
        tokio::task::spawn_blocking(move || {
            let session = BrowserSession::open(&options)?;
            session.render(&url, options.settle)
        })
        .await
        .map_err(|e| FetchError::ResourceInit {
            reason: format!("browser task aborted: {}", e),
        })?
    }
}

/// One Chrome process plus its tab. Dropping it kills the process.
struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    fn open(options: &BrowserOptions) -> Result<Self, FetchError> {
        let init_err = |e: &dyn std::fmt::Display| FetchError::ResourceInit {
            reason: e.to_string(),
        };

        let launch = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(options.chrome.clone())
            .idle_browser_timeout(options.page_timeout + options.settle + Duration::from_secs(30))
            .args(vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--no-first-run"),
                OsStr::new("--mute-audio"),
                OsStr::new("--window-size=1920,1080"),
            ])
            .build()
            .map_err(|e| init_err(&e))?;

        let browser = Browser::new(launch).map_err(|e| init_err(&e))?;
        let tab = browser.new_tab().map_err(|e| init_err(&e))?;
        tab.set_default_timeout(options.page_timeout);
        if let Err(e) = tab.set_user_agent(USER_AGENT, None, None) {
            warn!("Could not override browser User-Agent: {}", e);
        }

        debug!("Browser session opened");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn render(&self, url: &str, settle: Duration) -> Result<String, FetchError> {
        let request_err = |e: anyhow::Error| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.tab.navigate_to(url).map_err(request_err)?;
        if let Err(e) = self.tab.wait_until_navigated() {
            warn!("Navigation did not settle for {}: {}", url, e);
        }
        std::thread::sleep(settle);

        self.tab.get_content().map_err(request_err)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("Browser session released");
    }
}
