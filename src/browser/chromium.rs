//! Chromium engine via `chromiumoxide` (Chrome DevTools Protocol).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use log::debug;
use tokio::task::JoinHandle;

use super::{BrowserEngine, BrowserPage, BrowserSession, LaunchOptions, NavigationResponse};

/// Launches a local Chromium, or connects to a remote one over CDP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumEngine;

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let (browser, mut handler, owned) = match options.remote_endpoint.as_deref() {
            Some(endpoint) => {
                let (browser, handler) = Browser::connect(endpoint)
                    .await
                    .with_context(|| format!("failed to connect to remote browser at {endpoint}"))?;
                (browser, handler, false)
            }
            None => {
                let config = local_config(options)?;
                let (browser, handler) = Browser::launch(config)
                    .await
                    .context("failed to launch Chromium")?;
                (browser, handler, true)
            }
        };

        // The CDP connection only makes progress while the handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium handler event error: {e}");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            owned,
        }))
    }
}

fn local_config(options: &LaunchOptions) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions");
    if !options.headless {
        builder = builder.with_head();
    }
    if let Some(proxy) = &options.proxy {
        if let Some(server) = proxy.server.as_deref().filter(|s| !s.is_empty()) {
            builder = builder.arg(format!("--proxy-server={server}"));
        }
        if let Some(bypass) = proxy.bypass.as_deref().filter(|s| !s.is_empty()) {
            builder = builder.arg(format!("--proxy-bypass-list={bypass}"));
        }
        if proxy.username.is_some() {
            debug!("Chromium does not accept proxy credentials on the command line; ignoring them");
        }
    }
    builder
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {e}"))
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    /// Launched by us, so closing it ends the process.
    owned: bool,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<()> {
        let result = if self.owned {
            close_browser(&mut self.browser).await
        } else {
            Ok(())
        };
        self.handler_task.abort();
        result
    }
}

async fn close_browser(browser: &mut Browser) -> Result<()> {
    browser.close().await.context("failed to close Chromium")?;
    browser
        .wait()
        .await
        .context("failed to wait for Chromium to exit")?;
    Ok(())
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str) -> Result<Option<NavigationResponse>> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        let response = self
            .page
            .wait_for_navigation_response()
            .await
            .with_context(|| format!("no navigation response for {url}"))?;
        if response.is_none() {
            return Ok(None);
        }

        let landed = self
            .page
            .url()
            .await
            .context("failed to read page URL")?
            .unwrap_or_else(|| url.to_string());
        Ok(Some(NavigationResponse { url: landed }))
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("failed to read page content")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close page")
    }
}
