//! Browser driving for the scrape pipeline.
//!
//! The extraction loops only need four capabilities: navigate, wait for a
//! selector, snapshot the rendered HTML, and scroll the result list. They are
//! expressed as the [`SearchSession`] trait so the loops can be tested against
//! a fake session with scripted snapshots, without a real browser.

use anyhow::{anyhow, Result};
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{BrowserConfig, DelaysConfig};

/// The capabilities the extraction loops need from a browser.
pub trait SearchSession {
    /// Navigate to a URL and wait for the document to load.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Block until an element matching the selector is present.
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Snapshot of the currently rendered HTML.
    fn content(&mut self) -> Result<String>;

    /// Scroll the result list to trigger loading of more entries.
    fn scroll_results(&mut self) -> Result<()>;

    /// Click away overlays blocking the result list. Best effort, no-op by
    /// default.
    fn dismiss_popups(&mut self) {}
}

/// Sleep for a random human-like interval. A zero range is a no-op.
pub fn human_delay(min_ms: u64, max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms.max(min_ms));
    std::thread::sleep(Duration::from_millis(ms));
}

/// Real Chrome session. The Chrome process is terminated when the session is
/// dropped (the `Browser` guard handles this).
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
    delays: DelaysConfig,
}

impl ChromeSession {
    /// Launch Chrome headless or headed per configuration and prepare a tab
    /// with the configured user agent and resource blocking.
    ///
    /// Sandbox is disabled automatically when running inside a container
    /// (detected via /.dockerenv or ORGHARVEST_CONTAINER env var).
    pub fn launch(
        config: &BrowserConfig,
        delays: &DelaysConfig,
        headless: bool,
    ) -> Result<Self> {
        let is_container = std::env::var("ORGHARVEST_CONTAINER").is_ok()
            || std::path::Path::new("/.dockerenv").exists();

        info!(headless, "Launching browser");
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(!is_container)
            .window_size(Some((config.viewport_width, config.viewport_height)))
            .build()
            .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;

        let browser = Browser::new(options)
            .map_err(|e| anyhow!("Failed to launch Chrome (headless={}): {}", headless, e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create browser tab: {}", e))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;
        tab.set_default_timeout(Duration::from_secs(config.nav_timeout_secs));

        let mut blocked = Vec::new();
        if config.block_images {
            blocked.extend(
                ["*.png", "*.jpg", "*.jpeg", "*.webp", "*.gif", "*.svg"]
                    .iter()
                    .map(|p| p.to_string()),
            );
        }
        if config.block_media {
            blocked.extend(
                ["*.mp4", "*.webm", "*.avi", "*.mov", "*.mp3", "*.wav", "*.ogg", "*.m4a"]
                    .iter()
                    .map(|p| p.to_string()),
            );
        }
        if !blocked.is_empty() {
            tab.call_method(Network::Enable {
                max_total_buffer_size: None,
                max_resource_buffer_size: None,
                max_post_data_size: None,
                enable_durable_messages: None,
                report_direct_socket_traffic: None,
            })
            .map_err(|e| anyhow!("Failed to enable network domain: {}", e))?;
            // Generated CDP binding name for Network.setBlockedURLs
            tab.call_method(Network::SetBlockedURLs { urls: blocked })
                .map_err(|e| anyhow!("Failed to set blocked URL patterns: {}", e))?;
            debug!(
                block_images = config.block_images,
                block_media = config.block_media,
                "Resource blocking enabled"
            );
        }

        Ok(Self {
            _browser: browser,
            tab,
            delays: delays.clone(),
        })
    }
}

impl SearchSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        info!("Opening {}", url);
        self.tab
            .navigate_to(url)
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| anyhow!("Page failed to load for {}: {}", url, e))?;
        human_delay(self.delays.action_min_ms, self.delays.action_max_ms);
        Ok(())
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        debug!("Waiting for selector: {}", selector);
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| anyhow!("Timed out waiting for '{}': {}", selector, e))?;
        Ok(())
    }

    fn content(&mut self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }

    fn scroll_results(&mut self) -> Result<()> {
        // Scroll the results sidebar when present; the page itself does not
        // scroll on the maps layout, so fall back to a wheel-sized jump.
        const SCRIPT: &str = r#"
            (() => {
                const selectors = [
                    '.search-list-view__list',
                    '.search-list-view__items',
                    '.scroll__container',
                ];
                for (const sel of selectors) {
                    const el = document.querySelector(sel);
                    if (el) {
                        el.scrollBy(0, el.scrollHeight);
                        return sel;
                    }
                }
                window.scrollBy(0, 1200);
                return 'window';
            })()
        "#;
        let result = self
            .tab
            .evaluate(SCRIPT, false)
            .map_err(|e| anyhow!("Failed to scroll results: {}", e))?;
        if let Some(target) = result.value.as_ref().and_then(|v| v.as_str()) {
            debug!("Scrolled {}", target);
        }
        human_delay(self.delays.scroll_min_ms, self.delays.scroll_max_ms);
        Ok(())
    }

    /// Click away cookie/consent popups that overlay the result list.
    /// Failures are ignored, the popups are not always present.
    fn dismiss_popups(&mut self) {
        const SCRIPT: &str = r#"
            (() => {
                const labels = ['Принять', 'Согласен', 'Отклонить', 'Закрыть'];
                let clicked = 0;
                for (const button of document.querySelectorAll('button')) {
                    const text = (button.textContent || '').trim();
                    if (labels.some(l => text === l)) {
                        button.click();
                        clicked += 1;
                    }
                }
                return clicked;
            })()
        "#;
        match self.tab.evaluate(SCRIPT, false) {
            Ok(result) => {
                if let Some(count) = result.value.as_ref().and_then(|v| v.as_u64()) {
                    if count > 0 {
                        debug!(count, "Closed popups");
                        human_delay(self.delays.action_min_ms, self.delays.action_max_ms);
                    }
                }
            }
            Err(e) => debug!("Popup dismissal failed: {}", e),
        }
    }
}
