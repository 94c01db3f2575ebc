//! Web driver implementation using Playwright.

use anyhow::Context;
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, ScreenshotType, Viewport};
use playwright::Playwright;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

use super::dialog;
use super::selector;
use super::{BrowserEngine, WebDriverConfig};
use crate::driver::traits::{DialogRecord, UiDriver};
use crate::error::{SetupError, StepError};
use crate::parser::types::{DialogAction, Locator};

/// One browser session: engine process, context and a single page.
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
    /// Action the in-page interceptor answers dialogs with. Re-applied after
    /// every navigation since the hook lives in the page's window.
    armed_action: Arc<StdMutex<DialogAction>>,
    closed: AtomicBool,
}

impl WebDriver {
    /// Launch a browser session. Failure here is a [`SetupError`]: nothing
    /// was verified and no step was attempted.
    pub async fn launch(config: WebDriverConfig) -> Result<Self, SetupError> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")
            .map_err(|e| SetupError(format!("{e:#}")))?;

        let browser = launch_browser(&playwright, &config)
            .await
            .map_err(|e| SetupError(format!("{e:#}")))?;

        let context = browser
            .context_builder()
            .build()
            .await
            .map_err(|e| SetupError(format!("Failed to create browser context: {e}")))?;

        let page = context
            .new_page()
            .await
            .map_err(|e| SetupError(format!("Failed to open page: {e}")))?;

        page.set_viewport_size(Viewport {
            width: config.viewport.width as i32,
            height: config.viewport.height as i32,
        })
        .await
        .map_err(|e| SetupError(format!("Failed to set viewport: {e}")))?;

        log::debug!(
            "browser session ready: {:?} headless={} viewport={}x{}",
            config.engine,
            config.headless,
            config.viewport.width,
            config.viewport.height
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
            armed_action: Arc::new(StdMutex::new(DialogAction::Dismiss)),
            closed: AtomicBool::new(false),
        })
    }

    fn armed(&self) -> DialogAction {
        *self.armed_action.lock().unwrap()
    }

    /// Install (or re-arm) the dialog interceptor on the current document.
    async fn install_dialog_hook(&self, page: &Page) -> Result<(), StepError> {
        let keyword = dialog::action_keyword(self.armed());
        page.evaluate::<&str, ()>(dialog::INSTALL_HOOK_JS, keyword)
            .await
            .map_err(|e| StepError::Session(format!("Failed to install dialog hook: {e}")))
    }
}

#[async_trait]
impl UiDriver for WebDriver {
    fn name(&self) -> &str {
        match self.config.engine {
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Webkit => "webkit",
        }
    }

    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<(), StepError> {
        let page = self.page.lock().await;

        let response = page
            .goto_builder(url)
            .timeout(timeout_ms as f64)
            .goto()
            .await
            .map_err(|e| StepError::Navigation(format!("{url}: {e}")))?;

        if let Some(response) = response {
            let status = response
                .status()
                .map_err(|e| StepError::Navigation(format!("{url}: {e}")))?;
            if !(200..400).contains(&status) {
                return Err(StepError::Navigation(format!(
                    "{url}: response status {status}"
                )));
            }
        }

        self.install_dialog_hook(&page).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), StepError> {
        let page = self.page.lock().await;
        page.wait_for_selector_builder(selector)
            .timeout(timeout_ms as f64)
            .wait_for_selector()
            .await
            .map_err(|_| {
                StepError::ElementNotFound(format!(
                    "selector {selector:?} not visible within {timeout_ms}ms"
                ))
            })?;
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, StepError> {
        let page = self.page.lock().await;
        let sel = selector::to_playwright(locator);

        let element = page
            .query_selector(&sel)
            .await
            .map_err(|e| StepError::Session(format!("query {sel:?} failed: {e}")))?;

        match element {
            Some(el) => el
                .is_visible()
                .await
                .map_err(|e| StepError::Session(format!("visibility probe failed: {e}"))),
            None => Ok(false),
        }
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<(), StepError> {
        let sel = selector::to_playwright(locator);

        // Clickable means visible and attached; wait for that first so the
        // failure distinguishes "never appeared" from "click itself failed".
        {
            let page = self.page.lock().await;
            page.wait_for_selector_builder(&sel)
                .timeout(timeout_ms as f64)
                .wait_for_selector()
                .await
                .map_err(|_| {
                    StepError::Interaction(format!(
                        "{locator} not clickable within {timeout_ms}ms"
                    ))
                })?;

            page.click_builder(&sel)
                .click()
                .await
                .map_err(|e| StepError::Interaction(format!("click on {locator} failed: {e}")))?;
        }

        Ok(())
    }

    async fn current_url(&self) -> Result<String, StepError> {
        let page = self.page.lock().await;
        page.evaluate::<(), String>("() => window.location.href", ())
            .await
            .map_err(|e| StepError::Session(format!("could not read location: {e}")))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), StepError> {
        let page = self.page.lock().await;
        let sel = selector::to_playwright(locator);

        let element = page
            .query_selector(&sel)
            .await
            .map_err(|e| StepError::Session(format!("query {sel:?} failed: {e}")))?
            .ok_or_else(|| StepError::ElementNotFound(format!("{locator} not on page")))?;

        element
            .scroll_into_view_if_needed(None)
            .await
            .map_err(|e| StepError::Interaction(format!("scroll to {locator} failed: {e}")))
    }

    async fn arm_dialogs(&self, action: DialogAction) -> Result<(), StepError> {
        *self.armed_action.lock().unwrap() = action;
        let page = self.page.lock().await;
        self.install_dialog_hook(&page).await
    }

    async fn next_dialog(&self) -> Result<Option<DialogRecord>, StepError> {
        let page = self.page.lock().await;
        let value: serde_json::Value = page
            .evaluate(dialog::TAKE_DIALOG_JS, ())
            .await
            .map_err(|e| StepError::Session(format!("dialog poll failed: {e}")))?;

        if value.is_null() {
            return Ok(None);
        }

        let record: DialogRecord = serde_json::from_value(value)
            .map_err(|e| StepError::Session(format!("malformed dialog record: {e}")))?;
        Ok(Some(record))
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), StepError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StepError::Session(format!("cannot create {}: {e}", parent.display())))?;
        }

        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .full_page(full_page)
            .screenshot()
            .await
            .map_err(|e| StepError::Session(format!("screenshot failed: {e}")))?;
        Ok(())
    }

    async fn screenshot_bytes(&self) -> Result<Vec<u8>, StepError> {
        let page = self.page.lock().await;
        page.screenshot_builder()
            .r#type(ScreenshotType::Png)
            .screenshot()
            .await
            .map_err(|e| StepError::Session(format!("screenshot failed: {e}")))
    }

    async fn close(&self) -> Result<(), StepError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log::debug!("closing browser session");
        self.browser
            .close()
            .await
            .map_err(|e| StepError::Session(format!("browser close failed: {e}")))
    }
}

/// Launch the configured engine, resolving a browser executable for Chromium
/// when one is discoverable (env override, then PATH, then well-known
/// locations).
async fn launch_browser(
    playwright: &Playwright,
    config: &WebDriverConfig,
) -> anyhow::Result<Browser> {
    match config.engine {
        BrowserEngine::Chromium => {
            let chromium = playwright.chromium();
            let mut launcher = chromium.launcher().headless(config.headless);

            let executable = chromium_executable();
            if let Some(path) = &executable {
                log::info!("using browser executable: {}", path.display());
                launcher = launcher.executable(path);
            }

            let args: Vec<String> = [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--ignore-certificate-errors",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            launcher = launcher.args(&args);

            Ok(launcher.launch().await.context("Chromium launch failed")?)
        }
        BrowserEngine::Firefox => Ok(playwright
            .firefox()
            .launcher()
            .headless(config.headless)
            .launch()
            .await
            .context("Firefox launch failed")?),
        BrowserEngine::Webkit => Ok(playwright
            .webkit()
            .launcher()
            .headless(config.headless)
            .launch()
            .await
            .context("WebKit launch failed")?),
    }
}

fn chromium_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("UIPROBE_BROWSER_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        log::warn!("UIPROBE_BROWSER_PATH does not exist: {}", path.display());
    }

    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    let well_known = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/snap/bin/chromium",
    ];
    well_known
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        // Normal runs close explicitly; this only covers unwinds. The
        // playwright resources shut the engine down as their handles drop.
        if !self.closed.load(Ordering::SeqCst) {
            log::warn!("browser session dropped without explicit close");
        }
    }
}
