use crate::error::StepError;
use crate::parser::types::{DialogAction, Locator};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// A native dialog observed on the page, in order of arrival.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DialogRecord {
    /// "alert", "confirm" or "prompt".
    pub kind: String,
    pub message: String,
}

/// Driver interface for one browser page.
///
/// The executor only talks to this trait, so runs can be exercised in tests
/// with a scripted in-memory driver. The production implementation is
/// [`crate::driver::web::WebDriver`].
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Engine label for status output (e.g. "chromium").
    fn name(&self) -> &str;

    /// Navigate to an absolute URL. Fails with [`StepError::Navigation`] when
    /// the response status is not successful or the load exceeds the timeout.
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<(), StepError>;

    /// Wait until a CSS selector matches a visible element.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), StepError>;

    /// One visibility probe, no waiting. Visible means attached to the layout
    /// tree with a non-zero rendered area.
    async fn is_visible(&self, locator: &Locator) -> Result<bool, StepError>;

    /// Wait for the target to become clickable, then click it.
    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<(), StepError>;

    async fn current_url(&self) -> Result<String, StepError>;

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), StepError>;

    /// Choose how the in-page interceptor answers the next native dialogs.
    async fn arm_dialogs(&self, action: DialogAction) -> Result<(), StepError>;

    /// Consume the oldest recorded dialog, if any arrived since the last call.
    async fn next_dialog(&self) -> Result<Option<DialogRecord>, StepError>;

    /// Write a screenshot artifact. Callers treat failures as warnings.
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), StepError>;

    /// Current viewport screenshot as PNG bytes, for visual comparison.
    async fn screenshot_bytes(&self) -> Result<Vec<u8>, StepError>;

    /// Release the browser session. Must be idempotent; the runner calls it
    /// on every exit path.
    async fn close(&self) -> Result<(), StepError>;
}
