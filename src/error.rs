use thiserror::Error;

/// The browser session could not be created at all. Nothing was verified;
/// callers map this to a distinct process exit code.
#[derive(Debug, Error)]
#[error("setup failed: {0}")]
pub struct SetupError(pub String);

/// Failure of a single verification step. Any of these aborts the run at the
/// step that produced it; there is no retry and no skip-and-continue.
#[derive(Debug, Error)]
pub enum StepError {
    /// Navigation did not complete, or the response status was not successful.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The target element never became visible within the step's timeout.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The target element was found but could not be interacted with.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// A dialog appeared, but its message did not contain the expected text.
    #[error("dialog message mismatch: expected substring {expected:?}, got {actual:?}")]
    DialogMismatch { expected: String, actual: String },

    /// No dialog appeared within the step's window.
    #[error("no dialog appeared within {timeout_ms}ms")]
    DialogTimeout { timeout_ms: u64 },

    /// A negative assertion did not hold (element expected absent was still
    /// visible).
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// The live page differs from the reference image beyond tolerance.
    #[error("visual mismatch: {diff_percent:.2}% of pixels differ (tolerance {tolerance_percent:.2}%)")]
    VisualMismatch {
        diff_percent: f64,
        tolerance_percent: f64,
    },

    /// The browser session itself misbehaved mid-run (lost page, failed
    /// script evaluation). Not attributable to the page under test.
    #[error("browser session error: {0}")]
    Session(String),
}

impl StepError {
    /// Short taxonomy name used in per-step status lines.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::Navigation(_) => "NavigationError",
            StepError::ElementNotFound(_) => "ElementNotFound",
            StepError::Interaction(_) => "InteractionError",
            StepError::DialogMismatch { .. } => "DialogMismatch",
            StepError::DialogTimeout { .. } => "DialogTimeout",
            StepError::AssertionFailed(_) => "AssertionFailed",
            StepError::VisualMismatch { .. } => "VisualMismatch",
            StepError::Session(_) => "SessionError",
        }
    }
}
