use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed verification flow: optional header plus the ordered step list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFlow {
    #[serde(default)]
    pub name: Option<String>,

    /// Absolute base URL for this flow, overriding the CLI `--base-url`.
    /// Relative step URLs are joined onto it at execution time.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub viewport: Option<ViewportSize>,

    #[serde(default, alias = "defaultTimeout")]
    pub default_timeout_ms: Option<u64>,

    /// Browser engine: "chromium" (default), "firefox" or "webkit".
    #[serde(default)]
    pub browser: Option<String>,

    #[serde(default)]
    pub headless: Option<bool>,

    #[serde(default)]
    pub env: Option<HashMap<String, String>>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub steps: Vec<VerificationStep>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// One atomic verification or interaction action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStep {
    #[serde(alias = "goto", alias = "open")]
    Navigate(NavigateInput),

    WaitForSelector(WaitForSelectorInput),

    #[serde(alias = "see")]
    AssertVisible(LocatorParams),

    #[serde(alias = "notSee")]
    AssertNotVisible(LocatorParams),

    #[serde(alias = "tap")]
    Click(LocatorParams),

    #[serde(alias = "waitForURL")]
    WaitForUrl(WaitForUrlInput),

    #[serde(alias = "expectDialog")]
    WaitForDialog(DialogParams),

    #[serde(alias = "scrollTo")]
    ScrollIntoView(LocatorParams),

    #[serde(alias = "takeScreenshot")]
    Screenshot(Option<ScreenshotInput>),

    #[serde(alias = "compareScreenshot")]
    AssertScreenshot(AssertScreenshotInput),

    /// Explicit fixed wait, used only where no observable completion signal
    /// exists. Every other wait in the runner is condition-based. A bare
    /// `settle` uses the configured default delay.
    #[serde(alias = "settle")]
    SettleDelay(Option<SettleInput>),
}

impl VerificationStep {
    /// Short label for status lines and artifact names.
    pub fn display_name(&self) -> String {
        match self {
            VerificationStep::Navigate(input) => format!("navigate {}", input.url()),
            VerificationStep::WaitForSelector(input) => {
                format!("waitForSelector {}", input.selector())
            }
            VerificationStep::AssertVisible(p) => format!("assertVisible {}", p.describe()),
            VerificationStep::AssertNotVisible(p) => format!("assertNotVisible {}", p.describe()),
            VerificationStep::Click(p) => format!("click {}", p.describe()),
            VerificationStep::WaitForUrl(input) => format!("waitForUrl {}", input.pattern()),
            VerificationStep::WaitForDialog(p) => format!("waitForDialog {:?}", p.contains),
            VerificationStep::ScrollIntoView(p) => format!("scrollIntoView {}", p.describe()),
            VerificationStep::Screenshot(_) => "screenshot".to_string(),
            VerificationStep::AssertScreenshot(input) => {
                format!("assertScreenshot {}", input.reference())
            }
            VerificationStep::SettleDelay(input) => match input {
                Some(i) => format!("settleDelay {}ms", i.ms()),
                None => "settleDelay".to_string(),
            },
        }
    }
}

/// `- navigate: /pricing` or the struct form with a timeout override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavigateInput {
    Url(String),
    Params(NavigateParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub url: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl NavigateInput {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(u) => u,
            Self::Params(p) => &p.url,
        }
    }

    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::Url(_) => None,
            Self::Params(p) => p.timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitForSelectorInput {
    Selector(String),
    Params(WaitForSelectorParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForSelectorParams {
    pub selector: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl WaitForSelectorInput {
    pub fn selector(&self) -> &str {
        match self {
            Self::Selector(s) => s,
            Self::Params(p) => &p.selector,
        }
    }

    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::Selector(_) => None,
            Self::Params(p) => p.timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitForUrlInput {
    Pattern(String),
    Params(WaitForUrlParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForUrlParams {
    pub pattern: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl WaitForUrlInput {
    pub fn pattern(&self) -> &str {
        match self {
            Self::Pattern(p) => p,
            Self::Params(p) => &p.pattern,
        }
    }

    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::Pattern(_) => None,
            Self::Params(p) => p.timeout,
        }
    }
}

/// Element description shared by assert/click/scroll steps. Exactly one of
/// `text`, `role` or `css` must be given.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocatorParams {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    /// Accessible name, used together with `role`.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub css: Option<String>,

    #[serde(default)]
    pub exact: bool,

    /// 0-based index among matches.
    #[serde(default)]
    pub index: usize,

    /// Demote a failed assertion to a warning. The run still fails overall
    /// if any warning was recorded, but execution continues.
    #[serde(default)]
    pub soft: bool,

    #[serde(default)]
    pub timeout: Option<u64>,
}

impl LocatorParams {
    /// Build the locator, or `None` when no selector field was given.
    pub fn locator(&self) -> Option<Locator> {
        if let Some(ref css) = self.css {
            return Some(Locator::Css {
                selector: css.clone(),
                index: self.index,
            });
        }
        if let Some(ref role) = self.role {
            return Some(Locator::Role {
                role: role.clone(),
                name: self.name.clone(),
                exact: self.exact,
                index: self.index,
            });
        }
        self.text.as_ref().map(|text| Locator::Text {
            text: text.clone(),
            exact: self.exact,
            index: self.index,
        })
    }

    pub fn describe(&self) -> String {
        match self.locator() {
            Some(l) => l.to_string(),
            None => "<no locator>".to_string(),
        }
    }
}

/// How to find a UI element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Text {
        text: String,
        exact: bool,
        index: usize,
    },
    Role {
        role: String,
        name: Option<String>,
        exact: bool,
        index: usize,
    },
    Css {
        selector: String,
        index: usize,
    },
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Text { text, exact, .. } => {
                if *exact {
                    write!(f, "text=\"{}\"", text)
                } else {
                    write!(f, "text~\"{}\"", text)
                }
            }
            Locator::Role { role, name, .. } => match name {
                Some(n) => write!(f, "role={} name=\"{}\"", role, n),
                None => write!(f, "role={}", role),
            },
            Locator::Css { selector, .. } => write!(f, "css={}", selector),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogParams {
    /// Substring the dialog message must contain.
    pub contains: String,

    /// Whether to accept or dismiss the dialog. Part of the step
    /// configuration, never inferred.
    #[serde(default)]
    pub action: DialogAction,

    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialogAction {
    Accept,
    #[default]
    Dismiss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScreenshotInput {
    Path(String),
    Params(ScreenshotParams),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotParams {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub full_page: bool,
}

impl ScreenshotInput {
    pub fn into_params(self) -> ScreenshotParams {
        match self {
            Self::Path(path) => ScreenshotParams {
                path: Some(path),
                full_page: false,
            },
            Self::Params(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertScreenshotInput {
    Reference(String),
    Params(AssertScreenshotParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertScreenshotParams {
    pub reference: String,
    #[serde(default = "default_tolerance_percent")]
    pub tolerance: f64,
}

fn default_tolerance_percent() -> f64 {
    1.0
}

impl AssertScreenshotInput {
    pub fn reference(&self) -> &str {
        match self {
            Self::Reference(r) => r,
            Self::Params(p) => &p.reference,
        }
    }

    pub fn tolerance(&self) -> f64 {
        match self {
            Self::Reference(_) => default_tolerance_percent(),
            Self::Params(p) => p.tolerance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettleInput {
    Ms(u64),
    Params(SettleParams),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleParams {
    pub ms: u64,
}

impl SettleInput {
    pub fn ms(&self) -> u64 {
        match self {
            Self::Ms(ms) => *ms,
            Self::Params(p) => p.ms,
        }
    }
}
