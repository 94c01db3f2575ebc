use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default per-step timeouts, overridable from the CLI and per step.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SETTLE_MS: u64 = 1_000;

/// Runtime information for one verification run.
pub struct RunContext {
    /// Directory of the flow file, for resolving reference images.
    pub base_dir: PathBuf,

    /// Output directory for screenshot artifacts.
    pub output_dir: PathBuf,

    /// Base URL that relative step URLs are joined onto.
    pub base_url: Option<String>,

    pub nav_timeout_ms: u64,
    pub wait_timeout_ms: u64,
    pub settle_ms: u64,

    /// Variables from the flow header's `env` section.
    pub env: HashMap<String, String>,
}

impl RunContext {
    pub fn new(base_dir: &Path, output_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            base_url: None,
            nav_timeout_ms: DEFAULT_NAV_TIMEOUT_MS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            env: HashMap::new(),
        }
    }

    /// Join a step URL onto the base URL unless it is already absolute.
    pub fn resolve_url(&self, raw: &str) -> String {
        let url = self.substitute_vars(raw);
        if url.starts_with("http://") || url.starts_with("https://") {
            return url;
        }
        match self.base_url {
            Some(ref base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url,
        }
    }

    /// Resolve a reference path relative to the flow file.
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Artifact location for a screenshot. Explicit names land under the
    /// output directory; omitted names get a deterministic per-step default
    /// so CI artifact collection stays stable.
    pub fn screenshot_path(&self, step_index: usize, explicit: Option<&str>) -> PathBuf {
        match explicit {
            Some(name) => {
                let name = self.substitute_vars(name);
                let path = Path::new(&name);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.output_dir.join(path)
                }
            }
            None => self.output_dir.join(format!("step_{step_index:02}.png")),
        }
    }

    pub fn failure_screenshot_path(&self, step_index: usize) -> PathBuf {
        self.output_dir
            .join(format!("failure_step_{step_index:02}.png"))
    }

    /// Get a variable from the flow env, falling back to the process
    /// environment.
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.env
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Substitute `${name}` placeholders, plus the dynamic `${date}`,
    /// `${time}` and `${timestamp}` values. Unknown names are left alone.
    pub fn substitute_vars(&self, text: &str) -> String {
        let re = Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").unwrap();
        re.replace_all(text, |caps: &regex::Captures| {
            let key = &caps[1];
            if let Some(val) = self.get_var(key) {
                return val;
            }
            match key {
                "time" => chrono::Local::now().format("%H-%M-%S").to_string(),
                "date" => chrono::Local::now().format("%Y-%m-%d").to_string(),
                "timestamp" => chrono::Utc::now().timestamp().to_string(),
                _ => format!("${{{key}}}"),
            }
        })
        .to_string()
    }
}
