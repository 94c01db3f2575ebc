use std::time::{Duration, Instant};

use uuid::Uuid;

use super::context::RunContext;
use super::events::{EventEmitter, RunEvent};
use super::state::{RunState, StepStatus};
use crate::driver::traits::UiDriver;
use crate::error::StepError;
use crate::parser::types::{
    DialogParams, Locator, LocatorParams, VerificationFlow, VerificationStep,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Executes one verification flow against one browser session, strictly in
/// order. The first failing step stops the run; remaining steps are recorded
/// as skipped.
pub struct StepExecutor {
    driver: Box<dyn UiDriver>,
    context: RunContext,
    emitter: EventEmitter,
}

impl StepExecutor {
    pub fn new(driver: Box<dyn UiDriver>, context: RunContext, emitter: EventEmitter) -> Self {
        Self {
            driver,
            context,
            emitter,
        }
    }

    /// Run all steps. Step failures are captured in the returned state, not
    /// propagated, so the caller always regains control to release the
    /// session.
    pub async fn run_flow(&mut self, flow: &VerificationFlow) -> RunState {
        let run_id: String = Uuid::new_v4().to_string().chars().take(8).collect();
        let flow_name = flow.name.clone().unwrap_or_else(|| "unnamed".to_string());
        let labels: Vec<String> = flow.steps.iter().map(|s| s.display_name()).collect();

        let mut state = RunState::new(&run_id, &flow_name, &labels);

        self.emitter.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            flow_name: flow_name.clone(),
            step_count: flow.steps.len(),
        });
        state.start();

        for (i, step) in flow.steps.iter().enumerate() {
            // The next pending dialog expectation decides how the in-page
            // interceptor answers dialogs fired by this step.
            let armed = flow.steps[i..]
                .iter()
                .find_map(|s| match s {
                    VerificationStep::WaitForDialog(p) => Some(p.action),
                    _ => None,
                })
                .unwrap_or_default();
            if let Err(e) = self.driver.arm_dialogs(armed).await {
                log::debug!("dialog arming skipped: {e}");
            }

            state.steps[i].start();
            self.emitter.emit(RunEvent::StepStarted {
                index: i,
                label: labels[i].clone(),
            });

            match self.execute_step(i, step, &mut state).await {
                Ok(()) => {
                    state.steps[i].pass();
                    self.emitter.emit(RunEvent::StepPassed {
                        index: i,
                        duration_ms: state.steps[i].duration_ms.unwrap_or(0),
                    });
                }
                Err(err) => {
                    let kind = err.kind();
                    state.steps[i].fail(kind, err.to_string());
                    self.emitter.emit(RunEvent::StepFailed {
                        index: i,
                        error: format!("{kind}: {err}"),
                        duration_ms: state.steps[i].duration_ms.unwrap_or(0),
                    });

                    self.capture_failure_screenshot(i, &mut state).await;

                    state.skip_remaining(i + 1);
                    for step in &state.steps[i + 1..] {
                        if step.status == StepStatus::Skipped {
                            self.emitter.emit(RunEvent::StepSkipped {
                                index: step.index,
                                label: step.label.clone(),
                            });
                        }
                    }
                    break;
                }
            }
        }

        state.finish();
        self.emitter.emit(RunEvent::RunFinished {
            flow_name,
            passed: state.verdict().passed(),
            duration_ms: state.duration_ms,
            warnings: state.warnings.len() + state.soft_failures.len(),
        });

        state
    }

    /// Release the browser session. Called by the runner on every exit path.
    pub async fn shutdown(self) {
        if let Err(e) = self.driver.close().await {
            self.emitter.emit(RunEvent::Warning {
                message: format!("session close failed: {e}"),
            });
        }
    }

    async fn execute_step(
        &self,
        index: usize,
        step: &VerificationStep,
        state: &mut RunState,
    ) -> Result<(), StepError> {
        match step {
            VerificationStep::Navigate(input) => {
                let url = self.context.resolve_url(input.url());
                let timeout = input.timeout().unwrap_or(self.context.nav_timeout_ms);
                self.driver.navigate(&url, timeout).await
            }

            VerificationStep::WaitForSelector(input) => {
                let selector = self.context.substitute_vars(input.selector());
                let timeout = input.timeout().unwrap_or(self.context.wait_timeout_ms);
                self.driver.wait_for_selector(&selector, timeout).await
            }

            VerificationStep::AssertVisible(params) => {
                let locator = self.resolve_locator(params)?;
                let timeout = params.timeout.unwrap_or(self.context.wait_timeout_ms);
                let result = self.wait_visible(&locator, timeout).await;
                self.settle_assertion(result, params.soft, state)
            }

            VerificationStep::AssertNotVisible(params) => {
                let locator = self.resolve_locator(params)?;
                let timeout = params.timeout.unwrap_or(self.context.wait_timeout_ms);
                let result = self.wait_absent(&locator, timeout).await;
                self.settle_assertion(result, params.soft, state)
            }

            VerificationStep::Click(params) => {
                let locator = self.resolve_locator(params)?;
                let timeout = params.timeout.unwrap_or(self.context.wait_timeout_ms);
                self.driver.click(&locator, timeout).await
            }

            VerificationStep::WaitForUrl(input) => {
                let pattern = self.context.substitute_vars(input.pattern());
                let timeout = input.timeout().unwrap_or(self.context.wait_timeout_ms);
                self.wait_for_url(&pattern, timeout).await
            }

            VerificationStep::WaitForDialog(params) => self.wait_for_dialog(params).await,

            VerificationStep::ScrollIntoView(params) => {
                let locator = self.resolve_locator(params)?;
                self.driver.scroll_into_view(&locator).await
            }

            VerificationStep::Screenshot(input) => {
                let params = input.clone().map(|i| i.into_params()).unwrap_or_default();
                let path = self.context.screenshot_path(index, params.path.as_deref());

                // Best-effort: a missing artifact must never mask the
                // verdict established by the verification steps.
                match self.driver.screenshot(&path, params.full_page).await {
                    Ok(()) => {
                        self.emitter.emit(RunEvent::Log {
                            message: format!("Screenshot saved to {}", path.display()),
                        });
                        Ok(())
                    }
                    Err(e) => {
                        let message = format!("could not write {}: {e}", path.display());
                        state.warn(message.clone());
                        self.emitter.emit(RunEvent::Warning { message });
                        Ok(())
                    }
                }
            }

            VerificationStep::AssertScreenshot(input) => {
                let reference = self
                    .context
                    .resolve_path(&self.context.substitute_vars(input.reference()));
                if !reference.exists() {
                    return Err(StepError::Session(format!(
                        "reference screenshot not found: {}",
                        reference.display()
                    )));
                }

                let bytes = self.driver.screenshot_bytes().await?;
                let diff = crate::driver::compare::diff_against_reference(&bytes, &reference)
                    .map_err(|e| StepError::Session(format!("comparison failed: {e}")))?;

                let tolerance = input.tolerance();
                if diff > tolerance {
                    Err(StepError::VisualMismatch {
                        diff_percent: diff,
                        tolerance_percent: tolerance,
                    })
                } else {
                    self.emitter.emit(RunEvent::Log {
                        message: format!("Visual check passed (diff: {diff:.2}%)"),
                    });
                    Ok(())
                }
            }

            VerificationStep::SettleDelay(input) => {
                let ms = input
                    .as_ref()
                    .map(|i| i.ms())
                    .unwrap_or(self.context.settle_ms);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
        }
    }

    fn resolve_locator(&self, params: &LocatorParams) -> Result<Locator, StepError> {
        let mut params = params.clone();
        params.text = params.text.map(|t| self.context.substitute_vars(&t));
        params.name = params.name.map(|n| self.context.substitute_vars(&n));
        params.css = params.css.map(|c| self.context.substitute_vars(&c));
        params
            .locator()
            .ok_or_else(|| StepError::Session("step has no locator (text/role/css)".to_string()))
    }

    fn settle_assertion(
        &self,
        result: Result<(), StepError>,
        soft: bool,
        state: &mut RunState,
    ) -> Result<(), StepError> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if soft => {
                let message = format!("soft assertion failed: {e}");
                state.soft_fail(message.clone());
                self.emitter.emit(RunEvent::Warning { message });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<(), StepError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.driver.is_visible(locator).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StepError::ElementNotFound(format!(
                    "{locator} not visible within {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_absent(&self, locator: &Locator, timeout_ms: u64) -> Result<(), StepError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if !self.driver.is_visible(locator).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StepError::AssertionFailed(format!(
                    "{locator} still visible after {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_url(&self, pattern: &str, timeout_ms: u64) -> Result<(), StepError> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| StepError::Session(format!("invalid URL pattern {pattern:?}: {e}")))?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let url = self.driver.current_url().await?;
            if matcher.matches(&url) || url == pattern {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StepError::Navigation(format!(
                    "URL never matched {pattern:?} within {timeout_ms}ms (last: {url})"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_dialog(&self, params: &DialogParams) -> Result<(), StepError> {
        let timeout_ms = params.timeout.unwrap_or(self.context.wait_timeout_ms);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if let Some(record) = self.driver.next_dialog().await? {
                if record.message.contains(&params.contains) {
                    self.emitter.emit(RunEvent::Log {
                        message: format!("Dialog message: {}", record.message),
                    });
                    return Ok(());
                }
                return Err(StepError::DialogMismatch {
                    expected: params.contains.clone(),
                    actual: record.message,
                });
            }
            if Instant::now() >= deadline {
                return Err(StepError::DialogTimeout { timeout_ms });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn capture_failure_screenshot(&self, index: usize, state: &mut RunState) {
        let path = self.context.failure_screenshot_path(index);
        match self.driver.screenshot(&path, false).await {
            Ok(()) => self.emitter.emit(RunEvent::Log {
                message: format!("Failure screenshot saved to {}", path.display()),
            }),
            Err(e) => {
                let message = format!("could not write failure screenshot: {e}");
                state.warn(message.clone());
                self.emitter.emit(RunEvent::Warning { message });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::DialogRecord;
    use crate::parser::types::{
        DialogAction, NavigateInput, ScreenshotInput, SettleInput, WaitForSelectorInput,
        WaitForUrlInput, WaitForUrlParams,
    };
    use crate::runner::state::RunVerdict;
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted driver state, shared between the executor's boxed driver and
    /// the test body so assertions can inspect the recorded calls.
    #[derive(Default)]
    struct MockState {
        visible: Mutex<HashSet<String>>,
        navigate_errors: Mutex<VecDeque<StepError>>,
        dialogs: Mutex<VecDeque<DialogRecord>>,
        url: Mutex<String>,
        screenshot_fails: AtomicBool,
        calls: Mutex<Vec<String>>,
        armed: Mutex<Vec<DialogAction>>,
        close_count: AtomicUsize,
    }

    #[derive(Clone, Default)]
    struct MockDriver {
        state: Arc<MockState>,
    }

    impl MockDriver {
        fn with_visible(selectors: &[&str]) -> Self {
            let driver = Self::default();
            {
                let mut visible = driver.state.visible.lock().unwrap();
                for s in selectors {
                    visible.insert(s.to_string());
                }
            }
            driver
        }

        fn record(&self, call: String) {
            self.state.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.state.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UiDriver for MockDriver {
        fn name(&self) -> &str {
            "mock"
        }

        async fn navigate(&self, url: &str, _timeout_ms: u64) -> Result<(), StepError> {
            self.record(format!("navigate {url}"));
            if let Some(err) = self.state.navigate_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            *self.state.url.lock().unwrap() = url.to_string();
            Ok(())
        }

        async fn wait_for_selector(
            &self,
            selector: &str,
            timeout_ms: u64,
        ) -> Result<(), StepError> {
            self.record(format!("waitForSelector {selector}"));
            if self.state.visible.lock().unwrap().contains(selector) {
                Ok(())
            } else {
                Err(StepError::ElementNotFound(format!(
                    "selector {selector:?} not visible within {timeout_ms}ms"
                )))
            }
        }

        async fn is_visible(&self, locator: &Locator) -> Result<bool, StepError> {
            self.record(format!("isVisible {locator}"));
            Ok(self
                .state
                .visible
                .lock()
                .unwrap()
                .contains(&locator.to_string()))
        }

        async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<(), StepError> {
            self.record(format!("click {locator}"));
            if self
                .state
                .visible
                .lock()
                .unwrap()
                .contains(&locator.to_string())
            {
                Ok(())
            } else {
                Err(StepError::Interaction(format!(
                    "{locator} not clickable within {timeout_ms}ms"
                )))
            }
        }

        async fn current_url(&self) -> Result<String, StepError> {
            Ok(self.state.url.lock().unwrap().clone())
        }

        async fn scroll_into_view(&self, locator: &Locator) -> Result<(), StepError> {
            self.record(format!("scroll {locator}"));
            Ok(())
        }

        async fn arm_dialogs(&self, action: DialogAction) -> Result<(), StepError> {
            self.state.armed.lock().unwrap().push(action);
            Ok(())
        }

        async fn next_dialog(&self) -> Result<Option<DialogRecord>, StepError> {
            Ok(self.state.dialogs.lock().unwrap().pop_front())
        }

        async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<(), StepError> {
            self.record(format!("screenshot {}", path.display()));
            if self.state.screenshot_fails.load(Ordering::SeqCst) {
                Err(StepError::Session("disk full".into()))
            } else {
                Ok(())
            }
        }

        async fn screenshot_bytes(&self) -> Result<Vec<u8>, StepError> {
            Err(StepError::Session("not scripted".into()))
        }

        async fn close(&self) -> Result<(), StepError> {
            self.state.close_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context() -> RunContext {
        let mut ctx = RunContext::new(Path::new("/flows"), Path::new("/out"));
        ctx.base_url = Some("http://localhost:3131".into());
        // Short waits keep the polling tests fast.
        ctx.wait_timeout_ms = 200;
        ctx.settle_ms = 10;
        ctx
    }

    fn executor(driver: &MockDriver) -> StepExecutor {
        StepExecutor::new(Box::new(driver.clone()), context(), EventEmitter::default())
    }

    fn flow(steps: Vec<VerificationStep>) -> VerificationFlow {
        VerificationFlow {
            name: Some("test flow".into()),
            steps,
            ..Default::default()
        }
    }

    fn text_params(text: &str, exact: bool) -> LocatorParams {
        LocatorParams {
            text: Some(text.into()),
            exact,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pricing_scenario_passes() {
        let driver = MockDriver::with_visible(&[
            "table",
            "text=\"Unlock Pro Features\"",
            "text=\"Compare Features\"",
            "text=\"Upgrade to Pro\"",
        ]);
        driver.state.dialogs.lock().unwrap().push_back(DialogRecord {
            kind: "alert".into(),
            message: "This is a fake checkout button".into(),
        });

        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::Navigate(NavigateInput::Url("/pricing".into())),
            VerificationStep::WaitForSelector(WaitForSelectorInput::Selector("table".into())),
            VerificationStep::AssertVisible(text_params("Unlock Pro Features", true)),
            VerificationStep::AssertVisible(text_params("Compare Features", true)),
            VerificationStep::Click(text_params("Upgrade to Pro", true)),
            VerificationStep::WaitForDialog(DialogParams {
                contains: "fake checkout button".into(),
                action: DialogAction::Dismiss,
                timeout: Some(200),
            }),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        assert_eq!(state.verdict(), RunVerdict::Passed);
        assert!(state.steps.iter().all(|s| s.status == StepStatus::Passed));
    }

    #[tokio::test]
    async fn test_missing_table_fails_at_step_one() {
        let driver = MockDriver::with_visible(&["text=\"Unlock Pro Features\""]);
        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::Navigate(NavigateInput::Url("/pricing".into())),
            VerificationStep::WaitForSelector(WaitForSelectorInput::Selector("table".into())),
            VerificationStep::AssertVisible(text_params("Unlock Pro Features", true)),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        match state.verdict() {
            RunVerdict::Failed { step_index, reason } => {
                assert_eq!(step_index, 1);
                assert!(reason.starts_with("ElementNotFound"), "got: {reason}");
            }
            RunVerdict::Passed => panic!("expected failure"),
        }
        assert_eq!(state.steps[2].status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn test_no_step_runs_after_failure() {
        let driver = MockDriver::default();
        driver
            .state
            .navigate_errors
            .lock()
            .unwrap()
            .push_back(StepError::Navigation("/pricing: response status 500".into()));

        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::Navigate(NavigateInput::Url("/pricing".into())),
            VerificationStep::WaitForSelector(WaitForSelectorInput::Selector("table".into())),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        match state.verdict() {
            RunVerdict::Failed { step_index, reason } => {
                assert_eq!(step_index, 0);
                assert!(reason.starts_with("NavigationError"));
            }
            RunVerdict::Passed => panic!("expected failure"),
        }

        // Only the navigate and the opportunistic failure screenshot ran.
        let calls = driver.calls();
        assert!(
            calls.iter().all(|c| !c.starts_with("waitForSelector")),
            "calls: {calls:?}"
        );
    }

    #[tokio::test]
    async fn test_exact_sponsor_link_missing() {
        let driver = MockDriver::default();
        let mut exec = executor(&driver);
        let sponsor_link = LocatorParams {
            role: Some("link".into()),
            name: Some("Sponsor".into()),
            exact: true,
            timeout: Some(150),
            ..Default::default()
        };
        let steps = vec![
            VerificationStep::Navigate(NavigateInput::Url("/history".into())),
            VerificationStep::AssertVisible(sponsor_link.clone()),
            VerificationStep::Click(sponsor_link),
            VerificationStep::WaitForUrl(WaitForUrlInput::Pattern("**/support".into())),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        match state.verdict() {
            RunVerdict::Failed { step_index, reason } => {
                assert_eq!(step_index, 1);
                assert!(reason.starts_with("ElementNotFound"));
            }
            RunVerdict::Passed => panic!("expected failure"),
        }
        assert_eq!(state.steps[2].status, StepStatus::Skipped);
        assert_eq!(state.steps[3].status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn test_wait_for_url_glob() {
        let driver = MockDriver::default();
        *driver.state.url.lock().unwrap() = "http://localhost:3131/support".into();

        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::WaitForUrl(WaitForUrlInput::Pattern(
            "**/support".into(),
        ))];
        let state = exec.run_flow(&flow(steps)).await;
        assert_eq!(state.verdict(), RunVerdict::Passed);
    }

    #[tokio::test]
    async fn test_wait_for_url_timeout_is_navigation_error() {
        let driver = MockDriver::default();
        *driver.state.url.lock().unwrap() = "http://localhost:3131/history".into();

        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::WaitForUrl(WaitForUrlInput::Params(
            WaitForUrlParams {
                pattern: "**/support".into(),
                timeout: Some(150),
            },
        ))];
        let state = exec.run_flow(&flow(steps)).await;
        match state.verdict() {
            RunVerdict::Failed { reason, .. } => {
                assert!(reason.starts_with("NavigationError"), "got: {reason}")
            }
            RunVerdict::Passed => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_screenshot_failure_never_changes_verdict() {
        let driver = MockDriver::with_visible(&["text=\"CYBER SUPPORT\""]);
        driver.state.screenshot_fails.store(true, Ordering::SeqCst);

        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::AssertVisible(text_params("CYBER SUPPORT", true)),
            VerificationStep::Screenshot(Some(ScreenshotInput::Path("support.png".into()))),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        assert_eq!(state.verdict(), RunVerdict::Passed);
        assert_eq!(state.warnings.len(), 1);
        assert!(state.warnings[0].contains("support.png"));
    }

    #[tokio::test]
    async fn test_dialog_mismatch() {
        let driver = MockDriver::default();
        driver.state.dialogs.lock().unwrap().push_back(DialogRecord {
            kind: "alert".into(),
            message: "unexpected message".into(),
        });

        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::WaitForDialog(DialogParams {
            contains: "fake checkout button".into(),
            action: DialogAction::Dismiss,
            timeout: Some(200),
        })];
        let state = exec.run_flow(&flow(steps)).await;

        match state.verdict() {
            RunVerdict::Failed { reason, .. } => {
                assert!(reason.starts_with("DialogMismatch"), "got: {reason}")
            }
            RunVerdict::Passed => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_dialog_timeout_is_bounded() {
        let driver = MockDriver::default();
        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::WaitForDialog(DialogParams {
            contains: "anything".into(),
            action: DialogAction::Dismiss,
            timeout: Some(150),
        })];

        let started = Instant::now();
        let state = exec.run_flow(&flow(steps)).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        match state.verdict() {
            RunVerdict::Failed { reason, .. } => {
                assert!(reason.starts_with("DialogTimeout"), "got: {reason}")
            }
            RunVerdict::Passed => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_dialog_action_armed_before_trigger_step() {
        let driver = MockDriver::with_visible(&["text=\"Upgrade to Pro\""]);
        driver.state.dialogs.lock().unwrap().push_back(DialogRecord {
            kind: "confirm".into(),
            message: "fake checkout button".into(),
        });

        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::Click(text_params("Upgrade to Pro", true)),
            VerificationStep::WaitForDialog(DialogParams {
                contains: "fake checkout button".into(),
                action: DialogAction::Accept,
                timeout: Some(200),
            }),
        ];
        let state = exec.run_flow(&flow(steps)).await;
        assert_eq!(state.verdict(), RunVerdict::Passed);

        // Armed with the step's accept choice already before the click ran.
        let armed = driver.state.armed.lock().unwrap().clone();
        assert_eq!(armed[0], DialogAction::Accept);
    }

    #[tokio::test]
    async fn test_soft_assertion_continues_but_fails_run() {
        let driver = MockDriver::with_visible(&["text=Thanks for voting!"]);
        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::AssertVisible(LocatorParams {
                text: Some("No Such Banner".into()),
                soft: true,
                timeout: Some(150),
                ..Default::default()
            }),
            VerificationStep::AssertVisible(text_params("Thanks for voting!", false)),
        ];
        let state = exec.run_flow(&flow(steps)).await;

        // Both steps executed; the soft failure surfaced at the end.
        assert!(state.steps.iter().all(|s| s.status == StepStatus::Passed));
        assert_eq!(state.soft_failures.len(), 1);
        assert!(!state.verdict().passed());
    }

    #[tokio::test]
    async fn test_settle_delay_and_scroll() {
        let driver = MockDriver::with_visible(&["text=Code Arena"]);
        let mut exec = executor(&driver);
        let steps = vec![
            VerificationStep::ScrollIntoView(text_params("Code Arena", false)),
            VerificationStep::SettleDelay(Some(SettleInput::Ms(10))),
            VerificationStep::SettleDelay(None),
        ];
        let state = exec.run_flow(&flow(steps)).await;
        assert_eq!(state.verdict(), RunVerdict::Passed);
    }

    #[tokio::test]
    async fn test_session_closed_exactly_once() {
        let driver = MockDriver::default();
        driver
            .state
            .navigate_errors
            .lock()
            .unwrap()
            .push_back(StepError::Navigation("boom".into()));

        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::Navigate(NavigateInput::Url("/".into()))];
        let _ = exec.run_flow(&flow(steps)).await;

        assert_eq!(driver.state.close_count.load(Ordering::SeqCst), 0);
        exec.shutdown().await;
        assert_eq!(driver.state.close_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_base_url_joined_on_navigate() {
        let driver = MockDriver::default();
        let mut exec = executor(&driver);
        let steps = vec![VerificationStep::Navigate(NavigateInput::Url(
            "/pricing".into(),
        ))];
        let _ = exec.run_flow(&flow(steps)).await;

        let calls = driver.calls();
        assert_eq!(calls[0], "navigate http://localhost:3131/pricing");
    }
}
