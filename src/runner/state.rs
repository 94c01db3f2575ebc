use std::time::Instant;

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { kind: &'static str, reason: String },
    /// Never executed because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub label: String,
    pub status: StepStatus,
    started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn new(index: usize, label: &str) -> Self {
        Self {
            index,
            label: label.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.record_duration();
        self.status = StepStatus::Passed;
    }

    pub fn fail(&mut self, kind: &'static str, reason: String) {
        self.record_duration();
        self.status = StepStatus::Failed { kind, reason };
    }

    pub fn skip(&mut self) {
        self.status = StepStatus::Skipped;
    }

    fn record_duration(&mut self) {
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }
}

/// Final verdict of a run. `Failed` carries the first failing step only;
/// nothing after it was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunVerdict {
    Passed,
    Failed { step_index: usize, reason: String },
}

impl RunVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, RunVerdict::Passed)
    }
}

/// State of one verification run against one browser session.
#[derive(Debug)]
pub struct RunState {
    pub run_id: String,
    pub flow_name: String,
    pub steps: Vec<StepState>,
    /// Informational notices (artifact write problems). Never affect the
    /// verdict.
    pub warnings: Vec<String>,
    /// Failed assertions demoted by `soft: true`. Execution continued, but
    /// any of these still fails the final verdict.
    pub soft_failures: Vec<String>,
    started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl RunState {
    pub fn new(run_id: &str, flow_name: &str, step_labels: &[String]) -> Self {
        let steps = step_labels
            .iter()
            .enumerate()
            .map(|(i, label)| StepState::new(i, label))
            .collect();
        Self {
            run_id: run_id.to_string(),
            flow_name: flow_name.to_string(),
            steps,
            warnings: Vec::new(),
            soft_failures: Vec::new(),
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn soft_fail(&mut self, message: String) {
        self.soft_failures.push(message);
    }

    /// Mark every still-pending step after a failure as skipped.
    pub fn skip_remaining(&mut self, from_index: usize) {
        for step in &mut self.steps[from_index..] {
            if step.status == StepStatus::Pending {
                step.skip();
            }
        }
    }

    /// Passed only when every step passed and no soft assertion failed.
    /// Artifact warnings never change the verdict.
    pub fn verdict(&self) -> RunVerdict {
        for step in &self.steps {
            if let StepStatus::Failed { kind, reason } = &step.status {
                return RunVerdict::Failed {
                    step_index: step.index,
                    reason: format!("{kind}: {reason}"),
                };
            }
        }
        if let Some(first) = self.soft_failures.first() {
            return RunVerdict::Failed {
                step_index: self.steps.len(),
                reason: format!(
                    "{} soft assertion failure(s), first: {}",
                    self.soft_failures.len(),
                    first
                ),
            };
        }
        RunVerdict::Passed
    }
}

/// Aggregate over all runs of one invocation.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub warnings: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn absorb(&mut self, run: &RunState) {
        self.total_runs += 1;
        if run.verdict().passed() {
            self.passed_runs += 1;
        } else {
            self.failed_runs += 1;
        }
        for step in &run.steps {
            self.total_steps += 1;
            match step.status {
                StepStatus::Passed => self.passed_steps += 1,
                StepStatus::Failed { .. } => self.failed_steps += 1,
                StepStatus::Skipped => self.skipped_steps += 1,
                _ => {}
            }
        }
        self.warnings += run.warnings.len() + run.soft_failures.len();
        self.total_duration_ms += run.duration_ms.unwrap_or(0);
    }

    pub fn all_passed(&self) -> bool {
        self.failed_runs == 0
    }
}
