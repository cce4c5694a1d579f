use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    /// The step failed, and the pipeline kept going. Holds the diagnostic.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label : String,
    pub status: StepStatus,
}

/// Status of every step that was attempted, in the sequential reference order.
#[derive(Debug, Default, Clone)]
pub struct PipelineReport {
    steps: Vec<StepReport>,
}

impl PipelineReport {
    pub(crate) fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    pub(crate) fn extend(&mut self, steps: impl IntoIterator<Item = StepReport>) {
        self.steps.extend(steps);
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| matches!(step.status, StepStatus::Failed(_)))
    }

    /// # Errors
    /// `PipelineError::FailedSteps` if any of the attempted steps failed.
    pub fn ensure_success(&self) -> Result<(), PipelineError> {
        let failed: Vec<&str> = self.failures().map(|step| step.label.as_str()).collect();
        match failed.is_empty() {
            true  => Ok(()),
            false => Err(PipelineError::FailedSteps{failed: failed.len(), total: self.steps.len(), steps: failed.join(", ")}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_steps_summary() {
        let mut report = PipelineReport::default();
        report.push(StepReport{label: "convert".into(), status: StepStatus::Done});
        assert!(report.ensure_success().is_ok());

        report.extend([
            StepReport{label: "geno".into(),      status: StepStatus::Failed("bad".into())},
            StepReport{label: "chr2-vcf".into(),  status: StepStatus::Failed("bad".into())},
        ]);
        let err = report.ensure_success().expect_err("two steps failed");
        assert_eq!(err.to_string(), "2 out of 3 pipeline steps failed: geno, chr2-vcf");
    }
}
