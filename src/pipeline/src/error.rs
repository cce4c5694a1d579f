use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline step '{0}' failed. Aborting. Use '--on-error continue' to run the remaining steps regardless")]
    StepFailed(String),

    #[error("{failed} out of {total} pipeline steps failed: {steps}")]
    FailedSteps{failed: usize, total: usize, steps: String},

    #[error("Failed to instantiate threadpool")]
    BuildThreadPool(#[source] rayon::ThreadPoolBuildError),
}
