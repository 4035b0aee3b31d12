use dmp_core::Real;

/// Stage of the optimization loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStage {
    Initialize,
    EvaluateMean,
    SampleAndRollout,
    UpdateDistribution,
    Terminated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationEvent {
    pub stage: OptimizationStage,
    /// Index of the current update (counted over resumed runs too).
    pub update: usize,
    /// Index one past the last update of this run.
    pub end_update: usize,
    pub n_samples_so_far: usize,
    /// Total cost of the mean, once evaluated in this update.
    pub cost_eval: Option<Real>,
}
