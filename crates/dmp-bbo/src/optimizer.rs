//! The sample / rollout / update loop.

use crate::config::OptimizationConfig;
use crate::distribution::Distribution;
use crate::error::BboResult;
use crate::learning_curve::{LearningCurve, LearningCurveRow};
use crate::progress::{OptimizationEvent, OptimizationStage};
use crate::task::{Rollout, Task, TaskSolver};
use crate::updater::Updater;
use dmp_core::{DmpError, Real};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything one update saw and produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub distribution: Distribution,
    pub rollout_eval: Rollout,
    pub rollouts: Vec<Rollout>,
    pub weights: DVector<Real>,
    pub distribution_new: Distribution,
}

/// Result of an optimization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRun {
    pub learning_curve: LearningCurve,
    /// Starting distribution followed by the one produced by each update.
    pub distributions: Vec<Distribution>,
    pub update_summaries: Vec<UpdateSummary>,
}

impl OptimizationRun {
    pub fn final_distribution(&self) -> Option<&Distribution> {
        self.distributions.last()
    }
}

/// Optimize the parameters `task_solver` is rolled out with.
///
/// Runs `config.n_updates` updates starting from `initial_distribution`. Errors
/// from the task, the task solver or the updater abort the run unchanged.
pub fn run_optimization_task<T, S, U>(
    task: &T,
    task_solver: &S,
    initial_distribution: Distribution,
    updater: &U,
    config: &OptimizationConfig,
    progress_cb: Option<&mut dyn FnMut(OptimizationEvent)>,
) -> BboResult<OptimizationRun>
where
    T: Task + Sync + ?Sized,
    S: TaskSolver + Sync + ?Sized,
    U: Updater + ?Sized,
{
    run_from(
        task,
        task_solver,
        initial_distribution,
        LearningCurve::new(),
        updater,
        config,
        progress_cb,
    )
}

/// Continue a run from the last update of an earlier one.
///
/// Starts from `last.distribution_new` and appends `config.n_updates` rows to
/// `learning_curve`, continuing its sample count. The sampling seed is offset
/// by the number of updates already done, so reusing the earlier run's seed
/// still gives new samples.
pub fn resume_optimization_task<T, S, U>(
    task: &T,
    task_solver: &S,
    last: &UpdateSummary,
    learning_curve: LearningCurve,
    updater: &U,
    config: &OptimizationConfig,
    progress_cb: Option<&mut dyn FnMut(OptimizationEvent)>,
) -> BboResult<OptimizationRun>
where
    T: Task + Sync + ?Sized,
    S: TaskSolver + Sync + ?Sized,
    U: Updater + ?Sized,
{
    run_from(
        task,
        task_solver,
        last.distribution_new.clone(),
        learning_curve,
        updater,
        config,
        progress_cb,
    )
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(OptimizationEvent)>,
    stage: OptimizationStage,
    update: usize,
    end_update: usize,
    n_samples_so_far: usize,
    cost_eval: Option<Real>,
) {
    debug!(?stage, update, "optimization stage");
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(OptimizationEvent {
            stage,
            update,
            end_update,
            n_samples_so_far,
            cost_eval,
        });
    }
}

fn run_from<T, S, U>(
    task: &T,
    task_solver: &S,
    initial_distribution: Distribution,
    mut learning_curve: LearningCurve,
    updater: &U,
    config: &OptimizationConfig,
    mut progress_cb: Option<&mut dyn FnMut(OptimizationEvent)>,
) -> BboResult<OptimizationRun>
where
    T: Task + Sync + ?Sized,
    S: TaskSolver + Sync + ?Sized,
    U: Updater + ?Sized,
{
    let n_samples = config.n_samples_per_update;
    if n_samples == 0 {
        return Err(DmpError::invalid_parameter("n_samples_per_update must be at least 1").into());
    }
    let first_update = learning_curve.len();
    let end_update = first_update + config.n_updates;
    let mut n_samples_so_far = learning_curve.last().map_or(0, |row| row.n_samples + n_samples);
    let mut rng = sampling_rng(config.seed, first_update);

    emit_progress(
        &mut progress_cb,
        OptimizationStage::Initialize,
        first_update,
        end_update,
        n_samples_so_far,
        None,
    );

    let mut distribution = initial_distribution;
    let mut distributions = vec![distribution.clone()];
    let mut update_summaries = Vec::with_capacity(config.n_updates);

    for update in first_update..end_update {
        emit_progress(
            &mut progress_cb,
            OptimizationStage::EvaluateMean,
            update,
            end_update,
            n_samples_so_far,
            None,
        );
        let mean = distribution.mean().clone();
        let cost_vars_eval = task_solver.perform_rollout(&mean)?;
        let costs_eval = task.evaluate_rollout(&cost_vars_eval)?;
        let rollout_eval = Rollout::new(mean, cost_vars_eval, costs_eval)?;
        let cost_eval = rollout_eval.total_cost();

        emit_progress(
            &mut progress_cb,
            OptimizationStage::SampleAndRollout,
            update,
            end_update,
            n_samples_so_far,
            Some(cost_eval),
        );
        let samples = distribution.generate_samples(n_samples, &mut rng)?;
        let rollouts = perform_rollouts(task, task_solver, &samples, config.parallel_rollouts)?;
        let costs = DVector::from_iterator(rollouts.len(), rollouts.iter().map(Rollout::total_cost));

        emit_progress(
            &mut progress_cb,
            OptimizationStage::UpdateDistribution,
            update,
            end_update,
            n_samples_so_far,
            Some(cost_eval),
        );
        let (distribution_new, weights) = updater.update_distribution(&distribution, &samples, &costs)?;

        let exploration = distribution.max_eigen_value().max(0.0).sqrt();
        learning_curve.push(LearningCurveRow {
            n_samples: n_samples_so_far,
            cost_eval,
            exploration,
        })?;
        info!(
            update,
            n_samples = n_samples_so_far,
            cost_eval,
            exploration,
            "distribution updated"
        );

        n_samples_so_far += n_samples;
        distributions.push(distribution_new.clone());
        update_summaries.push(UpdateSummary {
            distribution,
            rollout_eval,
            rollouts,
            weights,
            distribution_new: distribution_new.clone(),
        });
        distribution = distribution_new;
    }

    emit_progress(
        &mut progress_cb,
        OptimizationStage::Terminated,
        end_update,
        end_update,
        n_samples_so_far,
        learning_curve.last().map(|row| row.cost_eval),
    );

    Ok(OptimizationRun {
        learning_curve,
        distributions,
        update_summaries,
    })
}

/// Random stream for a run whose first update is `first_update`.
///
/// A fresh run uses `seed` as is; a resumed run offsets it by its starting
/// update so that it does not replay the draws of the run it continues.
fn sampling_rng(seed: Option<u64>, first_update: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ (first_update as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}

/// Roll out and score every sample; results are in sample order.
fn perform_rollouts<T, S>(
    task: &T,
    task_solver: &S,
    samples: &DMatrix<Real>,
    parallel: bool,
) -> BboResult<Vec<Rollout>>
where
    T: Task + Sync + ?Sized,
    S: TaskSolver + Sync + ?Sized,
{
    let rollout = |i: usize| -> BboResult<Rollout> {
        let sample = samples.row(i).transpose();
        let cost_vars = task_solver.perform_rollout(&sample)?;
        let costs = task.evaluate_rollout(&cost_vars)?;
        Rollout::new(sample, cost_vars, costs)
    };
    if parallel {
        (0..samples.nrows()).into_par_iter().map(rollout).collect()
    } else {
        (0..samples.nrows()).map(rollout).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BboError;
    use crate::updater::UpdaterMean;

    /// Solver that returns the sample itself; cost is its squared norm.
    struct Sphere;

    impl TaskSolver for Sphere {
        fn perform_rollout(&self, sample: &DVector<Real>) -> BboResult<DMatrix<Real>> {
            Ok(DMatrix::from_row_slice(1, sample.len(), sample.as_slice()))
        }
    }

    impl Task for Sphere {
        fn evaluate_rollout(&self, cost_vars: &DMatrix<Real>) -> BboResult<DVector<Real>> {
            Ok(DVector::from_element(1, cost_vars.norm_squared()))
        }
    }

    fn start() -> Distribution {
        Distribution::isotropic(DVector::from_vec(vec![1.0, 1.0]), 0.25).unwrap()
    }

    #[test]
    fn stages_are_reported_in_order() {
        let config = OptimizationConfig {
            n_updates: 2,
            n_samples_per_update: 3,
            seed: Some(1),
            ..OptimizationConfig::default()
        };
        let mut stages = Vec::new();
        let mut record = |e: OptimizationEvent| stages.push((e.stage, e.update));
        run_optimization_task(&Sphere, &Sphere, start(), &UpdaterMean::default(), &config, Some(&mut record))
            .unwrap();

        use OptimizationStage::*;
        assert_eq!(
            stages,
            vec![
                (Initialize, 0),
                (EvaluateMean, 0),
                (SampleAndRollout, 0),
                (UpdateDistribution, 0),
                (EvaluateMean, 1),
                (SampleAndRollout, 1),
                (UpdateDistribution, 1),
                (Terminated, 2),
            ]
        );
    }

    #[test]
    fn history_is_kept_per_update() {
        let config = OptimizationConfig {
            n_updates: 3,
            n_samples_per_update: 4,
            seed: Some(5),
            ..OptimizationConfig::default()
        };
        let run = run_optimization_task(&Sphere, &Sphere, start(), &UpdaterMean::default(), &config, None).unwrap();
        assert_eq!(run.distributions.len(), 4);
        assert_eq!(run.update_summaries.len(), 3);
        assert_eq!(run.distributions[0], start());
        for (i, summary) in run.update_summaries.iter().enumerate() {
            assert_eq!(summary.rollouts.len(), 4);
            assert_eq!(summary.distribution, run.distributions[i]);
            assert_eq!(&summary.distribution_new, &run.distributions[i + 1]);
            assert_eq!(summary.rollout_eval.sample(), summary.distribution.mean());
        }
        assert_eq!(run.final_distribution(), run.distributions.last());
    }

    #[test]
    fn zero_updates_is_an_empty_run() {
        let config = OptimizationConfig {
            n_updates: 0,
            ..OptimizationConfig::default()
        };
        let run = run_optimization_task(&Sphere, &Sphere, start(), &UpdaterMean::default(), &config, None).unwrap();
        assert!(run.learning_curve.is_empty());
        assert_eq!(run.distributions, vec![start()]);
    }

    /// Keeps the distribution as is, so that only the random stream differs between runs.
    struct Frozen;

    impl Updater for Frozen {
        fn update_distribution(
            &self,
            distribution: &Distribution,
            samples: &DMatrix<Real>,
            _costs: &DVector<Real>,
        ) -> BboResult<(Distribution, DVector<Real>)> {
            let n = samples.nrows();
            Ok((distribution.clone(), DVector::from_element(n, 1.0 / n as Real)))
        }
    }

    #[test]
    fn resumed_run_draws_new_samples_with_same_seed() {
        let config = OptimizationConfig {
            n_updates: 1,
            n_samples_per_update: 5,
            seed: Some(17),
            ..OptimizationConfig::default()
        };
        let first = run_optimization_task(&Sphere, &Sphere, start(), &Frozen, &config, None).unwrap();
        let last = &first.update_summaries[0];
        assert_eq!(last.distribution_new, start());

        let resumed =
            resume_optimization_task(&Sphere, &Sphere, last, first.learning_curve.clone(), &Frozen, &config, None)
                .unwrap();
        let samples = |run: &OptimizationRun| -> Vec<DVector<Real>> {
            run.update_summaries[0].rollouts.iter().map(|r| r.sample().clone()).collect()
        };
        assert_ne!(samples(&first), samples(&resumed));

        // Resuming twice from the same point is still reproducible
        let again =
            resume_optimization_task(&Sphere, &Sphere, last, first.learning_curve.clone(), &Frozen, &config, None)
                .unwrap();
        assert_eq!(samples(&resumed), samples(&again));
    }

    #[test]
    fn fresh_run_uses_seed_unchanged() {
        use rand::RngCore;
        let mut a = sampling_rng(Some(5), 0);
        let mut b = StdRng::seed_from_u64(5);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn rejects_empty_batches() {
        let config = OptimizationConfig {
            n_samples_per_update: 0,
            ..OptimizationConfig::default()
        };
        let err = run_optimization_task(&Sphere, &Sphere, start(), &UpdaterMean::default(), &config, None)
            .unwrap_err();
        assert!(matches!(err, BboError::Dmp(DmpError::InvalidParameter { .. })));
    }
}
