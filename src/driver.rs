//! The sequential experiment loop.

use crate::config::ProgramSpace;
use crate::doe::{DoeStrategy, ExperimentQueue};
use crate::error::Error;
use crate::evaluate::Evaluator;
use crate::factor::FactorSpace;
use crate::matrix::{self, ExperimentMatrix, Response};
use log::{info, warn};
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Stop after this many experiments even if the queue is not drained.
    pub max_experiments: Option<usize>,
    /// Materialize each variant into its own directory instead of reusing
    /// one shared work directory.
    pub save_variants: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    /// Experiments whose evaluation broke down and was recorded as failing.
    pub failures: usize,
}

/// Build the experiment queue for a run.
///
/// A fresh run populates the queue from the strategy and persists the plan
/// to `plan_path` before anything executes, so the run can be resumed or
/// sharded later. A planned run loads the persisted plan instead;
/// `rows = (0, 0)` loads every row, anything else a 0-based half-open row
/// range.
pub fn plan_queue(
    space: &dyn FactorSpace,
    strategy: &mut dyn DoeStrategy,
    planned: Option<(usize, usize)>,
    plan_path: &Path,
) -> Result<ExperimentQueue, Error> {
    match planned {
        Some(rows) => {
            let range = (rows != (0, 0)).then_some(rows);
            matrix::load_plan(plan_path, range, space.size())
        }
        None => {
            let mut queue = ExperimentQueue::new();
            strategy.populate(space, &mut queue)?;
            matrix::save_plan(&queue, plan_path, space.size())?;
            Ok(queue)
        }
    }
}

/// Drain the queue: materialize each deletion mask, evaluate it, record the
/// response. Strictly sequential. An [`EvaluationFailure`] is logged and
/// recorded as the all-failing response; it never aborts the run and is
/// never retried.
///
/// [`EvaluationFailure`]: crate::evaluate::EvaluationFailure
pub fn run_experiments(
    space: &dyn FactorSpace,
    queue: &mut ExperimentQueue,
    evaluator: &dyn Evaluator,
    matrix: &mut ExperimentMatrix,
    program: &ProgramSpace,
    options: &RunOptions,
) -> Result<RunSummary, Error> {
    let total = queue.len();
    let mut summary = RunSummary::default();

    while let Some(mask) = queue.pop() {
        if let Some(max) = options.max_experiments {
            if summary.executed >= max {
                info!("experiment budget of {max} reached, {} mask(s) left", queue.len() + 1);
                break;
            }
        }

        let work_dir = if options.save_variants {
            program.variant_dir(summary.executed)
        } else {
            program.work_dir()
        };
        space.create_variant(&mask, &work_dir)?;

        let response = match evaluator.evaluate(&work_dir) {
            Ok(response) => response,
            Err(e) => {
                warn!("experiment {mask}: {e}");
                summary.failures += 1;
                Response::failing(evaluator.response_len())
            }
        };

        summary.executed += 1;
        info!(
            "experiment {}/{total}: mask {mask}, compile {}, {} failing outcome(s)",
            summary.executed,
            response.compile_ok,
            response.outcomes.iter().filter(|b| !**b).count()
        );
        matrix.record(mask, response);
    }

    info!(
        "run finished: {} experiment(s), {} evaluation failure(s)",
        summary.executed, summary.failures
    );
    Ok(summary)
}
