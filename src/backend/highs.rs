use super::{BackendError, BackendSolution, MilpBackend, collect, translate};
use crate::config::SolverConfig;
use crate::model::Model;
use good_lp::solvers::highs::highs;
use good_lp::SolverModel;
use log::{debug, info};
use std::time::Instant;

/// HiGHS through `good_lp`.
pub struct HighsBackend;

impl HighsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpBackend for HighsBackend {
    fn name(&self) -> &str {
        "HiGHS"
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<BackendSolution, BackendError> {
        let start_time = Instant::now();
        let threads = i32::try_from(config.threads).map_err(|_| {
            BackendError::Failed(format!(
                "HiGHS accepts at most {} threads, got {}",
                i32::MAX,
                config.threads
            ))
        })?;
        let lp = translate(model);

        let mut problem = lp
            .problem
            .minimise(lp.objective)
            .using(highs)
            .set_option("threads", threads)
            .set_option("random_seed", config.random_seed)
            .set_option("log_to_console", config.verbose);
        if let Some(seconds) = config.time_limit_secs {
            problem = problem.set_option("time_limit", seconds);
        }
        if let Some(gap) = config.mip_gap {
            problem = problem.set_option("mip_rel_gap", gap);
        }
        for row in lp.constraints {
            problem.add_constraint(row);
        }

        info!("Starting HiGHS on {} variables...", lp.variables.len());
        let result = problem.solve();
        let solution = collect(result, &lp.variables)?;
        debug!(
            "HiGHS finished with status {} in {:.2?}",
            solution.status,
            start_time.elapsed()
        );
        Ok(solution)
    }
}
