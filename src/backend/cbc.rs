use super::{BackendError, BackendSolution, MilpBackend, collect, translate};
use crate::config::SolverConfig;
use crate::model::Model;
use good_lp::SolverModel;
use good_lp::solvers::coin_cbc::coin_cbc;
use log::{debug, info};
use std::time::Instant;

/// COIN-OR CBC through `good_lp`. Only built with the `cbc` feature.
pub struct CbcBackend;

impl CbcBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CbcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpBackend for CbcBackend {
    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<BackendSolution, BackendError> {
        let start_time = Instant::now();
        let lp = translate(model);

        let mut problem = lp.problem.minimise(lp.objective).using(coin_cbc);
        problem.set_parameter("threads", &config.threads.to_string());
        problem.set_parameter("log", if config.verbose { "1" } else { "0" });
        if let Some(seconds) = config.time_limit_secs {
            problem.set_parameter("sec", &seconds.to_string());
        }
        if let Some(gap) = config.mip_gap {
            problem.set_parameter("ratioGap", &gap.to_string());
        }
        for row in lp.constraints {
            problem.add_constraint(row);
        }

        info!("Starting CBC on {} variables...", lp.variables.len());
        let solution = collect(problem.solve(), &lp.variables)?;
        debug!(
            "CBC finished with status {} in {:.2?}",
            solution.status,
            start_time.elapsed()
        );
        Ok(solution)
    }
}
