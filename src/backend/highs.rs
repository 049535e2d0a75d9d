use super::{Backend, BackendError, SolveOutcome};
use crate::config::SolverConfig;
use crate::model::{LinearExpr, LinearProgram, Relation};
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver,
};
use log::{info, trace};
use std::time::Instant;

/// Integer programming through good_lp and the HiGHS MILP solver.
#[derive(Debug, Clone, Default)]
pub struct HighsBackend {
    config: SolverConfig,
}

impl HighsBackend {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

/// HiGHS integer options are `i32`; refuse values that would wrap.
fn int_option(name: &str, value: u32) -> Result<i32, BackendError> {
    i32::try_from(value)
        .map_err(|_| BackendError::Model(format!("option {name}={value} exceeds {}", i32::MAX)))
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut sum = Expression::from(0.0);
    for &(var, coefficient) in expr.terms() {
        sum += (coefficient as f64) * vars[var];
    }
    sum
}

impl Backend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, BackendError> {
        let threads = int_option("threads", self.config.threads)?;
        let random_seed = int_option("random_seed", self.config.random_seed)?;

        let start_time = Instant::now();
        let mut problem = ProblemVariables::new();
        let vars = problem.add_vector(variable().binary(), program.num_vars());

        let objective = to_expression(program.objective(), &vars);
        let mut model = problem
            .minimise(objective)
            .using(default_solver)
            .set_option("threads", threads)
            .set_option("random_seed", random_seed)
            .set_option(
                "log_to_console",
                if self.config.log_to_console { "true" } else { "false" },
            );
        if let Some(limit) = self.config.time_limit {
            model = model.set_option("time_limit", limit.as_secs_f64());
        }

        for c in program.constraints() {
            let lhs = to_expression(&c.expr, &vars);
            let rhs = c.rhs as f64;
            match c.relation {
                Relation::LessOrEqual => model.add_constraint(constraint!(lhs <= rhs)),
                Relation::Equal => model.add_constraint(constraint!(lhs == rhs)),
                Relation::GreaterOrEqual => model.add_constraint(constraint!(lhs >= rhs)),
            };
        }
        trace!(
            "Handed {} variables and {} constraints to HiGHS.",
            program.num_vars(),
            program.constraints().len()
        );

        info!("Starting ILP solver...");
        let solved = model.solve();
        let duration = start_time.elapsed();
        info!("HiGHS returned in {:.2?}", duration);
        let hit_limit = self.config.time_limit.is_some_and(|limit| duration >= limit);

        let solution = match solved {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => return Ok(SolveOutcome::Infeasible),
            Err(e) if hit_limit => {
                info!("HiGHS stopped at the time limit: {e}");
                return Ok(SolveOutcome::LimitReached);
            }
            Err(ResolutionError::Unbounded) => {
                return Err(BackendError::Solve("model reported unbounded".to_string()));
            }
            Err(e) => return Err(BackendError::Model(e.to_string())),
        };

        let values: Vec<bool> = vars.iter().map(|v| solution.value(*v) > 0.5).collect();
        if !program.is_feasible(&values) {
            // HiGHS hands back a point even when it stops without an incumbent.
            return Ok(if hit_limit {
                SolveOutcome::LimitReached
            } else {
                SolveOutcome::Infeasible
            });
        }
        Ok(if hit_limit {
            SolveOutcome::Feasible(values)
        } else {
            SolveOutcome::Optimal(values)
        })
    }
}
