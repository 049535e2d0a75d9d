//! Depth-first branch and bound over boolean variables.
//!
//! Variables are fixed in index order. Every constraint keeps the sum of its
//! fixed terms plus the positive and negative mass of its still-free terms, so
//! a branch is cut as soon as some constraint can no longer be met. The
//! objective bound is the cost so far plus every negative coefficient left.
//! Meant for small instances and for running without a native engine.

use super::{Backend, BackendError, SolveOutcome};
use crate::config::SolverConfig;
use crate::model::{LinearProgram, Relation};
use log::{debug, info};
use std::time::{Duration, Instant};

/// How often the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
}

impl BranchAndBound {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            time_limit: config.time_limit,
            node_limit: config.node_limit,
        }
    }

    pub fn with_node_limit(mut self, node_limit: u64) -> Self {
        self.node_limit = Some(node_limit);
        self
    }
}

impl Backend for BranchAndBound {
    fn name(&self) -> &'static str {
        "search"
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, BackendError> {
        let start_time = Instant::now();
        let mut search = Search::new(program);
        let stopped = search.run(self, start_time);
        info!(
            "Branch and bound visited {} nodes in {:.2?}",
            search.nodes,
            start_time.elapsed()
        );
        Ok(match (search.best, stopped) {
            (Some((cost, values)), false) => {
                debug!("Proved optimal cost {cost}");
                SolveOutcome::Optimal(values)
            }
            (Some((cost, values)), true) => {
                debug!("Stopped early with incumbent cost {cost}");
                SolveOutcome::Feasible(values)
            }
            (None, false) => SolveOutcome::Infeasible,
            (None, true) => SolveOutcome::LimitReached,
        })
    }
}

struct Search<'a> {
    program: &'a LinearProgram,
    /// For each variable, the constraints it appears in with its coefficient.
    occurrences: Vec<Vec<(usize, i64)>>,
    fixed_sum: Vec<i64>,
    free_positive: Vec<i64>,
    free_negative: Vec<i64>,
    objective: Vec<i64>,
    /// `negative_suffix[v]` is the sum of negative objective coefficients from `v` on.
    negative_suffix: Vec<i64>,
    values: Vec<bool>,
    cost: i64,
    best: Option<(i64, Vec<bool>)>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(program: &'a LinearProgram) -> Self {
        let n = program.num_vars();
        let m = program.constraints().len();
        let mut occurrences = vec![Vec::new(); n];
        let mut free_positive = vec![0; m];
        let mut free_negative = vec![0; m];
        for (index, constraint) in program.constraints().iter().enumerate() {
            for &(var, coefficient) in constraint.expr.terms() {
                occurrences[var].push((index, coefficient));
                if coefficient > 0 {
                    free_positive[index] += coefficient;
                } else {
                    free_negative[index] += coefficient;
                }
            }
        }

        let mut objective = vec![0; n];
        for &(var, coefficient) in program.objective().terms() {
            objective[var] += coefficient;
        }
        let mut negative_suffix = vec![0; n + 1];
        for var in (0..n).rev() {
            negative_suffix[var] = negative_suffix[var + 1] + objective[var].min(0);
        }

        Self {
            program,
            occurrences,
            fixed_sum: vec![0; m],
            free_positive,
            free_negative,
            objective,
            negative_suffix,
            values: vec![false; n],
            cost: 0,
            best: None,
            nodes: 0,
        }
    }

    fn can_still_hold(&self, index: usize) -> bool {
        let constraint = &self.program.constraints()[index];
        let low = self.fixed_sum[index] + self.free_negative[index];
        let high = self.fixed_sum[index] + self.free_positive[index];
        match constraint.relation {
            Relation::LessOrEqual => low <= constraint.rhs,
            Relation::Equal => low <= constraint.rhs && constraint.rhs <= high,
            Relation::GreaterOrEqual => high >= constraint.rhs,
        }
    }

    /// Fixes `var` and reports whether every touched constraint stays satisfiable.
    fn assign(&mut self, var: usize, value: bool) -> bool {
        self.values[var] = value;
        if value {
            self.cost += self.objective[var];
        }
        let mut consistent = true;
        for k in 0..self.occurrences[var].len() {
            let (index, coefficient) = self.occurrences[var][k];
            if coefficient > 0 {
                self.free_positive[index] -= coefficient;
            } else {
                self.free_negative[index] -= coefficient;
            }
            if value {
                self.fixed_sum[index] += coefficient;
            }
            consistent &= self.can_still_hold(index);
        }
        consistent
    }

    fn unassign(&mut self, var: usize) {
        let value = self.values[var];
        if value {
            self.cost -= self.objective[var];
        }
        for &(index, coefficient) in &self.occurrences[var] {
            if coefficient > 0 {
                self.free_positive[index] += coefficient;
            } else {
                self.free_negative[index] += coefficient;
            }
            if value {
                self.fixed_sum[index] -= coefficient;
            }
        }
        self.values[var] = false;
    }

    fn promising(&self, next_var: usize) -> bool {
        match &self.best {
            Some((best_cost, _)) => self.cost + self.negative_suffix[next_var] < *best_cost,
            None => true,
        }
    }

    fn out_of_budget(&self, limits: &BranchAndBound, start_time: Instant) -> bool {
        if limits.node_limit.is_some_and(|limit| self.nodes >= limit) {
            return true;
        }
        self.nodes % CLOCK_CHECK_INTERVAL == 0
            && limits
                .time_limit
                .is_some_and(|limit| start_time.elapsed() >= limit)
    }

    /// Explores the tree iteratively; returns true if a limit cut it short.
    fn run(&mut self, limits: &BranchAndBound, start_time: Instant) -> bool {
        let n = self.program.num_vars();
        if !(0..self.program.constraints().len()).all(|index| self.can_still_hold(index)) {
            return false;
        }

        // 0: untried, 1: `true` tried, 2: both tried.
        let mut stage = vec![0u8; n + 1];
        let mut depth = 0;
        loop {
            if depth == n {
                if self.best.as_ref().is_none_or(|(best, _)| self.cost < *best) {
                    debug!("New incumbent with cost {}", self.cost);
                    self.best = Some((self.cost, self.values.clone()));
                }
                if n == 0 {
                    return false;
                }
                depth -= 1;
                self.unassign(depth);
                continue;
            }

            let value = match stage[depth] {
                0 => true,
                1 => false,
                _ => {
                    stage[depth] = 0;
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                    self.unassign(depth);
                    continue;
                }
            };
            stage[depth] += 1;

            self.nodes += 1;
            if self.out_of_budget(limits, start_time) {
                return true;
            }

            if self.assign(depth, value) && self.promising(depth + 1) {
                depth += 1;
            } else {
                self.unassign(depth);
            }
        }
    }
}
