//! Engines that minimise a [`LinearProgram`] over boolean variables.

pub mod highs;
pub mod search;

use crate::model::LinearProgram;
use thiserror::Error;

pub use highs::HighsBackend;
pub use search::BranchAndBound;

/// What a backend reports after one solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Proven optimal assignment, one value per variable.
    Optimal(Vec<bool>),
    /// Best assignment found before a limit stopped the search.
    Feasible(Vec<bool>),
    Infeasible,
    /// A limit stopped the search before any assignment was found.
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("engine rejected the model: {0}")]
    Model(String),
    #[error("engine failed while solving: {0}")]
    Solve(String),
}

pub trait Backend {
    fn name(&self) -> &'static str;

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, program: &LinearProgram) -> Result<SolveOutcome, BackendError> {
        (**self).solve(program)
    }
}
