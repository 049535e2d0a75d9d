use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Knobs handed to whichever backend runs the solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Wall-clock budget for one solve; `None` lets the engine run unbounded.
    pub time_limit: Option<Duration>,
    pub threads: u32,
    pub random_seed: u32,
    pub log_to_console: bool,
    /// Only honoured by the branch-and-bound backend.
    pub node_limit: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(60)),
            threads: 1,        // limit to 1 thread for reproducibility
            random_seed: 1234, // set seed for reproducibility
            log_to_console: false,
            node_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// good_lp with the HiGHS MILP solver.
    #[default]
    Highs,
    /// Built-in branch and bound, only suited to small instances.
    Search,
}

/// Section scheduling service.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Address the HTTP server binds to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Wall-clock limit per solve, in seconds. Zero, negative or non-finite
    /// values disable the limit.
    #[arg(short = 't', long = "time-limit", default_value_t = 60.0)]
    pub time_limit_secs: f64,

    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=i32::MAX as i64)
    )]
    pub threads: u32,

    #[arg(
        long = "random-seed",
        default_value_t = 1234,
        value_parser = clap::value_parser!(u32).range(0..=i32::MAX as i64)
    )]
    pub random_seed: u32,

    /// Let the engine print its own progress log.
    #[arg(long = "log-solver")]
    pub log_solver: bool,

    /// Node budget for the search backend.
    #[arg(long = "node-limit")]
    pub node_limit: Option<u64>,

    #[arg(long, value_enum, default_value_t)]
    pub backend: BackendKind,
}

impl Args {
    pub fn solver_config(&self) -> SolverConfig {
        let time_limit = Duration::try_from_secs_f64(self.time_limit_secs)
            .ok()
            .filter(|limit| !limit.is_zero());
        SolverConfig {
            time_limit,
            threads: self.threads.max(1),
            random_seed: self.random_seed,
            log_to_console: self.log_solver,
            node_limit: self.node_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_solver_config_default() {
        let args = Args::parse_from(["section_scheduler"]);
        assert_eq!(args.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(args.backend, BackendKind::Highs);
        assert_eq!(args.solver_config(), SolverConfig::default());
    }

    #[test]
    fn zero_time_limit_disables_it() {
        let args = Args::parse_from([
            "section_scheduler",
            "--time-limit",
            "0",
            "--backend",
            "search",
            "--node-limit",
            "5000",
        ]);
        let config = args.solver_config();
        assert_eq!(config.time_limit, None);
        assert_eq!(config.node_limit, Some(5000));
        assert_eq!(args.backend, BackendKind::Search);
    }

    #[test]
    fn unrepresentable_time_limits_disable_it() {
        for raw in ["inf", "NaN", "-5", "1e300"] {
            let flag = format!("--time-limit={raw}");
            let args = Args::parse_from(["section_scheduler", flag.as_str()]);
            assert_eq!(args.solver_config().time_limit, None, "--time-limit {raw}");
        }
        let args = Args::parse_from(["section_scheduler", "--time-limit", "2.5"]);
        assert_eq!(args.solver_config().time_limit, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn seeds_beyond_i32_are_refused() {
        let too_big = (i32::MAX as u64 + 1).to_string();
        let parsed = Args::try_parse_from(["section_scheduler", "--random-seed", too_big.as_str()]);
        assert!(parsed.is_err());

        let max = i32::MAX.to_string();
        let args = Args::parse_from(["section_scheduler", "--random-seed", max.as_str()]);
        assert_eq!(args.solver_config().random_seed, i32::MAX as u32);
    }
}
