//! Assigns course sections to (instructor, room, time pattern) triples.
//!
//! The single entry point is [`solve`]: it runs the feasibility pre-check,
//! builds a boolean assignment model with the hard rules and the weighted
//! soft-preference objective, hands it to a [`backend::Backend`], and
//! extracts a [`data::ResultStatus`]. Infeasibility is reported in the
//! result, never as an error.

pub mod backend;
pub mod clash;
pub mod config;
pub mod data;
pub mod feasibility;
pub mod model;
pub mod server;
pub mod solver;
pub mod submission;

pub use solver::{Scheduler, solve};
