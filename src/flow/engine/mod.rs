// SPDX-License-Identifier: MIT

//! Per-message graph execution
//!
//! The engine walks a compiled graph for one message at a time. Single
//! successors are followed in a loop; fan-out runs every branch and joins
//! before the caller's continuation fires.

mod executor;

pub use executor::GraphExecutionEngine;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FlowError;

/// Default number of stages one path may visit
pub const DEFAULT_MAX_HOPS: usize = 10_000;

/// Default number of stage invocations one message may make across all paths
pub const DEFAULT_MAX_VISITS: usize = 100_000;

/// Default nesting limit for snapshot fan-outs
pub const DEFAULT_MAX_FAN_OUT_DEPTH: usize = 64;

/// How fan-out branches see the message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchIsolation {
    /// Branches run one after another on the same message
    #[default]
    Shared,
    /// Each branch gets its own copy; copies run concurrently and are merged
    /// back in branch order
    Snapshot,
}

impl FromStr for BranchIsolation {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "snapshot" | "isolated" => Ok(Self::Snapshot),
            other => Err(FlowError::config(format!(
                "Unknown branch isolation: {}",
                other
            ))),
        }
    }
}

/// Engine tuning shared by every message of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub isolation: BranchIsolation,
    /// Stages one path may visit, counted from the entry through every
    /// fan-out it descends. This caps the length of an acyclic chain as well
    /// as the number of trips around a cycle.
    pub max_hops: usize,
    /// Stage invocations one message may make across all of its paths
    pub max_visits: usize,
    /// Nesting depth at which a snapshot fan-out fails instead of running.
    /// Shared fan-outs are flattened and have no depth limit.
    pub max_fan_out_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            isolation: BranchIsolation::default(),
            max_hops: DEFAULT_MAX_HOPS,
            max_visits: DEFAULT_MAX_VISITS,
            max_fan_out_depth: DEFAULT_MAX_FAN_OUT_DEPTH,
        }
    }
}

/// What the engine reports to the caller's continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The entry node has no successors
    NoSuccessors,
    /// A single path follows; signalled before it runs
    Proceeding,
    /// All fan-out branches settled
    Joined { branches: usize, failed: usize },
}

/// Invoked exactly once per `execute` call
pub type Continuation = Box<dyn FnOnce(Completion) + Send>;
