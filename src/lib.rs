// SPDX-License-Identifier: MIT

//! routeflow compiles visual node/edge flows into namespaced route graphs
//! and executes them per message.

pub mod config;
pub mod error;
pub mod flow;
pub mod pipeline;

pub use config::RuntimeConfig;
pub use error::{BoxError, CompileError, DeployError, ExchangeError, FlowError, PredicateError};
