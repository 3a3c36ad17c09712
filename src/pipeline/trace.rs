//! Tracing processors
//!
//! A minimal host implementation used by the CLI `run` command: every step
//! logs itself and appends its stage id to the `trace` header.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::message::Message;
use super::processor::{Processor, StepFactory};
use crate::error::BoxError;
use crate::flow::descriptor::StepDescriptor;

/// Header collecting visited stage ids
pub const TRACE_HEADER: &str = "trace";

/// Processor that records its visit on the message
pub struct TraceProcessor {
    stage_id: String,
    uri: String,
}

impl TraceProcessor {
    pub fn new(stage_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            uri: uri.into(),
        }
    }
}

#[async_trait]
impl Processor for TraceProcessor {
    fn name(&self) -> &str {
        &self.stage_id
    }

    async fn process(&self, message: &mut Message) -> Result<(), BoxError> {
        log::info!("[{}] {} -> {}", message.id(), self.stage_id, self.uri);
        let mut visited = match message.header(TRACE_HEADER) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        visited.push(Value::String(self.stage_id.clone()));
        message.set_header(TRACE_HEADER, Value::Array(visited));
        Ok(())
    }
}

/// Step factory producing a `TraceProcessor` for every descriptor
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceStepFactory;

impl StepFactory for TraceStepFactory {
    fn create(&self, descriptor: &StepDescriptor) -> Result<Arc<dyn Processor>, BoxError> {
        Ok(Arc::new(TraceProcessor::new(
            descriptor.id.clone(),
            descriptor.uri.clone(),
        )))
    }
}

/// Stage ids recorded in the trace header, in visit order
pub fn visited(message: &Message) -> Vec<String> {
    match message.header(TRACE_HEADER) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
