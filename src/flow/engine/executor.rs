//! Graph execution engine

use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use super::{BranchIsolation, Completion, Continuation, EngineOptions};
use crate::error::ExchangeError;
use crate::flow::graph::{CompiledGraph, NodeId};
use crate::flow::registry::{FlowStages, RunnableStage};
use crate::pipeline::Message;

/// Walks a compiled graph for each message
///
/// The graph and stage set are immutable snapshots; any number of messages
/// may run through one engine concurrently.
#[derive(Debug, Clone)]
pub struct GraphExecutionEngine {
    graph: Arc<CompiledGraph>,
    stages: Arc<FlowStages>,
    options: EngineOptions,
}

impl GraphExecutionEngine {
    pub fn new(
        graph: Arc<CompiledGraph>,
        stages: Arc<FlowStages>,
        options: EngineOptions,
    ) -> Self {
        Self {
            graph,
            stages,
            options,
        }
    }

    pub fn graph(&self) -> &Arc<CompiledGraph> {
        &self.graph
    }

    pub fn stages(&self) -> &Arc<FlowStages> {
        &self.stages
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Run a message from the entry node.
    ///
    /// With no successors the continuation fires immediately. With one, it
    /// fires with `Proceeding` before the path runs. With several, it fires
    /// once after every branch has settled. Failures never escape: they are
    /// attached to the message.
    pub async fn execute(&self, message: &mut Message, continuation: Continuation) {
        let entry = self.graph.entry_node();
        log::debug!(
            "[{}] Executing flow '{}' from '{}'",
            message.id(),
            self.graph.flow_id(),
            self.graph.name(entry)
        );

        let budget = VisitBudget::new(self.options.max_visits);
        match self.graph.successors(entry) {
            [] => continuation(Completion::NoSuccessors),
            [next] => {
                continuation(Completion::Proceeding);
                let roots = std::slice::from_ref(next);
                self.walk(roots, message, 0, 0, &budget).await;
            }
            branches => {
                let failed = match self.options.isolation {
                    BranchIsolation::Shared => self.walk(branches, message, 0, 0, &budget).await,
                    BranchIsolation::Snapshot => {
                        self.snapshot(entry, branches, message, 0, 0, &budget).await
                    }
                };
                if failed > 0 {
                    log::warn!(
                        "[{}] {} of {} branches failed",
                        message.id(),
                        failed,
                        branches.len()
                    );
                }
                continuation(Completion::Joined {
                    branches: branches.len(),
                    failed,
                });
            }
        }
    }

    /// Run a message and return the completion instead of taking a continuation
    pub async fn process(&self, message: &mut Message) -> Completion {
        let (tx, rx) = oneshot::channel();
        self.execute(
            message,
            Box::new(move |completion: Completion| {
                let _ = tx.send(completion);
            }),
        )
        .await;
        rx.await.unwrap_or(Completion::NoSuccessors)
    }

    /// Drive every path starting at `roots` to its end and return how many
    /// roots had a failure somewhere below them.
    ///
    /// Shared fan-outs push their branches onto the pending stack instead of
    /// recursing, so cycles through a fan-out cannot grow the call stack.
    /// Only snapshot fan-outs nest, bounded by `max_fan_out_depth`.
    fn walk<'a>(
        &'a self,
        roots: &'a [NodeId],
        message: &'a mut Message,
        hops: usize,
        depth: usize,
        budget: &'a VisitBudget,
    ) -> BoxFuture<'a, usize> {
        async move {
            let mut failed = vec![false; roots.len()];
            let mut pending: Vec<(NodeId, usize, usize)> = roots
                .iter()
                .enumerate()
                .rev()
                .map(|(root, node)| (*node, hops, root))
                .collect();

            while let Some((start, hops, root)) = pending.pop() {
                let end = self.run_path(start, message, hops, budget).await;
                let (from, branches, hops) = match end {
                    PathEnd::Done => continue,
                    PathEnd::Failed => {
                        failed[root] = true;
                        continue;
                    }
                    PathEnd::FanOut {
                        from,
                        branches,
                        hops,
                    } => (from, branches, hops),
                };

                log::debug!(
                    "[{}] Fan-out to {} branches ({:?})",
                    message.id(),
                    branches.len(),
                    self.options.isolation
                );
                if self.options.isolation == BranchIsolation::Shared {
                    pending.extend(branches.iter().rev().map(|b| (*b, hops, root)));
                    continue;
                }
                let nested = self.snapshot(from, &branches, message, hops, depth, budget);
                if nested.await > 0 {
                    failed[root] = true;
                }
            }

            failed.iter().filter(|failed| **failed).count()
        }
        .boxed()
    }

    /// Follow single successors from `start` until the path ends or fans out
    async fn run_path(
        &self,
        start: NodeId,
        message: &mut Message,
        mut hops: usize,
        budget: &VisitBudget,
    ) -> PathEnd {
        let mut current = start;
        loop {
            hops += 1;
            if hops > self.options.max_hops {
                let stage_id = self.graph.qualified(current);
                log::error!(
                    "[{}] Hop limit {} reached at '{}'",
                    message.id(),
                    self.options.max_hops,
                    stage_id
                );
                message.set_error(ExchangeError::HopLimitExceeded {
                    stage_id,
                    limit: self.options.max_hops,
                });
                return PathEnd::Failed;
            }

            if let Err(used) = budget.claim() {
                let stage_id = self.graph.qualified(current);
                if used == budget.limit {
                    log::error!(
                        "[{}] Visit budget {} used up at '{}'",
                        message.id(),
                        budget.limit,
                        stage_id
                    );
                }
                message.set_error(ExchangeError::VisitBudgetExceeded {
                    stage_id,
                    limit: budget.limit,
                });
                return PathEnd::Failed;
            }

            let next = match self.invoke(current, message).await {
                Some(next) => next,
                None => return PathEnd::Failed,
            };
            match next.len() {
                0 => return PathEnd::Done,
                1 => current = next[0],
                _ => {
                    return PathEnd::FanOut {
                        from: current,
                        branches: next,
                        hops,
                    };
                }
            }
        }
    }

    /// Invoke the stage bound to `node` and compute its successors.
    /// `None` means the stage failed and the path halts.
    async fn invoke(&self, node: NodeId, message: &mut Message) -> Option<Vec<NodeId>> {
        let stage_id = self.graph.qualified(node);
        let stage = match self.stages.get(&stage_id) {
            Some(stage) => stage,
            None => {
                log::error!("[{}] No stage registered for '{}'", message.id(), stage_id);
                message.set_error(ExchangeError::MissingStage(stage_id));
                return None;
            }
        };

        match stage {
            RunnableStage::Step(processor) => {
                log::debug!("[{}] -> {}", message.id(), stage_id);
                if let Err(e) = processor.process(message).await {
                    log::error!("[{}] Stage '{}' failed: {}", message.id(), stage_id, e);
                    message.set_error(ExchangeError::Stage {
                        stage_id,
                        message: e.to_string(),
                    });
                    return None;
                }
                Some(self.graph.successors(node).to_vec())
            }
            RunnableStage::Choice(choice) => {
                if !choice.process(message) {
                    return None;
                }
                Some(self.choice_successors(message))
            }
        }
    }

    /// Successors named by the message's choice match, in match order
    fn choice_successors(&self, message: &mut Message) -> Vec<NodeId> {
        let mut resolved = Vec::new();
        let mut unknown = None;
        for target in message.choice_targets() {
            match self.graph.resolve_qualified(target) {
                Some(id) if !resolved.contains(&id) => resolved.push(id),
                Some(_) => {}
                None => unknown = Some(target.to_string()),
            }
        }
        if let Some(target) = unknown {
            log::warn!(
                "[{}] Choice selected unknown node '{}'",
                message.id(),
                target
            );
            message.set_error(ExchangeError::MissingStage(target));
        }
        resolved
    }

    /// Run each branch on its own copy of the message, concurrently, then
    /// merge the copies back in branch order. Returns the failed branch count.
    async fn snapshot(
        &self,
        from: NodeId,
        branches: &[NodeId],
        message: &mut Message,
        hops: usize,
        depth: usize,
        budget: &VisitBudget,
    ) -> usize {
        if depth >= self.options.max_fan_out_depth {
            let stage_id = self.graph.qualified(from);
            log::error!(
                "[{}] Fan-out depth {} reached at '{}'",
                message.id(),
                self.options.max_fan_out_depth,
                stage_id
            );
            message.set_error(ExchangeError::FanOutDepthExceeded {
                stage_id,
                limit: self.options.max_fan_out_depth,
            });
            return branches.len();
        }

        let base = message.clone();
        let mut copies: Vec<Message> = branches.iter().map(|_| base.clone()).collect();

        let runs = copies.iter_mut().zip(branches).map(|(copy, branch)| {
            let roots = std::slice::from_ref(branch);
            self.walk(roots, copy, hops, depth + 1, budget)
        });
        let results = join_all(runs).await;

        for copy in copies {
            merge_branch(message, &base, copy);
        }
        match base.choice_match() {
            Some(key) => message.set_choice_match(key),
            None => message.clear_choice_match(),
        }

        results.iter().filter(|failed| **failed > 0).count()
    }
}

/// How a single path stopped
enum PathEnd {
    Done,
    Failed,
    FanOut {
        from: NodeId,
        branches: Vec<NodeId>,
        hops: usize,
    },
}

/// Stage visits claimed by one execution across all of its paths
struct VisitBudget {
    limit: usize,
    used: AtomicUsize,
}

impl VisitBudget {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Claim one visit. Once the limit is reached, returns how many visits
    /// had already been claimed before this one.
    fn claim(&self) -> Result<(), usize> {
        let used = self.used.fetch_add(1, Ordering::Relaxed);
        if used < self.limit {
            Ok(())
        } else {
            Err(used)
        }
    }
}

/// Apply what a branch changed relative to the fan-out point
fn merge_branch(target: &mut Message, base: &Message, mut branch: Message) {
    for (name, value) in branch.headers() {
        if base.header(name) != Some(value) {
            target.set_header(name.clone(), value.clone());
        }
    }
    for (name, value) in branch.properties() {
        if base.property(name) != Some(value) {
            target.set_property(name.clone(), value.clone());
        }
    }
    if branch.body() != base.body() {
        target.set_body(branch.body().clone());
    }
    if let Some(error) = branch.take_error() {
        if base.error() != Some(&error) {
            target.set_error(error);
        }
    }
}
