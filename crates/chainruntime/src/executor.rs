use crate::NodeRunner;
use chaincore::{
    Chain, ChainError, EnvironmentMap, EventBus, ExecutionEvent, ExecutionId, NodeDefinition,
    NodeError, NodeMap, PlanStep, RunReport, WorkflowDefinition,
};
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;

/// Walks a workflow's chains strictly in order, one node at a time
pub struct WorkflowExecutor {
    runner: NodeRunner,
}

impl WorkflowExecutor {
    pub fn new(runner: NodeRunner) -> Self {
        Self { runner }
    }

    /// Run every chain and return the accumulated report.
    ///
    /// A failing chain stops at the failing link and sets the report's error;
    /// the remaining chains still run.
    pub async fn execute(
        &self,
        flow: &WorkflowDefinition,
        node_map: &NodeMap,
        env: &EnvironmentMap,
        event_bus: &EventBus,
    ) -> RunReport {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();
        let plan = flow.to_runnable();

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            chains: plan.chains.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            "Starting workflow execution {} ({} chains)",
            execution_id,
            plan.chains.len()
        );

        let mut report = RunReport::new();

        for (index, chain) in plan.chains.iter().enumerate() {
            event_bus.emit(ExecutionEvent::ChainStarted {
                execution_id,
                index,
                timestamp: Utc::now(),
            });

            if let Err(e) = self
                .run_chain(chain, node_map, env, &mut report, event_bus, execution_id)
                .await
            {
                tracing::warn!("Chain {} failed: {}", index, e);

                event_bus.emit(ExecutionEvent::ChainFailed {
                    execution_id,
                    index,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });

                report.fail_chain(&e);
            }
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            "Workflow execution {} finished in {}ms (success: {})",
            execution_id,
            duration_ms,
            report.is_success()
        );

        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            success: report.is_success(),
            duration_ms,
            timestamp: Utc::now(),
        });

        report
    }

    async fn run_chain(
        &self,
        chain: &Chain,
        node_map: &NodeMap,
        env: &EnvironmentMap,
        report: &mut RunReport,
        event_bus: &EventBus,
        execution_id: ExecutionId,
    ) -> Result<(), ChainError> {
        for step in &chain.steps {
            match step {
                PlanStep::Node(id) => {
                    let Some(node) = node_map.get(id) else {
                        let error = ChainError::NodeNotFound(id.clone());
                        report.record_error(id.clone(), error.to_string());
                        return Err(error);
                    };

                    let result = self
                        .run_node(node, env, &report.chain, event_bus, execution_id)
                        .await;

                    match result {
                        Ok(output) => report.record_output(id.clone(), output),
                        Err(source) => {
                            report.record_error(id.clone(), source.to_string());
                            return Err(ChainError::NodeExecution {
                                name: node.name.clone(),
                                source,
                            });
                        }
                    }
                }
                PlanStep::Flow { id, dropped_next } => {
                    if *dropped_next {
                        tracing::debug!("Flow link {} ends its chain; later links are skipped", id);
                    }
                    return Ok(());
                }
                PlanStep::Invalid { kind, .. } => {
                    return Err(ChainError::InvalidNodeType(kind.clone()));
                }
            }
        }
        Ok(())
    }

    /// Run one node with events, outside of any chain.
    pub async fn execute_node(
        &self,
        node: &NodeDefinition,
        env: &EnvironmentMap,
        event_bus: &EventBus,
    ) -> Result<Option<Value>, NodeError> {
        self.run_node(node, env, &[], event_bus, ExecutionId::new_v4())
            .await
    }

    async fn run_node(
        &self,
        node: &NodeDefinition,
        env: &EnvironmentMap,
        outputs: &[Value],
        event_bus: &EventBus,
        execution_id: ExecutionId,
    ) -> Result<Option<Value>, NodeError> {
        event_bus.emit(ExecutionEvent::NodeStarted {
            execution_id,
            node_id: node.id.clone(),
            name: node.name.clone(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let result = self.runner.run(node, env, outputs).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => {
                tracing::debug!("Node {} completed in {}ms", node.id, duration_ms);

                event_bus.emit(ExecutionEvent::NodeCompleted {
                    execution_id,
                    node_id: node.id.clone(),
                    output: output.clone().unwrap_or(Value::Null),
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!("Node {} failed: {}", node.id, e);

                event_bus.emit(ExecutionEvent::NodeFailed {
                    execution_id,
                    node_id: node.id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        result
    }
}
