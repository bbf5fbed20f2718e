use crate::{FlowNodeKind, FlowNodeRef, NodeId, NodeMap, WorkflowDefinition};

/// A step of a flattened chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Node(NodeId),
    /// Inert terminator. Anything linked after it is dropped.
    Flow { id: NodeId, dropped_next: bool },
    /// Unknown link kind; the chain fails when it gets here.
    Invalid { id: NodeId, kind: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    pub steps: Vec<PlanStep>,
}

impl Chain {
    fn flatten(head: &FlowNodeRef) -> Self {
        let mut steps = Vec::new();
        let mut cursor = Some(head);

        while let Some(link) = cursor {
            match link.parsed_kind() {
                Some(FlowNodeKind::Node) => {
                    steps.push(PlanStep::Node(link.id.clone()));
                    cursor = link.next.as_deref();
                }
                Some(FlowNodeKind::Flow) => {
                    steps.push(PlanStep::Flow {
                        id: link.id.clone(),
                        dropped_next: link.next.is_some(),
                    });
                    break;
                }
                None => {
                    steps.push(PlanStep::Invalid {
                        id: link.id.clone(),
                        kind: link.kind.clone(),
                    });
                    break;
                }
            }
        }

        Self { steps }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Node(id) => Some(id),
            _ => None,
        })
    }
}

/// Chains of a workflow, flattened in stored order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnablePlan {
    pub chains: Vec<Chain>,
}

impl RunnablePlan {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Human-readable problems the plan will hit at run time.
    pub fn diagnostics(&self, node_map: &NodeMap) -> Vec<String> {
        let mut issues = Vec::new();
        for (index, chain) in self.chains.iter().enumerate() {
            for step in &chain.steps {
                match step {
                    PlanStep::Node(id) if !node_map.contains_key(id) => {
                        issues.push(format!("chain {}: node {} is not defined", index, id));
                    }
                    PlanStep::Flow {
                        id,
                        dropped_next: true,
                    } => {
                        issues.push(format!(
                            "chain {}: flow link {} ends the chain, later links never run",
                            index, id
                        ));
                    }
                    PlanStep::Invalid { id, kind } => {
                        issues.push(format!(
                            "chain {}: link {} has unknown type '{}'",
                            index, id, kind
                        ));
                    }
                    _ => {}
                }
            }
        }
        issues
    }
}

impl WorkflowDefinition {
    /// Flatten every `next` chain into a sequence of steps.
    pub fn to_runnable(&self) -> RunnablePlan {
        RunnablePlan {
            chains: self.chains.iter().map(Chain::flatten).collect(),
        }
    }
}
