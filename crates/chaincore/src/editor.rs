//! Conversion between the visual editor's node/edge lists and the stored
//! chain topology.

use crate::{FlowNodeRef, NodeDefinition, NodeId, NodeMap, Settings, WorkflowDefinition, WorkflowError};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Node position in the visual editor
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditorNodeData {
    pub label: String,

    #[serde(default)]
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorNode {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    pub data: EditorNodeData,
}

impl EditorNode {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            data: EditorNodeData {
                label: label.into(),
                ..EditorNodeData::default()
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.data.code = code.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl EditorEdge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
        }
    }
}

/// Build the stored topology and node map from the editor's graph.
///
/// Every edge whose source has not been seen yet opens a chain; each edge
/// points its source at a fresh link for the target. Links only ever point
/// at links created after them, so the result is acyclic by construction.
pub fn create_workflow(
    nodes: &[EditorNode],
    edges: &[EditorEdge],
) -> Result<(WorkflowDefinition, NodeMap), WorkflowError> {
    let node_map: NodeMap = nodes
        .iter()
        .map(|node| {
            let definition = NodeDefinition {
                id: node.id.clone(),
                name: node.data.label.clone(),
                code: Some(node.data.code.clone()).filter(|code| !code.is_empty()),
                template_id: node.data.template_id.clone(),
                settings: node.data.settings.clone(),
            };
            (node.id.clone(), definition)
        })
        .collect();

    check_edges(&node_map, edges)?;

    // Arena of links: (node id, index of next link).
    let mut links: Vec<(NodeId, Option<usize>)> = Vec::new();
    let mut latest: HashMap<&str, usize> = HashMap::new();
    let mut heads = Vec::new();

    for edge in edges {
        let source = match latest.get(edge.source.as_str()) {
            Some(&index) => index,
            None => {
                links.push((edge.source.clone(), None));
                let index = links.len() - 1;
                heads.push(index);
                latest.insert(&edge.source, index);
                index
            }
        };
        links.push((edge.target.clone(), None));
        let target = links.len() - 1;
        links[source].1 = Some(target);
        latest.insert(&edge.target, target);
    }

    let mut flow = WorkflowDefinition::new();
    for head in heads {
        let mut ids = Vec::new();
        let mut cursor = Some(head);
        while let Some(index) = cursor {
            ids.push(links[index].0.clone());
            cursor = links[index].1;
        }
        if let Some(chain) = FlowNodeRef::chain(ids) {
            flow.add_chain(chain);
        }
    }

    Ok((flow, node_map))
}

fn check_edges(node_map: &NodeMap, edges: &[EditorEdge]) -> Result<(), WorkflowError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut node_to_index = HashMap::new();
    for id in node_map.keys() {
        node_to_index.insert(id.as_str(), graph.add_node(id.as_str()));
    }

    let mut sources = HashSet::new();
    for edge in edges {
        let from_idx = node_to_index
            .get(edge.source.as_str())
            .ok_or_else(|| WorkflowError::NodeNotFound(edge.source.clone()))?;
        let to_idx = node_to_index
            .get(edge.target.as_str())
            .ok_or_else(|| WorkflowError::NodeNotFound(edge.target.clone()))?;

        if !sources.insert(edge.source.as_str()) {
            return Err(WorkflowError::InvalidConnection(format!(
                "node {} has more than one outgoing edge",
                edge.source
            )));
        }
        graph.add_edge(*from_idx, *to_idx, ());
    }

    if toposort(&graph, None).is_err() {
        return Err(WorkflowError::CyclicDependency);
    }
    Ok(())
}

/// Lay a stored workflow out for the editor, one node per row.
pub fn to_editor_graph(
    flow: &WorkflowDefinition,
    node_map: &NodeMap,
) -> (Vec<EditorNode>, Vec<EditorEdge>) {
    let mut nodes: Vec<EditorNode> = Vec::new();
    let mut edges = Vec::new();
    let mut visited = HashSet::new();

    for head in &flow.chains {
        let mut cursor = Some(head);
        while let Some(link) = cursor {
            if !visited.insert(link.id.clone()) {
                break;
            }
            let definition = node_map.get(&link.id);
            nodes.push(EditorNode {
                id: link.id.clone(),
                position: Position {
                    x: 100.0,
                    y: (nodes.len() + 1) as f32 * 100.0,
                },
                data: EditorNodeData {
                    label: definition
                        .map(|d| d.name.clone())
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| link.id.clone()),
                    code: definition
                        .and_then(|d| d.code.clone())
                        .unwrap_or_default(),
                    template_id: definition.and_then(|d| d.template_id.clone()),
                    settings: definition.map(|d| d.settings.clone()).unwrap_or_default(),
                },
            });

            cursor = link.next.as_deref();
            if let Some(next) = cursor {
                edges.push(EditorEdge::new(link.id.clone(), next.id.clone()));
            }
        }
    }

    (nodes, edges)
}
