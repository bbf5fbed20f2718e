// crates/chaincore/tests/editor_test.rs

use chaincore::editor::{create_workflow, to_editor_graph, EditorEdge, EditorNode};
use chaincore::{FlowNodeRef, WorkflowError};

fn nodes(ids: &[&str]) -> Vec<EditorNode> {
    ids.iter()
        .map(|id| EditorNode::new(*id, format!("Node {}", id)).with_code(format!("return \"{}\";", id)))
        .collect()
}

#[test]
fn test_linear_edges_make_one_chain() {
    let (flow, node_map) = create_workflow(
        &nodes(&["a", "b", "c"]),
        &[EditorEdge::new("a", "b"), EditorEdge::new("b", "c")],
    )
    .unwrap();

    assert_eq!(flow.chains, vec![FlowNodeRef::chain(["a", "b", "c"]).unwrap()]);
    assert_eq!(node_map.len(), 3);
    assert_eq!(node_map["b"].name, "Node b");
    assert_eq!(node_map["b"].code.as_deref(), Some("return \"b\";"));
}

#[test]
fn test_edge_order_decides_chain_heads() {
    let (flow, _) = create_workflow(
        &nodes(&["a", "b", "c"]),
        &[EditorEdge::new("b", "c"), EditorEdge::new("a", "b")],
    )
    .unwrap();

    assert_eq!(
        flow.chains,
        vec![
            FlowNodeRef::chain(["b", "c"]).unwrap(),
            FlowNodeRef::chain(["a", "b"]).unwrap(),
        ]
    );
}

#[test]
fn test_unconnected_nodes_start_no_chain() {
    let (flow, node_map) =
        create_workflow(&nodes(&["a", "b", "lonely"]), &[EditorEdge::new("a", "b")]).unwrap();

    assert_eq!(flow.chains.len(), 1);
    assert!(node_map.contains_key("lonely"));
}

#[test]
fn test_empty_editor_graph_is_a_no_op_workflow() {
    let (flow, node_map) = create_workflow(&[], &[]).unwrap();

    assert!(flow.chains.is_empty());
    assert!(node_map.is_empty());
    assert!(flow.to_runnable().is_empty());
}

#[test]
fn test_cycles_are_rejected() {
    let result = create_workflow(
        &nodes(&["a", "b"]),
        &[EditorEdge::new("a", "b"), EditorEdge::new("b", "a")],
    );
    assert!(matches!(result, Err(WorkflowError::CyclicDependency)));
}

#[test]
fn test_branching_and_unknown_nodes_are_rejected() {
    let branching = create_workflow(
        &nodes(&["a", "b", "c"]),
        &[EditorEdge::new("a", "b"), EditorEdge::new("a", "c")],
    );
    assert!(matches!(branching, Err(WorkflowError::InvalidConnection(_))));

    let unknown = create_workflow(&nodes(&["a"]), &[EditorEdge::new("a", "ghost")]);
    assert!(matches!(unknown, Err(WorkflowError::NodeNotFound(id)) if id == "ghost"));
}

#[test]
fn test_editor_graph_round_trip() {
    let edges = vec![EditorEdge::new("a", "b"), EditorEdge::new("b", "c")];
    let (flow, node_map) = create_workflow(&nodes(&["a", "b", "c"]), &edges).unwrap();

    let (loaded_nodes, loaded_edges) = to_editor_graph(&flow, &node_map);

    let ids: Vec<_> = loaded_nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(loaded_edges, edges);
    assert_eq!(loaded_nodes[0].position.y, 100.0);
    assert_eq!(loaded_nodes[2].position.y, 300.0);
    assert_eq!(loaded_nodes[1].data.label, "Node b");

    let (again, _) = create_workflow(&loaded_nodes, &loaded_edges).unwrap();
    assert_eq!(again, flow);
}

#[test]
fn test_editor_graph_labels_fall_back_to_id() {
    let flow = chaincore::WorkflowDefinition::new().with_chain(FlowNodeRef::node("orphan"));
    let (loaded_nodes, loaded_edges) = to_editor_graph(&flow, &Default::default());

    assert_eq!(loaded_nodes[0].data.label, "orphan");
    assert!(loaded_nodes[0].data.code.is_empty());
    assert!(loaded_edges.is_empty());
}
