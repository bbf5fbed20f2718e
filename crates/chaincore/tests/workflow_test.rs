// crates/chaincore/tests/workflow_test.rs

use chaincore::{
    ChainError, FlowNodeRef, NodeError, NodeOutcome, PlanStep, RunReport, ScriptError,
    StoredWorkflow, TemplateError, WorkflowDefinition,
};
use serde_json::json;

fn stored_document() -> serde_json::Value {
    json!({
        "flow": {
            "type": "flow",
            "nodes": [
                {
                    "id": "1",
                    "type": "node",
                    "next": { "id": "2", "type": "node" }
                },
                { "id": "3", "type": "node" }
            ]
        },
        "nodeMap": {
            "1": { "id": "1", "name": "First", "code": "return 1;", "template_id": null, "settings": {} },
            "2": { "id": "2", "name": "Second", "template_id": "upper", "settings": { "mode": "loud" } },
            "3": { "id": "3", "name": "Third", "code": "" }
        },
        "env": { "API_URL": "http://localhost" }
    })
}

#[test]
fn test_stored_document_parses() {
    let workflow: StoredWorkflow = serde_json::from_value(stored_document()).unwrap();

    assert_eq!(workflow.flow.chains.len(), 2);
    assert_eq!(workflow.flow.chains[0].next.as_ref().unwrap().id, "2");
    assert_eq!(workflow.node_map["1"].code.as_deref(), Some("return 1;"));
    assert_eq!(workflow.node_map["1"].template_id, None);
    assert_eq!(workflow.node_map["2"].template_id.as_deref(), Some("upper"));
    assert_eq!(workflow.node_map["2"].settings["mode"], "loud");
    assert_eq!(workflow.env["API_URL"], "http://localhost");
}

#[test]
fn test_stored_document_writes_wire_names() {
    let workflow: StoredWorkflow = serde_json::from_value(stored_document()).unwrap();
    let value = serde_json::to_value(&workflow).unwrap();

    assert_eq!(value["flow"]["type"], "flow");
    assert_eq!(value["flow"]["nodes"][0]["next"]["id"], "2");
    assert_eq!(value["nodeMap"]["2"]["template_id"], "upper");
    assert!(value["nodeMap"]["1"].get("template_id").is_none());
}

#[test]
fn test_document_without_flow_defaults_to_empty() {
    let workflow: StoredWorkflow =
        serde_json::from_value(json!({ "flow": {}, "nodeMap": {}, "env": { "A": "b" } })).unwrap();

    assert!(workflow.flow.chains.is_empty());
    assert_eq!(workflow.flow.kind, "flow");
    assert!(workflow.flow.to_runnable().is_empty());
}

#[test]
fn test_chains_alias_and_camel_case_template_id() {
    let flow: WorkflowDefinition =
        serde_json::from_value(json!({ "chains": [ { "id": "a", "type": "node" } ] })).unwrap();
    assert_eq!(flow.chains.len(), 1);

    let node: chaincore::NodeDefinition =
        serde_json::from_value(json!({ "id": "a", "name": "A", "templateId": "t1" })).unwrap();
    assert_eq!(node.template_id.as_deref(), Some("t1"));
    assert!(node.settings.is_empty());
}

#[test]
fn test_to_runnable_flattens_in_order() {
    let flow = WorkflowDefinition::new()
        .with_chain(FlowNodeRef::chain(["a", "b", "c"]).unwrap())
        .with_chain(FlowNodeRef::node("d"));

    let plan = flow.to_runnable();

    assert_eq!(plan.chains.len(), 2);
    let first: Vec<_> = plan.chains[0].node_ids().cloned().collect();
    assert_eq!(first, vec!["a", "b", "c"]);
    assert_eq!(plan.chains[1].steps, vec![PlanStep::Node("d".to_string())]);
}

#[test]
fn test_flow_link_terminates_chain() {
    let head = FlowNodeRef::node("a").with_next(FlowNodeRef::flow("sub").with_next(FlowNodeRef::node("b")));
    let plan = WorkflowDefinition::new().with_chain(head).to_runnable();

    assert_eq!(
        plan.chains[0].steps,
        vec![
            PlanStep::Node("a".to_string()),
            PlanStep::Flow {
                id: "sub".to_string(),
                dropped_next: true
            },
        ]
    );
}

#[test]
fn test_unknown_kind_is_kept_as_invalid_step() {
    let head: FlowNodeRef = serde_json::from_value(json!({
        "id": "a",
        "type": "node",
        "next": { "id": "x", "type": "branch", "next": { "id": "b", "type": "node" } }
    }))
    .unwrap();
    let plan = WorkflowDefinition::new().with_chain(head).to_runnable();

    assert_eq!(plan.chains[0].steps.len(), 2);
    assert_eq!(
        plan.chains[0].steps[1],
        PlanStep::Invalid {
            id: "x".to_string(),
            kind: "branch".to_string()
        }
    );
}

#[test]
fn test_diagnostics_report_runtime_problems() {
    let workflow: StoredWorkflow = serde_json::from_value(json!({
        "flow": { "nodes": [
            { "id": "1", "type": "node", "next": { "id": "ghost", "type": "node" } },
            { "id": "f", "type": "flow", "next": { "id": "1", "type": "node" } },
            { "id": "q", "type": "weird" }
        ] },
        "nodeMap": { "1": { "id": "1", "name": "One" } }
    }))
    .unwrap();

    let issues = workflow.flow.to_runnable().diagnostics(&workflow.node_map);

    assert_eq!(issues.len(), 3);
    assert!(issues[0].contains("ghost"));
    assert!(issues[1].contains("flow link f"));
    assert!(issues[2].contains("weird"));
}

#[test]
fn test_report_serializes_like_the_http_body() {
    let mut report = RunReport::new();
    report.record_output("a".to_string(), Some(json!(1)));
    report.record_output("b".to_string(), None);
    report.record_error("c".to_string(), "boom");

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({
            "nodeOutputs": {
                "a": { "output": 1 },
                "b": { "output": null },
                "c": { "error": "boom" }
            },
            "chain": [1, null]
        })
    );

    let back: RunReport = serde_json::from_value(value).unwrap();
    assert_eq!(back.get("c").and_then(NodeOutcome::error), Some("boom"));
    assert_eq!(back.get("a").and_then(NodeOutcome::output), Some(&json!(1)));
}

#[test]
fn test_empty_report_has_no_error_key() {
    let value = serde_json::to_value(RunReport::new()).unwrap();
    assert_eq!(value, json!({ "nodeOutputs": {}, "chain": [] }));
}

#[test]
fn test_error_messages() {
    let compile = NodeError::Compile {
        name: "Parse".to_string(),
        id: "n1".to_string(),
        detail: ScriptError::new("unexpected token"),
    };
    assert_eq!(
        compile.to_string(),
        "Error creating the node function Parse (n1): unexpected token"
    );

    let runtime = NodeError::Runtime {
        name: "Parse".to_string(),
        id: "n1".to_string(),
        detail: ScriptError::new("boom"),
    };
    assert_eq!(runtime.to_string(), "Error executing the node Parse (n1): boom");

    let template = NodeError::TemplateResolution {
        template_id: "t9".to_string(),
        source: TemplateError::NotFound("t9".to_string()),
    };
    assert_eq!(
        template.to_string(),
        "Error loading template t9: Template with ID t9 not found"
    );

    let chain = ChainError::NodeExecution {
        name: "Parse".to_string(),
        source: runtime,
    };
    assert_eq!(chain.to_string(), "Failed to run node Parse.");

    let mut report = RunReport::new();
    report.fail_chain(&chain);
    assert_eq!(
        report.error.as_deref(),
        Some("Failed to execute workflow. Failed to run node Parse.")
    );
}
