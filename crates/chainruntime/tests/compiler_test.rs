// crates/chainruntime/tests/compiler_test.rs

use chaincore::ExecutionContext;
use chainruntime::{CodeCompiler, ScriptCompiler};
use serde_json::json;

fn context() -> ExecutionContext {
    ExecutionContext::new(
        [("HOST".to_string(), "example.org".to_string())]
            .into_iter()
            .collect(),
        vec![json!({ "count": 2 }), json!([1, 2, 3])],
        [("suffix".to_string(), "!".to_string())].into_iter().collect(),
    )
}

#[tokio::test]
async fn test_context_is_visible_to_scripts() {
    let compiler = ScriptCompiler::default();
    let function = compiler
        .compile("return `${env.HOST}${settings.suffix}` + outputs[0].count;")
        .unwrap();

    let output = function.call(context()).await.unwrap();

    assert_eq!(output, Some(json!("example.org!2")));
}

#[tokio::test]
async fn test_structured_results_become_json() {
    let compiler = ScriptCompiler::default();
    let function = compiler
        .compile("let total = 0; for n in outputs[1] { total += n; } #{ total: total, items: outputs[1] }")
        .unwrap();

    let output = function.call(context()).await.unwrap();

    assert_eq!(output, Some(json!({ "total": 6, "items": [1, 2, 3] })));
}

#[tokio::test]
async fn test_unit_result_is_no_output() {
    let compiler = ScriptCompiler::default();

    let function = compiler.compile("").unwrap();
    assert_eq!(function.call(context()).await.unwrap(), None);

    let function = compiler.compile("return;").unwrap();
    assert_eq!(function.call(context()).await.unwrap(), None);
}

#[test]
fn test_syntax_errors_fail_compilation() {
    let compiler = ScriptCompiler::default();

    assert!(compiler.compile("let = 1;").is_err());
    assert!(compiler.compile("fn broken( {").is_err());
}

#[tokio::test]
async fn test_runtime_errors_surface_from_call() {
    let compiler = ScriptCompiler::default();

    let function = compiler.compile("throw \"bad input\";").unwrap();
    let error = function.call(context()).await.unwrap_err();
    assert!(error.to_string().contains("bad input"));

    let function = compiler.compile("outputs[10].count").unwrap();
    assert!(function.call(context()).await.is_err());
}

#[tokio::test]
async fn test_compiled_function_is_reusable() {
    let compiler = ScriptCompiler::default();
    let function = compiler.compile("outputs.len()").unwrap();

    assert_eq!(function.call(context()).await.unwrap(), Some(json!(2)));

    let ctx = ExecutionContext::new(Default::default(), vec![], Default::default());
    assert_eq!(function.call(ctx).await.unwrap(), Some(json!(0)));
}
