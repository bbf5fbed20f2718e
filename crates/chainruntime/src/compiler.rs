use crate::CapabilityRegistry;
use async_trait::async_trait;
use chaincore::{ExecutionContext, NodeFunction, ScriptError};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Dynamic, Engine, Map, Scope, AST};
use serde_json::Value;
use std::sync::Arc;

/// Turns node code into a callable.
pub trait CodeCompiler: Send + Sync {
    /// Fails when the code is not valid source for the target language.
    fn compile(&self, code: &str) -> Result<Arc<dyn NodeFunction>, ScriptError>;
}

/// Compiles node code as rhai scripts against a fixed capability set.
///
/// Scripts see `env`, `outputs` and `settings` as variables, and the same
/// three bundled in a `params` map. The value of a top-level `return` or of
/// the last expression is the node's output; `()` means no output.
#[derive(Clone)]
pub struct ScriptCompiler {
    engine: Arc<Engine>,
}

impl ScriptCompiler {
    pub fn new(registry: &CapabilityRegistry) -> Self {
        Self {
            engine: Arc::new(registry.build_engine()),
        }
    }
}

impl Default for ScriptCompiler {
    fn default() -> Self {
        Self::new(&CapabilityRegistry::new())
    }
}

impl CodeCompiler for ScriptCompiler {
    fn compile(&self, code: &str) -> Result<Arc<dyn NodeFunction>, ScriptError> {
        let ast = self
            .engine
            .compile(code)
            .map_err(|e| ScriptError::new(e.to_string()))?;

        Ok(Arc::new(ScriptFunction {
            engine: Arc::clone(&self.engine),
            ast: Arc::new(ast),
        }))
    }
}

struct ScriptFunction {
    engine: Arc<Engine>,
    ast: Arc<AST>,
}

#[async_trait]
impl NodeFunction for ScriptFunction {
    async fn call(&self, ctx: ExecutionContext) -> Result<Option<Value>, ScriptError> {
        let engine = Arc::clone(&self.engine);
        let ast = Arc::clone(&self.ast);
        let span = tracing::Span::current();

        // Scripts run synchronously; keep them off the async workers.
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            evaluate(&engine, &ast, ctx)
        })
        .await
        .map_err(|e| ScriptError::new(format!("Script task failed: {}", e)))?
    }
}

fn evaluate(engine: &Engine, ast: &AST, ctx: ExecutionContext) -> Result<Option<Value>, ScriptError> {
    let mut scope = context_scope(ctx)?;

    let result: Dynamic = engine
        .eval_ast_with_scope(&mut scope, ast)
        .map_err(|e| ScriptError::new(e.to_string()))?;

    if result.is_unit() {
        return Ok(None);
    }

    from_dynamic::<Value>(&result)
        .map(Some)
        .map_err(|e| ScriptError::new(format!("Unsupported result value: {}", e)))
}

fn context_scope(ctx: ExecutionContext) -> Result<Scope<'static>, ScriptError> {
    let convert = |e: Box<rhai::EvalAltResult>| ScriptError::new(format!("Invalid context: {}", e));

    let env = to_dynamic(&ctx.env).map_err(convert)?;
    let outputs = to_dynamic(&ctx.outputs).map_err(convert)?;
    let settings = to_dynamic(&ctx.settings).map_err(convert)?;

    let mut params = Map::new();
    params.insert("env".into(), env.clone());
    params.insert("outputs".into(), outputs.clone());
    params.insert("settings".into(), settings.clone());

    let mut scope = Scope::new();
    scope.push_dynamic("env", env);
    scope.push_dynamic("outputs", outputs);
    scope.push_dynamic("settings", settings);
    scope.push_dynamic("params", Dynamic::from_map(params));
    Ok(scope)
}
