use crate::{CodeCompiler, TemplateResolver};
use chaincore::{EnvironmentMap, ExecutionContext, NodeDefinition, NodeError};
use serde_json::Value;
use std::sync::Arc;

/// Executes one node definition in isolation.
#[derive(Clone)]
pub struct NodeRunner {
    resolver: TemplateResolver,
    compiler: Arc<dyn CodeCompiler>,
}

impl NodeRunner {
    pub fn new(resolver: TemplateResolver, compiler: Arc<dyn CodeCompiler>) -> Self {
        Self { resolver, compiler }
    }

    /// Resolve, compile and invoke the node. `Ok(None)` is a run with no output.
    ///
    /// `outputs` is copied into the node's context; the caller alone decides
    /// whether the result is appended to it.
    #[tracing::instrument(name = "node.run", skip_all, fields(node_id = %node.id, node_name = %node.name))]
    pub async fn run(
        &self,
        node: &NodeDefinition,
        env: &EnvironmentMap,
        outputs: &[Value],
    ) -> Result<Option<Value>, NodeError> {
        let code = match &node.template_id {
            Some(template_id) => {
                tracing::debug!("Resolving template {}", template_id);
                self.resolver
                    .resolve(template_id)
                    .await
                    .map_err(|source| NodeError::TemplateResolution {
                        template_id: template_id.clone(),
                        source,
                    })?
            }
            None => node.code.clone().unwrap_or_default(),
        };

        let function = self
            .compiler
            .compile(&code)
            .map_err(|detail| NodeError::Compile {
                name: node.name.clone(),
                id: node.id.clone(),
                detail,
            })?;

        let ctx = ExecutionContext::new(env.clone(), outputs.to_vec(), node.settings.clone());

        function.call(ctx).await.map_err(|detail| NodeError::Runtime {
            name: node.name.clone(),
            id: node.id.clone(),
            detail,
        })
    }
}
