use chaincore::{TemplateError, TemplateStore};
use std::sync::Arc;

/// Looks up the code body of a template.
#[derive(Clone)]
pub struct TemplateResolver {
    store: Arc<dyn TemplateStore>,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, template_id: &str) -> Result<String, TemplateError> {
        match self.store.get_template_by_id(template_id).await {
            Ok(Some(template)) => Ok(template.code),
            Ok(None) => Err(TemplateError::NotFound(template_id.to_string())),
            Err(e) => Err(TemplateError::Store(e.to_string())),
        }
    }
}
