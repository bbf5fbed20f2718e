use chainruntime::rhai::Engine;
use chainruntime::{Capability, CapabilityMetadata, FunctionDefinition};

/// Lets scripts write to the engine's log
pub struct LogCapability;

impl Capability for LogCapability {
    fn name(&self) -> &str {
        "log"
    }

    fn register(&self, engine: &mut Engine) {
        engine.register_fn("log_info", |message: &str| {
            tracing::info!(target: "chain::script", capability = "log", "{}", message);
        });
        engine.register_fn("log_warn", |message: &str| {
            tracing::warn!(target: "chain::script", capability = "log", "{}", message);
        });
    }

    fn metadata(&self) -> CapabilityMetadata {
        CapabilityMetadata {
            description: "Write messages to the engine log".to_string(),
            functions: vec![
                FunctionDefinition::new("log_info(message)", "Log at info level"),
                FunctionDefinition::new("log_warn(message)", "Log at warn level"),
            ],
        }
    }
}
