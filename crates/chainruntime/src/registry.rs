use rhai::Engine;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named group of host functions exposed to node scripts
pub trait Capability: Send + Sync {
    /// Unique name (e.g., "json", "time")
    fn name(&self) -> &str;

    /// Register the capability's functions on the engine
    fn register(&self, engine: &mut Engine);

    fn metadata(&self) -> CapabilityMetadata {
        CapabilityMetadata::default()
    }
}

/// Metadata about a capability
#[derive(Debug, Clone, Default)]
pub struct CapabilityMetadata {
    pub description: String,
    pub functions: Vec<FunctionDefinition>,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub signature: String,
    pub description: String,
}

impl FunctionDefinition {
    pub fn new(signature: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            description: description.into(),
        }
    }
}

/// The set of capabilities node scripts may call. Nothing else is reachable.
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        tracing::info!("Registering capability: {}", name);
        self.capabilities.insert(name, capability);
    }

    pub fn list_capabilities(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    pub fn get_metadata(&self, name: &str) -> Option<CapabilityMetadata> {
        self.capabilities.get(name).map(|c| c.metadata())
    }

    /// Build a script engine with every registered capability installed.
    pub fn build_engine(&self) -> Engine {
        let mut engine = Engine::new();

        engine.on_print(|text| tracing::info!(target: "chain::script", "{}", text));
        engine.on_debug(|text, _source, position| {
            tracing::debug!(target: "chain::script", "{} @ {}", text, position)
        });

        for capability in self.capabilities.values() {
            capability.register(&mut engine);
        }
        engine
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
