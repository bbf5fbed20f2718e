//! Standard capability library
//!
//! Host functions that node scripts may call: logging, JSON, time and HTTP.

mod debug;
mod http;
mod time;
mod transform;

pub use debug::LogCapability;
pub use http::HttpCapability;
pub use time::TimeCapability;
pub use transform::JsonCapability;
use chainruntime::CapabilityRegistry;

use std::sync::Arc;

/// Register all standard capabilities with a registry
pub fn register_all(registry: &mut CapabilityRegistry) {
    registry.register(Arc::new(debug::LogCapability));
    registry.register(Arc::new(http::HttpCapability));
    registry.register(Arc::new(transform::JsonCapability));
    registry.register(Arc::new(time::TimeCapability));
}

/// A registry holding every standard capability
pub fn standard_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    register_all(&mut registry);
    registry
}
