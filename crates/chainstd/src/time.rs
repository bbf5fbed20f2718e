use chainruntime::rhai::Engine;
use chainruntime::{Capability, CapabilityMetadata, FunctionDefinition};
use chrono::Utc;
use std::time::Duration;

/// Clock access and delays
pub struct TimeCapability;

impl Capability for TimeCapability {
    fn name(&self) -> &str {
        "time"
    }

    fn register(&self, engine: &mut Engine) {
        engine.register_fn("now_iso", || Utc::now().to_rfc3339());
        engine.register_fn("now_millis", || Utc::now().timestamp_millis());
        // Scripts run on the blocking pool, so a plain sleep only holds up this node.
        engine.register_fn("sleep_ms", |ms: i64| {
            std::thread::sleep(Duration::from_millis(ms.max(0) as u64));
        });
    }

    fn metadata(&self) -> CapabilityMetadata {
        CapabilityMetadata {
            description: "Current time and delays".to_string(),
            functions: vec![
                FunctionDefinition::new("now_iso()", "Current UTC time as RFC 3339 text"),
                FunctionDefinition::new("now_millis()", "Milliseconds since the Unix epoch"),
                FunctionDefinition::new("sleep_ms(ms)", "Pause the node for `ms` milliseconds"),
            ],
        }
    }
}
