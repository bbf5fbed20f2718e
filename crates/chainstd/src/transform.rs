use chainruntime::rhai::serde::{from_dynamic, to_dynamic};
use chainruntime::rhai::{Dynamic, Engine, EvalAltResult};
use chainruntime::{Capability, CapabilityMetadata, FunctionDefinition};

/// JSON text <-> script values
pub struct JsonCapability;

fn json_parse(text: &str) -> Result<Dynamic, Box<EvalAltResult>> {
    let parsed: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("JSON parse error: {}", e))?;
    to_dynamic(&parsed)
}

fn json_stringify(value: Dynamic) -> Result<String, Box<EvalAltResult>> {
    let value: serde_json::Value = from_dynamic(&value)?;
    serde_json::to_string(&value).map_err(|e| format!("JSON stringify error: {}", e).into())
}

impl Capability for JsonCapability {
    fn name(&self) -> &str {
        "json"
    }

    fn register(&self, engine: &mut Engine) {
        engine.register_fn("json_parse", json_parse);
        engine.register_fn("json_stringify", json_stringify);
    }

    fn metadata(&self) -> CapabilityMetadata {
        CapabilityMetadata {
            description: "Parse and produce JSON text".to_string(),
            functions: vec![
                FunctionDefinition::new("json_parse(text)", "Parse JSON text into a value"),
                FunctionDefinition::new("json_stringify(value)", "Convert a value to JSON text"),
            ],
        }
    }
}
