use chainruntime::rhai::{Dynamic, Engine, EvalAltResult, Map, INT};
use chainruntime::{Capability, CapabilityMetadata, FunctionDefinition};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound HTTP requests
pub struct HttpCapability;

// The blocking client owns its own runtime, so it is built and dropped on
// the script thread rather than held by the engine.
fn client() -> Result<Client, Box<EvalAltResult>> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| format!("HTTP client error: {}", e).into())
}

fn into_map(response: Response) -> Result<Map, Box<EvalAltResult>> {
    let status = response.status().as_u16() as INT;
    let body = response
        .text()
        .map_err(|e| format!("Failed to read response: {}", e))?;

    let mut map = Map::new();
    map.insert("status".into(), Dynamic::from(status));
    map.insert("body".into(), Dynamic::from(body));
    Ok(map)
}

fn http_get(url: &str) -> Result<Map, Box<EvalAltResult>> {
    tracing::debug!(capability = "http", "GET {}", url);
    let response = client()?
        .get(url)
        .send()
        .map_err(|e| format!("HTTP request failed: {}", e))?;
    into_map(response)
}

fn http_post(url: &str, body: &str) -> Result<Map, Box<EvalAltResult>> {
    tracing::debug!(capability = "http", "POST {}", url);
    let response = client()?
        .post(url)
        .body(body.to_string())
        .send()
        .map_err(|e| format!("HTTP request failed: {}", e))?;
    into_map(response)
}

impl Capability for HttpCapability {
    fn name(&self) -> &str {
        "http"
    }

    fn register(&self, engine: &mut Engine) {
        engine.register_fn("http_get", http_get);
        engine.register_fn("http_post", http_post);
    }

    fn metadata(&self) -> CapabilityMetadata {
        CapabilityMetadata {
            description: "Make HTTP requests".to_string(),
            functions: vec![
                FunctionDefinition::new("http_get(url)", "GET a URL, returns #{ status, body }"),
                FunctionDefinition::new(
                    "http_post(url, body)",
                    "POST text to a URL, returns #{ status, body }",
                ),
            ],
        }
    }
}
