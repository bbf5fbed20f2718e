use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use actix_ws::Message;
use chaincore::{
    EnvironmentMap, FlowError, NodeMap, StoreError, Template, TemplateStore, WorkflowDefinition,
    WorkflowError, WorkflowStore,
};
use chainruntime::{FlowRuntime, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<FlowRuntime>,
}

/// Request body for saving the workflow
#[derive(Debug, Deserialize)]
struct SaveWorkflowRequest {
    #[serde(default)]
    flow: WorkflowDefinition,
    #[serde(rename = "nodeMap", default)]
    node_map: NodeMap,
}

#[derive(Debug, Deserialize)]
struct RunNodeRequest {
    #[serde(rename = "nodeId", default)]
    node_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunNodeResponse {
    output: Option<serde_json::Value>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(mut builder: actix_web::HttpResponseBuilder, message: impl Into<String>) -> HttpResponse {
    builder.json(ErrorResponse {
        error: message.into(),
    })
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "chainserver"
    }))
}

/// Persist the workflow topology and node map
#[post("/workflow")]
async fn save_workflow(
    data: web::Data<AppState>,
    body: web::Json<SaveWorkflowRequest>,
) -> HttpResponse {
    let SaveWorkflowRequest { flow, node_map } = body.into_inner();
    info!(
        "Saving workflow: {} chains, {} nodes",
        flow.chains.len(),
        node_map.len()
    );

    match data.runtime.workflows().save_workflow(flow, node_map).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            error!("Failed to save workflow: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
        }
    }
}

/// Fetch the stored workflow document
#[get("/workflow")]
async fn get_workflow(data: web::Data<AppState>) -> HttpResponse {
    match data.runtime.workflows().load_workflow().await {
        Ok(Some(workflow)) => HttpResponse::Ok().json(workflow),
        Ok(None) => error_response(HttpResponse::NotFound(), "Workflow not found"),
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

/// Run a single stored node
#[post("/run-node")]
async fn run_node(data: web::Data<AppState>, body: web::Json<RunNodeRequest>) -> HttpResponse {
    let Some(node_id) = body.into_inner().node_id.filter(|id| !id.is_empty()) else {
        return error_response(HttpResponse::BadRequest(), "Missing nodeId");
    };

    info!("Running node: {}", node_id);

    match data.runtime.run_node(&node_id).await {
        Ok(output) => HttpResponse::Ok().json(RunNodeResponse { output }),
        Err(FlowError::Workflow(WorkflowError::NotFound)) => {
            error_response(HttpResponse::NotFound(), "Workflow not found")
        }
        Err(FlowError::Workflow(WorkflowError::NodeNotFound(_))) => {
            error_response(HttpResponse::NotFound(), "Node not found.")
        }
        Err(e) => {
            error!("Node {} failed: {}", node_id, e);
            error_response(HttpResponse::InternalServerError(), e.to_string())
        }
    }
}

/// Run every chain of the stored workflow
#[post("/run-workflow")]
async fn run_workflow(data: web::Data<AppState>) -> HttpResponse {
    match data.runtime.run_workflow().await {
        Ok(report) => {
            if let Some(error) = &report.error {
                info!("Workflow finished with errors: {}", error);
            }
            HttpResponse::Ok().json(report)
        }
        Err(FlowError::Workflow(WorkflowError::NotFound)) => {
            error_response(HttpResponse::NotFound(), "Workflow not found")
        }
        Err(e) => {
            error!("Workflow execution failed: {}", e);
            error_response(HttpResponse::InternalServerError(), e.to_string())
        }
    }
}

#[get("/environment-variables")]
async fn get_environment(data: web::Data<AppState>) -> HttpResponse {
    match data.runtime.workflows().load_env().await {
        Ok(env) => HttpResponse::Ok().json(env),
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

#[post("/environment-variables")]
async fn save_environment(
    data: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    let env: EnvironmentMap = match serde_json::from_value(body.into_inner()) {
        Ok(env) => env,
        Err(_) => {
            return error_response(
                HttpResponse::BadRequest(),
                "Environment variables must be a JSON object of strings.",
            )
        }
    };

    match data.runtime.workflows().save_env(env).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

#[get("/node-templates")]
async fn list_templates(data: web::Data<AppState>) -> HttpResponse {
    match data.runtime.templates().list_templates().await {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

#[get("/node-templates/{id}")]
async fn get_template(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let template_id = path.into_inner();
    match data.runtime.templates().get_template_by_id(&template_id).await {
        Ok(Some(template)) => HttpResponse::Ok().json(template),
        Ok(None) => error_response(HttpResponse::NotFound(), "Template not found"),
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

#[post("/node-templates")]
async fn create_template(
    data: web::Data<AppState>,
    body: web::Json<Template>,
) -> HttpResponse {
    match data.runtime.templates().create_template(body.into_inner()).await {
        Ok(template) => {
            info!("Created template: {} ({})", template.name, template.id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "template": template,
            }))
        }
        Err(e @ (StoreError::Invalid(_) | StoreError::DuplicateTemplate(_))) => {
            error_response(HttpResponse::BadRequest(), e.to_string())
        }
        Err(e) => error_response(HttpResponse::InternalServerError(), e.to_string()),
    }
}

/// List capabilities available to node scripts
#[get("/capabilities")]
async fn list_capabilities(data: web::Data<AppState>) -> HttpResponse {
    let registry = data.runtime.registry();
    let capabilities: Vec<_> = registry
        .list_capabilities()
        .iter()
        .map(|name| {
            let metadata = registry.get_metadata(name).unwrap_or_default();
            serde_json::json!({
                "name": name,
                "description": metadata.description,
                "functions": metadata
                    .functions
                    .iter()
                    .map(|f| serde_json::json!({ "signature": f.signature, "description": f.description }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    HttpResponse::Ok().json(capabilities)
}

/// WebSocket endpoint for real-time events
#[get("/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("WebSocket client lagged, {} events dropped", skipped);
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(save_workflow)
        .service(get_workflow)
        .service(run_node)
        .service(run_workflow)
        .service(get_environment)
        .service(save_environment)
        .service(list_templates)
        .service(get_template)
        .service(create_template)
        .service(list_capabilities)
        .service(websocket_events);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting chain server");

    let config = RuntimeConfig::from_env();
    info!(
        "Workflow file: {}, templates file: {}",
        config.workflow_file.display(),
        config.templates_file.display()
    );

    let runtime = FlowRuntime::from_config(config, Arc::new(chainstd::standard_registry()));

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3002".to_string());

    info!("Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .configure(configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use chaincore::{FlowNodeRef, NodeDefinition, StoredWorkflow};
    use chainruntime::{CapabilityRegistry, MemoryStore};

    fn state(store: MemoryStore) -> web::Data<AppState> {
        state_with_registry(store, CapabilityRegistry::new())
    }

    fn state_with_registry(
        store: MemoryStore,
        registry: CapabilityRegistry,
    ) -> web::Data<AppState> {
        let store = Arc::new(store);
        let runtime = FlowRuntime::with_stores(
            store.clone(),
            store,
            Arc::new(registry),
            RuntimeConfig::default(),
        );
        web::Data::new(AppState {
            runtime: Arc::new(runtime),
        })
    }

    fn stored_workflow() -> StoredWorkflow {
        let mut workflow = StoredWorkflow::default();
        workflow.flow.add_chain(FlowNodeRef::chain(["a", "b"]).unwrap());
        workflow.node_map.insert(
            "a".to_string(),
            NodeDefinition::new("a", "First").with_code("return 1;"),
        );
        workflow.node_map.insert(
            "b".to_string(),
            NodeDefinition::new("b", "Second").with_code("return outputs[0] + 1;"),
        );
        workflow
    }

    #[actix_web::test]
    async fn test_run_workflow_returns_report() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new().with_workflow(stored_workflow())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/run-workflow").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["nodeOutputs"]["a"]["output"], 1);
        assert_eq!(body["nodeOutputs"]["b"]["output"], 2);
        assert_eq!(body["chain"], serde_json::json!([1, 2]));
        assert!(body.get("error").is_none());
    }

    #[actix_web::test]
    async fn test_run_workflow_without_document_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/run-workflow").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_run_node_status_codes() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new().with_workflow(stored_workflow())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/run-node")
            .set_json(serde_json::json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/run-node")
            .set_json(serde_json::json!({ "nodeId": "missing" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/run-node")
            .set_json(serde_json::json!({ "nodeId": "a" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["output"], 1);

        // `b` reads outputs[0], which is empty outside a chain.
        let req = test::TestRequest::post()
            .uri("/run-node")
            .set_json(serde_json::json!({ "nodeId": "b" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_save_then_get_workflow_keeps_env() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/workflow").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/environment-variables")
            .set_json(serde_json::json!({ "API_URL": "http://localhost" }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/workflow")
            .set_json(serde_json::json!({
                "flow": { "type": "flow", "nodes": [ { "id": "a", "type": "node" } ] },
                "nodeMap": { "a": { "id": "a", "name": "A", "code": "return env.API_URL;" } }
            }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get().uri("/workflow").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["env"]["API_URL"], "http://localhost");
        assert_eq!(body["flow"]["nodes"][0]["id"], "a");

        let req = test::TestRequest::post().uri("/run-workflow").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["nodeOutputs"]["a"]["output"], "http://localhost");
    }

    #[actix_web::test]
    async fn test_environment_must_be_string_map() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/environment-variables")
            .set_json(serde_json::json!(["not", "a", "map"]))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_template_routes() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new()))
                .configure(configure),
        )
        .await;

        let template = serde_json::json!({
            "id": "greet",
            "name": "Greeter",
            "setting_schema": { "who": { "label": "Who", "type": "text" } },
            "code": "`hello ${settings.who}`"
        });

        let req = test::TestRequest::post()
            .uri("/node-templates")
            .set_json(&template)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let req = test::TestRequest::post()
            .uri("/node-templates")
            .set_json(&template)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/node-templates/greet").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Greeter");

        let req = test::TestRequest::get().uri("/node-templates/nope").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(state(MemoryStore::new()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "chainserver");
    }

    #[actix_web::test]
    async fn test_capabilities_lists_standard_library() {
        let app = test::init_service(
            App::new()
                .app_data(state_with_registry(
                    MemoryStore::new(),
                    chainstd::standard_registry(),
                ))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/capabilities").to_request();
        let body: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;

        let names: Vec<_> = body.iter().map(|c| c["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["http", "json", "log", "time"]);

        let http = &body[0];
        assert_eq!(http["description"], "Make HTTP requests");
        assert_eq!(http["functions"][0]["signature"], "http_get(url)");
    }
}
