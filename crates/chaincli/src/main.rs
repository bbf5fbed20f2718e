// crates/chaincli/src/main.rs

use anyhow::{Context, Result};
use chaincore::editor::{create_workflow, EditorEdge, EditorNode};
use chaincore::{ExecutionEvent, NodeOutcome, RunReport, StoredWorkflow, TemplateStore};
use chainruntime::{FlowRuntime, JsonFileStore, RuntimeConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chain")]
#[command(about = "Chain workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every chain of a workflow document
    Run {
        /// Path to the workflow JSON document
        #[arg(short, long, default_value = "workflow.json")]
        file: PathBuf,

        /// Path to the templates JSON file
        #[arg(short, long, default_value = "node_templates.json")]
        templates: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run a single node of a workflow document
    RunNode {
        /// Id of the node to run
        node_id: String,

        #[arg(short, long, default_value = "workflow.json")]
        file: PathBuf,

        #[arg(short, long, default_value = "node_templates.json")]
        templates: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Check a workflow document for links that will fail at run time
    Validate {
        /// Path to the workflow JSON document
        file: PathBuf,
    },

    /// List the capabilities available to node scripts
    Capabilities,

    /// List stored templates
    Templates {
        #[arg(short, long, default_value = "node_templates.json")]
        file: PathBuf,
    },

    /// Create an example workflow document
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn build_runtime(file: PathBuf, templates: PathBuf) -> FlowRuntime {
    tracing::debug!(
        "Workflow file: {}, templates file: {}",
        file.display(),
        templates.display()
    );
    let config = RuntimeConfig {
        workflow_file: file,
        templates_file: templates,
        ..RuntimeConfig::default()
    };
    FlowRuntime::from_config(config, Arc::new(chainstd::standard_registry()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            templates,
            verbose,
        } => {
            init_logging(verbose);
            run_workflow(file, templates).await?;
        }

        Commands::RunNode {
            node_id,
            file,
            templates,
            verbose,
        } => {
            init_logging(verbose);
            run_node(file, templates, &node_id).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Capabilities => {
            list_capabilities();
        }

        Commands::Templates { file } => {
            list_templates(file).await?;
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::WorkflowStarted { chains, .. } => {
            println!("▶️  Workflow started ({} chains)", chains);
        }
        ExecutionEvent::ChainStarted { index, .. } => {
            println!("  ⛓  Chain {}", index);
        }
        ExecutionEvent::NodeStarted { node_id, name, .. } => {
            println!("    ⚡ Starting node: {} ({})", name, node_id);
        }
        ExecutionEvent::NodeCompleted {
            node_id,
            duration_ms,
            ..
        } => {
            println!("    ✅ Node {} completed in {}ms", node_id, duration_ms);
        }
        ExecutionEvent::NodeFailed { node_id, error, .. } => {
            println!("    ❌ Node {} failed: {}", node_id, error);
        }
        ExecutionEvent::ChainFailed { index, error, .. } => {
            println!("  💥 Chain {} stopped: {}", index, error);
        }
        ExecutionEvent::WorkflowCompleted {
            success,
            duration_ms,
            ..
        } => {
            if success {
                println!("✨ Workflow completed successfully in {}ms", duration_ms);
            } else {
                println!("💥 Workflow finished with errors after {}ms", duration_ms);
            }
        }
    }
}

async fn run_workflow(file: PathBuf, templates: PathBuf) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let runtime = build_runtime(file, templates);

    // Spawn event listener
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });

    let report = runtime.run_workflow().await?;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    print_report(&report)?;

    if let Some(error) = report.error {
        anyhow::bail!(error);
    }
    Ok(())
}

fn print_report(report: &RunReport) -> Result<()> {
    println!();
    println!("📊 Execution Summary:");
    let failed = report
        .node_outputs
        .values()
        .filter(|outcome| outcome.is_error())
        .count();
    println!(
        "   Nodes: {} ran, {} failed",
        report.node_outputs.len(),
        failed
    );

    if !report.node_outputs.is_empty() {
        println!();
        println!("📤 Outputs:");
        for (node_id, outcome) in &report.node_outputs {
            match outcome {
                NodeOutcome::Output { output } => {
                    println!("   {}: {}", node_id, serde_json::to_string(output)?);
                }
                NodeOutcome::Error { error } => {
                    println!("   {}: error: {}", node_id, error);
                }
            }
        }
    }
    Ok(())
}

async fn run_node(file: PathBuf, templates: PathBuf, node_id: &str) -> Result<()> {
    let runtime = build_runtime(file, templates);

    let output = runtime
        .run_node(node_id)
        .await
        .with_context(|| format!("Failed to run node {}", node_id))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&output.unwrap_or(serde_json::Value::Null))?
    );
    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow_json = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let workflow: StoredWorkflow = serde_json::from_str(&workflow_json)?;
    let plan = workflow.flow.to_runnable();

    println!("   Chains: {}", plan.chains.len());
    println!("   Nodes: {}", workflow.node_map.len());
    println!("   Environment keys: {}", workflow.env.len());

    let issues = plan.diagnostics(&workflow.node_map);
    if issues.is_empty() {
        println!("✅ Workflow is valid");
        return Ok(());
    }

    println!("⚠️  Problems found:");
    for issue in &issues {
        println!("   • {}", issue);
    }
    anyhow::bail!("{} problem(s) found", issues.len())
}

fn list_capabilities() {
    println!("📦 Available Capabilities:");
    println!();

    let registry = chainstd::standard_registry();

    for name in registry.list_capabilities() {
        if let Some(metadata) = registry.get_metadata(&name) {
            println!("  • {}: {}", name, metadata.description);
            for function in metadata.functions {
                println!("      {}  {}", function.signature, function.description);
            }
        } else {
            println!("  • {}", name);
        }
    }
}

async fn list_templates(file: PathBuf) -> Result<()> {
    let store = JsonFileStore::new(PathBuf::new(), file);
    let templates = store.list_templates().await?;

    if templates.is_empty() {
        println!("No templates stored in {}", store.templates_file().display());
        return Ok(());
    }

    for template in templates {
        println!("  • {} ({})", template.name, template.id);
        for (key, field) in &template.setting_schema {
            println!("      {}: {} [{:?}]", key, field.label, field.kind);
        }
    }
    Ok(())
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let nodes = vec![
        EditorNode::new("fetch", "Build Greeting")
            .with_code("let who = env.GREETING_TARGET ?? \"world\";\nreturn `hello ${who}`;"),
        EditorNode::new("shout", "Shout").with_code("return outputs[0].to_upper();"),
    ];
    let edges = vec![EditorEdge::new("fetch", "shout")];

    let (flow, node_map) = create_workflow(&nodes, &edges)?;
    let mut workflow = StoredWorkflow {
        flow,
        node_map,
        ..StoredWorkflow::default()
    };
    workflow
        .env
        .insert("GREETING_TARGET".to_string(), "chain".to_string());

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  chain run --file {}", output.display());

    Ok(())
}
