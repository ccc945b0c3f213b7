//! mcp-bridge binary entry point.

use std::sync::Arc;

use clap::Parser;
use mcp_bridge::agent_loop::Orchestrator;
use mcp_bridge::cli::{Cli, Commands, ToolsArgs};
use mcp_bridge::config::BridgeConfig;
use mcp_bridge::error::BridgeError;
use mcp_bridge::inference::HttpChatBackend;
use mcp_bridge::mcp::SessionManager;
use mcp_bridge::server::{self, AppState};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.load_config() {
        Ok(config) => {
            mcp_bridge::telemetry::init_logging(&config.logging);
            match &cli.command {
                Some(Commands::Tools(args)) => handle_tools(&config, args).await,
                Some(Commands::Serve) | None => handle_serve(config).await,
            }
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_serve(config: BridgeConfig) -> Result<(), BridgeError> {
    tracing::info!(
        servers = config.mcp_servers.len(),
        backend = %config.inference_server.base_url,
        "Starting mcp-bridge"
    );

    // Sessions are ready (or failed) before the listener accepts anything.
    let manager = Arc::new(SessionManager::initialize(&config.mcp_servers).await);
    let backend = Arc::new(HttpChatBackend::new(&config.inference_server)?);
    let orchestrator = Orchestrator::new(Arc::clone(&manager), backend, &config.agent_loop);
    let state = AppState::new(orchestrator, &config);

    let served = server::serve(&config, state, shutdown_signal()).await;
    manager.shutdown().await;
    served
}

async fn handle_tools(config: &BridgeConfig, args: &ToolsArgs) -> Result<(), BridgeError> {
    let manager = SessionManager::initialize(&config.mcp_servers).await;

    for status in manager.statuses() {
        match &status.error {
            Some(error) => println!("{} [{}] {}: {error}", status.name, status.transport, status.state),
            None => println!("{} [{}] {}", status.name, status.transport, status.state),
        }
    }

    let tools = manager.list_tools_for_model(args.model.as_deref()).await;
    println!();
    for entry in &tools {
        let description = entry.tool.description.as_deref().unwrap_or("");
        println!("{}/{}  {description}", entry.server, entry.tool.name);
    }

    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
