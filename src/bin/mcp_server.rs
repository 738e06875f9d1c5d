// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use reviewrs::application::bootstrap;
use reviewrs::config::settings::Settings;
use reviewrs::presentation::mcp::ReviewMcpServer;
use reviewrs::utils::telemetry;
use reviewrs::workers::expiration_worker::ExpirationWorker;
use reviewrs::workers::manager::WorkerManager;
use rmcp::{transport::stdio, ServiceExt};
use tracing::{error, info};

/// MCP服务入口
///
/// 通过stdio提供工具调用，日志写到stderr
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_stderr_telemetry();

    let settings = Settings::new()?;
    info!(
        "Starting restaurant review MCP server v{} (configured port {})",
        env!("CARGO_PKG_VERSION"),
        settings.mcp.port
    );

    let components = bootstrap::build_components(&settings).await;

    // Queued search_and_scrape jobs run in this process
    let mut worker_manager =
        WorkerManager::new(components.service.clone(), components.queue.clone());
    worker_manager.start_workers(settings.workers.count);
    let expiration = ExpirationWorker::new(components.cache.clone(), components.jobs.clone()).start();

    let server = ReviewMcpServer::new(components.service.clone())
        .serve(stdio())
        .await
        .inspect_err(|e| error!("serving error: {:?}", e))?;

    server.waiting().await?;

    expiration.abort();
    components.queue.close().await;
    worker_manager.shutdown().await;
    info!("MCP server stopped");
    Ok(())
}
