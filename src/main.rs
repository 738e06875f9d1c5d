// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use reviewrs::application::bootstrap;
use reviewrs::config::settings::Settings;
use reviewrs::infrastructure::observability::metrics;
use reviewrs::presentation::middleware::rate_limit_middleware::ApiRateLimiter;
use reviewrs::presentation::routes;
use reviewrs::utils::security::mask_sensitive_data;
use reviewrs::utils::telemetry;
use reviewrs::workers::expiration_worker::ExpirationWorker;
use reviewrs::workers::manager::WorkerManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting reviewrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    let masked = mask_sensitive_data(&serde_json::to_value(settings.as_ref())?);
    info!("Configuration loaded: {}", masked);

    // 3. Metrics exporter
    if settings.metrics.enabled {
        let address: SocketAddr = settings.metrics.address.parse()?;
        metrics::init_metrics(address)?;
    }

    // 4. Service, stores and queue
    let components = bootstrap::build_components(&settings).await;
    let service = components.service.clone();

    // 5. Start workers
    let mut worker_manager = WorkerManager::new(service.clone(), components.queue.clone());
    worker_manager.start_workers(settings.workers.count);
    let expiration = ExpirationWorker::new(components.cache.clone(), components.jobs.clone()).start();

    // 6. API rate limiter
    let api_limiter = ApiRateLimiter::new(
        settings.rate_limiting.api_requests_per_minute,
        settings.rate_limiting.api_burst,
    );
    let cleanup_limiter = api_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_limiter.retain_recent();
        }
    });

    // 7. Start HTTP server
    let app = routes::app(service, settings.clone(), api_limiter);

    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    expiration.abort();
    components.queue.close().await;
    worker_manager.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
