// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::models::webhook::WebhookEvent;
use crate::domain::services::webhook_service::WebhookService;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::security::sign_webhook_payload;

/// 回调请求超时
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
enum DeliveryError {
    /// 接收方明确拒绝（4xx），不再重试
    #[error("Webhook rejected with status {0}")]
    Rejected(StatusCode),
    #[error("Webhook delivery failed: {0}")]
    Failed(String),
}

/// 回调服务实现
///
/// 请求头携带 `X-Reviewrs-Signature`（对 `{timestamp}.{body}` 的HMAC-SHA256）、
/// `X-Reviewrs-Timestamp` 和 `X-Reviewrs-Event-ID`，网络错误和5xx按重试策略重发
pub struct WebhookServiceImpl {
    /// HTTP 客户端
    client: reqwest::Client,
    /// 签名密钥
    secret: String,
    retry_policy: RetryPolicy,
}

impl WebhookServiceImpl {
    /// 创建新的回调服务实现
    ///
    /// # 参数
    ///
    /// * `secret` - 签名密钥
    pub fn new(secret: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            secret,
            retry_policy: RetryPolicy::fast(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn post_once(&self, event: &WebhookEvent, body: &str) -> Result<(), DeliveryError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_webhook_payload(body, timestamp, &self.secret);

        let response = self
            .client
            .post(&event.webhook_url)
            .header("Content-Type", "application/json")
            .header("X-Reviewrs-Signature", signature)
            .header("X-Reviewrs-Timestamp", timestamp.to_string())
            .header("X-Reviewrs-Event-ID", event.id.to_string())
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(DeliveryError::Rejected(status))
        } else {
            Err(DeliveryError::Failed(format!("status {}", status)))
        }
    }
}

#[async_trait]
impl WebhookService for WebhookServiceImpl {
    async fn send_webhook(&self, event: &WebhookEvent) -> Result<()> {
        let body = serde_json::to_string(&event.payload)?;

        let result = self
            .retry_policy
            .run(
                "webhook delivery",
                |e: &DeliveryError| matches!(e, DeliveryError::Failed(_)),
                || self.post_once(event, &body),
            )
            .await;

        match result {
            Ok(()) => {
                info!("Delivered {} webhook {}", event.event_type, event.id);
                Ok(())
            }
            Err(e) => {
                warn!("Webhook {} to {} failed: {}", event.id, event.webhook_url, e);
                Err(e.into())
            }
        }
    }
}
