// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::WebhookEvent;
use anyhow::Result;
use async_trait::async_trait;

/// 回调服务特质
///
/// 作业完成或失败后，抓取服务通过它通知调用方
#[async_trait]
pub trait WebhookService: Send + Sync {
    /// 发送回调事件
    ///
    /// # 参数
    ///
    /// * `event` - 回调事件
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 接收方返回2xx
    /// * `Err(anyhow::Error)` - 重试后仍发送失败
    async fn send_webhook(&self, event: &WebhookEvent) -> Result<()>;
}
