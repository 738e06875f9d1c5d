// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 抓取服务（scraper_service）：作业生命周期与抓取流水线
/// - 去重（deduplicator）：按作者和正文指纹去重
/// - 限流（rate_limiting_service）：按域名的限流接口
/// - 回调（webhook_service）：作业结束通知的发送接口
pub mod deduplicator;
pub mod rate_limiting_service;
pub mod scraper_service;
pub mod webhook_service;
