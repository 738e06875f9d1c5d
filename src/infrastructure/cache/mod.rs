// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 缓存模块
///
/// 包括Redis客户端与抓取结果缓存
pub mod redis_client;
pub mod result_cache;
