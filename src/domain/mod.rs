// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：作业、评论、商家信息
/// - 平台接口（platforms）：各评论平台客户端的抽象
/// - 仓库接口（repositories）：作业持久化抽象接口
/// - 服务（services）：抓取编排、去重和限流
pub mod models;
pub mod platforms;
pub mod repositories;
pub mod services;
