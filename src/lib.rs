// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 请求DTO与输入校验
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 评论、作业等领域模型，抓取服务与仓库接口
pub mod domain;

/// 引擎模块
///
/// 基于无头浏览器的页面渲染
pub mod engines;

/// 基础设施模块
///
/// 平台客户端、缓存、限流、作业存储与指标
pub mod infrastructure;

/// 表示层模块
///
/// HTTP路由、处理器、中间件与MCP工具服务
pub mod presentation;

/// 队列模块
///
/// 作业队列
pub mod queue;

/// 工具模块
///
/// 错误类型、重试、robots.txt、安全校验与日志
pub mod utils;

/// 工作器模块
///
/// 后台作业执行与worker管理
pub mod workers;
