// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 包含的子模块：
/// - 缓存（cache）：Redis客户端与结果缓存
/// - 可观测性（observability）：Prometheus指标
/// - 平台（platforms）：Google Maps、Yelp、TripAdvisor客户端
/// - 仓库实现（repositories）：作业仓库的内存/Redis实现
/// - 服务实现（services）：滑动窗口限流器
///
/// 基础设施层依赖领域层的抽象接口，领域层保持纯粹的业务逻辑。
pub mod cache;
pub mod observability;
pub mod platforms;
pub mod repositories;
pub mod services;
