// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 作业保存在内存中，配置Redis时同步镜像
pub mod job_repo_impl;
