// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 作业创建后只把ID放入队列，由后台worker取出执行
pub mod job_queue;
