// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 作业（job）：抓取作业及其状态机
/// - 评论（review）：评论、商家信息与平台枚举
/// - 回调（webhook）：作业结束通知
pub mod job;
pub mod review;
pub mod webhook;
