// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 后台执行排队的抓取作业，并定期清理过期缓存与作业
pub mod expiration_worker;
pub mod job_worker;
pub mod manager;
pub mod worker;

pub use worker::Worker;
