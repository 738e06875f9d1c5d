// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 平台客户端实现
///
/// 解析函数均为纯函数（HTML输入，记录输出），以固定HTML快照测试
pub mod base;
pub mod factory;
pub mod google;
pub mod selectors;
pub mod tripadvisor;
pub mod yelp;
