// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 渲染引擎模块
///
/// - traits：渲染器接口与错误类型
/// - browser_engine：基于chromiumoxide的实现
pub mod browser_engine;
pub mod traits;
