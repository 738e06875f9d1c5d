// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// MCP工具服务
pub mod review_server;

pub use review_server::ReviewMcpServer;
