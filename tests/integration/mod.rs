// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

mod api_test;
mod health_check;
mod helpers;
mod job_workflow_test;
mod platform_client_test;
