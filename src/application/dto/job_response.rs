// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::job::{JobStatus, ScrapingJob};
use crate::utils::security::generate_job_token;

/// 作业创建响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedResponseDto {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    /// 查询结果时可携带的访问令牌
    pub access_token: String,
}

impl JobCreatedResponseDto {
    pub fn new(job: &ScrapingJob, secret_key: &str) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            message: "Scraping job created and queued".to_string(),
            access_token: generate_job_token(&job.id.to_string(), secret_key),
        }
    }
}

/// 作业取消响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCancelledResponseDto {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// 结果查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobResultsQueryDto {
    /// 可选的访问令牌，提供时必须有效
    pub token: Option<String>,
}
