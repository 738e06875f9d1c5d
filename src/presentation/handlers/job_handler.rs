// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::dto::job_request::CreateJobRequestDto;
use crate::application::dto::job_response::{
    JobCancelledResponseDto, JobCreatedResponseDto, JobResultsQueryDto,
};
use crate::config::settings::Settings;
use crate::domain::models::job::JobStatus;
use crate::domain::services::scraper_service::ScraperService;
use crate::presentation::errors::AppError;
use crate::utils::errors::ScraperError;
use crate::utils::security::verify_job_token;

/// 创建抓取作业
///
/// 作业入队后立即返回202，由后台worker执行
pub async fn create_job(
    Extension(service): Extension<Arc<ScraperService>>,
    Extension(settings): Extension<Arc<Settings>>,
    Json(payload): Json<CreateJobRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.into_job_request()?;
    let job = service.submit_job(request).await?;
    info!("Job {} accepted", job.id);

    let body = JobCreatedResponseDto::new(&job, &settings.security.secret_key);
    Ok((StatusCode::ACCEPTED, Json(body)))
}

/// 查询作业详情
pub async fn get_job(
    Extension(service): Extension<Arc<ScraperService>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = service.get_job_status(id).await?;
    Ok(Json(job))
}

/// 获取作业结果
///
/// 携带 `token` 查询参数时必须是该作业的有效令牌
pub async fn get_job_results(
    Extension(service): Extension<Arc<ScraperService>>,
    Extension(settings): Extension<Arc<Settings>>,
    Path(id): Path<Uuid>,
    Query(query): Query<JobResultsQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = query.token.as_deref() {
        if !verify_job_token(token, &id.to_string(), &settings.security.secret_key) {
            warn!("Invalid access token presented for job {}", id);
            return Err(ScraperError::InvalidRequest("Invalid access token".to_string()).into());
        }
    }

    let reviews = service.get_job_results(id).await?;
    Ok(Json(reviews))
}

/// 取消作业
pub async fn cancel_job(
    Extension(service): Extension<Arc<ScraperService>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !service.cancel_job(id).await? {
        let job = service.get_job_status(id).await?;
        return Err(ScraperError::InvalidJobState(format!(
            "Job {} is {} and cannot be cancelled",
            id, job.status
        ))
        .into());
    }

    Ok(Json(JobCancelledResponseDto {
        job_id: id,
        status: JobStatus::Cancelled,
        message: "Job cancelled".to_string(),
    }))
}
