// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Query, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::application::dto::scrape_request::ExtractQueryDto;
use crate::domain::services::scraper_service::ScraperService;
use crate::presentation::errors::AppError;
use crate::utils::errors::ScraperError;

/// 提取商家信息，找不到商家名称时返回404
pub async fn extract(
    Extension(service): Extension<Arc<ScraperService>>,
    Query(query): Query<ExtractQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    let url = query.checked()?;
    match service.extract_business_info(&url).await? {
        Some(info) => Ok(Json(info)),
        None => Err(ScraperError::BusinessNotFound(url).into()),
    }
}
