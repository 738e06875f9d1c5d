// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{extract::Query, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::application::dto::scrape_request::ScrapeQueryDto;
use crate::domain::services::scraper_service::ScraperService;
use crate::presentation::errors::AppError;

/// 同步抓取单个URL的评论
pub async fn scrape(
    Extension(service): Extension<Arc<ScraperService>>,
    Query(query): Query<ScrapeQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    let (url, max_pages) = query.checked()?;
    let reviews = service.scrape_reviews(&url, max_pages).await?;
    Ok(Json(reviews))
}
