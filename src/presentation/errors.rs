// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::utils::errors::ScraperError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    /// 对应的HTTP状态码
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<ScraperError>() {
            Some(err) => status_for(err),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 抓取错误到HTTP状态码的映射
pub fn status_for(err: &ScraperError) -> StatusCode {
    match err {
        ScraperError::InvalidUrl(_)
        | ScraperError::InvalidRequest(_)
        | ScraperError::UnsupportedPlatform(_) => StatusCode::BAD_REQUEST,
        ScraperError::JobNotFound(_) | ScraperError::BusinessNotFound(_) => StatusCode::NOT_FOUND,
        ScraperError::InvalidJobState(_) => StatusCode::CONFLICT,
        ScraperError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        ScraperError::RobotsDisallowed(_) => StatusCode::FORBIDDEN,
        ScraperError::Scraping(_) | ScraperError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = self.0.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", error_message);
        }

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
