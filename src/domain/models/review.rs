// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::domain::models::job::DomainError;

/// 评分上限
pub const MAX_RATING: f64 = 5.0;

/// 支持的评论平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Google Maps
    Google,
    /// Yelp
    Yelp,
    /// TripAdvisor
    #[serde(rename = "tripadvisor")]
    TripAdvisor,
}

impl Platform {
    /// 所有受支持的平台
    pub const ALL: [Platform; 3] = [Platform::Yelp, Platform::Google, Platform::TripAdvisor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Google => "google",
            Platform::Yelp => "yelp",
            Platform::TripAdvisor => "tripadvisor",
        }
    }

    /// 根据URL的主机名判断所属平台
    pub fn from_url(url: &Url) -> Option<Platform> {
        let host = url.host_str()?.to_lowercase();
        if host.contains("yelp") {
            Some(Platform::Yelp)
        } else if host.contains("google") {
            Some(Platform::Google)
        } else if host.contains("tripadvisor") {
            Some(Platform::TripAdvisor)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Platform::Google),
            "yelp" => Ok(Platform::Yelp),
            "tripadvisor" => Ok(Platform::TripAdvisor),
            other => Err(DomainError::ValidationError(format!(
                "Invalid platform '{}'. Must be one of: yelp, google, tripadvisor",
                other
            ))),
        }
    }
}

/// 评论实体
///
/// 构造后不再修改；评分必须位于 [0, 5] 区间，反序列化时同样校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReview")]
pub struct Review {
    /// 评论正文
    pub text: String,
    /// 评分 (0.0-5.0)
    pub rating: f64,
    /// 日期（平台原样文本）
    pub date: String,
    /// 作者
    pub author: String,
    /// 来源平台
    pub platform: Platform,
    /// 评论所在页面URL
    pub url: String,
    /// 商家回复
    pub response: Option<String>,
}

#[derive(Deserialize)]
struct RawReview {
    text: String,
    rating: f64,
    date: String,
    author: String,
    platform: Platform,
    url: String,
    #[serde(default)]
    response: Option<String>,
}

impl TryFrom<RawReview> for Review {
    type Error = DomainError;

    fn try_from(raw: RawReview) -> Result<Self, Self::Error> {
        Review::new(
            raw.text,
            raw.rating,
            raw.date,
            raw.author,
            raw.platform,
            raw.url,
            raw.response,
        )
    }
}

impl Review {
    /// 创建评论，评分越界时返回验证错误
    pub fn new(
        text: impl Into<String>,
        rating: f64,
        date: impl Into<String>,
        author: impl Into<String>,
        platform: Platform,
        url: impl Into<String>,
        response: Option<String>,
    ) -> Result<Self, DomainError> {
        if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
            return Err(DomainError::ValidationError(format!(
                "rating {} outside [0, {}]",
                rating, MAX_RATING
            )));
        }

        Ok(Self {
            text: text.into(),
            rating,
            date: date.into(),
            author: author.into(),
            platform,
            url: url.into(),
            response,
        })
    }
}

/// 商家信息
///
/// 名称缺失即视为提取失败，由提取方返回 None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub url: String,
}
