// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 入口安全校验
//!
//! HTTP与MCP入口在调用抓取服务前使用这里的函数校验URL和文本输入

use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::Sha256;
use url::Url;

use crate::domain::models::review::Platform;
use crate::utils::errors::ScraperError;

type HmacSha256 = Hmac<Sha256>;

/// URL最大长度
pub const MAX_URL_LENGTH: usize = 2048;

/// 文本输入默认最大长度
pub const MAX_INPUT_LENGTH: usize = 1000;

/// 允许抓取的域名（含其子域名）
pub const ALLOWED_DOMAINS: &[&str] = &[
    "yelp.com",
    "www.yelp.com",
    "google.com",
    "www.google.com",
    "maps.google.com",
    "tripadvisor.com",
    "www.tripadvisor.com",
];

static BLOCKED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^.*\.(exe|dll|bat|cmd|sh|ps1)$",
        r"^.*/(admin|login|auth|api-key|token).*",
        r"^.*\.(zip|tar|gz|rar|7z)$",
        r"^file://.*",
        r"^.*localhost.*",
        r"^.*127\.0\.0\.1.*",
        r"^.*::1.*",
        r"^.*\.(onion|i2p)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static blocked pattern"))
    .collect()
});

const SQL_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "union", "exec", "script",
];

const XSS_PATTERNS: &[&str] = &["<script", "javascript:", "onerror=", "onclick=", "alert("];

const SENSITIVE_FIELDS: &[&str] = &[
    "password", "token", "api_key", "secret", "auth", "cookie", "session",
];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static tag pattern"));

static PII_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b", "[CARD]"),
        (r"\b\d{3}-\d{2}-\d{4}\b", "[SSN]"),
        (r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", "[EMAIL]"),
        (r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b", "[PHONE]"),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).expect("static pii pattern"), *r))
    .collect()
});

/// 校验进入系统的URL
///
/// 依次检查长度、协议、域名白名单、屏蔽模式、SQL关键字和XSS片段
///
/// # 返回值
///
/// * `Ok(Url)` - 解析后的URL
/// * `Err(ScraperError::InvalidUrl)` - 任一检查未通过
pub fn validate_url(raw: &str) -> Result<Url, ScraperError> {
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return Err(ScraperError::InvalidUrl("Invalid URL length".to_string()));
    }

    let url = Url::parse(raw)
        .map_err(|_| ScraperError::InvalidUrl(format!("Invalid URL format: {}", raw)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScraperError::InvalidUrl(
            "Only HTTP/HTTPS URLs are allowed".to_string(),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ScraperError::InvalidUrl(format!("URL has no host: {}", raw)))?
        .to_lowercase();
    if !is_allowed_domain(&host) || url.port().is_some() {
        return Err(ScraperError::InvalidUrl(format!(
            "Domain {} is not in the allowed list",
            host
        )));
    }

    let lower = raw.to_lowercase();
    if BLOCKED_PATTERNS.iter().any(|re| re.is_match(&lower)) {
        return Err(ScraperError::InvalidUrl(
            "URL matches blocked pattern".to_string(),
        ));
    }

    if SQL_KEYWORDS.iter().any(|kw| {
        lower.contains(&format!(" {} ", kw)) || lower.contains(&format!("%20{}%20", kw))
    }) {
        return Err(ScraperError::InvalidUrl(
            "Potential SQL injection detected".to_string(),
        ));
    }

    if XSS_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(ScraperError::InvalidUrl(
            "Potential XSS attack detected".to_string(),
        ));
    }

    Ok(url)
}

/// 校验作业回调地址
///
/// 回调地址指向调用方自己的服务，不受平台域名白名单约束，
/// 其余检查与 `validate_url` 相同，本机地址同样被屏蔽
pub fn validate_webhook_url(raw: &str) -> Result<Url, ScraperError> {
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return Err(ScraperError::InvalidUrl("Invalid webhook URL length".to_string()));
    }

    let url = Url::parse(raw)
        .map_err(|_| ScraperError::InvalidUrl(format!("Invalid webhook URL format: {}", raw)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScraperError::InvalidUrl(
            "Only HTTP/HTTPS webhook URLs are allowed".to_string(),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ScraperError::InvalidUrl(format!("Webhook URL has no host: {}", raw)));
    }

    let lower = raw.to_lowercase();
    if BLOCKED_PATTERNS.iter().any(|re| re.is_match(&lower))
        || XSS_PATTERNS.iter().any(|p| lower.contains(p))
    {
        return Err(ScraperError::InvalidUrl(
            "Webhook URL matches blocked pattern".to_string(),
        ));
    }

    Ok(url)
}

/// 域名是否在白名单内（含子域名）
pub fn is_allowed_domain(host: &str) -> bool {
    ALLOWED_DOMAINS
        .iter()
        .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
}

/// 清理用户输入文本
///
/// 截断到 `max_length` 个字符，去掉除换行外的控制字符和HTML标签。
/// 结果只以JSON形式输出，转义交给序列化层。
pub fn sanitize_input(text: &str, max_length: usize) -> String {
    let truncated: String = text
        .chars()
        .take(max_length)
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    TAG_RE.replace_all(&truncated, "").trim().to_string()
}

/// 校验平台名称
pub fn validate_platform(platform: &str) -> Result<Platform, ScraperError> {
    platform
        .parse::<Platform>()
        .map_err(|e| ScraperError::UnsupportedPlatform(e.to_string()))
}

/// 生成作业访问令牌，格式 `job:{id}:{nonce}:{signature}`
pub fn generate_job_token(job_id: &str, secret_key: &str) -> String {
    let nonce = hex::encode(rand::random::<[u8; 8]>());
    let message = format!("job:{}:{}", job_id, nonce);
    format!("{}:{}", message, sign(&message, secret_key))
}

/// 校验作业访问令牌
pub fn verify_job_token(token: &str, job_id: &str, secret_key: &str) -> bool {
    let parts: Vec<&str> = token.split(':').collect();
    let [kind, token_job_id, nonce, signature] = parts.as_slice() else {
        return false;
    };
    if *kind != "job" || *token_job_id != job_id {
        return false;
    }

    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret_key.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}:{}:{}", kind, token_job_id, nonce).as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// 回调请求签名：对 `{timestamp}.{payload}` 计算HMAC-SHA256
pub fn sign_webhook_payload(payload: &str, timestamp: i64, secret_key: &str) -> String {
    sign(&format!("{}.{}", timestamp, payload), secret_key)
}

fn sign(message: &str, secret_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// 递归遮盖JSON中的敏感字段，保留首尾各两个字符
pub fn mask_sensitive_data(data: &Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let key_lower = key.to_lowercase();
                    let sensitive = SENSITIVE_FIELDS.iter().any(|f| key_lower.contains(f));
                    let masked = match value {
                        Value::String(s) if sensitive => Value::String(mask_string(s)),
                        other => mask_sensitive_data(other),
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive_data).collect()),
        other => other.clone(),
    }
}

fn mask_string(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 4 {
        let head: String = chars[..2].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
    } else {
        "*".repeat(chars.len())
    }
}

/// 遮盖评论文本中的邮箱、电话、SSN和卡号
pub fn anonymize_pii(text: &str) -> String {
    PII_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}
