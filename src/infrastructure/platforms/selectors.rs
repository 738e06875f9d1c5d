// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 平台选择器集合与通用解析
//!
//! 每个字段给出若干备选选择器，按顺序尝试，第一个有结果的生效。
//! 页面结构变化时新增一个版本号不同的集合，并用新的HTML快照补测试。

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::models::review::{BusinessInfo, Platform, Review, MAX_RATING};
use crate::utils::security::anonymize_pii;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("static number pattern"));

static COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d,.\s]*)").expect("static count pattern"));

static BUBBLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bubble_(\d{2})").expect("static bubble pattern"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?\+?\d[\d\s().-]{7,}\d").expect("static phone pattern")
});

/// 选择器定义（字符串形式）
pub struct SelectorSpec {
    pub version: &'static str,
    pub review_container: &'static [&'static str],
    pub review_text: &'static [&'static str],
    pub review_author: &'static [&'static str],
    pub review_rating: &'static [&'static str],
    pub review_date: &'static [&'static str],
    pub review_response: &'static [&'static str],
    pub business_name: &'static [&'static str],
    pub business_address: &'static [&'static str],
    pub business_phone: &'static [&'static str],
    pub business_rating: &'static [&'static str],
    pub business_review_count: &'static [&'static str],
    pub business_categories: &'static [&'static str],
    pub search_result: &'static [&'static str],
}

/// 编译后的选择器集合
pub struct SelectorSet {
    pub platform: Platform,
    pub version: &'static str,
    review_container: Vec<Selector>,
    review_text: Vec<Selector>,
    review_author: Vec<Selector>,
    review_rating: Vec<Selector>,
    review_date: Vec<Selector>,
    review_response: Vec<Selector>,
    business_name: Vec<Selector>,
    business_address: Vec<Selector>,
    business_phone: Vec<Selector>,
    business_rating: Vec<Selector>,
    business_review_count: Vec<Selector>,
    business_categories: Vec<Selector>,
    search_result: Vec<Selector>,
}

fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).unwrap_or_else(|e| panic!("invalid selector {}: {:?}", s, e)))
        .collect()
}

impl SelectorSet {
    /// 编译选择器定义，定义写死在代码中，非法选择器直接panic
    pub fn compile(platform: Platform, spec: &SelectorSpec) -> Self {
        Self {
            platform,
            version: spec.version,
            review_container: compile(spec.review_container),
            review_text: compile(spec.review_text),
            review_author: compile(spec.review_author),
            review_rating: compile(spec.review_rating),
            review_date: compile(spec.review_date),
            review_response: compile(spec.review_response),
            business_name: compile(spec.business_name),
            business_address: compile(spec.business_address),
            business_phone: compile(spec.business_phone),
            business_rating: compile(spec.business_rating),
            business_review_count: compile(spec.business_review_count),
            business_categories: compile(spec.business_categories),
            search_result: compile(spec.search_result),
        }
    }

    /// 评论容器的主选择器（用于等待与滚动计数）
    pub fn primary_review_selector(spec: &SelectorSpec) -> &'static str {
        spec.review_container.first().copied().unwrap_or("body")
    }
}

/// 合并空白
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

/// 按备选顺序取所有匹配元素
pub fn select_all<'a>(root: ElementRef<'a>, alternatives: &[Selector]) -> Vec<ElementRef<'a>> {
    for selector in alternatives {
        let found: Vec<_> = root.select(selector).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// 第一个匹配元素
pub fn first_element<'a>(root: ElementRef<'a>, alternatives: &[Selector]) -> Option<ElementRef<'a>> {
    alternatives
        .iter()
        .find_map(|selector| root.select(selector).next())
}

/// 第一个非空文本
pub fn first_text(root: ElementRef, alternatives: &[Selector]) -> Option<String> {
    alternatives.iter().find_map(|selector| {
        root.select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// 文本中的第一个数字
pub fn parse_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// 解析 "1,842 reviews"、"(312)" 之类的计数
pub fn parse_count(text: &str) -> Option<u32> {
    COUNT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse().ok())
}

/// 从评分元素读取评分
///
/// 依次尝试 aria-label、title、`bubble_45` 形式的类名和元素文本
pub fn parse_rating(element: ElementRef) -> Option<f64> {
    let value = element.value();
    let from_attr = ["aria-label", "title"]
        .iter()
        .filter_map(|attr| value.attr(attr))
        .find_map(parse_number);

    let rating = from_attr
        .or_else(|| {
            value.classes().find_map(|class| {
                BUBBLE_RE
                    .captures(class)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .map(|n| n / 10.0)
            })
        })
        .or_else(|| parse_number(&element_text(element)))?;

    (0.0..=MAX_RATING).contains(&rating).then_some(rating)
}

/// 解析评论列表
///
/// 缺少评分或评分越界的条目被跳过，不影响其余条目
pub fn parse_reviews(html: &str, page_url: &str, set: &SelectorSet) -> Vec<Review> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let containers = select_all(root, &set.review_container);

    let mut reviews = Vec::with_capacity(containers.len());
    for (index, container) in containers.into_iter().enumerate() {
        let Some(rating) = first_element(container, &set.review_rating).and_then(parse_rating)
        else {
            debug!(
                "Skipping {} review #{}: no rating (selectors {})",
                set.platform, index, set.version
            );
            continue;
        };

        let text = first_text(container, &set.review_text).unwrap_or_default();
        let author = first_text(container, &set.review_author).unwrap_or_else(|| "Anonymous".to_string());
        let date = first_text(container, &set.review_date).unwrap_or_default();
        let response = first_text(container, &set.review_response).map(|r| anonymize_pii(&r));

        match Review::new(
            anonymize_pii(&text),
            rating,
            date,
            author,
            set.platform,
            page_url,
            response,
        ) {
            Ok(review) => reviews.push(review),
            Err(e) => debug!("Skipping {} review #{}: {}", set.platform, index, e),
        }
    }
    reviews
}

/// 解析商家信息，找不到名称时返回None
pub fn parse_business_info(html: &str, page_url: &str, set: &SelectorSet) -> Option<BusinessInfo> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let name = first_text(root, &set.business_name)?;

    let rating = first_element(root, &set.business_rating).and_then(parse_rating);
    let review_count = first_element(root, &set.business_review_count).and_then(|el| {
        el.value()
            .attr("aria-label")
            .and_then(parse_count)
            .or_else(|| parse_count(&element_text(el)))
    });
    let phone = first_text(root, &set.business_phone).and_then(|text| {
        PHONE_RE
            .find(&text)
            .map(|m| m.as_str().trim().to_string())
    });

    let mut categories: Vec<String> = Vec::new();
    for element in select_all(root, &set.business_categories) {
        let category = element_text(element);
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }

    Some(BusinessInfo {
        name,
        address: first_text(root, &set.business_address),
        phone,
        rating,
        review_count,
        categories,
        url: page_url.to_string(),
    })
}

/// 解析搜索结果页中第一个商家链接，返回绝对URL
pub fn parse_search_result(html: &str, base: &str, set: &SelectorSet) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base).ok()?;

    set.search_result.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| !href.contains("adredir"))
            .find_map(|href| base.join(href).ok())
            .map(|url| url.to_string())
    })
}
