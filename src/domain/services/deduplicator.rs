// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::review::Review;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// 评论内容指纹：`"{author}:{text}"` 的SHA-256十六进制
pub fn fingerprint(review: &Review) -> String {
    let mut hasher = Sha256::new();
    hasher.update(review.author.as_bytes());
    hasher.update(b":");
    hasher.update(review.text.as_bytes());
    hex::encode(hasher.finalize())
}

/// 评论去重
///
/// 指纹相同的评论只保留第一次出现的那条，其余顺序不变
pub fn deduplicate_reviews(reviews: Vec<Review>) -> Vec<Review> {
    let mut seen = HashSet::with_capacity(reviews.len());
    reviews
        .into_iter()
        .filter(|review| seen.insert(fingerprint(review)))
        .collect()
}
