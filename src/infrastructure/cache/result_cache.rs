// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::infrastructure::cache::redis_client::RedisClient;

/// 缓存条目
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

/// 抓取结果缓存
///
/// 内存中保存带时间戳的JSON负载，读取时惰性淘汰过期条目。
/// 配置了Redis时以 `cache:{key}` 镜像写入，内存未命中时回退读取Redis。
pub struct ResultCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
    redis: Option<Arc<RedisClient>>,
}

impl ResultCache {
    /// 创建新的结果缓存
    ///
    /// # 参数
    ///
    /// * `ttl` - 条目存活时间
    /// * `redis` - 可选的共享缓存
    pub fn new(ttl: Duration, redis: Option<Arc<RedisClient>>) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            redis,
        }
    }

    /// 由请求参数生成缓存键
    ///
    /// 参数按名称排序后拼成 `k=v&k=v`，取SHA-256十六进制的前16位，
    /// 因此与参数传入顺序无关
    pub fn generate_key<K, V>(params: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: Into<String>,
        V: ToString,
    {
        let sorted: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        let canonical = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        digest[..16].to_string()
    }

    fn redis_key(key: &str) -> String {
        format!("cache:{}", key)
    }

    /// 读取缓存值，过期返回None并淘汰
    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if now.duration_since(entry.stored_at) <= self.ttl {
                return Some(entry.payload.clone());
            }
        }
        if self
            .entries
            .remove_if(key, |_, entry| now.duration_since(entry.stored_at) > self.ttl)
            .is_some()
        {
            debug!("Evicted expired cache entry {}", key);
        }

        let redis = self.redis.as_ref()?;
        match redis.get(&Self::redis_key(key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(payload) => {
                    // Redis expiry is authoritative, the local copy restarts its own clock
                    self.entries.insert(
                        key.to_string(),
                        CacheEntry {
                            payload: payload.clone(),
                            stored_at: Instant::now(),
                        },
                    );
                    Some(payload)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read cache entry from Redis: {}", e);
                None
            }
        }
    }

    /// 写入缓存值，覆盖旧值并重置存活时间
    pub async fn set(&self, key: &str, value: Value) {
        if let Some(ref redis) = self.redis {
            match serde_json::to_string(&value) {
                Ok(raw) => {
                    if let Err(e) = redis
                        .set(&Self::redis_key(key), &raw, self.ttl.as_secs())
                        .await
                    {
                        warn!("Failed to write cache entry to Redis: {}", e);
                    }
                }
                Err(e) => warn!("Failed to encode cache entry {}: {}", key, e),
            }
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: value,
                stored_at: Instant::now(),
            },
        );
    }

    /// 读取并反序列化为指定类型
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Cache entry {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// 序列化后写入
    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value).await,
            Err(e) => warn!("Failed to encode cache entry {}: {}", key, e),
        }
    }

    /// 删除单个条目
    pub async fn invalidate(&self, key: &str) {
        self.entries.remove(key);
        if let Some(ref redis) = self.redis {
            if let Err(e) = redis.delete(&Self::redis_key(key)).await {
                warn!("Failed to delete cache entry from Redis: {}", e);
            }
        }
    }

    /// 批量清理过期条目
    ///
    /// # 返回值
    ///
    /// 被清理的条目数
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.stored_at) <= self.ttl);
        before.saturating_sub(self.entries.len())
    }

    /// 内存中的条目数（含尚未淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
