// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// 队列错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    /// 消费端已关闭
    #[error("Job queue closed")]
    Closed,
}

/// 作业队列特质
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 入队作业ID，队列满时等待
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// 出队作业ID，所有发送端关闭且队列为空时返回None
    async fn dequeue(&self) -> Option<Uuid>;
}

/// 基于tokio mpsc的进程内队列
///
/// 接收端放在互斥锁后，多个worker可共享同一个队列
pub struct InMemoryJobQueue {
    sender: mpsc::Sender<Uuid>,
    receiver: Mutex<mpsc::Receiver<Uuid>>,
}

impl InMemoryJobQueue {
    /// 创建新的进程内队列
    ///
    /// # 参数
    ///
    /// * `capacity` - 队列容量
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// 关闭接收端，之后的入队返回错误，已入队的仍可取出
    pub async fn close(&self) {
        self.receiver.lock().await.close();
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.sender.send(job_id).await.map_err(|_| QueueError::Closed)
    }

    async fn dequeue(&self) -> Option<Uuid> {
        self.receiver.lock().await.recv().await
    }
}
