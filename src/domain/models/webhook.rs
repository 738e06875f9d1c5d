// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::models::job::{JobStatus, ScrapingJob};

/// 回调事件
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// 事件唯一标识符，随请求头发送，便于接收方去重
    pub id: Uuid,
    /// 事件类型，如 `job.completed`
    pub event_type: String,
    /// 回调地址
    pub webhook_url: String,
    /// 请求体
    pub payload: Value,
}

impl WebhookEvent {
    /// 为已结束的作业构造回调事件
    ///
    /// # 返回值
    ///
    /// * `Some(WebhookEvent)` - 作业已完成或失败且设置了回调地址
    /// * `None` - 无需通知
    pub fn for_finished_job(job: &ScrapingJob) -> Option<Self> {
        let webhook_url = job.webhook_url.clone()?;
        let event_type = match job.status {
            JobStatus::Completed => "job.completed",
            JobStatus::Failed => "job.failed",
            _ => return None,
        };

        Some(Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            webhook_url,
            payload: json!({
                "event": event_type,
                "job_id": job.id,
                "status": job.status.to_string(),
                "platform": job.platform,
                "business_name": job.business_name,
                "location": job.location,
                "url": job.url,
                "review_count": job.results.len(),
                "completed_at": job.completed_at,
                "error": job.error,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::JobTarget;

    fn job_with_webhook() -> ScrapingJob {
        ScrapingJob::new(
            JobTarget::Url("https://www.yelp.com/biz/social-house-orlando".to_string()),
            1,
        )
        .unwrap()
        .with_webhook_url(Some("https://hooks.example.com/reviews".to_string()))
    }

    #[test]
    fn test_event_for_completed_job() {
        let job = job_with_webhook().start().unwrap().complete(vec![]).unwrap();
        let event = WebhookEvent::for_finished_job(&job).unwrap();

        assert_eq!(event.event_type, "job.completed");
        assert_eq!(event.webhook_url, "https://hooks.example.com/reviews");
        assert_eq!(event.payload["job_id"], json!(job.id));
        assert_eq!(event.payload["status"], "completed");
        assert_eq!(event.payload["review_count"], 0);
    }

    #[test]
    fn test_no_event_without_url_or_before_finish() {
        let pending = job_with_webhook();
        assert!(WebhookEvent::for_finished_job(&pending).is_none());

        let cancelled = job_with_webhook().cancel().unwrap();
        assert!(WebhookEvent::for_finished_job(&cancelled).is_none());

        let failed = job_with_webhook().with_webhook_url(None).fail("boom").unwrap();
        assert!(WebhookEvent::for_finished_job(&failed).is_none());

        let failed = job_with_webhook().fail("boom").unwrap();
        assert_eq!(
            WebhookEvent::for_finished_job(&failed).unwrap().payload["error"],
            "boom"
        );
    }
}
