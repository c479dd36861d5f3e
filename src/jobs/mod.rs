//! 训练任务跟踪
//!
//! 任务在 launch 工具成功时创建，之后只被状态轮询结果修改；completed / failed 为终态。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// 后端状态字符串映射（大小写不敏感）；无法识别返回 None
    pub fn from_backend(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "queued" | "created" => Some(JobStatus::Queued),
            "starting" | "inprogress" | "in_progress" | "running" | "training" | "downloading" | "uploading"
            | "stopping" => Some(JobStatus::Running),
            "completed" | "succeeded" => Some(JobStatus::Completed),
            "failed" | "stopped" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub session_id: String,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    pub cost_so_far: f64,
    /// 发起时的参数快照
    pub config: Value,
    pub metrics: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct JobTracker {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 launch 工具的成功结果创建任务；结果中没有 job_id 时返回 None
    pub async fn launch(&self, session_id: &str, params: &Value, payload: &Value) -> Option<Job> {
        let id = payload.get("job_id").and_then(Value::as_str)?.to_string();
        let status = match payload.get("status").and_then(Value::as_str).and_then(JobStatus::from_backend) {
            Some(JobStatus::Running) => JobStatus::Running,
            _ => JobStatus::Queued,
        };
        let now = Utc::now();
        let job = Job {
            id: id.clone(),
            session_id: session_id.to_string(),
            status,
            progress: 0,
            cost_so_far: 0.0,
            config: params.clone(),
            metrics: Map::new(),
            created_at: now,
            updated_at: now,
        };
        tracing::info!(job = %id, session = session_id, status = ?status, "training job launched");
        self.jobs.write().await.insert(id, job.clone());
        Some(job)
    }

    /// 应用一次状态轮询结果；未知任务或终态任务不变更，返回当前快照
    pub async fn apply_status(&self, payload: &Value) -> Option<Job> {
        let id = payload.get("job_id").and_then(Value::as_str)?;
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id)?;
        if job.status.is_terminal() {
            return Some(job.clone());
        }
        if let Some(status) = payload.get("status").and_then(Value::as_str).and_then(JobStatus::from_backend) {
            job.status = status;
        }
        if let Some(p) = payload.get("progress").and_then(Value::as_f64) {
            job.progress = p.clamp(0.0, 100.0).round() as u8;
        }
        if job.status == JobStatus::Completed {
            job.progress = 100;
        }
        if let Some(c) = payload.get("cost_so_far").and_then(Value::as_f64) {
            job.cost_so_far = job.cost_so_far.max(c);
        }
        if let Some(Value::Object(m)) = payload.get("metrics") {
            for (k, v) in m {
                job.metrics.insert(k.clone(), v.clone());
            }
        }
        job.updated_at = Utc::now();
        Some(job.clone())
    }

    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// 会话内任务，按创建时间升序
    pub async fn list_for_session(&self, session_id: &str) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.session_id == session_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_job_lifecycle() {
        let t = JobTracker::new();
        let job = t
            .launch("s1", &json!({"model_name": "bert"}), &json!({"success": true, "job_id": "j1", "status": "Starting"}))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.config["model_name"], "bert");

        let j = t.apply_status(&json!({"job_id": "j1", "status": "InProgress", "progress": 140, "cost_so_far": 1.0})).await.unwrap();
        assert_eq!(j.progress, 100);
        assert_eq!(j.cost_so_far, 1.0);

        let j = t.apply_status(&json!({"job_id": "j1", "cost_so_far": 0.5, "progress": -3})).await.unwrap();
        assert_eq!(j.cost_so_far, 1.0);
        assert_eq!(j.progress, 0);

        let j = t
            .apply_status(&json!({"job_id": "j1", "status": "Completed", "metrics": {"f1": 0.9}}))
            .await
            .unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        assert_eq!(j.progress, 100);

        let j = t.apply_status(&json!({"job_id": "j1", "status": "Failed"})).await.unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        assert_eq!(j.metrics["f1"], 0.9);

        assert_eq!(t.list_for_session("s1").await.len(), 1);
        assert!(t.list_for_session("s2").await.is_empty());
    }

    #[tokio::test]
    async fn test_launch_without_job_id() {
        let t = JobTracker::new();
        assert!(t.launch("s1", &json!({}), &json!({"success": true})).await.is_none());
        assert!(t.apply_status(&json!({"job_id": "nope"})).await.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(JobStatus::from_backend("Stopped"), Some(JobStatus::Failed));
        assert_eq!(JobStatus::from_backend("PENDING"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::from_backend("weird"), None);
    }
}
