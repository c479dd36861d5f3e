//! 沙箱后端：进程内模拟的 LLMOps 工具实现（轻量本地模式）
//!
//! 结果是确定性的，训练任务每被轮询一次进度前进 25%。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::gateway::LocalBackend;

const DATASETS: &[(&str, f64, &str)] = &[
    ("cier", 12.4, "raw"),
    ("conll2003", 3.1, "prepared"),
    ("wikiann-en", 28.0, "raw"),
];

const INSTANCES: &[(&str, f64, u32)] = &[
    ("ml.g4dn.xlarge", 0.736, 2),
    ("ml.g5.xlarge", 1.408, 1),
    ("ml.p3.2xlarge", 3.825, 0),
];

/// (model, f1, cost_usd, hours)
const MODELS: &[(&str, f64, f64, f64)] = &[
    ("distilbert-base-cased", 0.87, 1.50, 1.0),
    ("bert-base-cased", 0.90, 2.90, 2.0),
    ("roberta-large", 0.93, 5.00, 3.5),
];

#[derive(Default)]
struct SandboxJob {
    polls: u32,
    cost_per_poll: f64,
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// 构造预置六个工具模拟实现的 LocalBackend
pub fn sandbox_backend() -> LocalBackend {
    let jobs: Arc<Mutex<HashMap<String, SandboxJob>>> = Arc::new(Mutex::new(HashMap::new()));
    let launch_jobs = Arc::clone(&jobs);
    let status_jobs = Arc::clone(&jobs);

    LocalBackend::new()
        .with_fn("llmops-tool-list-datasets", |params| {
            let prefix = str_param(&params, "prefix").unwrap_or("");
            let datasets: Vec<Value> = DATASETS
                .iter()
                .filter(|(name, _, _)| name.starts_with(prefix))
                .map(|(name, size, status)| json!({"name": name, "size_mb": size, "status": status}))
                .collect();
            Ok(json!({"success": true, "count": datasets.len(), "datasets": datasets}))
        })
        .with_fn("llmops-tool-check-sagemaker-quotas", |params| {
            let wanted: Option<Vec<String>> = params
                .get("instance_types")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect());
            let instances: Vec<Value> = INSTANCES
                .iter()
                .filter(|(name, _, _)| wanted.as_ref().map_or(true, |w| w.iter().any(|x| x == name)))
                .map(|(name, cost, available)| {
                    json!({"instance_type": name, "cost_per_hour": cost, "available": available, "quota": 2})
                })
                .collect();
            Ok(json!({"success": true, "instances": instances}))
        })
        .with_fn("llmops-tool-select-model", |params| {
            let task = str_param(&params, "task_type").unwrap_or("token-classification");
            if task != "token-classification" && task != "ner" {
                return Err(format!("ValidationException: unsupported task_type {task}"));
            }
            let candidates: Vec<Value> = MODELS
                .iter()
                .map(|(model, f1, cost, hours)| {
                    json!({"model_name": model, "f1": f1, "cost": cost, "time_hours": hours})
                })
                .collect();
            Ok(json!({"success": true, "task_type": task, "candidates": candidates}))
        })
        .with_fn("llmops-tool-prepare-dataset", |params| {
            let name = str_param(&params, "dataset_name").unwrap_or("");
            let found = DATASETS.iter().find(|(n, _, _)| *n == name);
            let Some((_, _, status)) = found else {
                return Err(format!("ResourceNotFoundException: dataset {name} not found"));
            };
            let force = params.get("force_prepare").and_then(Value::as_bool).unwrap_or(false);
            Ok(json!({
                "success": true,
                "dataset_path": format!("s3://llmops-datasets/processed/{name}/"),
                "skipped": *status == "prepared" && !force,
            }))
        })
        .with_fn("llmops-tool-launch-training", move |params| {
            let cost = params.get("estimated_cost_usd").and_then(Value::as_f64).unwrap_or(0.0);
            let instance = str_param(&params, "instance_type").unwrap_or("ml.g4dn.xlarge");
            if let Some((_, _, 0)) = INSTANCES.iter().find(|(n, _, _)| *n == instance) {
                return Err(format!("ResourceLimitExceeded: no capacity left for {instance}"));
            }
            let job_id = format!("train-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
            let mut jobs = launch_jobs.lock().map_err(|e| e.to_string())?;
            jobs.insert(
                job_id.clone(),
                SandboxJob {
                    polls: 0,
                    cost_per_poll: cost / 4.0,
                },
            );
            Ok(json!({"success": true, "job_id": job_id, "status": "Starting", "instance_type": instance}))
        })
        .with_fn("llmops-tool-job-status", move |params| {
            let job_id = str_param(&params, "job_id").unwrap_or("");
            let mut jobs = status_jobs.lock().map_err(|e| e.to_string())?;
            let Some(job) = jobs.get_mut(job_id) else {
                return Err(format!("ResourceNotFoundException: job {job_id} not found"));
            };
            job.polls = (job.polls + 1).min(4);
            let progress = job.polls * 25;
            let mut out = json!({
                "success": true,
                "job_id": job_id,
                "status": if progress >= 100 { "Completed" } else { "InProgress" },
                "progress": progress,
                "cost_so_far": job.cost_per_poll * f64::from(job.polls),
            });
            if progress >= 100 {
                out["metrics"] = json!({"f1": 0.88, "precision": 0.89, "recall": 0.87});
            }
            Ok(out)
        })
}
