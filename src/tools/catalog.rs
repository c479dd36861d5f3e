//! 默认工具目录：数据发现、配额查询、模型选择、数据准备、训练发布、任务轮询
//!
//! 调用目标为后端函数名；direct 模式下由 HttpBackend 拼到 backend_url 之后。

use crate::tools::{ParamKind, ParamSpec, ToolDescriptor, ToolEffect, ToolRegistry};

pub const LIST_DATASETS: &str = "list_datasets";
pub const CHECK_INSTANCE_QUOTAS: &str = "check_instance_quotas";
pub const SELECT_MODEL: &str = "select_model";
pub const PREPARE_DATASET: &str = "prepare_dataset";
pub const LAUNCH_TRAINING_JOB: &str = "launch_training_job";
pub const GET_TRAINING_JOB_STATUS: &str = "get_training_job_status";

/// 训练发布工具中表示预估费用的参数名
pub const COST_PARAM: &str = "estimated_cost_usd";

pub fn default_registry() -> ToolRegistry {
    [
        ToolDescriptor::new(
            LIST_DATASETS,
            "llmops-tool-list-datasets",
            "List all datasets available in the dataset bucket. Returns name, size and preparation status for each.",
            ToolEffect::Idempotent,
        )
        .param(ParamSpec::optional("prefix", ParamKind::String, "Only list datasets under this prefix (e.g. raw/ or processed/)")),
        ToolDescriptor::new(
            CHECK_INSTANCE_QUOTAS,
            "llmops-tool-check-sagemaker-quotas",
            "Check GPU instance quotas and availability (ml.g4dn.xlarge, ml.g5.xlarge, ml.p3.2xlarge, ...). Returns available instances, cost per hour and quota limits.",
            ToolEffect::Idempotent,
        )
        .param(ParamSpec::optional("instance_types", ParamKind::Array, "Restrict the check to these instance types")),
        ToolDescriptor::new(
            SELECT_MODEL,
            "llmops-tool-select-model",
            "Rank candidate base models for a task. Returns candidates with expected f1, estimated cost and training time.",
            ToolEffect::Idempotent,
        )
        .param(ParamSpec::required("task_type", ParamKind::String, "ML task, e.g. token-classification"))
        .param(ParamSpec::optional("max_cost_usd", ParamKind::Number, "Budget ceiling for the training run"))
        .param(ParamSpec::optional("min_f1", ParamKind::Number, "Minimum acceptable F1 score"))
        .param(ParamSpec::optional("max_time_hours", ParamKind::Number, "Maximum training time")),
        ToolDescriptor::new(
            PREPARE_DATASET,
            "llmops-tool-prepare-dataset",
            "Prepare and validate a dataset for training: checks format, normalizes annotations, removes invalid records. Already prepared datasets are skipped unless force_prepare=true.",
            ToolEffect::StateChanging,
        )
        .param(ParamSpec::required("dataset_name", ParamKind::String, "Dataset name as returned by list_datasets"))
        .param(ParamSpec::optional("task_type", ParamKind::String, "ML task, default token-classification"))
        .param(ParamSpec::optional("force_prepare", ParamKind::Boolean, "Re-prepare an already prepared dataset")),
        ToolDescriptor::new(
            LAUNCH_TRAINING_JOB,
            "llmops-tool-launch-training",
            "Launch a training job. This is a paid action: estimated_cost_usd is checked against the session and global budget before launch.",
            ToolEffect::Paid {
                cost_param: COST_PARAM.to_string(),
            },
        )
        .param(ParamSpec::required("model_name", ParamKind::String, "Base model id"))
        .param(ParamSpec::required("dataset_path", ParamKind::String, "Dataset name or full URI"))
        .param(ParamSpec::required(COST_PARAM, ParamKind::Number, "Estimated cost of the run in USD"))
        .param(ParamSpec::optional("instance_type", ParamKind::String, "Instance type; defaults to the model's registry entry")),
        ToolDescriptor::new(
            GET_TRAINING_JOB_STATUS,
            "llmops-tool-job-status",
            "Get the current status, progress, cost so far and metrics of a training job.",
            ToolEffect::Volatile,
        )
        .param(ParamSpec::required("job_id", ParamKind::String, "Job id returned by launch_training_job")),
    ]
    .into_iter()
    .collect()
}
