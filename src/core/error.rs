//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：工具级错误注入观察后继续，会话级错误（预算、协商失败、超时）直接上报。

use thiserror::Error;

use crate::gateway::ToolErrorKind;

/// 编排过程中可能出现的错误
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// 参数校验失败（本地处理，绝不下发到网关）
    #[error("Validation error for tool {tool}: {}", .problems.join("; "))]
    Validation { tool: String, problems: Vec<String> },

    #[error("Backend error ({kind}) from tool {tool}: {message}")]
    Backend {
        tool: String,
        kind: ToolErrorKind,
        message: String,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Budget exceeded for {scope}: requested ${requested:.2}, remaining ${remaining:.2}")]
    BudgetExceeded {
        scope: String,
        requested: f64,
        remaining: f64,
    },

    #[error("Iteration limit reached after {iterations} steps")]
    IterationLimitReached { iterations: usize, partial: String },

    #[error("Turn timed out after {elapsed_secs}s")]
    TimeoutReached { elapsed_secs: u64, partial: String },

    #[error("No alternative satisfies the constraints: {0}")]
    NegotiationExhausted(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Cancelled by caller")]
    Cancelled,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session busy: a turn is already running in {0}")]
    SessionBusy(String),

    #[error("Session archived: {0}")]
    SessionArchived(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    /// 稳定的机器可读错误类别（用于 error 事件）
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Validation { .. } => "validation_error",
            AgentError::Backend { .. } => "backend_error",
            AgentError::UnknownTool(_) => "unknown_tool",
            AgentError::BudgetExceeded { .. } => "budget_exceeded",
            AgentError::IterationLimitReached { .. } => "iteration_limit_reached",
            AgentError::TimeoutReached { .. } => "timeout_reached",
            AgentError::NegotiationExhausted(_) => "negotiation_exhausted",
            AgentError::JsonParse(_) => "json_parse_error",
            AgentError::Llm(_) => "llm_error",
            AgentError::Cancelled => "cancelled",
            AgentError::SessionNotFound(_) => "session_not_found",
            AgentError::SessionBusy(_) => "session_busy",
            AgentError::SessionArchived(_) => "session_archived",
            AgentError::Store(_) => "store_error",
            AgentError::Config(_) => "config_error",
        }
    }

    /// 后端错误是否属于可重试的资源耗尽类
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Backend { kind, .. } => kind.is_retryable(),
            _ => false,
        }
    }

    /// 面向用户的下一步建议，保证至少一条
    pub fn next_steps(&self) -> Vec<String> {
        let steps: &[&str] = match self {
            AgentError::Validation { .. } => &["Provide the missing parameters and try again."],
            AgentError::Backend { kind, .. } => return vec![kind.hint().to_string()],
            AgentError::UnknownTool(_) => &["Rephrase the request using one of the available capabilities."],
            AgentError::BudgetExceeded { .. } => &[
                "Increase the session budget.",
                "Use a smaller model or a cheaper instance type.",
                "Reduce the dataset size or the number of epochs.",
            ],
            AgentError::IterationLimitReached { .. } => &[
                "Break the request into smaller steps.",
                "Ask again with more specific requirements.",
            ],
            AgentError::TimeoutReached { .. } => &[
                "Retry the request; slow backends usually recover.",
                "Split the request into smaller steps.",
            ],
            AgentError::NegotiationExhausted(_) => &[
                "Relax the quality target.",
                "Increase the budget or the time limit.",
            ],
            AgentError::JsonParse(_) | AgentError::Llm(_) => {
                &["Retry the request; the reasoning service returned an unusable reply."]
            }
            AgentError::Cancelled => &["Send the request again when ready."],
            AgentError::SessionNotFound(_) => &["Create a new session."],
            AgentError::SessionBusy(_) => &["Wait for the current turn to finish, or cancel it with /cancel."],
            AgentError::SessionArchived(_) => &["Start a new session; archived sessions are read-only."],
            AgentError::Store(_) => &["Retry shortly; the session store is unavailable."],
            AgentError::Config(_) => &["Check the configuration file and LLMOPS__* environment variables."],
        };
        steps.iter().map(|s| s.to_string()).collect()
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 LLM 重试（如 JSON 格式错误）
    RetryWithPrompt(String),
    /// 以观察的形式告知 LLM，继续循环（工具级错误）
    InjectObservation(String),
    /// 结束本轮并向用户说明（会话级错误，不自动重试）
    SurfaceToUser,
    /// 终止当前轮
    Abort,
}
