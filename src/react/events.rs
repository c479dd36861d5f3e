//! 轮内过程事件：按产生顺序逐个推送给展示层，可序列化为 JSON

use serde::Serialize;
use serde_json::Value;

use crate::budget::BudgetWarning;
use crate::gateway::ToolFailure;
use crate::jobs::Job;
use crate::negotiation::{Alternative, Conflict};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// `<thinking>` 中的一段推理
    ReasoningStep { iteration: usize, text: String },
    /// 即将下发（或命中缓存）的工具调用
    ToolInvoked {
        iteration: usize,
        tool: String,
        params: Value,
    },
    /// 工具结果（预览，避免过长）
    ToolResult {
        iteration: usize,
        tool: String,
        success: bool,
        cached: bool,
        latency_ms: u64,
        preview: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ToolFailure>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        budget_warnings: Vec<BudgetWarning>,
    },
    /// 面向用户的回复片段
    ConversationalChunk { text: String },
    JobsLaunched { jobs: Vec<Job> },
    /// 约束无法同时满足：冲突与备选方案
    ConstraintConflict {
        reason: String,
        conflicts: Vec<Conflict>,
        alternatives: Vec<Alternative>,
    },
    Completed { iterations: usize, response: String },
    /// 终止本轮的错误，至少带一条可执行的下一步建议
    Error {
        kind: String,
        message: String,
        next_steps: Vec<String>,
    },
}

impl AgentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::ReasoningStep { .. } => "reasoning-step",
            AgentEvent::ToolInvoked { .. } => "tool-invoked",
            AgentEvent::ToolResult { .. } => "tool-result",
            AgentEvent::ConversationalChunk { .. } => "conversational-chunk",
            AgentEvent::JobsLaunched { .. } => "jobs-launched",
            AgentEvent::ConstraintConflict { .. } => "constraint-conflict",
            AgentEvent::Completed { .. } => "completed",
            AgentEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Completed { .. } | AgentEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let e = AgentEvent::ReasoningStep {
            iteration: 1,
            text: "check datasets".into(),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], e.kind());
        assert_eq!(v["iteration"], 1);

        let r = AgentEvent::ToolResult {
            iteration: 1,
            tool: "list_datasets".into(),
            success: true,
            cached: false,
            latency_ms: 3,
            preview: "{}".into(),
            error: None,
            budget_warnings: Vec::new(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["type"], "tool-result");
        assert!(v.get("error").is_none());
        assert!(v.get("budget_warnings").is_none());
    }
}
