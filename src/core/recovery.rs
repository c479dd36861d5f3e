//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction：工具级错误在本地恢复，会话级错误上报给调用方。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParse(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous <tool_call> block was not valid JSON ({raw}). \
                 Each <tool_call> must contain exactly one JSON object of the form \
                 {{\"name\": \"tool_name\", \"parameters\": {{...}}}} and nothing else."
            )),
            AgentError::Validation { tool, problems } => RecoveryAction::InjectObservation(format!(
                "✗ {tool}: not executed, invalid parameters: {}. Fix the parameters or choose another tool.",
                problems.join("; ")
            )),
            AgentError::UnknownTool(name) => RecoveryAction::InjectObservation(format!(
                "✗ {name}: no such tool exists; the call was skipped. Use only tools from the catalogue."
            )),
            AgentError::Backend {
                tool,
                kind,
                message,
            } => RecoveryAction::InjectObservation(format!(
                "✗ {tool}: Error - {message}\n  Suggestion: {}",
                kind.hint()
            )),
            AgentError::BudgetExceeded { .. }
            | AgentError::NegotiationExhausted(_)
            | AgentError::IterationLimitReached { .. }
            | AgentError::TimeoutReached { .. }
            | AgentError::SessionArchived(_)
            | AgentError::SessionBusy(_)
            | AgentError::SessionNotFound(_) => RecoveryAction::SurfaceToUser,
            _ => RecoveryAction::Abort,
        }
    }
}
