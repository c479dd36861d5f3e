//! 对话日志：只追加、有序、按会话隔离
//!
//! 消息一旦写入即不可修改或删除；归档会话只影响后续可见性，不改动日志本身。
//! `window(n)` 为推理步骤提供最近 n 条消息作为上下文窗口。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 消息角色；System 只用于拼装 LLM 请求，不会写入会话日志
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Agent,
    ToolObservation,
    System,
}

/// 可选的结构化载荷（如前端渲染的卡片类型与数据）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub card_type: String,
    pub data: serde_json::Value,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
    /// 附带的推理步骤（透明展示用）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning: Vec<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            payload: None,
            reasoning: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::with_role(Role::Agent, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::with_role(Role::ToolObservation, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn with_payload(mut self, card_type: impl Into<String>, data: serde_json::Value) -> Self {
        self.payload = Some(MessagePayload {
            card_type: card_type.into(),
            data,
        });
        self
    }

    pub fn with_reasoning(mut self, steps: Vec<String>) -> Self {
        self.reasoning = steps;
        self
    }
}

/// 只追加的对话日志
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条消息，返回其序号（从 0 开始，即写入顺序）
    pub fn append(&mut self, msg: Message) -> usize {
        self.messages.push(msg);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近 n 条消息，保持原有顺序
    pub fn window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for ConversationLog {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
