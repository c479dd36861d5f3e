//! 会话数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{ConversationLog, Message};

/// 会话：预算作用域内的一段用户与 Agent 的对话
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub budget_limit: f64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub messages: ConversationLog,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: config.title.unwrap_or_else(|| "New training session".to_string()),
            created_at: Utc::now(),
            budget_limit: config.budget_limit,
            archived: false,
            messages: ConversationLog::new(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            budget_limit: self.budget_limit,
            archived: self.archived,
            message_count: self.messages.len(),
            last_message: self.messages.last().map(|m| crate::gateway::result::truncate(&m.content, 80)),
        }
    }

    pub fn append(&mut self, message: Message) -> usize {
        self.messages.append(message)
    }
}

/// 创建会话参数
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionConfig {
    pub title: Option<String>,
    pub budget_limit: f64,
}

impl SessionConfig {
    pub fn with_budget(budget_limit: f64) -> Self {
        Self {
            title: None,
            budget_limit,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// 会话列表项
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub budget_limit: f64,
    pub archived: bool,
    pub message_count: usize,
    pub last_message: Option<String>,
}
