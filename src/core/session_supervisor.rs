//! 会话监管：每个会话当前轮的取消令牌
//!
//! 根令牌用于整体关闭；每轮使用根令牌的子令牌，`cancel(session)` 只影响该会话。

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;

#[derive(Debug, Default)]
pub struct SessionSupervisor {
    root: CancellationToken,
    active: RwLock<HashMap<String, CancellationToken>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一轮；同一会话已有进行中的轮次时拒绝
    pub async fn begin_turn(&self, session_id: &str) -> Result<CancellationToken, AgentError> {
        let mut active = self.active.write().await;
        if let Some(existing) = active.get(session_id) {
            if !existing.is_cancelled() {
                return Err(AgentError::SessionBusy(session_id.to_string()));
            }
        }
        let token = self.root.child_token();
        active.insert(session_id.to_string(), token.clone());
        Ok(token)
    }

    pub async fn end_turn(&self, session_id: &str) {
        self.active.write().await.remove(session_id);
    }

    /// 取消会话当前轮；没有进行中的轮次时返回 false
    pub async fn cancel(&self, session_id: &str) -> bool {
        match self.active.read().await.get(session_id) {
            Some(token) => {
                tracing::info!(session = session_id, "turn cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_active(&self, session_id: &str) -> bool {
        self.active.read().await.contains_key(session_id)
    }

    /// 取消所有会话（进程关闭）
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}
