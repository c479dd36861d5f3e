//! 工具并发池：同一推理步内的独立调用可并发下发，Semaphore 限制并发数

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::AgentError;

pub struct TaskScheduler {
    /// 工具并发限制（默认 3）
    tool_semaphore: Arc<Semaphore>,
}

impl TaskScheduler {
    pub fn new(max_concurrent_tools: usize) -> Self {
        Self {
            tool_semaphore: Arc::new(Semaphore::new(max_concurrent_tools.max(1))),
        }
    }

    /// 获取工具执行许可
    pub async fn acquire_tool(&self) -> Result<OwnedSemaphorePermit, AgentError> {
        self.tool_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AgentError::Cancelled)
    }

    pub fn available_permits(&self) -> usize {
        self.tool_semaphore.available_permits()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let s = TaskScheduler::new(2);
        let p1 = s.acquire_tool().await.unwrap();
        let _p2 = s.acquire_tool().await.unwrap();
        assert_eq!(s.available_permits(), 0);
        drop(p1);
        assert_eq!(s.available_permits(), 1);
        assert_eq!(TaskScheduler::new(0).available_permits(), 1);
    }
}
