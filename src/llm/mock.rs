//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序回放预置脚本；脚本用尽后回显最后一条 User 消息作为 `<answer>`，
//! 或在 `repeating` 模式下不断重复最后一条回复。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<String>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    /// 每次调用收到的消息（测试断言用）
    received: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 永远返回同一条回复（用于验证迭代上限）
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            repeat: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if let Ok(mut r) = self.received.lock() {
            r.push(messages.to_vec());
        }
        let next = self
            .script
            .lock()
            .map_err(|_| LlmError::ApiError("mock script poisoned".into()))?
            .pop_front();
        if let Some(reply) = next {
            return Ok(reply);
        }
        if let Some(reply) = &self.repeat {
            return Ok(reply.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("<answer>Echo from Mock: {last_user}</answer>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_script_then_echo() {
        let llm = MockLlmClient::scripted(["one", "two"]);
        let msgs = vec![Message::user("hello")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "one");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "two");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "<answer>Echo from Mock: hello</answer>");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_stream_yields_whole_reply() {
        let llm = MockLlmClient::repeating("again");
        let mut s = llm.complete_stream(&[]).await.unwrap();
        assert_eq!(s.next().await.unwrap().unwrap(), "again");
        assert!(s.next().await.is_none());
    }
}
