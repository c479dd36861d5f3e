//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, TokenStream};

use crate::config::LlmSection;
use crate::core::AgentError;

/// 按配置创建 LLM 客户端
pub fn create_llm_client(cfg: &LlmSection) -> Result<Arc<dyn LlmClient>, AgentError> {
    match cfg.provider.as_str() {
        "openai" => {
            tracing::info!(model = %cfg.model, base_url = ?cfg.base_url, "using OpenAI-compatible LLM");
            Ok(Arc::new(OpenAiClient::from_config(cfg)))
        }
        "mock" => {
            tracing::info!("using mock LLM");
            Ok(Arc::new(MockLlmClient::new()))
        }
        other => Err(AgentError::Config(format!("unknown llm.provider '{other}' (expected openai or mock)"))),
    }
}
