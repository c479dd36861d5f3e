//! 执行后端
//!
//! direct 策略按工具的调用目标直接请求后端：HttpBackend 以 JSON POST 到 `{backend_url}/{target}`；
//! LocalBackend 在进程内按目标分发给注册的 ToolHandler（轻量本地模式与测试使用）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::gateway::{BackendFailure, ToolErrorKind};

/// 执行后端：按调用目标执行一次远程调用
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn call(&self, target: &str, params: Value) -> Result<Value, BackendFailure>;
}

/// HTTP 后端：每个调用目标对应 `{base_url}/{target}`
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("llmops-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ToolBackend for HttpBackend {
    async fn call(&self, target: &str, params: Value) -> Result<Value, BackendFailure> {
        let url = format!("{}/{}", self.base_url, target);
        let resp = self.client.post(&url).json(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendFailure::from_status(status.as_u16(), &body));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| BackendFailure::new(ToolErrorKind::Internal, format!("invalid JSON response: {e}")))
    }
}

/// 进程内工具实现
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value, String>;
}

/// 闭包适配为 ToolHandler
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync,
{
    async fn handle(&self, params: Value) -> Result<Value, String> {
        (self.0)(params)
    }
}

/// 进程内后端：目标名 -> handler
#[derive(Default, Clone)]
pub struct LocalBackend {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: &str, handler: impl ToolHandler + 'static) {
        self.handlers.insert(target.to_string(), Arc::new(handler));
    }

    pub fn with_handler(mut self, target: &str, handler: impl ToolHandler + 'static) -> Self {
        self.register(target, handler);
        self
    }

    pub fn with_fn<F>(self, target: &str, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.with_handler(target, FnHandler(f))
    }
}

#[async_trait]
impl ToolBackend for LocalBackend {
    async fn call(&self, target: &str, params: Value) -> Result<Value, BackendFailure> {
        let handler = self.handlers.get(target).ok_or_else(|| {
            BackendFailure::new(ToolErrorKind::NotFound, format!("no backend function named {target}"))
        })?;
        handler.handle(params).await.map_err(BackendFailure::from_message)
    }
}
