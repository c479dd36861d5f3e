//! 集成测试共用的构造器与后端替身

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use llmops_agent::config::AppConfig;
use llmops_agent::gateway::{
    sandbox_backend, BackendFailure, DirectGateway, LocalBackend, LocalRoutingService, RoutedGateway, ToolBackend,
    ToolGateway, ToolHandler,
};
use llmops_agent::llm::MockLlmClient;
use llmops_agent::tools::default_registry;
use llmops_agent::{AgentEvent, Orchestrator};

/// 记录每个后端函数被调用次数的包装
pub struct CountingBackend<B> {
    inner: B,
    calls: Mutex<HashMap<String, usize>>,
}

impl<B: ToolBackend> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn count(&self, target: &str) -> usize {
        self.calls.lock().unwrap().get(target).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl<B: ToolBackend> ToolBackend for CountingBackend<B> {
    async fn call(&self, target: &str, params: Value) -> Result<Value, BackendFailure> {
        *self.calls.lock().unwrap().entry(target.to_string()).or_default() += 1;
        self.inner.call(target, params).await
    }
}

/// 延迟后返回带标记的成功结果
pub struct Delayed {
    pub delay: Duration,
    pub tag: &'static str,
}

#[async_trait]
impl ToolHandler for Delayed {
    async fn handle(&self, _params: Value) -> Result<Value, String> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"success": true, "tag": self.tag}))
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.llm.provider = "mock".into();
    cfg
}

pub fn sandbox() -> Arc<CountingBackend<LocalBackend>> {
    Arc::new(CountingBackend::new(sandbox_backend()))
}

pub fn direct(backend: Arc<dyn ToolBackend>) -> Arc<dyn ToolGateway> {
    Arc::new(DirectGateway::new(default_registry(), backend, 5))
}

pub fn routed(backend: Arc<dyn ToolBackend>) -> Arc<dyn ToolGateway> {
    Arc::new(RoutedGateway::new(
        Arc::new(LocalRoutingService::new(default_registry(), backend)),
        5,
    ))
}

pub async fn orchestrator(cfg: AppConfig, llm: Arc<MockLlmClient>, gateway: Arc<dyn ToolGateway>) -> Orchestrator {
    Orchestrator::builder(cfg)
        .with_llm(llm)
        .with_gateway(gateway)
        .build()
        .await
        .unwrap()
}

pub fn tool_call(name: &str, params: Value) -> String {
    format!("<tool_call>{}</tool_call>", json!({"name": name, "parameters": params}))
}

pub fn kinds(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(AgentEvent::kind).collect()
}
