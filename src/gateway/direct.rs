//! direct 策略：静态注册表 + 直接调用执行后端
//!
//! 每次调用施加超时，失败统一归一化为 ToolResult.error；网关内部从不重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;

use crate::gateway::{
    audit, normalize, rank_by_overlap, BackendFailure, GatewayMode, ToolBackend, ToolErrorKind,
    ToolGateway, ToolMatch, ToolResult,
};
use crate::tools::{ToolDescriptor, ToolRegistry};

pub struct DirectGateway {
    registry: ToolRegistry,
    backend: Arc<dyn ToolBackend>,
    timeout: Duration,
}

impl DirectGateway {
    pub fn new(registry: ToolRegistry, backend: Arc<dyn ToolBackend>, timeout_secs: u64) -> Self {
        Self {
            registry,
            backend,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ToolGateway for DirectGateway {
    fn mode(&self) -> GatewayMode {
        GatewayMode::Direct
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    async fn search_tools(&self, query: &str, top_k: usize) -> Vec<ToolMatch> {
        rank_by_overlap(self.registry.descriptors(), query, top_k)
    }

    async fn invoke(&self, name: &str, params: Value) -> ToolResult {
        let start = Instant::now();
        let raw = match self.registry.get(name) {
            Some(descriptor) => {
                match timeout(self.timeout, self.backend.call(&descriptor.target, params.clone())).await {
                    Ok(r) => r,
                    Err(_) => Err(BackendFailure::new(
                        ToolErrorKind::Timeout,
                        format!("{name} timed out after {}s", self.timeout.as_secs()),
                    )),
                }
            }
            None => Err(BackendFailure::new(
                ToolErrorKind::UnknownTool,
                format!("Unknown tool: {name}"),
            )),
        };
        let result = normalize(name, raw, start.elapsed().as_millis() as u64);
        audit(GatewayMode::Direct, &result, &params);
        result
    }
}
