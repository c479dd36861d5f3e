//! routed 策略：经共享路由服务转发调用，支持按能力描述的语义检索
//!
//! HttpRoutingService 对接托管的路由服务；LocalRoutingService 在进程内模拟同一协议
//! （注册表 + 执行后端 + 词重叠检索），便于本地运行与测试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::gateway::{
    audit, normalize, rank_by_overlap, BackendFailure, GatewayMode, ToolBackend, ToolErrorKind,
    ToolGateway, ToolMatch, ToolResult,
};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// 路由服务协议
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendFailure>;

    async fn search_tools(&self, query: &str, top_k: usize) -> Result<Vec<ToolMatch>, BackendFailure>;

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, BackendFailure>;
}

#[derive(Deserialize)]
struct ToolsEnvelope {
    tools: Vec<ToolDescriptor>,
}

#[derive(Deserialize)]
struct MatchesEnvelope {
    matches: Vec<ToolMatch>,
}

/// 托管路由服务客户端
pub struct HttpRoutingService {
    client: Client,
    base_url: String,
    gateway_id: String,
}

impl HttpRoutingService {
    pub fn new(service_url: &str, gateway_id: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("llmops-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: service_url.trim_end_matches('/').to_string(),
            gateway_id: gateway_id.to_string(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/gateways/{}/{}", self.base_url, self.gateway_id, suffix)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, BackendFailure> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendFailure::from_status(status.as_u16(), &body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| BackendFailure::new(ToolErrorKind::Internal, format!("invalid routing response: {e}")))
    }
}

#[async_trait]
impl RoutingService for HttpRoutingService {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendFailure> {
        let resp = self.client.get(self.url("tools")).send().await?;
        Ok(Self::read_json::<ToolsEnvelope>(resp).await?.tools)
    }

    async fn search_tools(&self, query: &str, top_k: usize) -> Result<Vec<ToolMatch>, BackendFailure> {
        let resp = self
            .client
            .post(self.url("tools:search"))
            .json(&json!({ "query": query, "top_k": top_k }))
            .send()
            .await?;
        Ok(Self::read_json::<MatchesEnvelope>(resp).await?.matches)
    }

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, BackendFailure> {
        let resp = self
            .client
            .post(self.url(&format!("tools/{name}:invoke")))
            .json(&json!({ "parameters": params }))
            .send()
            .await?;
        Self::read_json::<Value>(resp).await
    }
}

/// 进程内路由服务
pub struct LocalRoutingService {
    registry: ToolRegistry,
    backend: Arc<dyn ToolBackend>,
}

impl LocalRoutingService {
    pub fn new(registry: ToolRegistry, backend: Arc<dyn ToolBackend>) -> Self {
        Self { registry, backend }
    }
}

#[async_trait]
impl RoutingService for LocalRoutingService {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendFailure> {
        Ok(self.registry.descriptors())
    }

    async fn search_tools(&self, query: &str, top_k: usize) -> Result<Vec<ToolMatch>, BackendFailure> {
        Ok(rank_by_overlap(self.registry.descriptors(), query, top_k))
    }

    async fn invoke(&self, name: &str, params: Value) -> Result<Value, BackendFailure> {
        let descriptor = self.registry.get(name).ok_or_else(|| {
            BackendFailure::new(ToolErrorKind::UnknownTool, format!("Unknown tool: {name}"))
        })?;
        self.backend.call(&descriptor.target, params).await
    }
}

/// routed 网关：目录与调用都经路由服务；最后一次成功拉取的目录作为回退
pub struct RoutedGateway {
    service: Arc<dyn RoutingService>,
    timeout: Duration,
    catalogue: RwLock<Vec<ToolDescriptor>>,
}

impl RoutedGateway {
    pub fn new(service: Arc<dyn RoutingService>, timeout_secs: u64) -> Self {
        Self {
            service,
            timeout: Duration::from_secs(timeout_secs),
            catalogue: RwLock::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ToolGateway for RoutedGateway {
    fn mode(&self) -> GatewayMode {
        GatewayMode::Routed
    }

    async fn list_tools(&self) -> Vec<ToolDescriptor> {
        match timeout(self.timeout, self.service.list_tools()).await {
            Ok(Ok(tools)) => {
                *self.catalogue.write().await = tools.clone();
                tools
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e.message, "routing service list_tools failed, using cached catalogue");
                self.catalogue.read().await.clone()
            }
            Err(_) => {
                tracing::warn!("routing service list_tools timed out, using cached catalogue");
                self.catalogue.read().await.clone()
            }
        }
    }

    async fn search_tools(&self, query: &str, top_k: usize) -> Vec<ToolMatch> {
        match timeout(self.timeout, self.service.search_tools(query, top_k)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                tracing::warn!(error = %e.message, query, "routing service search failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(query, "routing service search timed out");
                Vec::new()
            }
        }
    }

    async fn invoke(&self, name: &str, params: Value) -> ToolResult {
        let start = Instant::now();
        let raw = match timeout(self.timeout, self.service.invoke(name, params.clone())).await {
            Ok(r) => r,
            Err(_) => Err(BackendFailure::new(
                ToolErrorKind::Timeout,
                format!("{name} timed out after {}s", self.timeout.as_secs()),
            )),
        };
        let result = normalize(name, raw, start.elapsed().as_millis() as u64);
        audit(GatewayMode::Routed, &result, &params);
        result
    }
}
