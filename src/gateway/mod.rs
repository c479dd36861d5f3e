//! 工具网关：同一接口的两种执行策略
//!
//! - **direct**：静态注册表，按调用目标直接请求执行后端
//! - **routed**：经共享路由服务发现与调用，支持语义检索
//!
//! 策略在构造时由 `gateway.mode` 选定，之后对调用方完全透明；所有失败都被归一化进 ToolResult，
//! 网关自身从不重试。

pub mod backend;
pub mod direct;
pub mod result;
pub mod routed;
pub mod sandbox;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GatewayMode, GatewaySection};
use crate::core::AgentError;
use crate::tools::{ToolDescriptor, ToolRegistry};

pub use backend::{FnHandler, HttpBackend, LocalBackend, ToolBackend, ToolHandler};
pub use direct::DirectGateway;
pub use result::{classify, normalize, BackendFailure, ToolErrorKind, ToolFailure, ToolResult};
pub use routed::{HttpRoutingService, LocalRoutingService, RoutedGateway, RoutingService};
pub use sandbox::sandbox_backend;

/// 检索命中：描述符 + 相关度
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolMatch {
    pub descriptor: ToolDescriptor,
    pub score: f64,
}

/// 统一工具网关接口
#[async_trait]
pub trait ToolGateway: Send + Sync {
    fn mode(&self) -> GatewayMode;

    /// 当前可用工具目录
    async fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// 按能力描述检索工具，按相关度降序，最多 top_k 个
    async fn search_tools(&self, query: &str, top_k: usize) -> Vec<ToolMatch>;

    /// 调用工具；任何失败都体现在返回值的 error 字段
    async fn invoke(&self, name: &str, params: Value) -> ToolResult;
}

fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// 词重叠打分：查询词在「名称 + 描述 + 参数名」中的命中比例
pub(crate) fn rank_by_overlap(tools: Vec<ToolDescriptor>, query: &str, top_k: usize) -> Vec<ToolMatch> {
    let query_tokens = tokenize_lower(query);
    if query_tokens.is_empty() || top_k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<ToolMatch> = tools
        .into_iter()
        .filter_map(|descriptor| {
            let mut text = format!("{} {}", descriptor.name, descriptor.description);
            for p in &descriptor.parameters {
                text.push(' ');
                text.push_str(&p.name);
            }
            let doc_tokens = tokenize_lower(&text);
            let hits = query_tokens.intersection(&doc_tokens).count();
            (hits > 0).then(|| ToolMatch {
                descriptor,
                score: hits as f64 / query_tokens.len() as f64,
            })
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.descriptor.name.cmp(&b.descriptor.name))
    });
    scored.truncate(top_k);
    scored
}

/// 每次调用一条 JSON 审计日志
pub(crate) fn audit(mode: GatewayMode, result: &ToolResult, params: &Value) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "strategy": mode.as_str(),
        "tool": result.tool,
        "ok": result.success,
        "outcome": result.outcome(),
        "error_kind": result.error.as_ref().map(|e| e.kind),
        "duration_ms": result.latency_ms,
        "args_preview": result::truncate(&params.to_string(), 200),
    });
    tracing::info!(audit = %audit.to_string(), "tool");
}

/// 按配置构造网关；未配置远端地址时使用进程内沙箱后端
pub fn create_gateway(cfg: &GatewaySection, registry: ToolRegistry) -> Result<Arc<dyn ToolGateway>, AgentError> {
    let timeout_secs = cfg.tool_timeout_secs;
    if timeout_secs == 0 {
        return Err(AgentError::Config("gateway.tool_timeout_secs must be greater than 0".into()));
    }
    let gateway: Arc<dyn ToolGateway> = match cfg.mode {
        GatewayMode::Direct => {
            let backend: Arc<dyn ToolBackend> = match cfg.direct.backend_url.as_deref() {
                Some(url) if !url.trim().is_empty() => Arc::new(HttpBackend::new(url, timeout_secs)),
                _ => Arc::new(sandbox_backend()),
            };
            Arc::new(DirectGateway::new(registry, backend, timeout_secs))
        }
        GatewayMode::Routed => {
            let service: Arc<dyn RoutingService> = match cfg.routed.service_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {
                    let gateway_id = cfg.routed.gateway_id.as_deref().ok_or_else(|| {
                        AgentError::Config("gateway.routed.gateway_id is required with service_url".into())
                    })?;
                    Arc::new(HttpRoutingService::new(url, gateway_id, timeout_secs))
                }
                _ => Arc::new(LocalRoutingService::new(registry, Arc::new(sandbox_backend()))),
            };
            Arc::new(RoutedGateway::new(service, timeout_secs))
        }
    };
    tracing::info!(strategy = gateway.mode().as_str(), "tool gateway ready");
    Ok(gateway)
}
