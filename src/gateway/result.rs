//! 工具调用结果与失败分类
//!
//! 两种网关策略都经由 `normalize` 生成 ToolResult，保证结构一致；
//! 后端失败按 HTTP 状态码与错误文本归类为可重试（资源耗尽类）或最终失败。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 后端失败类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Timeout,
    Throttled,
    ResourceExhausted,
    NotFound,
    InvalidRequest,
    UnknownTool,
    Transport,
    Internal,
}

impl ToolErrorKind {
    /// 资源耗尽类（超时、限流、配额、网络）可重试；其余为最终失败
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ToolErrorKind::Timeout
                | ToolErrorKind::Throttled
                | ToolErrorKind::ResourceExhausted
                | ToolErrorKind::Transport
        )
    }

    /// 注入观察时附带的建议
    pub fn hint(self) -> &'static str {
        match self {
            ToolErrorKind::Timeout => "The backend did not answer in time. Try again in a moment or use a lighter request.",
            ToolErrorKind::Throttled => "Requests are being throttled. Suggest trying again in a few moments.",
            ToolErrorKind::ResourceExhausted => "Resource quota exceeded or no GPUs available. Suggest waiting for resources or using a different instance type.",
            ToolErrorKind::NotFound => "The requested resource was not found. The dataset or configuration may need to be set up first.",
            ToolErrorKind::InvalidRequest => "The request was rejected as invalid. Check the dataset name or parameters, or use a different dataset.",
            ToolErrorKind::UnknownTool => "This tool is not available. Choose a tool from the catalogue.",
            ToolErrorKind::Transport => "The tool backend is unreachable. Retry later or continue with the information already gathered.",
            ToolErrorKind::Internal => "The operation failed. Check the error details and suggest alternatives.",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::Throttled => "throttled",
            ToolErrorKind::ResourceExhausted => "resource_exhausted",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::InvalidRequest => "invalid_request",
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::Transport => "transport",
            ToolErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// 归一化后的失败详情
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ToolFailure {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }
}

/// 后端（或路由服务）返回的原始失败
#[derive(Clone, Debug, PartialEq)]
pub struct BackendFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl BackendFailure {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 由 HTTP 状态码与响应文本归类
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::new(classify(Some(status), body), format!("HTTP {status}: {}", truncate(body, 300)))
    }

    /// 仅由错误文本归类
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify(None, &message), message)
    }
}

impl From<reqwest::Error> for BackendFailure {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ToolErrorKind::Timeout
        } else if e.is_connect() || e.is_request() {
            ToolErrorKind::Transport
        } else if let Some(status) = e.status() {
            classify(Some(status.as_u16()), "")
        } else {
            ToolErrorKind::Internal
        };
        Self::new(kind, e.to_string())
    }
}

/// 错误文本优先（更具体），其次 HTTP 状态码
pub fn classify(status: Option<u16>, message: &str) -> ToolErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("throttlingexception") || lower.contains("too many requests") || lower.contains("rate limit") {
        return ToolErrorKind::Throttled;
    }
    if lower.contains("quotaexceeded")
        || lower.contains("resourcelimitexceeded")
        || lower.contains("insufficient capacity")
        || lower.contains("no available")
    {
        return ToolErrorKind::ResourceExhausted;
    }
    if lower.contains("resourcenotfoundexception") || lower.contains("not found") {
        return ToolErrorKind::NotFound;
    }
    if lower.contains("validationexception") || lower.contains("s3 uri") || lower.contains("invalid") {
        return ToolErrorKind::InvalidRequest;
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return ToolErrorKind::Timeout;
    }
    match status {
        Some(408) | Some(504) => ToolErrorKind::Timeout,
        Some(429) => ToolErrorKind::Throttled,
        Some(503) => ToolErrorKind::ResourceExhausted,
        Some(404) => ToolErrorKind::NotFound,
        Some(400) | Some(422) => ToolErrorKind::InvalidRequest,
        _ => ToolErrorKind::Internal,
    }
}

/// 一次工具调用的结果，与 ToolCall 一一对应
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
    pub latency_ms: u64,
}

impl ToolResult {
    pub fn ok(tool: &str, payload: Value, latency_ms: u64) -> Self {
        Self {
            tool: tool.to_string(),
            success: true,
            payload: Some(payload),
            error: None,
            latency_ms,
        }
    }

    pub fn failed(tool: &str, failure: ToolFailure, latency_ms: u64) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            payload: None,
            error: Some(failure),
            latency_ms,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match &self.error {
            None => "ok",
            Some(f) if f.kind == ToolErrorKind::Timeout => "timeout",
            Some(_) => "error",
        }
    }
}

/// Lambda 风格响应：`{"statusCode": 200, "body": "<json>"}` 取出 body
fn unwrap_body(v: Value) -> Value {
    let body = match v.get("body") {
        Some(Value::String(s)) => serde_json::from_str::<Value>(s).ok(),
        Some(b @ Value::Object(_)) => Some(b.clone()),
        _ => None,
    };
    body.unwrap_or(v)
}

/// 将后端原始返回归一化为 ToolResult：响应至少要带 `success` 布尔值
pub fn normalize(tool: &str, raw: Result<Value, BackendFailure>, latency_ms: u64) -> ToolResult {
    let value = match raw {
        Ok(v) => unwrap_body(v),
        Err(f) => return ToolResult::failed(tool, ToolFailure::new(f.kind, f.message), latency_ms),
    };
    match value.get("success").and_then(Value::as_bool) {
        Some(true) => ToolResult::ok(tool, value, latency_ms),
        Some(false) => {
            let message = value
                .get("error")
                .or_else(|| value.get("message"))
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "tool reported failure".to_string());
            let kind = classify(None, &message);
            ToolResult::failed(tool, ToolFailure::new(kind, message), latency_ms)
        }
        None => ToolResult::failed(
            tool,
            ToolFailure::new(ToolErrorKind::Internal, "malformed backend response: missing success flag"),
            latency_ms,
        ),
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
