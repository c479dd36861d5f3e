//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LLMOPS__*` 覆盖（双下划线表示嵌套，如 `LLMOPS__GATEWAY__MODE=routed`）。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub gateway: GatewaySection,
    pub agent: AgentSection,
    pub budget: BudgetSection,
    pub negotiation: NegotiationSection,
}

/// [app] 段：应用名、会话存储目录、日志级别
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 会话 JSON 存储目录；未设置时使用内存存储
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "llmops-agent".to_string(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

/// [llm] 段：推理后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai（任意 OpenAI 兼容端点）/ mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            request_timeout_secs: 60,
            temperature: 0.2,
        }
    }
}

/// 网关执行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Direct,
    Routed,
}

impl GatewayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayMode::Direct => "direct",
            GatewayMode::Routed => "routed",
        }
    }
}

/// [gateway] 段：策略选择与单次调用超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub mode: GatewayMode,
    pub tool_timeout_secs: u64,
    pub direct: DirectSection,
    pub routed: RoutedSection,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Direct,
            tool_timeout_secs: 30,
            direct: DirectSection::default(),
            routed: RoutedSection::default(),
        }
    }
}

/// [gateway.direct] 段：未设置 backend_url 时使用进程内沙箱后端
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectSection {
    pub backend_url: Option<String>,
}

/// [gateway.routed] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoutedSection {
    pub service_url: Option<String>,
    pub gateway_id: Option<String>,
}

/// [agent] 段：推理循环的边界
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_iterations: usize,
    pub turn_timeout_secs: u64,
    pub max_concurrent_tools: usize,
    /// 送入 THINKING 的最近消息条数
    pub history_window: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            turn_timeout_secs: 300,
            max_concurrent_tools: 3,
            history_window: 40,
        }
    }
}

/// [budget] 段（美元）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetSection {
    pub global_limit_usd: f64,
    pub default_session_limit_usd: f64,
    pub warning_threshold_percent: f64,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            global_limit_usd: 100.0,
            default_session_limit_usd: 10.0,
            warning_threshold_percent: 80.0,
        }
    }
}

/// [negotiation] 段：相对容差（百分比）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NegotiationSection {
    pub tolerance_percent: f64,
}

impl Default for NegotiationSection {
    fn default() -> Self {
        Self { tolerance_percent: 10.0 }
    }
}

impl AppConfig {
    /// 检查数值边界；构造编排器前调用
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.agent.max_iterations == 0 {
            return Err(AgentError::Config("agent.max_iterations must be at least 1".into()));
        }
        if self.agent.max_concurrent_tools == 0 {
            return Err(AgentError::Config("agent.max_concurrent_tools must be at least 1".into()));
        }
        if self.budget.global_limit_usd < 0.0 || self.budget.default_session_limit_usd < 0.0 {
            return Err(AgentError::Config("budget limits must not be negative".into()));
        }
        if !(0.0..=100.0).contains(&self.budget.warning_threshold_percent) {
            return Err(AgentError::Config("budget.warning_threshold_percent must be within 0..=100".into()));
        }
        if self.negotiation.tolerance_percent < 0.0 {
            return Err(AgentError::Config("negotiation.tolerance_percent must not be negative".into()));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 LLMOPS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 LLMOPS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LLMOPS")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| AgentError::Config(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}
