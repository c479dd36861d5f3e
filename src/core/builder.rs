//! 编排器构建器：统一的组件初始化逻辑
//!
//! 默认全部按配置创建；测试与嵌入方可用 `with_*` 替换任一组件（LLM、网关、会话存储、预算存储）。

use std::sync::Arc;

use crate::budget::{BudgetStore, BudgetTracker, InMemoryBudgetStore};
use crate::config::AppConfig;
use crate::core::{AgentError, Orchestrator, RecoveryEngine, SessionSupervisor, TaskScheduler};
use crate::gateway::{create_gateway, ToolGateway};
use crate::jobs::JobTracker;
use crate::llm::{create_llm_client, LlmClient};
use crate::negotiation::Negotiator;
use crate::react::{Planner, TurnRuntime, DEFAULT_SYSTEM_PROMPT};
use crate::session::{create_session_store, SessionStore};
use crate::tools::default_registry;

pub struct OrchestratorBuilder {
    config: AppConfig,
    system_prompt: String,
    llm: Option<Arc<dyn LlmClient>>,
    gateway: Option<Arc<dyn ToolGateway>>,
    sessions: Option<Arc<dyn SessionStore>>,
    budget_store: Option<Arc<dyn BudgetStore>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            llm: None,
            gateway: None,
            sessions: None,
            budget_store: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// 从文件加载系统提示词，找不到时保留默认提示词
    pub fn with_system_prompt_from_file(mut self) -> Self {
        if let Some(prompt) = ["config/prompts/system.md", "../config/prompts/system.md"]
            .into_iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .filter(|p| !p.trim().is_empty())
        {
            self.system_prompt = prompt;
        }
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ToolGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn with_budget_store(mut self, store: Arc<dyn BudgetStore>) -> Self {
        self.budget_store = Some(store);
        self
    }

    pub async fn build(self) -> Result<Orchestrator, AgentError> {
        let cfg = self.config;
        cfg.validate()?;

        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_client(&cfg.llm)?,
        };
        let gateway = match self.gateway {
            Some(gw) => gw,
            None => create_gateway(&cfg.gateway, default_registry())?,
        };
        let store = match self.sessions {
            Some(s) => s,
            None => create_session_store(cfg.app.data_dir.as_deref()).await?,
        };
        let budget_store = self
            .budget_store
            .unwrap_or_else(|| Arc::new(InMemoryBudgetStore::new()));
        let budget = Arc::new(BudgetTracker::new(budget_store, &cfg.budget).await?);

        let runtime = TurnRuntime {
            planner: Arc::new(Planner::new(llm, self.system_prompt)),
            gateway,
            store,
            budget,
            negotiator: Arc::new(Negotiator::new(cfg.negotiation.tolerance_percent)),
            jobs: Arc::new(JobTracker::new()),
            scheduler: Arc::new(TaskScheduler::new(cfg.agent.max_concurrent_tools)),
            recovery: RecoveryEngine::new(),
            limits: cfg.agent.clone(),
        };
        tracing::info!(
            app = %cfg.app.name,
            strategy = runtime.gateway.mode().as_str(),
            max_iterations = cfg.agent.max_iterations,
            "orchestrator ready"
        );
        Ok(Orchestrator::new(Arc::new(runtime), Arc::new(SessionSupervisor::new())))
    }
}
