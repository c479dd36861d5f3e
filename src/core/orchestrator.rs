//! 编排器：会话生命周期与单轮调度
//!
//! 每条用户消息启动一个后台任务运行 ReAct 轮次，事件经无界通道推送给调用方；
//! 同一会话同时只允许一轮，不同会话的轮次互不阻塞。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::budget::{BudgetRecord, BudgetScope};
use crate::config::{load_config, AppConfig};
use crate::core::{AgentError, OrchestratorBuilder, SessionSupervisor};
use crate::gateway::ToolGateway;
use crate::jobs::Job;
use crate::react::{run_turn, AgentEvent, TurnOutcome, TurnRuntime};
use crate::session::{Session, SessionConfig, SessionSummary};

/// 进行中的一轮：事件流 + 取消 + 最终结果
pub struct TurnHandle {
    pub events: mpsc::UnboundedReceiver<AgentEvent>,
    cancel: CancellationToken,
    join: JoinHandle<Result<TurnOutcome, AgentError>>,
}

impl TurnHandle {
    /// 请求取消；已下发的工具调用会跑完但结果被丢弃
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 等待本轮结束（不消费事件）
    pub async fn join(self) -> Result<TurnOutcome, AgentError> {
        self.join.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "turn task aborted");
            Err(AgentError::Cancelled)
        })
    }

    /// 收集全部事件与最终结果
    pub async fn collect(mut self) -> (Vec<AgentEvent>, Result<TurnOutcome, AgentError>) {
        let mut events = Vec::new();
        while let Some(ev) = self.events.recv().await {
            events.push(ev);
        }
        let result = self.join().await;
        (events, result)
    }
}

pub struct Orchestrator {
    runtime: Arc<TurnRuntime>,
    supervisor: Arc<SessionSupervisor>,
}

impl Orchestrator {
    pub(crate) fn new(runtime: Arc<TurnRuntime>, supervisor: Arc<SessionSupervisor>) -> Self {
        Self { runtime, supervisor }
    }

    pub fn builder(config: AppConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// 加载配置并按配置构建全部组件
    pub async fn from_config_file(path: Option<std::path::PathBuf>) -> Result<Self, AgentError> {
        let cfg = load_config(path)?;
        OrchestratorBuilder::new(cfg).with_system_prompt_from_file().build().await
    }

    /// 新建会话并登记会话预算；限额非正时使用默认会话限额
    pub async fn create_session(&self, mut config: SessionConfig) -> Result<Session, AgentError> {
        if !(config.budget_limit > 0.0) {
            config.budget_limit = self.runtime.budget.default_session_limit();
        }
        let session = self.runtime.store.create_session(config).await?;
        let record = self
            .runtime
            .budget
            .open_session(&session.id, Some(session.budget_limit))
            .await?;
        tracing::info!(session = %session.id, limit = record.limit, "session created");
        Ok(session)
    }

    /// 提交一条用户消息；同一会话已有进行中的轮次时返回 SessionBusy
    pub async fn handle_message(&self, session_id: &str, text: &str) -> Result<TurnHandle, AgentError> {
        let session = self.runtime.store.get_session(session_id).await?;
        if session.archived {
            return Err(AgentError::SessionArchived(session_id.to_string()));
        }
        let cancel = self.supervisor.begin_turn(session_id).await?;
        let (tx, rx) = mpsc::unbounded_channel();

        let runtime = Arc::clone(&self.runtime);
        let supervisor = Arc::clone(&self.supervisor);
        let sid = session_id.to_string();
        let text = text.to_string();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            let result = run_turn(&runtime, &sid, &text, &tx, token).await;
            supervisor.end_turn(&sid).await;
            result
        });

        Ok(TurnHandle {
            events: rx,
            cancel,
            join,
        })
    }

    /// 取消会话当前轮；没有进行中的轮次时返回 false
    pub async fn cancel(&self, session_id: &str) -> bool {
        self.supervisor.cancel(session_id).await
    }

    /// 归档会话：先取消进行中的轮次，之后只读
    pub async fn archive_session(&self, session_id: &str) -> Result<(), AgentError> {
        self.supervisor.cancel(session_id).await;
        self.runtime.store.archive_session(session_id).await?;
        tracing::info!(session = session_id, "session archived");
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, AgentError> {
        self.runtime.store.get_session(session_id).await
    }

    pub async fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionSummary>, AgentError> {
        self.runtime.store.list_sessions(include_archived).await
    }

    pub async fn jobs(&self, session_id: &str) -> Vec<Job> {
        self.runtime.jobs.list_for_session(session_id).await
    }

    pub async fn budget_status(&self, scope: &BudgetScope) -> Result<Option<BudgetRecord>, AgentError> {
        self.runtime.budget.status(scope).await
    }

    pub fn gateway(&self) -> Arc<dyn ToolGateway> {
        Arc::clone(&self.runtime.gateway)
    }

    /// LLM token 用量 (prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.runtime.planner.token_usage()
    }

    /// 取消所有会话的进行中轮次
    pub fn shutdown(&self) {
        tracing::info!("orchestrator shutting down");
        self.supervisor.shutdown();
    }
}
