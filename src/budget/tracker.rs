//! 预算跟踪：全局与会话两个作用域同时生效，较严格者决定付费动作能否进行
//!
//! 所有「检查再写入」都在同一把 tokio Mutex 内完成，避免并发会话同时通过 can_afford
//! 后瓜分同一份余量。付费动作走 reserve → commit / release。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::budget::{BudgetRecord, BudgetScope, BudgetStore};
use crate::config::BudgetSection;
use crate::core::AgentError;

const EPSILON: f64 = 1e-9;

/// 用量越过预警阈值
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetWarning {
    pub scope: String,
    pub spent: f64,
    pub limit: f64,
    pub usage_percent: f64,
}

/// 付费动作的预留额度；commit 或 release 时消费
#[derive(Debug)]
pub struct Reservation {
    session_id: String,
    amount: f64,
}

impl Reservation {
    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

pub struct BudgetTracker {
    store: Arc<dyn BudgetStore>,
    /// 作用域 -> 已预留未提交金额；同时作为全局串行化锁
    reserved: Mutex<HashMap<BudgetScope, f64>>,
    default_session_limit: f64,
    warning_threshold_percent: f64,
}

impl BudgetTracker {
    /// 创建跟踪器；全局限额不存在时写入配置值
    pub async fn new(store: Arc<dyn BudgetStore>, cfg: &BudgetSection) -> Result<Self, AgentError> {
        if store.get_budget(&BudgetScope::Global).await?.is_none() {
            store.set_budget(&BudgetScope::Global, cfg.global_limit_usd).await?;
        }
        Ok(Self {
            store,
            reserved: Mutex::new(HashMap::new()),
            default_session_limit: cfg.default_session_limit_usd,
            warning_threshold_percent: cfg.warning_threshold_percent,
        })
    }

    pub fn default_session_limit(&self) -> f64 {
        self.default_session_limit
    }

    /// 打开会话作用域；limit 为空时使用默认会话限额
    pub async fn open_session(&self, session_id: &str, limit: Option<f64>) -> Result<BudgetRecord, AgentError> {
        let _guard = self.reserved.lock().await;
        self.store
            .set_budget(&BudgetScope::session(session_id), limit.unwrap_or(self.default_session_limit))
            .await
    }

    pub async fn set_limit(&self, scope: &BudgetScope, limit: f64) -> Result<BudgetRecord, AgentError> {
        let _guard = self.reserved.lock().await;
        self.store.set_budget(scope, limit).await
    }

    pub async fn status(&self, scope: &BudgetScope) -> Result<Option<BudgetRecord>, AgentError> {
        self.store.get_budget(scope).await
    }

    /// 余量（扣除预留后）
    pub async fn remaining(&self, scope: &BudgetScope) -> Result<f64, AgentError> {
        let reserved = self.reserved.lock().await;
        self.available(scope, &reserved).await
    }

    pub async fn can_afford(&self, scope: &BudgetScope, amount: f64) -> Result<bool, AgentError> {
        let reserved = self.reserved.lock().await;
        Ok(amount <= self.available(scope, &reserved).await? + EPSILON)
    }

    /// 记录一笔已发生的花费；超过限额只告警（软约束），不阻断
    pub async fn record(&self, scope: &BudgetScope, amount: f64) -> Result<Option<BudgetWarning>, AgentError> {
        let _guard = self.reserved.lock().await;
        let before = self.store.get_budget(scope).await?;
        let after = self.store.record_spend(scope, amount).await?;
        Ok(self.crossed(before.as_ref(), &after))
    }

    /// 为付费动作预留额度：全局与会话两个作用域都必须放得下
    pub async fn reserve(&self, session_id: &str, amount: f64) -> Result<Reservation, AgentError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AgentError::Validation {
                tool: "budget".into(),
                problems: vec![format!("invalid cost {amount}")],
            });
        }
        let mut reserved = self.reserved.lock().await;
        let session = BudgetScope::session(session_id);
        if self.store.get_budget(&session).await?.is_none() {
            self.store.set_budget(&session, self.default_session_limit).await?;
        }

        for scope in [&session, &BudgetScope::Global] {
            let available = self.available(scope, &reserved).await?;
            if amount > available + EPSILON {
                tracing::warn!(scope = %scope, requested = amount, remaining = available, "budget gate denied");
                return Err(AgentError::BudgetExceeded {
                    scope: scope.to_string(),
                    requested: amount,
                    remaining: available,
                });
            }
        }

        *reserved.entry(session).or_insert(0.0) += amount;
        *reserved.entry(BudgetScope::Global).or_insert(0.0) += amount;
        Ok(Reservation {
            session_id: session_id.to_string(),
            amount,
        })
    }

    /// 付费动作成功：预留转为花费，返回越过阈值的告警
    pub async fn commit(&self, reservation: Reservation) -> Result<Vec<BudgetWarning>, AgentError> {
        let mut reserved = self.reserved.lock().await;
        let session = BudgetScope::session(&reservation.session_id);
        let mut warnings = Vec::new();
        for scope in [session, BudgetScope::Global] {
            unreserve(&mut reserved, &scope, reservation.amount);
            let before = self.store.get_budget(&scope).await?;
            let after = self.store.record_spend(&scope, reservation.amount).await?;
            if let Some(w) = self.crossed(before.as_ref(), &after) {
                warnings.push(w);
            }
        }
        Ok(warnings)
    }

    /// 付费动作失败：归还预留
    pub async fn release(&self, reservation: Reservation) {
        let mut reserved = self.reserved.lock().await;
        unreserve(&mut reserved, &BudgetScope::session(&reservation.session_id), reservation.amount);
        unreserve(&mut reserved, &BudgetScope::Global, reservation.amount);
    }

    pub async fn reset(&self, scope: &BudgetScope) -> Result<(), AgentError> {
        let _guard = self.reserved.lock().await;
        tracing::info!(scope = %scope, "budget reset");
        self.store.reset(scope).await
    }

    async fn available(&self, scope: &BudgetScope, reserved: &HashMap<BudgetScope, f64>) -> Result<f64, AgentError> {
        let record = self.store.get_budget(scope).await?;
        let pending = reserved.get(scope).copied().unwrap_or(0.0);
        Ok(record.map(|r| (r.remaining() - pending).max(0.0)).unwrap_or(0.0))
    }

    fn crossed(&self, before: Option<&BudgetRecord>, after: &BudgetRecord) -> Option<BudgetWarning> {
        let was = before.map(BudgetRecord::usage_percent).unwrap_or(0.0);
        let now = after.usage_percent();
        if now >= self.warning_threshold_percent && was < self.warning_threshold_percent {
            tracing::warn!(scope = %after.scope, spent = after.spent, limit = after.limit, "budget warning threshold crossed");
            Some(BudgetWarning {
                scope: after.scope.to_string(),
                spent: after.spent,
                limit: after.limit,
                usage_percent: now,
            })
        } else {
            None
        }
    }
}

fn unreserve(reserved: &mut HashMap<BudgetScope, f64>, scope: &BudgetScope, amount: f64) {
    if let Some(v) = reserved.get_mut(scope) {
        *v = (*v - amount).max(0.0);
        if *v <= EPSILON {
            reserved.remove(scope);
        }
    }
}
