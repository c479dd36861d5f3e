//! 预算持久化接口与内存实现

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::AgentError;

/// 预算作用域：全局或单个会话
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BudgetScope {
    Global,
    Session(String),
}

impl BudgetScope {
    pub fn session(id: &str) -> Self {
        BudgetScope::Session(id.to_string())
    }
}

impl fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetScope::Global => write!(f, "global"),
            BudgetScope::Session(id) => write!(f, "session:{id}"),
        }
    }
}

impl From<BudgetScope> for String {
    fn from(scope: BudgetScope) -> Self {
        scope.to_string()
    }
}

impl TryFrom<String> for BudgetScope {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "global" {
            Ok(BudgetScope::Global)
        } else if let Some(id) = s.strip_prefix("session:").filter(|id| !id.is_empty()) {
            Ok(BudgetScope::Session(id.to_string()))
        } else {
            Err(format!("invalid budget scope: {s}"))
        }
    }
}

/// 作用域的限额与累计花费（美元）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub scope: BudgetScope,
    pub limit: f64,
    pub spent: f64,
}

impl BudgetRecord {
    pub fn new(scope: BudgetScope, limit: f64) -> Self {
        Self { scope, limit, spent: 0.0 }
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.spent).max(0.0)
    }

    pub fn usage_percent(&self) -> f64 {
        if self.limit <= 0.0 {
            if self.spent > 0.0 {
                100.0
            } else {
                0.0
            }
        } else {
            self.spent / self.limit * 100.0
        }
    }
}

/// 预算持久化协作方
#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<BudgetRecord>, AgentError>;

    /// 设置限额；已有花费保留
    async fn set_budget(&self, scope: &BudgetScope, limit: f64) -> Result<BudgetRecord, AgentError>;

    /// 累加花费（只增不减）
    async fn record_spend(&self, scope: &BudgetScope, amount: f64) -> Result<BudgetRecord, AgentError>;

    /// 管理性清零：唯一的花费回退路径
    async fn reset(&self, scope: &BudgetScope) -> Result<(), AgentError>;
}

#[derive(Default)]
pub struct InMemoryBudgetStore {
    records: RwLock<HashMap<BudgetScope, BudgetRecord>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<BudgetRecord>, AgentError> {
        Ok(self.records.read().await.get(scope).cloned())
    }

    async fn set_budget(&self, scope: &BudgetScope, limit: f64) -> Result<BudgetRecord, AgentError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(scope.clone())
            .or_insert_with(|| BudgetRecord::new(scope.clone(), limit));
        record.limit = limit;
        Ok(record.clone())
    }

    async fn record_spend(&self, scope: &BudgetScope, amount: f64) -> Result<BudgetRecord, AgentError> {
        if amount < 0.0 {
            return Err(AgentError::Store(format!("negative spend {amount} for {scope}")));
        }
        let mut records = self.records.write().await;
        let record = records
            .get_mut(scope)
            .ok_or_else(|| AgentError::Store(format!("no budget set for {scope}")))?;
        record.spent += amount;
        Ok(record.clone())
    }

    async fn reset(&self, scope: &BudgetScope) -> Result<(), AgentError> {
        if let Some(record) = self.records.write().await.get_mut(scope) {
            record.spent = 0.0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display_roundtrip() {
        assert_eq!(BudgetScope::Global.to_string(), "global");
        assert_eq!(BudgetScope::session("abc").to_string(), "session:abc");
        assert_eq!(BudgetScope::try_from("session:abc".to_string()).unwrap(), BudgetScope::session("abc"));
        assert!(BudgetScope::try_from("session:".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_store_spend_and_reset() {
        let store = InMemoryBudgetStore::new();
        let scope = BudgetScope::session("s1");
        assert!(store.record_spend(&scope, 1.0).await.is_err());
        store.set_budget(&scope, 5.0).await.unwrap();
        let r = store.record_spend(&scope, 2.0).await.unwrap();
        assert_eq!(r.spent, 2.0);
        assert_eq!(r.remaining(), 3.0);
        assert!(store.record_spend(&scope, -1.0).await.is_err());
        store.reset(&scope).await.unwrap();
        assert_eq!(store.get_budget(&scope).await.unwrap().unwrap().spent, 0.0);
    }
}
