//! 会话存储抽象层
//!
//! 编排器只通过该接口读写会话，从不内嵌存储逻辑；提供内存与 JSON 文件两种实现。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::core::AgentError;
use crate::memory::Message;
use crate::session::{Session, SessionConfig, SessionSummary};

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, id: &str) -> Result<Session, AgentError>;

    /// 追加消息，返回其在日志中的序号；已归档会话拒绝写入
    async fn append_message(&self, id: &str, message: Message) -> Result<usize, AgentError>;

    async fn create_session(&self, config: SessionConfig) -> Result<Session, AgentError>;

    /// 按创建时间升序
    async fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionSummary>, AgentError>;

    /// 归档后只读
    async fn archive_session(&self, id: &str) -> Result<(), AgentError>;
}

fn sorted_summaries<'a>(sessions: impl Iterator<Item = &'a Session>, include_archived: bool) -> Vec<SessionSummary> {
    let mut out: Vec<SessionSummary> = sessions
        .filter(|s| include_archived || !s.archived)
        .map(Session::summary)
        .collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    out
}

/// 内存会话存储
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, id: &str) -> Result<Session, AgentError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    async fn append_message(&self, id: &str, message: Message) -> Result<usize, AgentError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        if session.archived {
            return Err(AgentError::SessionArchived(id.to_string()));
        }
        Ok(session.append(message))
    }

    async fn create_session(&self, config: SessionConfig) -> Result<Session, AgentError> {
        let session = Session::new(config);
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionSummary>, AgentError> {
        Ok(sorted_summaries(self.sessions.read().await.values(), include_archived))
    }

    async fn archive_session(&self, id: &str) -> Result<(), AgentError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        session.archived = true;
        Ok(())
    }
}

/// JSON 文件会话存储：每个会话一个 `<id>.json`（pretty 格式）
///
/// 写操作经同一把锁串行化，整文件重写。
pub struct JsonFileSessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSessionStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AgentError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AgentError::Store(format!("create {}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, AgentError> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AgentError::SessionNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn load(&self, id: &str) -> Result<Session, AgentError> {
        let path = self.path_for(id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentError::SessionNotFound(id.to_string()))
            }
            Err(e) => return Err(AgentError::Store(format!("read {}: {e}", path.display()))),
        };
        serde_json::from_str(&data).map_err(|e| AgentError::Store(format!("parse {}: {e}", path.display())))
    }

    async fn save(&self, session: &Session) -> Result<(), AgentError> {
        let path = self.path_for(&session.id)?;
        let data = serde_json::to_string_pretty(session).map_err(|e| AgentError::Store(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| AgentError::Store(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AgentError::Store(format!("rename {}: {e}", path.display())))
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn get_session(&self, id: &str) -> Result<Session, AgentError> {
        self.load(id).await
    }

    async fn append_message(&self, id: &str, message: Message) -> Result<usize, AgentError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?;
        if session.archived {
            return Err(AgentError::SessionArchived(id.to_string()));
        }
        let index = session.append(message);
        self.save(&session).await?;
        Ok(index)
    }

    async fn create_session(&self, config: SessionConfig) -> Result<Session, AgentError> {
        let _guard = self.write_lock.lock().await;
        let session = Session::new(config);
        self.save(&session).await?;
        Ok(session)
    }

    async fn list_sessions(&self, include_archived: bool) -> Result<Vec<SessionSummary>, AgentError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| AgentError::Store(format!("list {}: {e}", self.dir.display())))?;
        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::Store(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(id).await {
                Ok(s) => sessions.push(s),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session file"),
            }
        }
        Ok(sorted_summaries(sessions.iter(), include_archived))
    }

    async fn archive_session(&self, id: &str) -> Result<(), AgentError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?;
        session.archived = true;
        self.save(&session).await
    }
}

/// 按配置选择实现：设置了 data_dir 则用 JSON 文件存储，否则内存存储
pub async fn create_session_store(data_dir: Option<&Path>) -> Result<Arc<dyn SessionStore>, AgentError> {
    match data_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "using JSON file session store");
            Ok(Arc::new(JsonFileSessionStore::open(dir).await?))
        }
        None => Ok(Arc::new(InMemorySessionStore::new())),
    }
}
