//! 会话：数据模型与存储协作方

pub mod model;
pub mod store;

pub use model::{Session, SessionConfig, SessionSummary};
pub use store::{create_session_store, InMemorySessionStore, JsonFileSessionStore, SessionStore};
