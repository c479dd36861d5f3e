//! 记忆层：会话内只追加的对话日志

pub mod conversation;

pub use conversation::{ConversationLog, Message, MessagePayload, Role};
