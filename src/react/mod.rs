//! 认知层：Planner（提示词与回复解析）、轮内记忆、ReAct 主循环与事件

pub mod events;
pub mod loop_;
pub mod memory;
pub mod planner;

pub use events::AgentEvent;
pub use loop_::{run_turn, TurnOutcome, TurnRuntime};
pub use memory::TurnMemory;
pub use planner::{format_catalogue, parse_reply, ParsedReply, Planner, ReplyAction, ToolCall, DEFAULT_SYSTEM_PROMPT};
