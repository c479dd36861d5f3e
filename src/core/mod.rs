//! 核心编排层：错误与恢复、轮次状态、会话监管、工具并发调度、编排器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod session_supervisor;
pub mod state;
pub mod task_scheduler;

pub use builder::OrchestratorBuilder;
pub use error::{AgentError, RecoveryAction};
pub use orchestrator::{Orchestrator, TurnHandle};
pub use recovery::RecoveryEngine;
pub use session_supervisor::SessionSupervisor;
pub use state::{TurnPhase, TurnState};
pub use task_scheduler::TaskScheduler;
