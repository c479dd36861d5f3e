//! LLMOps Agent - 自主模型训练智能体核心
//!
//! 模块划分：
//! - **budget**: 全局 / 会话两级预算，付费动作前的预留与提交
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、轮次状态、错误恢复、会话监管、工具并发调度
//! - **gateway**: 工具网关（直连 / 路由两种策略）与结果归一化
//! - **jobs**: 训练任务跟踪
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 只追加的会话对话日志
//! - **negotiation**: 约束冲突检测与备选方案排序
//! - **observability**: tracing 初始化
//! - **react**: Planner、轮内记忆、ReAct 主循环与事件
//! - **session**: 会话模型与存储（内存 / JSON 文件）
//! - **tools**: 工具注册表与默认目录

pub mod budget;
pub mod config;
pub mod core;
pub mod gateway;
pub mod jobs;
pub mod llm;
pub mod memory;
pub mod negotiation;
pub mod observability;
pub mod react;
pub mod session;
pub mod tools;

pub use crate::core::{AgentError, Orchestrator, OrchestratorBuilder, TurnHandle};
pub use crate::react::AgentEvent;
