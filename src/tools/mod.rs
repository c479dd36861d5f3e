//! 工具层：静态注册表、默认目录、调用格式 Schema

pub mod catalog;
pub mod registry;
pub mod schema;

pub use catalog::default_registry;
pub use registry::{ParamKind, ParamSpec, ToolDescriptor, ToolEffect, ToolRegistry};
pub use schema::tool_call_schema_json;
