//! 工具调用 JSON Schema 生成（schemars 自动生成）
//!
//! 将 `<tool_call>` 内合法 JSON 的结构注入 system prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};
use std::collections::HashMap;

/// 工具调用格式：与推理解析的 `{"name": "...", "parameters": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，必须出现在工具目录中
    pub name: String,
    /// 工具参数，依工具不同而不同
    pub parameters: HashMap<String, serde_json::Value>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
