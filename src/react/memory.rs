//! 轮内工作记忆：已成功调用的工具集合与幂等工具结果缓存
//!
//! 缓存键为「工具名 + 规范化参数 JSON」（对象键排序），参数顺序不影响命中。

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::gateway::result::truncate;
use crate::gateway::ToolResult;
use crate::tools::ToolEffect;

/// 注入 prompt 的缓存结果摘要长度
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Default)]
pub struct TurnMemory {
    tools_called: BTreeSet<String>,
    cache: HashMap<String, ToolResult>,
    /// 缓存写入顺序（prompt 中按此顺序列出）
    order: Vec<(String, String)>,
    /// 本轮所有成功结果的一行摘要（用于部分结果消息）
    findings: Vec<String>,
}

fn canonical(v: &Value) -> String {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => format!("[{}]", items.iter().map(canonical).collect::<Vec<_>>().join(",")),
        other => other.to_string(),
    }
}

fn cache_key(tool: &str, params: &Value) -> String {
    format!("{tool}:{}", canonical(params))
}

impl TurnMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, tool: &str, params: &Value) -> Option<&ToolResult> {
        self.cache.get(&cache_key(tool, params))
    }

    /// 记录一次真实调用的结果；只有成功且可缓存的结果进入缓存
    pub fn remember(&mut self, effect: &ToolEffect, tool: &str, params: &Value, result: &ToolResult) {
        if !result.success {
            return;
        }
        self.tools_called.insert(tool.to_string());
        let summary = result
            .payload
            .as_ref()
            .map(|p| truncate(&p.to_string(), SUMMARY_CHARS))
            .unwrap_or_default();
        self.findings.push(format!("{tool}: {summary}"));
        if effect.is_cacheable() {
            let key = cache_key(tool, params);
            if !self.cache.contains_key(&key) {
                self.order.push((key.clone(), summary));
            }
            self.cache.insert(key, result.clone());
        }
    }

    pub fn tools_called(&self) -> impl Iterator<Item = &str> {
        self.tools_called.iter().map(String::as_str)
    }

    pub fn findings(&self) -> &[String] {
        &self.findings
    }

    /// THINKING 提示中的「已调用工具 + 缓存结果」段落
    pub fn prompt_section(&self) -> String {
        let mut out = String::new();
        if self.tools_called.is_empty() {
            out.push_str("Tools already called successfully in this turn: none\n");
        } else {
            let names: Vec<&str> = self.tools_called().collect();
            out.push_str(&format!(
                "Tools already called successfully in this turn: {}\n",
                names.join(", ")
            ));
        }
        if !self.order.is_empty() {
            out.push_str("Cached results (repeat calls with identical parameters return these without re-invoking):\n");
            for (key, summary) in &self.order {
                out.push_str(&format!("- {key} => {summary}\n"));
            }
        }
        out
    }
}
