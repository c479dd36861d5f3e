//! 工具注册表
//!
//! 静态映射：工具名 -> 调用目标 + 描述 + 参数 schema。构建后只读；编排器按名查找，
//! 未注册的名字一律视为未知工具，不做任何动态调用。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 参数类型（JSON 类型子集）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamKind {
    fn matches(self, v: &Value) -> bool {
        match self {
            ParamKind::String => v.is_string(),
            ParamKind::Number => v.is_number(),
            ParamKind::Integer => v.is_i64() || v.is_u64(),
            ParamKind::Boolean => v.is_boolean(),
            ParamKind::Object => v.is_object(),
            ParamKind::Array => v.is_array(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
        }
    }
}

/// 单个参数的声明
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// 工具副作用类别：决定缓存、预算闸门与完成判定
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ToolEffect {
    /// 只读且幂等：同一轮内相同参数只调用一次
    Idempotent,
    /// 只读但结果随时间变化（如状态轮询），不缓存
    Volatile,
    /// 改变系统状态，不收费
    StateChanging,
    /// 改变系统状态且收费；费用取自 `cost_param` 参数
    Paid { cost_param: String },
}

impl ToolEffect {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ToolEffect::Idempotent)
    }

    pub fn changes_state(&self) -> bool {
        matches!(self, ToolEffect::StateChanging | ToolEffect::Paid { .. })
    }

    /// 成功后即可结束本轮（训练发布）；数据准备等中间步骤之后仍需继续推理
    pub fn completes_turn(&self) -> bool {
        matches!(self, ToolEffect::Paid { .. })
    }
}

/// 工具描述符
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    /// 后端调用目标（函数名 / 路径）
    pub target: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    #[serde(flatten)]
    pub effect: ToolEffect,
}

impl ToolDescriptor {
    pub fn new(name: &str, target: &str, description: &str, effect: ToolEffect) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            effect,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// 校验参数：必须是对象，必填项存在且非 null，已声明参数类型匹配；收费工具的费用不能为负
    pub fn validate(&self, params: &Value) -> Result<(), Vec<String>> {
        let Some(obj) = params.as_object() else {
            return Err(vec!["parameters must be a JSON object".to_string()]);
        };
        let mut problems = Vec::new();
        for spec in &self.parameters {
            match obj.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    problems.push(format!("missing required parameter '{}'", spec.name));
                }
                None | Some(Value::Null) => {}
                Some(v) if !spec.kind.matches(v) => problems.push(format!(
                    "parameter '{}' must be {}",
                    spec.name,
                    spec.kind.as_str()
                )),
                Some(_) => {}
            }
        }
        if let ToolEffect::Paid { cost_param } = &self.effect {
            if let Some(cost) = obj.get(cost_param).and_then(Value::as_f64) {
                if !cost.is_finite() || cost < 0.0 {
                    problems.push(format!("parameter '{cost_param}' must be a non-negative amount, got {cost}"));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// 收费工具的预估费用（参数缺失或非数值时为 None）
    pub fn cost_of(&self, params: &Value) -> Option<f64> {
        match &self.effect {
            ToolEffect::Paid { cost_param } => params.get(cost_param).and_then(Value::as_f64),
            _ => None,
        }
    }

    /// 参数的 JSON Schema（供 prompt 展示）
    pub fn parameters_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind.as_str(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// 工具注册表：按名称存储描述符（BTreeMap 保证目录顺序稳定）
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<ToolDescriptor> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolDescriptor>>(iter: I) -> Self {
        let mut registry = ToolRegistry::new();
        for d in iter {
            registry.register(d);
        }
        registry
    }
}
