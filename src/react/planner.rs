//! Planner：拼装 THINKING 提示、调用 LLM、解析带标签的回复
//!
//! 回复协议：`<thinking>` 推理、`<tool_call>` JSON 调用（可多个）、`<answer>` 最终回复、
//! `<question>` 澄清问题、`<negotiate>` 约束协商请求；不带任何标签的文本视为最终回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::negotiation::NegotiationRequest;
use crate::react::TurnMemory;
use crate::tools::{tool_call_schema_json, ToolDescriptor};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an MLOps assistant that plans and runs machine-learning training \
work for the user: discover datasets, pick a model, prepare data, launch training and monitor it. \
You act only through the tools listed below.";

const RESPONSE_RULES: &str = r#"RESPONSE FORMAT:
1. Write your reasoning in a <thinking> block.
2. Then do exactly one of:
   a) call one or more tools, each in its own block:
      <tool_call>{"name": "tool_name", "parameters": {...}}</tool_call>
      Independent calls may be issued together; they run concurrently.
   b) give the final answer: <answer>...</answer>
   c) ask the user a clarifying question: <question>...</question>
   d) when the user's requirements cannot all be met, ask for a negotiation:
      <negotiate>{"constraints": {"min_f1": 90, "max_cost": 2.0}, "options": [{"label": "...", "f1": 87, "cost": 1.5}]}</negotiate>
RULES:
- Use only tools from the catalogue; do not repeat a call whose result is already cached.
- Paid actions are checked against the budget before they run.
- When a tool fails, read the suggestion in the observation and try an alternative.
- Stop calling tools once a training job has been launched successfully."#;

/// 解析得到的工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default, alias = "arguments", alias = "args")]
    pub parameters: Value,
    /// 发起该调用的迭代序号
    #[serde(skip)]
    pub iteration: usize,
}

/// 回复中除工具调用外的收尾动作
#[derive(Debug, Clone)]
pub enum ReplyAction {
    Answer(String),
    Question(String),
    Negotiate(NegotiationRequest),
    /// 只有推理或工具调用，继续循环
    Continue,
}

#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub thinking: Vec<String>,
    pub calls: Vec<ToolCall>,
    pub action: ReplyAction,
}

const TAGS: [&str; 5] = ["thinking", "tool_call", "answer", "question", "negotiate"];

/// 按出现顺序切出已知标签块；未闭合的标签取到文本末尾。返回 (块, 标签外文本)
fn scan_tags(text: &str) -> (Vec<(&'static str, &str)>, String) {
    let mut blocks = Vec::new();
    let mut rest = String::new();
    let mut pos = 0;
    while pos < text.len() {
        let next = TAGS
            .iter()
            .filter_map(|tag| text[pos..].find(&format!("<{tag}>")).map(|i| (pos + i, *tag)))
            .min_by_key(|(i, _)| *i);
        let Some((start, tag)) = next else {
            rest.push_str(&text[pos..]);
            break;
        };
        rest.push_str(&text[pos..start]);
        let body_start = start + tag.len() + 2;
        let close = format!("</{tag}>");
        match text[body_start..].find(&close) {
            Some(i) => {
                blocks.push((tag, &text[body_start..body_start + i]));
                pos = body_start + i + close.len();
            }
            None => {
                blocks.push((tag, &text[body_start..]));
                pos = text.len();
            }
        }
    }
    (blocks, rest)
}

/// 去掉 ```json 围栏
fn strip_fence(body: &str) -> &str {
    let t = body.trim();
    let Some(inner) = t.strip_prefix("```") else {
        return t;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// 解析 LLM 回复；`<tool_call>` / `<negotiate>` 中的 JSON 无效时返回 JsonParse
pub fn parse_reply(text: &str) -> Result<ParsedReply, AgentError> {
    let (blocks, rest) = scan_tags(text);
    let mut thinking = Vec::new();
    let mut calls = Vec::new();
    let mut answer = None;
    let mut question = None;
    let mut negotiate = None;

    for (tag, body) in blocks {
        match tag {
            "thinking" => {
                let t = body.trim();
                if !t.is_empty() {
                    thinking.push(t.to_string());
                }
            }
            "tool_call" => {
                let json = strip_fence(body);
                let call: ToolCall = serde_json::from_str(json)
                    .map_err(|e| AgentError::JsonParse(format!("{e}: {}", crate::gateway::result::truncate(json, 120))))?;
                if call.name.trim().is_empty() {
                    return Err(AgentError::JsonParse("tool call without a name".into()));
                }
                calls.push(call);
            }
            "negotiate" => {
                let json = strip_fence(body);
                let req: NegotiationRequest = serde_json::from_str(json)
                    .map_err(|e| AgentError::JsonParse(format!("invalid <negotiate> block: {e}")))?;
                negotiate = Some(req);
            }
            "answer" => answer = Some(body.trim().to_string()),
            _ => question = Some(body.trim().to_string()),
        }
    }

    for call in &mut calls {
        if call.parameters.is_null() {
            call.parameters = Value::Object(Default::default());
        }
    }

    let untagged = rest.trim();
    let action = if let Some(req) = negotiate {
        ReplyAction::Negotiate(req)
    } else if !calls.is_empty() {
        ReplyAction::Continue
    } else if let Some(a) = answer {
        ReplyAction::Answer(a)
    } else if let Some(q) = question {
        ReplyAction::Question(q)
    } else if !untagged.is_empty() {
        ReplyAction::Answer(untagged.to_string())
    } else {
        ReplyAction::Continue
    };

    Ok(ParsedReply { thinking, calls, action })
}

/// 工具目录段落：`- name: description` + 参数 schema
pub fn format_catalogue(tools: &[ToolDescriptor]) -> String {
    let mut out = String::new();
    for t in tools {
        out.push_str(&format!("- {}: {}\n  parameters: {}\n", t.name, t.description, t.parameters_schema()));
    }
    out
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    tool_call_schema: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            tool_call_schema: tool_call_schema_json(),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 拼装本次 THINKING 的 system：目录、已调用工具与缓存、调用格式 schema、规则、纠错提示
    pub fn build_system(&self, catalogue: &[ToolDescriptor], memory: &TurnMemory, correction: Option<&str>) -> String {
        let mut system = format!(
            "{}\n\nAVAILABLE TOOLS:\n{}\n{}\nTool call JSON schema:\n{}\n\n{}",
            self.system_prompt,
            format_catalogue(catalogue),
            memory.prompt_section(),
            self.tool_call_schema,
            RESPONSE_RULES
        );
        if let Some(c) = correction {
            system.push_str("\n\nCORRECTION: ");
            system.push_str(c);
        }
        system
    }

    pub async fn think(&self, history: &[Message], system: &str) -> Result<String, AgentError> {
        let mut full_messages = vec![Message::system(system.to_string())];
        full_messages.extend(history.iter().cloned());
        self.llm
            .complete(&full_messages)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::default_registry;

    #[test]
    fn test_parse_tool_calls_and_thinking() {
        let reply = r#"<thinking>need data</thinking>
<tool_call>{"name": "list_datasets", "parameters": {}}</tool_call>
<tool_call>
```json
{"name": "check_instance_quotas"}
```
</tool_call>"#;
        let p = parse_reply(reply).unwrap();
        assert_eq!(p.thinking, vec!["need data".to_string()]);
        assert_eq!(p.calls.len(), 2);
        assert_eq!(p.calls[1].name, "check_instance_quotas");
        assert!(p.calls[1].parameters.is_object());
        assert!(matches!(p.action, ReplyAction::Continue));
    }

    #[test]
    fn test_parse_answer_and_untagged() {
        let p = parse_reply("<thinking>done</thinking><answer>Job launched.</answer>").unwrap();
        assert!(matches!(p.action, ReplyAction::Answer(ref a) if a == "Job launched."));

        let p = parse_reply("Plain reply without tags").unwrap();
        assert!(matches!(p.action, ReplyAction::Answer(ref a) if a == "Plain reply without tags"));

        let p = parse_reply("<thinking>still working</thinking>").unwrap();
        assert!(matches!(p.action, ReplyAction::Continue));
        assert!(p.calls.is_empty());

        let p = parse_reply("<question>Which dataset?</question>").unwrap();
        assert!(matches!(p.action, ReplyAction::Question(ref q) if q == "Which dataset?"));
    }

    #[test]
    fn test_parse_invalid_tool_call_json() {
        let err = parse_reply("<tool_call>{name: list_datasets}</tool_call>").unwrap_err();
        assert!(matches!(err, AgentError::JsonParse(_)));
    }

    #[test]
    fn test_parse_negotiate() {
        let p = parse_reply(
            r#"<negotiate>{"constraints": {"min_f1": 90, "max_cost": 2.0}, "options": [{"label": "a", "f1": 87, "cost": 1.5}]}</negotiate>"#,
        )
        .unwrap();
        match p.action {
            ReplyAction::Negotiate(req) => {
                assert_eq!(req.constraints().unwrap().len(), 2);
                assert_eq!(req.options.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_tag_runs_to_end() {
        let p = parse_reply("<answer>truncated reply").unwrap();
        assert!(matches!(p.action, ReplyAction::Answer(ref a) if a == "truncated reply"));
    }

    #[tokio::test]
    async fn test_build_system_and_think() {
        let llm = Arc::new(MockLlmClient::scripted(["<answer>ok</answer>"]));
        let planner = Planner::new(llm.clone(), DEFAULT_SYSTEM_PROMPT);
        let memory = TurnMemory::new();
        let system = planner.build_system(&default_registry().descriptors(), &memory, Some("fix your JSON"));
        assert!(system.contains("- launch_training_job:"));
        assert!(system.contains("Tools already called successfully in this turn: none"));
        assert!(system.contains("CORRECTION: fix your JSON"));

        let reply = planner.think(&[Message::user("hi")], &system).await.unwrap();
        assert_eq!(reply, "<answer>ok</answer>");
        let sent = &llm.received()[0];
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].content, system);
    }
}
