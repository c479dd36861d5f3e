//! ReAct 主循环：单轮 think → act → observe
//!
//! 每轮受迭代上限与墙钟截止时间双重约束，先到者结束本轮；取消只在迭代之间（及思考期间）生效，
//! 已下发的工具调用跑完后结果丢弃。会话记忆在每次推理与每次观察后追加，事件按产生顺序推送。

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::budget::{BudgetTracker, BudgetWarning, Reservation};
use crate::config::AgentSection;
use crate::core::{AgentError, RecoveryAction, RecoveryEngine, TaskScheduler, TurnPhase, TurnState};
use crate::gateway::result::truncate;
use crate::gateway::{ToolErrorKind, ToolFailure, ToolGateway, ToolResult};
use crate::jobs::{Job, JobTracker};
use crate::memory::{ConversationLog, Message, Role};
use crate::negotiation::{Alternative, CandidateOption, Constraint, NegotiationRequest, Negotiator, COST_METRIC};
use crate::react::{parse_reply, AgentEvent, Planner, ReplyAction, ToolCall, TurnMemory};
use crate::session::SessionStore;
use crate::tools::catalog::SELECT_MODEL;
use crate::tools::{ToolDescriptor, ToolEffect};

/// 事件中结果预览长度
const PREVIEW_CHARS: usize = 200;

/// 一轮所需的共享组件
pub struct TurnRuntime {
    pub planner: Arc<Planner>,
    pub gateway: Arc<dyn ToolGateway>,
    pub store: Arc<dyn SessionStore>,
    pub budget: Arc<BudgetTracker>,
    pub negotiator: Arc<Negotiator>,
    pub jobs: Arc<JobTracker>,
    pub scheduler: Arc<TaskScheduler>,
    pub recovery: RecoveryEngine,
    pub limits: AgentSection,
}

/// 正常结束的一轮
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub iterations: usize,
    pub response: String,
    pub jobs: Vec<Job>,
}

fn send_event(tx: &UnboundedSender<AgentEvent>, ev: AgentEvent) {
    let _ = tx.send(ev);
}

/// 执行一轮；结束本轮的错误先以 error 事件推送，再作为 Err 返回
pub async fn run_turn(
    rt: &TurnRuntime,
    session_id: &str,
    user_text: &str,
    tx: &UnboundedSender<AgentEvent>,
    cancel: CancellationToken,
) -> Result<TurnOutcome, AgentError> {
    let result = drive(rt, session_id, user_text, tx, cancel).await;
    match &result {
        Ok(outcome) => {
            tracing::info!(session = session_id, iterations = outcome.iterations, "turn completed");
        }
        Err(e) => {
            tracing::warn!(session = session_id, kind = e.kind(), error = %e, "turn ended with error");
            send_event(
                tx,
                AgentEvent::Error {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    next_steps: e.next_steps(),
                },
            );
        }
    }
    result
}

async fn drive(
    rt: &TurnRuntime,
    session_id: &str,
    user_text: &str,
    tx: &UnboundedSender<AgentEvent>,
    cancel: CancellationToken,
) -> Result<TurnOutcome, AgentError> {
    let session = rt.store.get_session(session_id).await?;
    if session.archived {
        return Err(AgentError::SessionArchived(session_id.to_string()));
    }
    let started = Instant::now();
    let mut turn = Turn {
        rt,
        session_id,
        tx,
        cancel,
        log: session.messages,
        memory: TurnMemory::new(),
        state: TurnState::new(),
        catalogue: Vec::new(),
        launched: Vec::new(),
        started,
        deadline: started + Duration::from_secs(rt.limits.turn_timeout_secs),
    };
    turn.append(Message::user(user_text)).await?;
    turn.catalogue = rt.gateway.list_tools().await;
    turn.run().await
}

/// 一次工具调用在下发前的处置
enum Planned {
    /// 本地拒绝（未知工具 / 参数校验失败），从不下发
    Rejected {
        call: ToolCall,
        failure: ToolFailure,
        observation: String,
    },
    /// 命中本轮缓存
    Cached { call: ToolCall, result: ToolResult },
    /// 与同一步内更早的相同幂等调用合并
    SameAs { call: ToolCall, index: usize },
    Dispatch {
        call: ToolCall,
        descriptor: ToolDescriptor,
        reservation: Option<Reservation>,
    },
}

enum StepOutcome {
    Continue,
    /// 状态变更类调用成功且无后续动作
    Complete(String),
}

struct Turn<'a> {
    rt: &'a TurnRuntime,
    session_id: &'a str,
    tx: &'a UnboundedSender<AgentEvent>,
    cancel: CancellationToken,
    log: ConversationLog,
    memory: TurnMemory,
    state: TurnState,
    catalogue: Vec<ToolDescriptor>,
    launched: Vec<Job>,
    started: Instant,
    deadline: Instant,
}

impl<'a> Turn<'a> {
    fn emit(&self, ev: AgentEvent) {
        send_event(self.tx, ev);
    }

    /// 先写存储，再写本地日志
    async fn append(&mut self, message: Message) -> Result<(), AgentError> {
        self.rt.store.append_message(self.session_id, message.clone()).await?;
        self.log.append(message);
        Ok(())
    }

    async fn run(&mut self) -> Result<TurnOutcome, AgentError> {
        let mut correction: Option<String> = None;
        loop {
            if self.cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if self.state.iteration() >= self.rt.limits.max_iterations {
                return Err(self.iteration_limit().await);
            }
            if Instant::now() >= self.deadline {
                return Err(self.timed_out().await);
            }

            self.state.transition(TurnPhase::Thinking);
            let iteration = self.state.iteration();
            tracing::info!(session = self.session_id, iteration, "thinking");

            let system = self.rt.planner.build_system(&self.catalogue, &self.memory, correction.as_deref());
            correction = None;
            let history = self.log.window(self.rt.limits.history_window).to_vec();
            let thought = tokio::select! {
                _ = self.cancel.cancelled() => None,
                r = timeout_at(self.deadline, self.rt.planner.think(&history, &system)) => Some(r),
            };
            let reply = match thought {
                None => return Err(AgentError::Cancelled),
                Some(Err(_)) => return Err(self.timed_out().await),
                Some(Ok(r)) => r?,
            };

            let parsed = match parse_reply(&reply) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(session = self.session_id, iteration, error = %e, "unparseable reply");
                    self.append(Message::agent(reply)).await?;
                    match self.rt.recovery.handle(&e) {
                        RecoveryAction::RetryWithPrompt(prompt) => {
                            correction = Some(prompt);
                            continue;
                        }
                        _ => return Err(e),
                    }
                }
            };

            for text in &parsed.thinking {
                self.emit(AgentEvent::ReasoningStep {
                    iteration,
                    text: text.clone(),
                });
            }

            match parsed.action {
                ReplyAction::Answer(text) | ReplyAction::Question(text) => {
                    return self.finish(text, parsed.thinking, None).await;
                }
                ReplyAction::Negotiate(req) => {
                    self.append(Message::agent(reply).with_reasoning(parsed.thinking.clone())).await?;
                    match req.constraints() {
                        Ok(constraints) => return self.negotiate(req, constraints, parsed.thinking).await,
                        Err(problem) => {
                            if let RecoveryAction::RetryWithPrompt(prompt) =
                                self.rt.recovery.handle(&AgentError::JsonParse(problem))
                            {
                                correction = Some(prompt);
                            }
                            continue;
                        }
                    }
                }
                ReplyAction::Continue => {
                    self.append(Message::agent(reply).with_reasoning(parsed.thinking.clone())).await?;
                    if parsed.calls.is_empty() {
                        continue;
                    }
                    let calls = parsed
                        .calls
                        .into_iter()
                        .map(|mut c| {
                            c.iteration = iteration;
                            c
                        })
                        .collect();
                    match self.act(calls, iteration).await? {
                        StepOutcome::Continue => continue,
                        StepOutcome::Complete(summary) => return self.finish(summary, parsed.thinking, None).await,
                    }
                }
            }
        }
    }

    /// ACTING + OBSERVING：校验 → 缓存 → 预算闸门 → 并发下发 → 按发起顺序写回观察
    async fn act(&mut self, calls: Vec<ToolCall>, iteration: usize) -> Result<StepOutcome, AgentError> {
        self.state.transition(TurnPhase::Acting);

        let mut planned: Vec<Planned> = Vec::with_capacity(calls.len());
        for call in calls {
            let Some(descriptor) = self.catalogue.iter().find(|d| d.name == call.name).cloned() else {
                let err = AgentError::UnknownTool(call.name.clone());
                planned.push(Planned::Rejected {
                    failure: ToolFailure::new(ToolErrorKind::UnknownTool, err.to_string()),
                    observation: self.observation_for(&err),
                    call,
                });
                continue;
            };
            if let Err(problems) = descriptor.validate(&call.parameters) {
                let err = AgentError::Validation {
                    tool: call.name.clone(),
                    problems,
                };
                planned.push(Planned::Rejected {
                    failure: ToolFailure::new(ToolErrorKind::InvalidRequest, err.to_string()),
                    observation: self.observation_for(&err),
                    call,
                });
                continue;
            }
            if descriptor.effect.is_cacheable() {
                if let Some(hit) = self.memory.lookup(&call.name, &call.parameters) {
                    tracing::debug!(tool = %call.name, "cache hit");
                    planned.push(Planned::Cached {
                        result: hit.clone(),
                        call,
                    });
                    continue;
                }
                let earlier = planned.iter().position(|p| {
                    matches!(p, Planned::Dispatch { call: c, .. } if c.name == call.name && c.parameters == call.parameters)
                });
                if let Some(index) = earlier {
                    planned.push(Planned::SameAs { call, index });
                    continue;
                }
            }
            let reservation = match descriptor.effect {
                ToolEffect::Paid { .. } => {
                    let cost = descriptor.cost_of(&call.parameters).unwrap_or(0.0);
                    match self.rt.budget.reserve(self.session_id, cost).await {
                        Ok(r) => Some(r),
                        Err(e) => {
                            for p in planned {
                                if let Planned::Dispatch {
                                    reservation: Some(r), ..
                                } = p
                                {
                                    self.rt.budget.release(r).await;
                                }
                            }
                            return Err(self.budget_denied(e, &call).await);
                        }
                    }
                }
                _ => None,
            };
            planned.push(Planned::Dispatch {
                call,
                descriptor,
                reservation,
            });
        }

        for p in &planned {
            match p {
                Planned::Dispatch { call, .. } | Planned::Cached { call, .. } | Planned::SameAs { call, .. } => {
                    self.emit(AgentEvent::ToolInvoked {
                        iteration,
                        tool: call.name.clone(),
                        params: call.parameters.clone(),
                    });
                }
                Planned::Rejected { .. } => {}
            }
        }

        let rt = self.rt;
        let gateway = &rt.gateway;
        let scheduler = &rt.scheduler;
        let results: Vec<Option<ToolResult>> = join_all(planned.iter().map(|p| async move {
            let Planned::Dispatch { call, .. } = p else {
                return None;
            };
            match scheduler.acquire_tool().await {
                Ok(_permit) => Some(gateway.invoke(&call.name, call.parameters.clone()).await),
                Err(_) => Some(ToolResult::failed(
                    &call.name,
                    ToolFailure::new(ToolErrorKind::Internal, "tool pool closed"),
                    0,
                )),
            }
        }))
        .await;

        if self.cancel.is_cancelled() {
            // 结果丢弃；已发生的付费动作仍计入花费
            for (p, r) in planned.into_iter().zip(results) {
                if let Planned::Dispatch {
                    reservation: Some(res), ..
                } = p
                {
                    if r.map_or(false, |r| r.success) {
                        self.rt.budget.commit(res).await?;
                    } else {
                        self.rt.budget.release(res).await;
                    }
                }
            }
            return Err(AgentError::Cancelled);
        }

        self.state.transition(TurnPhase::Observing);
        // 本步全部命中缓存：没有新信息，继续推理只会重复
        let all_reused = !planned.is_empty()
            && planned
                .iter()
                .all(|p| matches!(p, Planned::Cached { .. } | Planned::SameAs { .. }));
        let mut resolved: Vec<Option<ToolResult>> = vec![None; planned.len()];
        let mut step_jobs = Vec::new();
        let mut finished = Vec::new();
        let mut any_failed = false;

        for (i, (p, r)) in planned.into_iter().zip(results).enumerate() {
            match p {
                Planned::Rejected {
                    call,
                    failure,
                    observation,
                } => {
                    any_failed = true;
                    self.emit(AgentEvent::ToolResult {
                        iteration,
                        tool: call.name.clone(),
                        success: false,
                        cached: false,
                        latency_ms: 0,
                        preview: truncate(&observation, PREVIEW_CHARS),
                        error: Some(failure),
                        budget_warnings: Vec::new(),
                    });
                    self.append(
                        Message::observation(observation)
                            .with_payload("tool_rejected", json!({"tool": call.name, "params": call.parameters})),
                    )
                    .await?;
                }
                Planned::Cached { call, result } => {
                    self.observe_reused(&call, &result, iteration).await?;
                    resolved[i] = Some(result);
                }
                Planned::SameAs { call, index } => {
                    let result = resolved.get(index).cloned().flatten().unwrap_or_else(|| {
                        ToolResult::failed(&call.name, ToolFailure::new(ToolErrorKind::Internal, "no result"), 0)
                    });
                    self.observe_reused(&call, &result, iteration).await?;
                    resolved[i] = Some(result);
                }
                Planned::Dispatch {
                    call,
                    descriptor,
                    reservation,
                } => {
                    let result = r.unwrap_or_else(|| {
                        ToolResult::failed(&call.name, ToolFailure::new(ToolErrorKind::Internal, "no result"), 0)
                    });
                    let mut warnings: Vec<BudgetWarning> = Vec::new();
                    if let Some(res) = reservation {
                        if result.success {
                            warnings = self.rt.budget.commit(res).await?;
                        } else {
                            self.rt.budget.release(res).await;
                        }
                    }
                    if result.success {
                        self.memory.remember(&descriptor.effect, &call.name, &call.parameters, &result);
                        if let Some(payload) = &result.payload {
                            if payload.get("job_id").is_some() {
                                if matches!(descriptor.effect, ToolEffect::Paid { .. }) {
                                    if let Some(job) = self.rt.jobs.launch(self.session_id, &call.parameters, payload).await {
                                        step_jobs.push(job);
                                    }
                                } else {
                                    self.rt.jobs.apply_status(payload).await;
                                }
                            }
                        }
                        if descriptor.effect.completes_turn() {
                            finished.push(call.name.clone());
                        }
                    } else {
                        any_failed = true;
                    }

                    let observation = self.result_observation(&result);
                    self.emit(AgentEvent::ToolResult {
                        iteration,
                        tool: call.name.clone(),
                        success: result.success,
                        cached: false,
                        latency_ms: result.latency_ms,
                        preview: preview(&result),
                        error: result.error.clone(),
                        budget_warnings: warnings,
                    });
                    self.append(Message::observation(observation).with_payload("tool_result", tool_result_card(&result, &call)))
                        .await?;
                    resolved[i] = Some(result);
                }
            }
        }

        if !step_jobs.is_empty() {
            self.emit(AgentEvent::JobsLaunched { jobs: step_jobs.clone() });
        }
        let summary = if all_reused {
            tracing::info!(session = self.session_id, iteration, "all tool calls were redundant");
            Some(self.partial_results(
                "Every requested tool result was already available in this turn, so nothing new was gathered."
                    .to_string(),
            ))
        } else if !finished.is_empty() && !any_failed {
            Some(completion_summary(&finished, &step_jobs))
        } else {
            None
        };
        self.launched.extend(step_jobs);
        Ok(match summary {
            Some(s) => StepOutcome::Complete(s),
            None => StepOutcome::Continue,
        })
    }

    async fn observe_reused(&mut self, call: &ToolCall, result: &ToolResult, iteration: usize) -> Result<(), AgentError> {
        self.emit(AgentEvent::ToolResult {
            iteration,
            tool: call.name.clone(),
            success: result.success,
            cached: true,
            latency_ms: 0,
            preview: preview(result),
            error: result.error.clone(),
            budget_warnings: Vec::new(),
        });
        let observation = format!("(cached) {}", self.result_observation(result));
        self.append(Message::observation(observation).with_payload("tool_result", tool_result_card(result, call)))
            .await
    }

    fn observation_for(&self, err: &AgentError) -> String {
        match self.rt.recovery.handle(err) {
            RecoveryAction::InjectObservation(text) => text,
            _ => format!("✗ {err}"),
        }
    }

    /// 成功结果原样写回；失败结果附带按错误类别的建议
    fn result_observation(&self, result: &ToolResult) -> String {
        match (&result.payload, &result.error) {
            (Some(payload), _) if result.success => format!("✓ {}: {}", result.tool, payload),
            (_, Some(failure)) => self.observation_for(&AgentError::Backend {
                tool: result.tool.clone(),
                kind: failure.kind,
                message: failure.message.clone(),
            }),
            _ => format!("✗ {}: no result", result.tool),
        }
    }

    async fn finish(
        &mut self,
        response: String,
        reasoning: Vec<String>,
        card: Option<(&str, Value)>,
    ) -> Result<TurnOutcome, AgentError> {
        self.state.transition(TurnPhase::Complete);
        let mut message = Message::agent(response.clone()).with_reasoning(reasoning);
        if let Some((card_type, data)) = card {
            message = message.with_payload(card_type, data);
        }
        self.append(message).await?;
        self.emit_chunks(&response);
        self.emit(AgentEvent::Completed {
            iterations: self.state.iteration(),
            response: response.clone(),
        });
        Ok(TurnOutcome {
            iterations: self.state.iteration(),
            response,
            jobs: std::mem::take(&mut self.launched),
        })
    }

    fn emit_chunks(&self, text: &str) {
        for chunk in text.split("\n\n").map(str::trim).filter(|c| !c.is_empty()) {
            self.emit(AgentEvent::ConversationalChunk { text: chunk.to_string() });
        }
    }

    /// 推理给出的 `<negotiate>`：有备选则以备选结束本轮，否则 NegotiationExhausted
    async fn negotiate(
        &mut self,
        req: NegotiationRequest,
        constraints: Vec<Constraint>,
        reasoning: Vec<String>,
    ) -> Result<TurnOutcome, AgentError> {
        self.state.transition(TurnPhase::Negotiating);
        let outcome = self.rt.negotiator.negotiate(&constraints, &req.options);
        let wanted: Vec<String> = constraints.iter().map(ToString::to_string).collect();
        self.emit(AgentEvent::ConstraintConflict {
            reason: format!("Requirements cannot all be met: {}", wanted.join(", ")),
            conflicts: outcome.conflicts.clone(),
            alternatives: outcome.alternatives.clone(),
        });
        if outcome.is_exhausted() {
            let text = format!(
                "None of the {} available option(s) satisfies {} even after relaxing within {:.0}% tolerance. \
                 Please relax the quality target, the time limit or the budget.",
                req.options.len(),
                wanted.join(", "),
                self.rt.negotiator.tolerance_percent()
            );
            self.emit_chunks(&text);
            self.append(Message::agent(text.clone()).with_reasoning(reasoning)).await?;
            self.state.transition(TurnPhase::Error);
            return Err(AgentError::NegotiationExhausted(wanted.join(", ")));
        }
        let text = format!(
            "Your requirements ({}) cannot all be met at once. Options:\n\n{}\n\nReply with the option you prefer.",
            wanted.join(", "),
            render_alternatives(&outcome.alternatives)
        );
        let card = serde_json::to_value(&outcome).unwrap_or(Value::Null);
        self.finish(text, reasoning, Some(("alternatives", card))).await
    }

    /// 付费动作被预算闸门拒绝：不下发，给出备选后以 BudgetExceeded 结束本轮
    async fn budget_denied(&mut self, err: AgentError, call: &ToolCall) -> AgentError {
        self.state.transition(TurnPhase::Negotiating);
        let AgentError::BudgetExceeded {
            ref scope,
            requested,
            remaining,
        } = err
        else {
            self.state.transition(TurnPhase::Error);
            return err;
        };

        let requested_label = call
            .parameters
            .get("model_name")
            .and_then(Value::as_str)
            .map(|m| format!("{m} (requested)"))
            .unwrap_or_else(|| format!("{} (requested)", call.name));
        let mut options = self.known_model_options();
        options.push(CandidateOption::new(&requested_label).with(COST_METRIC, requested));
        let outcome = self
            .rt
            .negotiator
            .negotiate(&[Constraint::max(COST_METRIC, remaining)], &options);

        self.emit(AgentEvent::ConstraintConflict {
            reason: err.to_string(),
            conflicts: outcome.conflicts.clone(),
            alternatives: outcome.alternatives.clone(),
        });
        let text = format!(
            "I did not run {}: it costs ${:.2} but only ${:.2} remains in the {} budget.\n\nAlternatives:\n\n{}",
            call.name,
            requested,
            remaining,
            scope,
            render_alternatives(&outcome.alternatives)
        );
        self.emit_chunks(&text);
        let card = serde_json::to_value(&outcome).unwrap_or(Value::Null);
        if let Err(e) = self.append(Message::agent(text).with_payload("alternatives", card)).await {
            tracing::warn!(session = self.session_id, error = %e, "failed to record budget alternatives");
        }
        self.state.transition(TurnPhase::Error);
        err
    }

    /// 会话中最近一次 select_model 成功结果里的候选模型
    fn known_model_options(&self) -> Vec<CandidateOption> {
        let card = self.log.messages().iter().rev().find_map(|m| {
            let payload = m.payload.as_ref()?;
            let is_select = m.role == Role::ToolObservation
                && payload.card_type == "tool_result"
                && payload.data.get("tool").and_then(Value::as_str) == Some(SELECT_MODEL)
                && payload.data.get("success").and_then(Value::as_bool) == Some(true);
            is_select.then_some(&payload.data)
        });
        let Some(candidates) = card
            .and_then(|d| d.get("payload"))
            .and_then(|p| p.get("candidates"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };
        candidates
            .iter()
            .filter_map(|c| {
                let mut option: CandidateOption = serde_json::from_value(c.clone()).ok()?;
                if option.label.is_empty() {
                    option.label = c.get("model_name").and_then(Value::as_str).unwrap_or_default().to_string();
                }
                Some(option)
            })
            .collect()
    }

    fn partial_results(&self, head: String) -> String {
        let findings = self.memory.findings();
        if findings.is_empty() {
            format!(
                "{head} No tool results were gathered yet. \
                 Try rephrasing the request or breaking it into smaller steps."
            )
        } else {
            let lines: Vec<String> = findings.iter().map(|f| format!("- {f}")).collect();
            format!("{head} Here is what I found so far:\n\n{}", lines.join("\n"))
        }
    }

    async fn iteration_limit(&mut self) -> AgentError {
        let iterations = self.state.iteration();
        tracing::warn!(session = self.session_id, iterations, "iteration limit reached");
        let partial = self.partial_results(format!(
            "I reached the limit of {iterations} reasoning steps before finishing."
        ));
        self.end_with_partial(&partial).await;
        AgentError::IterationLimitReached { iterations, partial }
    }

    async fn timed_out(&mut self) -> AgentError {
        let elapsed_secs = self.started.elapsed().as_secs();
        tracing::warn!(session = self.session_id, elapsed_secs, "turn timed out");
        let partial = self.partial_results(format!("I ran out of time after {elapsed_secs}s."));
        self.end_with_partial(&partial).await;
        AgentError::TimeoutReached { elapsed_secs, partial }
    }

    async fn end_with_partial(&mut self, partial: &str) {
        self.emit_chunks(partial);
        if let Err(e) = self.append(Message::agent(partial.to_string())).await {
            tracing::warn!(session = self.session_id, error = %e, "failed to record partial results");
        }
        self.state.transition(TurnPhase::Error);
    }
}

fn preview(result: &ToolResult) -> String {
    match (&result.payload, &result.error) {
        (Some(p), _) => truncate(&p.to_string(), PREVIEW_CHARS),
        (None, Some(e)) => truncate(&e.message, PREVIEW_CHARS),
        _ => String::new(),
    }
}

fn tool_result_card(result: &ToolResult, call: &ToolCall) -> Value {
    let mut card = serde_json::to_value(result).unwrap_or(Value::Null);
    if let Value::Object(ref mut m) = card {
        m.insert("params".into(), call.parameters.clone());
        m.insert("iteration".into(), json!(call.iteration));
    }
    card
}

fn render_alternatives(alternatives: &[Alternative]) -> String {
    alternatives
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let tag = if a.recommended { " (recommended)" } else { "" };
            format!("{}. {}{}", i + 1, a.tradeoff, tag)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn completion_summary(finished: &[String], jobs: &[Job]) -> String {
    let mut lines = Vec::new();
    for job in jobs {
        let model = job.config.get("model_name").and_then(Value::as_str).unwrap_or("the selected model");
        lines.push(format!(
            "Training job {} launched with {} (status: {:?}). Ask me for its status at any time.",
            job.id, model, job.status
        ));
    }
    if jobs.is_empty() {
        lines.push(format!("Done: {} completed successfully.", finished.join(", ")));
    }
    lines.join("\n\n")
}
