//! LLMOps Agent 命令行入口
//!
//! 初始化日志、构建编排器，从 stdin 逐行读取用户消息；事件以 JSON 行写到 stdout，日志写到 stderr。
//! 命令：/new [budget]、/tools <query>、/sessions、/archive、/cancel、/quit

use anyhow::Context;
use llmops_agent::config::load_config;
use llmops_agent::observability;
use llmops_agent::session::{Session, SessionConfig};
use llmops_agent::{AgentEvent, Orchestrator};
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_event(ev: &AgentEvent) {
    match serde_json::to_string(ev) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
    }
}

fn print_session(session: &Session) {
    println!(
        "{}",
        serde_json::json!({"type": "session", "id": session.id, "title": session.title, "budget_limit": session.budget_limit})
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(Into::into);
    let cfg = load_config(config_path).context("Failed to load config")?;
    observability::init(&cfg.app.log_level);

    let orch = Orchestrator::builder(cfg)
        .with_system_prompt_from_file()
        .build()
        .await
        .context("Failed to build orchestrator")?;

    let mut session = orch
        .create_session(SessionConfig::default())
        .await
        .context("Failed to create session")?;
    print_session(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/quit") => break,
            Some("/new") => {
                let budget = parts.next().and_then(|b| b.parse::<f64>().ok()).unwrap_or(0.0);
                session = orch.create_session(SessionConfig::with_budget(budget)).await?;
                print_session(&session);
            }
            Some("/tools") => {
                let query = parts.collect::<Vec<_>>().join(" ");
                let matches = orch.gateway().search_tools(&query, 5).await;
                println!("{}", serde_json::json!({"type": "tools", "query": query, "matches": matches}));
            }
            Some("/sessions") => {
                let sessions = orch.list_sessions(true).await?;
                println!("{}", serde_json::json!({"type": "sessions", "sessions": sessions}));
            }
            Some("/archive") => {
                orch.archive_session(&session.id).await?;
                session = orch.create_session(SessionConfig::default()).await?;
                print_session(&session);
            }
            Some("/cancel") => {
                if !orch.cancel(&session.id).await {
                    eprintln!("no turn in progress");
                }
            }
            _ => {
                let mut handle = match orch.handle_message(&session.id, line).await {
                    Ok(h) => h,
                    Err(e) => {
                        print_event(&AgentEvent::Error {
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                            next_steps: e.next_steps(),
                        });
                        continue;
                    }
                };
                let mut stdin_open = true;
                loop {
                    tokio::select! {
                        ev = handle.events.recv() => match ev {
                            Some(ev) => print_event(&ev),
                            None => break,
                        },
                        next = lines.next_line(), if stdin_open => match next? {
                            Some(l) if l.trim() == "/cancel" => handle.cancel(),
                            Some(_) => eprintln!("a turn is in progress; only /cancel is accepted"),
                            None => {
                                stdin_open = false;
                                handle.cancel();
                            }
                        },
                        _ = tokio::signal::ctrl_c() => handle.cancel(),
                    }
                }
                // 事件流已包含结果
                let _ = handle.join().await;
                if !stdin_open {
                    break;
                }
            }
        }
    }

    let (prompt, completion, total) = orch.token_usage();
    tracing::info!(prompt, completion, total, "token usage");
    orch.shutdown();
    Ok(())
}
