//! JSON 文件会话存储与编排器的端到端持久化

mod common;

use std::sync::Arc;

use common::*;
use llmops_agent::llm::MockLlmClient;
use llmops_agent::memory::Role;
use llmops_agent::session::{JsonFileSessionStore, SessionConfig, SessionStore};
use llmops_agent::Orchestrator;

#[tokio::test]
async fn test_turn_persists_to_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileSessionStore::open(dir.path()).await.unwrap());
    let orch = Orchestrator::builder(test_config())
        .with_llm(Arc::new(MockLlmClient::scripted([
            tool_call("list_datasets", serde_json::json!({})),
            "<answer>cier, conll2003 and wikiann-en are available.</answer>".to_string(),
        ])))
        .with_gateway(direct(sandbox()))
        .with_session_store(store)
        .build()
        .await
        .unwrap();
    let session = orch
        .create_session(SessionConfig::with_budget(5.0).titled("ner"))
        .await
        .unwrap();
    orch.handle_message(&session.id, "what data is there?")
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    // 重新打开存储，日志原样可读
    let reopened = JsonFileSessionStore::open(dir.path()).await.unwrap();
    let loaded = reopened.get_session(&session.id).await.unwrap();
    assert_eq!(loaded.title, "ner");
    assert_eq!(loaded.budget_limit, 5.0);
    let roles: Vec<Role> = loaded.messages.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Agent, Role::ToolObservation, Role::Agent]);
    assert!(dir.path().join(format!("{}.json", session.id)).exists());
}

#[tokio::test]
async fn test_data_dir_selects_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config();
    cfg.app.data_dir = Some(dir.path().to_path_buf());
    let orch = Orchestrator::builder(cfg)
        .with_llm(Arc::new(MockLlmClient::new()))
        .with_gateway(direct(sandbox()))
        .build()
        .await
        .unwrap();
    let session = orch.create_session(SessionConfig::default()).await.unwrap();
    assert_eq!(session.budget_limit, 10.0);
    assert!(dir.path().join(format!("{}.json", session.id)).exists());
}
